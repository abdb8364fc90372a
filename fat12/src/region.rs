// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Region map (C4): cluster index <-> byte offset, root-vs-data classification.

/// Physical location of logical cluster `cluster` within the data area: this engine
/// uses `data_area[cluster * block_size]` rather than the historical `(cluster - 2)`
/// offset convention (both are self-consistent; see the allocator's lower bound).
pub fn cluster_offset(data_area_start: u32, block_size: u32, cluster: u32) -> u32 {
    data_area_start + cluster * block_size
}

pub fn is_root_region(ptr: u32, root_dir_start: u32, data_area_start: u32) -> bool {
    (root_dir_start..data_area_start).contains(&ptr)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cluster_offset_scales_by_block_size() {
        assert_eq!(cluster_offset(1000, 512, 2), 1000 + 1024);
        assert_eq!(cluster_offset(1000, 512, 3), 1000 + 1536);
    }

    #[test]
    fn root_region_is_exclusive_of_data_area_start() {
        assert!(is_root_region(500, 100, 1000));
        assert!(!is_root_region(1000, 100, 1000));
        assert!(!is_root_region(50, 100, 1000));
    }
}
