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

//! Cluster allocator (C3): scan the FAT for a free slot, chain allocations, free chains.

use fat12_err::{Error, Result};

use crate::fat::{self, FatTable};
use crate::layout::FIRST_DATA_CLUSTER;

pub fn allocate(fat: &mut FatTable, capacity: u32) -> Result<u32> {
    for cluster in FIRST_DATA_CLUSTER..capacity {
        if fat::is_free(fat.read(cluster)?) {
            fat.write(cluster, fat::EOC)?;
            return Ok(cluster);
        }
    }
    Err(Error::OutOfSpace)
}

/// Allocates `n` clusters and links them into a single chain terminated by EOC. On
/// partial failure, frees whatever was already allocated before reporting out-of-space.
pub fn chain_allocate(fat: &mut FatTable, capacity: u32, n: u32) -> Result<Vec<u32>> {
    let mut chain = Vec::with_capacity(n as usize);
    for _ in 0..n {
        match allocate(fat, capacity) {
            Ok(cluster) => chain.push(cluster),
            Err(err) => {
                for &c in &chain {
                    free(fat, c)?;
                }
                return Err(err);
            }
        }
    }
    for pair in chain.windows(2) {
        fat.write(pair[0], pair[1] as u16)?;
    }
    Ok(chain)
}

/// Walks the chain rooted at `cluster` and zeroes every link.
pub fn free(fat: &mut FatTable, cluster: u32) -> Result<()> {
    let mut current = cluster;
    loop {
        let value = fat.read(current)?;
        fat.write(current, fat::FREE)?;
        if fat::is_eoc(value) {
            break;
        }
        current = value as u32;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn successive_allocations_are_disjoint_and_marked_eoc() {
        let mut bytes = vec![0u8; 4608];
        let mut fat = FatTable::new(&mut bytes);
        let a = allocate(&mut fat, 3072).unwrap();
        let b = allocate(&mut fat, 3072).unwrap();
        assert_ne!(a, b);
        assert_eq!(fat.read(a).unwrap(), fat::EOC);
        assert_eq!(fat.read(b).unwrap(), fat::EOC);
    }

    #[test]
    fn chain_allocate_links_clusters_in_order() {
        let mut bytes = vec![0u8; 4608];
        let mut fat = FatTable::new(&mut bytes);
        let chain = chain_allocate(&mut fat, 3072, 3).unwrap();
        assert_eq!(chain.len(), 3);
        assert_eq!(fat.read(chain[0]).unwrap(), chain[1] as u16);
        assert_eq!(fat.read(chain[1]).unwrap(), chain[2] as u16);
        assert_eq!(fat.read(chain[2]).unwrap(), fat::EOC);
    }

    #[test]
    fn out_of_space_reports_and_leaves_fat_unchanged() {
        let mut bytes = vec![0u8; 4608];
        let mut fat = FatTable::new(&mut bytes);
        // Fill the tiny capacity with reserved data so allocation has nowhere to go.
        for c in 2..5 {
            fat.write(c, fat::EOC).unwrap();
        }
        let err = allocate(&mut fat, 5);
        assert!(matches!(err, Err(fat12_err::Error::OutOfSpace)));
    }

    #[test]
    fn free_walks_and_clears_the_whole_chain() {
        let mut bytes = vec![0u8; 4608];
        let mut fat = FatTable::new(&mut bytes);
        let chain = chain_allocate(&mut fat, 3072, 3).unwrap();
        free(&mut fat, chain[0]).unwrap();
        for c in chain {
            assert!(fat::is_free(fat.read(c).unwrap()));
        }
    }
}
