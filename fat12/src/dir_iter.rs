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

//! Directory iterator (C5): walk a directory's 32-byte slots across cluster boundaries,
//! treating the fixed root as one flat region and subdirectories as FAT chains.

use fat12_err::Result;

use crate::fat;
use crate::image::Fat12Image;
use crate::layout::{DirEntry, DIR_ENTRY_LEN};

enum Mode {
    Root { index: u32, count: u32 },
    Chain { cluster: u32, slot: u32, entries_per_cluster: u32 },
}

/// Iterates a directory's slots in traversal order. Constructed either from a
/// directory-bearing entry or from a bare cluster index for low-level callers.
pub struct DirCursor {
    mode: Mode,
}

impl DirCursor {
    /// The root directory: a single flat run of `rootEntryCount` slots.
    pub fn root(image: &Fat12Image) -> Self {
        DirCursor {
            mode: Mode::Root {
                index: 0,
                count: image.root_entry_count(),
            },
        }
    }

    /// A subdirectory rooted at `cluster`: `entriesPerCluster` slots per cluster, then
    /// follow the FAT chain until EOC.
    pub fn at_cluster(image: &Fat12Image, cluster: u32) -> Self {
        DirCursor {
            mode: Mode::Chain {
                cluster,
                slot: 0,
                entries_per_cluster: image.entries_per_cluster(),
            },
        }
    }

    fn has_next(&self, image: &Fat12Image) -> Result<bool> {
        match &self.mode {
            Mode::Root { index, count } => Ok(index < count),
            Mode::Chain {
                cluster,
                slot,
                entries_per_cluster,
            } => {
                if slot < entries_per_cluster {
                    Ok(true)
                } else {
                    Ok(!fat::is_eoc(image.read_fat(*cluster)?))
                }
            }
        }
    }

    /// Byte offset of the next slot, advancing the cursor; `None` once exhausted.
    fn advance(&mut self, image: &Fat12Image) -> Result<Option<u32>> {
        if !self.has_next(image)? {
            return Ok(None);
        }
        match &mut self.mode {
            Mode::Root { index, .. } => {
                let offset = image.root_dir_start() + *index * DIR_ENTRY_LEN as u32;
                *index += 1;
                Ok(Some(offset))
            }
            Mode::Chain {
                cluster,
                slot,
                entries_per_cluster,
            } => {
                if *slot >= *entries_per_cluster {
                    let next = image.read_fat(*cluster)?;
                    *cluster = next as u32;
                    *slot = 0;
                }
                let offset = image.cluster_byte_offset(*cluster) + *slot * DIR_ENTRY_LEN as u32;
                *slot += 1;
                Ok(Some(offset))
            }
        }
    }

    /// Returns every `(byte_offset, entry)` pair, free slots included; filtering is the
    /// caller's responsibility per §4.5. Termination is purely structural (slot count
    /// for the root, FAT-chain exhaustion for subdirectories) — a `0x00` slot does not
    /// stop the walk early.
    pub fn collect_all(mut self, image: &Fat12Image) -> Result<Vec<(u32, DirEntry)>> {
        let mut out = Vec::new();
        while let Some(offset) = self.advance(image)? {
            let entry = image.read_dir_entry(offset)?;
            out.push((offset, entry));
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::{Fat12Image, ImageSizeKb};

    #[test]
    fn root_cursor_terminates_at_root_entry_count() {
        let dir = tempfile::tempdir().unwrap();
        let image = Fat12Image::format(dir.path().join("image.img"), ImageSizeKb::One).unwrap();
        let slots = DirCursor::root(&image).collect_all(&image).unwrap();
        assert_eq!(slots.len(), image.root_entry_count() as usize);
    }
}
