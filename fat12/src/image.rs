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

//! Image lifecycle (C9): format, load, flush, and the shared read/write primitives
//! every other component uses to touch the in-memory buffer.

use std::path::{Path, PathBuf};

use log::{info, warn};
use zerocopy::{FromBytes, IntoBytes};

use fat12_err::{Error, Result};
use fat12_storage as storage;

use crate::fat::{self, FatTable};
use crate::layout::{BootSector, DirEntry, DIR_ENTRY_LEN};

/// Supported image sizes, in kilobytes of block size.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ImageSizeKb {
    Half,
    One,
}

impl ImageSizeKb {
    pub fn block_size(self) -> u32 {
        match self {
            ImageSizeKb::Half => 512,
            ImageSizeKb::One => 1024,
        }
    }

    pub fn from_kb(kb: f64) -> Result<Self> {
        if kb == 0.5 {
            Ok(ImageSizeKb::Half)
        } else if kb == 1.0 {
            Ok(ImageSizeKb::One)
        } else {
            Err(Error::BadImage(format!(
                "unsupported image size {kb}KB; must be 0.5 or 1.0"
            )))
        }
    }
}

/// The whole FAT12 volume, held as a single contiguous in-memory buffer for the
/// duration of the session.
pub struct Fat12Image {
    buffer: Vec<u8>,
    path: PathBuf,
    boot: BootSector,
}

impl Fat12Image {
    pub fn format(path: PathBuf, size: ImageSizeKb) -> Result<Self> {
        let block_size = size.block_size();
        let total_bytes = block_size * crate::layout::TOTAL_CLUSTERS;
        let sectors_per_cluster = (block_size / crate::layout::BYTES_PER_SECTOR as u32) as u8;
        let total_sectors = total_bytes / crate::layout::BYTES_PER_SECTOR as u32;

        let boot = BootSector::new(sectors_per_cluster, total_sectors);
        let mut buffer = vec![0u8; total_bytes as usize];
        buffer[..std::mem::size_of::<BootSector>()].copy_from_slice(boot.as_bytes());

        let mut image = Fat12Image { buffer, path, boot };

        // Reserved entries for cluster indices 0 and 1, per §4.9: media byte in the
        // low byte of index 0, 0xFFF at index 0's high nibble carrier, 0xFF0 at index 1.
        {
            let mut fat = image.fat_table_mut();
            fat.write(0, 0xF00 | crate::layout::MEDIA_DESCRIPTOR as u16)?;
            fat.write(1, fat::EOC)?;
        }
        image.mirror_fat()?;

        info!(
            "formatted {}KB image at {}",
            if size == ImageSizeKb::Half { "512" } else { "1024" },
            image.path.display()
        );
        Ok(image)
    }

    pub fn load(path: PathBuf) -> Result<Self> {
        let buffer = storage::read_image(&path)?;
        if buffer.len() < std::mem::size_of::<BootSector>() {
            return Err(Error::BadImage("image shorter than boot sector".into()));
        }
        let boot = BootSector::read_from_bytes(&buffer[..std::mem::size_of::<BootSector>()])
            .map_err(|_| Error::BadImage("boot sector could not be decoded".into()))?;

        if boot.bytes_per_sector() != crate::layout::BYTES_PER_SECTOR as u32 {
            return Err(Error::BadImage(format!(
                "unsupported bytes-per-sector {}",
                boot.bytes_per_sector()
            )));
        }
        let data_area_start = boot.data_area_start();
        if (buffer.len() as u32) < data_area_start {
            return Err(Error::BadImage(
                "image too short for its own boot-sector geometry".into(),
            ));
        }

        info!("loaded image from {}", path.display());
        Ok(Fat12Image { buffer, path, boot })
    }

    pub fn flush(&self) -> Result<()> {
        storage::flush_image(&self.path, &self.buffer)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn boot(&self) -> &BootSector {
        &self.boot
    }

    pub fn block_size(&self) -> u32 {
        self.boot.block_size()
    }

    pub fn root_dir_start(&self) -> u32 {
        self.boot.root_dir_start()
    }

    pub fn data_area_start(&self) -> u32 {
        self.boot.data_area_start()
    }

    pub fn root_entry_count(&self) -> u32 {
        self.boot.root_entry_count()
    }

    pub fn entries_per_cluster(&self) -> u32 {
        self.block_size() / DIR_ENTRY_LEN as u32
    }

    pub fn fat_capacity(&self) -> u32 {
        self.boot.fat_capacity()
    }

    fn fat_table_mut(&mut self) -> FatTable<'_> {
        let start = self.boot.fat1_start() as usize;
        let end = start + self.boot.fat_size_bytes() as usize;
        FatTable::new(&mut self.buffer[start..end])
    }

    pub fn fat_mut(&mut self) -> FatTable<'_> {
        self.fat_table_mut()
    }

    pub fn read_fat(&self, cluster: u32) -> Result<u16> {
        let start = self.boot.fat1_start() as usize;
        let end = start + self.boot.fat_size_bytes() as usize;
        fat::read_entry(&self.buffer[start..end], cluster)
    }

    /// Mirrors FAT1 onto FAT2; called at format time and before every flush so both
    /// copies stay byte-identical (invariant 5 / S5).
    pub fn mirror_fat(&mut self) -> Result<()> {
        let fat1_start = self.boot.fat1_start() as usize;
        let fat2_start = self.boot.fat2_start() as usize;
        let fat_len = self.boot.fat_size_bytes() as usize;
        let (lo, hi) = self.buffer.split_at_mut(fat2_start);
        hi[..fat_len].copy_from_slice(&lo[fat1_start..fat1_start + fat_len]);
        Ok(())
    }

    /// Byte offset of logical cluster `cluster` within the buffer (not relative to the
    /// data area alone).
    pub fn cluster_byte_offset(&self, cluster: u32) -> u32 {
        crate::region::cluster_offset(self.data_area_start(), self.block_size(), cluster)
    }

    pub fn is_root_region(&self, ptr: u32) -> bool {
        crate::region::is_root_region(ptr, self.root_dir_start(), self.data_area_start())
    }

    pub fn read_dir_entry(&self, byte_offset: u32) -> Result<DirEntry> {
        let o = byte_offset as usize;
        self.buffer
            .get(o..o + DIR_ENTRY_LEN)
            .and_then(|s| DirEntry::read_from_bytes(s).ok())
            .ok_or_else(|| Error::BadImage(format!("directory slot out of range at {byte_offset}")))
    }

    pub fn write_dir_entry(&mut self, byte_offset: u32, entry: &DirEntry) -> Result<()> {
        let o = byte_offset as usize;
        if o + DIR_ENTRY_LEN > self.buffer.len() {
            return Err(Error::BadImage(format!(
                "directory slot out of range at {byte_offset}"
            )));
        }
        self.buffer[o..o + DIR_ENTRY_LEN].copy_from_slice(entry.as_bytes());
        Ok(())
    }

    pub fn zero_cluster(&mut self, cluster: u32) -> Result<()> {
        let o = self.cluster_byte_offset(cluster) as usize;
        let len = self.block_size() as usize;
        if o + len > self.buffer.len() {
            return Err(Error::BadImage(format!("cluster {cluster} out of range")));
        }
        self.buffer[o..o + len].fill(0);
        Ok(())
    }

    pub fn read_cluster(&self, cluster: u32) -> Result<&[u8]> {
        let o = self.cluster_byte_offset(cluster) as usize;
        let len = self.block_size() as usize;
        self.buffer
            .get(o..o + len)
            .ok_or_else(|| Error::BadImage(format!("cluster {cluster} out of range")))
    }

    pub fn write_cluster_bytes(&mut self, cluster: u32, offset_in_cluster: usize, data: &[u8]) -> Result<()> {
        let o = self.cluster_byte_offset(cluster) as usize + offset_in_cluster;
        if o + data.len() > self.buffer.len() {
            return Err(Error::BadImage(format!("cluster {cluster} write out of range")));
        }
        self.buffer[o..o + data.len()].copy_from_slice(data);
        Ok(())
    }
}

impl Drop for Fat12Image {
    fn drop(&mut self) {
        if let Err(err) = self.mirror_fat().and_then(|_| self.flush()) {
            warn!("image teardown failed to flush {}: {err}", self.path.display());
        }
    }
}

/// Sweeps the FAT to classify cluster usage, for `dumpe2fs` (C8).
pub fn count_clusters(image: &Fat12Image) -> Result<(u32, u32)> {
    let mut free = 0;
    let mut used = 0;
    for cluster in crate::layout::FIRST_DATA_CLUSTER..image.fat_capacity() {
        if fat::is_free(image.read_fat(cluster)?) {
            free += 1;
        } else {
            used += 1;
        }
    }
    Ok((free, used))
}
