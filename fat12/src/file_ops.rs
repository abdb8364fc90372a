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

//! File operations (C8): import/export content, permission change, filesystem dump.

use log::{info, warn};

use fat12_err::{Error, Result};

use crate::alloc;
use crate::dir_ops::find_or_grow_free_slot;
use crate::image::{self as image_mod, Fat12Image};
use crate::layout::{pack_name, DirEntry, Timestamp, ATTR_ARCHIVE, ATTR_READABLE, ATTR_WRITABLE};
use crate::path::{self, ResolvedDir};

/// Imports a host file's content into `image_path`, reading permission bits from the
/// host file (external collaborator supplies the bytes and the POSIX bits).
pub fn write_file(
    image: &mut Fat12Image,
    image_path: &str,
    content: &[u8],
    host_perm_bits: u8,
) -> Result<()> {
    let (parent_path, name) = path::resolve_parent_and_name(image_path)?;
    let parent_dir = path::resolve_dir(image, parent_path)?;

    if path::find_in_dir(image, parent_dir, name)?.is_some() {
        warn!("write {image_path}: already exists");
        return Err(Error::AlreadyExists(image_path.to_string()));
    }
    if name.len() > 8 || !name.is_ascii() {
        warn!("write {image_path}: bad path");
        return Err(Error::BadPath(image_path.to_string()));
    }

    let slot_offset = find_or_grow_free_slot(image, parent_dir)?;

    let block_size = image.block_size() as usize;
    let cluster_count = content.len().div_ceil(block_size).max(1) as u32;

    let capacity = image.fat_capacity();
    let chain = {
        let mut fat = image.fat_mut();
        match alloc::chain_allocate(&mut fat, capacity, cluster_count) {
            Ok(chain) => chain,
            Err(err) => {
                drop(fat);
                image.write_dir_entry(slot_offset, &DirEntry::free())?;
                warn!("write {image_path}: {err}");
                return Err(err);
            }
        }
    };

    for (i, &cluster) in chain.iter().enumerate() {
        let start = i * block_size;
        let end = (start + block_size).min(content.len());
        image.zero_cluster(cluster)?;
        if start < content.len() {
            image.write_cluster_bytes(cluster, 0, &content[start..end])?;
        }
    }

    let now = Timestamp::now();
    let mut entry = DirEntry::free();
    entry.set_raw_name(&pack_name(name));
    entry.attr = ATTR_ARCHIVE | (host_perm_bits & (ATTR_READABLE | ATTR_WRITABLE));
    entry.created = now;
    entry.modified = now;
    entry.starting_cluster.set(chain[0] as u16);
    entry.file_size.set(content.len() as u32);
    image.write_dir_entry(slot_offset, &entry)?;
    info!("wrote {} bytes to {image_path}", content.len());
    Ok(())
}

/// Exports the content of `image_path`'s file, returning exactly `file_size` bytes
/// (not the padded tail of the last cluster). Fails **permission-denied** if the
/// entry's readable bit is clear.
pub fn read_file(image: &Fat12Image, image_path: &str) -> Result<Vec<u8>> {
    let (parent_path, name) = path::resolve_parent_and_name(image_path)?;
    let parent_dir = path::resolve_dir(image, parent_path)?;
    let (_, entry) = path::find_in_dir(image, parent_dir, name)?
        .ok_or_else(|| Error::NoSuchPath(image_path.to_string()))?;

    if !entry.is_readable() {
        return Err(Error::PermissionDenied(image_path.to_string()));
    }

    let mut out = Vec::with_capacity(entry.file_size.get() as usize);
    let mut remaining = entry.file_size.get() as usize;
    let mut cluster = entry.starting_cluster.get() as u32;
    let block_size = image.block_size() as usize;

    while remaining > 0 {
        let take = remaining.min(block_size);
        out.extend_from_slice(&image.read_cluster(cluster)?[..take]);
        remaining -= take;
        if remaining > 0 {
            cluster = image.read_fat(cluster)?.into();
        }
    }
    Ok(out)
}

/// Applies a `+rw`/`-r`/... permission-delta string to the entry's attribute byte.
/// `+` sets bits, `-` clears them; only `r`/`w` flags are recognized.
pub fn chmod(image: &mut Fat12Image, image_path: &str, delta: &str) -> Result<()> {
    let (parent_path, name) = path::resolve_parent_and_name(image_path)?;
    let parent_dir = path::resolve_dir(image, parent_path)?;
    let (offset, mut entry) = path::find_in_dir(image, parent_dir, name)?.ok_or_else(|| {
        warn!("chmod {image_path}: no such path");
        Error::NoSuchPath(image_path.to_string())
    })?;

    let mut set = true;
    for ch in delta.chars() {
        match ch {
            '+' => set = true,
            '-' => set = false,
            'r' => apply_bit(&mut entry.attr, ATTR_READABLE, set),
            'w' => apply_bit(&mut entry.attr, ATTR_WRITABLE, set),
            _ => {
                warn!("chmod {image_path}: unrecognized flag '{ch}'");
                return Err(Error::BadPath(format!("unrecognized chmod flag '{ch}'")));
            }
        }
    }
    image.write_dir_entry(offset, &entry)?;
    info!("chmod {delta} applied to {image_path}");
    Ok(())
}

fn apply_bit(attr: &mut u8, bit: u8, set: bool) {
    if set {
        *attr |= bit;
    } else {
        *attr &= !bit;
    }
}

/// Geometry and occupancy summary for `dumpe2fs`.
pub struct FsDump {
    pub total_bytes: u32,
    pub block_size: u32,
    pub fat1_start: u32,
    pub fat2_start: u32,
    pub root_dir_start: u32,
    pub data_area_start: u32,
    pub free_clusters: u32,
    pub used_clusters: u32,
    pub directory_count: u32,
    pub file_count: u32,
}

pub fn dumpe2fs(image: &Fat12Image) -> Result<FsDump> {
    let (free_clusters, used_clusters) = image_mod::count_clusters(image)?;
    let (directory_count, file_count) = count_tree(image, ResolvedDir::Root)?;
    Ok(FsDump {
        total_bytes: image.boot().total_bytes(),
        block_size: image.block_size(),
        fat1_start: image.boot().fat1_start(),
        fat2_start: image.boot().fat2_start(),
        root_dir_start: image.root_dir_start(),
        data_area_start: image.data_area_start(),
        free_clusters,
        used_clusters,
        directory_count,
        file_count,
    })
}

fn count_tree(image: &Fat12Image, dir: ResolvedDir) -> Result<(u32, u32)> {
    let mut directories = 0;
    let mut files = 0;
    let slots = dir.cursor(image).collect_all(image)?;
    for (_, entry) in slots {
        if entry.is_free() {
            continue;
        }
        let name = entry.display_name();
        if entry.is_directory() {
            if name == "." || name == ".." {
                continue;
            }
            directories += 1;
            let (sub_dirs, sub_files) = count_tree(
                image,
                ResolvedDir::Sub {
                    starting_cluster: entry.starting_cluster.get() as u32,
                },
            )?;
            directories += sub_dirs;
            files += sub_files;
        } else {
            files += 1;
        }
    }
    Ok((directories, files))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dir_ops::mkdir;
    use crate::image::ImageSizeKb;

    fn fresh_image() -> (tempfile::TempDir, Fat12Image) {
        let dir = tempfile::tempdir().unwrap();
        let image = Fat12Image::format(dir.path().join("image.img"), ImageSizeKb::One).unwrap();
        (dir, image)
    }

    #[test]
    fn write_then_read_round_trips_small_file() {
        let (_dir, mut image) = fresh_image();
        write_file(&mut image, "/f", b"hello world", 0x01 | 0x02).unwrap();
        let content = read_file(&image, "/f").unwrap();
        assert_eq!(content, b"hello world");
    }

    #[test]
    fn write_spans_multiple_clusters_and_reports_exact_size() {
        let (_dir, mut image) = fresh_image();
        let block_size = image.block_size() as usize;
        let content = vec![0xABu8; block_size + 17];
        write_file(&mut image, "/big", &content, 0x01 | 0x02).unwrap();
        let read_back = read_file(&image, "/big").unwrap();
        assert_eq!(read_back, content);
    }

    #[test]
    fn chmod_clears_and_restores_readable_bit() {
        let (_dir, mut image) = fresh_image();
        write_file(&mut image, "/f", b"x", 0x01 | 0x02).unwrap();
        chmod(&mut image, "/f", "-r").unwrap();
        assert!(matches!(
            read_file(&image, "/f"),
            Err(Error::PermissionDenied(_))
        ));
        chmod(&mut image, "/f", "+r").unwrap();
        assert_eq!(read_file(&image, "/f").unwrap(), b"x");
    }

    #[test]
    fn dumpe2fs_counts_directories_and_files() {
        let (_dir, mut image) = fresh_image();
        mkdir(&mut image, "/usr").unwrap();
        write_file(&mut image, "/f", b"x", 0x01 | 0x02).unwrap();
        let dump = dumpe2fs(&image).unwrap();
        assert_eq!(dump.directory_count, 1);
        assert_eq!(dump.file_count, 1);
    }
}
