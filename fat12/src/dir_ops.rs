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

//! Directory operations (C7): `mkdir`, directory listing.

use log::{info, warn};

use fat12_err::{Error, Result};

use crate::alloc;
use crate::layout::{pack_name, DirEntry, Timestamp, ATTR_DIRECTORY};
use crate::image::Fat12Image;
use crate::path::{self, ResolvedDir};

/// Creates a directory at `absolute_path`. Fails **no-such-path** if the parent is
/// missing, **already-exists** on a name collision, **parent-full** if the root cannot
/// grow and has no free slot, **out-of-space** if no cluster is available.
pub fn mkdir(image: &mut Fat12Image, absolute_path: &str) -> Result<()> {
    let (parent_path, name) = path::resolve_parent_and_name(absolute_path)?;
    let (parent_dir, parent_self_entry) = path::resolve_dir_with_self_entry(image, parent_path)?;

    if path::find_in_dir(image, parent_dir, name)?.is_some() {
        warn!("mkdir {absolute_path}: already exists");
        return Err(Error::AlreadyExists(absolute_path.to_string()));
    }
    if name.len() > 8 || !name.is_ascii() {
        warn!("mkdir {absolute_path}: bad path");
        return Err(Error::BadPath(absolute_path.to_string()));
    }

    let slot_offset = find_or_grow_free_slot(image, parent_dir)?;

    let capacity = image.fat_capacity();
    let new_cluster = {
        let mut fat = image.fat_mut();
        match alloc::allocate(&mut fat, capacity) {
            Ok(cluster) => cluster,
            Err(err) => {
                // Release the slot reserved above before surfacing out-of-space.
                drop(fat);
                image.write_dir_entry(slot_offset, &DirEntry::free())?;
                warn!("mkdir {absolute_path}: {err}");
                return Err(err);
            }
        }
    };

    let now = Timestamp::now();
    let mut new_entry = DirEntry::free();
    new_entry.set_raw_name(&pack_name(name));
    new_entry.attr = ATTR_DIRECTORY;
    new_entry.created = now;
    new_entry.modified = now;
    new_entry.starting_cluster.set(new_cluster as u16);
    image.write_dir_entry(slot_offset, &new_entry)?;

    image.zero_cluster(new_cluster)?;
    let dot = dot_entry(&new_entry, new_cluster);
    let dotdot = dotdot_entry(parent_dir, &parent_self_entry, &new_entry);
    let cluster_start = image.cluster_byte_offset(new_cluster);
    image.write_dir_entry(cluster_start, &dot)?;
    image.write_dir_entry(cluster_start + crate::layout::DIR_ENTRY_LEN as u32, &dotdot)?;

    touch_directory_modified(image, parent_self_entry)?;
    info!("created directory {absolute_path}");
    Ok(())
}

fn dot_entry(new_entry: &DirEntry, new_cluster: u32) -> DirEntry {
    let mut dot = *new_entry;
    dot.set_raw_name(&pack_name("."));
    dot.starting_cluster.set(new_cluster as u16);
    dot
}

fn dotdot_entry(
    parent_dir: ResolvedDir,
    parent_self_entry: &Option<(u32, DirEntry)>,
    new_entry: &DirEntry,
) -> DirEntry {
    let mut dotdot = *new_entry;
    dotdot.set_raw_name(&pack_name(".."));
    dotdot.attr = match parent_self_entry {
        Some((_, entry)) => entry.attr,
        None => ATTR_DIRECTORY,
    };
    let parent_cluster = match parent_dir {
        ResolvedDir::Root => 0,
        ResolvedDir::Sub { starting_cluster } => starting_cluster,
    };
    dotdot.starting_cluster.set(parent_cluster as u16);
    dotdot
}

/// Finds a free slot in `dir`; for subdirectories whose chain is exhausted, allocates
/// and links a new cluster before returning its first slot. The root can never grow:
/// an exhausted root reports **parent-full**.
pub(crate) fn find_or_grow_free_slot(image: &mut Fat12Image, dir: ResolvedDir) -> Result<u32> {
    if let Some(offset) = path::find_free_slot(image, dir)? {
        return Ok(offset);
    }
    match dir {
        ResolvedDir::Root => {
            warn!("root directory has no free slot");
            Err(Error::ParentFull)
        }
        ResolvedDir::Sub { starting_cluster } => {
            let capacity = image.fat_capacity();
            let new_cluster = {
                let mut fat = image.fat_mut();
                match alloc::allocate(&mut fat, capacity) {
                    Ok(cluster) => cluster,
                    Err(_) => {
                        warn!("parent directory cannot grow: allocator exhausted");
                        return Err(Error::ParentFull);
                    }
                }
            };
            link_chain_tail(image, starting_cluster, new_cluster)?;
            image.zero_cluster(new_cluster)?;
            Ok(image.cluster_byte_offset(new_cluster))
        }
    }
}

fn link_chain_tail(image: &mut Fat12Image, head: u32, new_tail: u32) -> Result<()> {
    let mut current = head;
    loop {
        let value = image.read_fat(current)?;
        if crate::fat::is_eoc(value) {
            let mut fat = image.fat_mut();
            fat.write(current, new_tail as u16)?;
            return Ok(());
        }
        current = value as u32;
    }
}

/// Updates the parent's own authoritative directory-entry slot (as found in the
/// *grandparent*'s directory region), not the `.` mirror living in the parent's own
/// cluster. Root has no entry of its own, so `None` is a no-op.
fn touch_directory_modified(image: &mut Fat12Image, self_entry: Option<(u32, DirEntry)>) -> Result<()> {
    let Some((offset, mut entry)) = self_entry else {
        return Ok(());
    };
    entry.modified = Timestamp::now();
    image.write_dir_entry(offset, &entry)
}

/// Returns every non-free slot of the directory named by `absolute_path`, in
/// traversal order, for human-readable listing.
pub fn list_dir(image: &Fat12Image, absolute_path: &str) -> Result<Vec<DirEntry>> {
    let dir = path::resolve_dir(image, absolute_path)?;
    let slots = dir.cursor(image).collect_all(image)?;
    Ok(slots
        .into_iter()
        .filter(|(_, entry)| !entry.is_free())
        .map(|(_, entry)| entry)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::ImageSizeKb;

    fn fresh_image() -> (tempfile::TempDir, Fat12Image) {
        let dir = tempfile::tempdir().unwrap();
        let image = Fat12Image::format(dir.path().join("image.img"), ImageSizeKb::One).unwrap();
        (dir, image)
    }

    #[test]
    fn mkdir_creates_directory_entry_in_root() {
        let (_dir, mut image) = fresh_image();
        mkdir(&mut image, "/usr").unwrap();
        let entries = list_dir(&image, "/").unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].display_name(), "usr");
        assert!(entries[0].is_directory());
        assert_eq!(entries[0].file_size.get(), 0);
    }

    #[test]
    fn mkdir_rejects_duplicate_name() {
        let (_dir, mut image) = fresh_image();
        mkdir(&mut image, "/a").unwrap();
        let err = mkdir(&mut image, "/a");
        assert!(matches!(err, Err(Error::AlreadyExists(_))));
    }

    #[test]
    fn mkdir_rejects_missing_parent() {
        let (_dir, mut image) = fresh_image();
        let err = mkdir(&mut image, "/nope/x");
        assert!(matches!(err, Err(Error::NoSuchPath(_))));
    }

    #[test]
    fn nested_mkdir_synthesizes_dot_and_dotdot() {
        let (_dir, mut image) = fresh_image();
        mkdir(&mut image, "/usr").unwrap();
        mkdir(&mut image, "/usr/ysa").unwrap();
        let entries = list_dir(&image, "/usr").unwrap();
        assert_eq!(entries[0].display_name(), ".");
        assert_eq!(entries[1].display_name(), "..");
        assert_eq!(entries[1].starting_cluster.get(), 0);
        assert_eq!(entries[2].display_name(), "ysa");
    }
}
