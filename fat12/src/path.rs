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

//! Path resolver (C6): tokenize an absolute path, descend directory-by-directory.

use fat12_err::{Error, Result};

use crate::dir_iter::DirCursor;
use crate::image::Fat12Image;
use crate::layout::DirEntry;

/// A resolved directory: its byte-offset slots are reachable either through the root
/// cursor or by cluster, so callers re-derive the cursor from this descriptor.
#[derive(Clone, Copy, Debug)]
pub enum ResolvedDir {
    Root,
    Sub { starting_cluster: u32 },
}

impl ResolvedDir {
    pub fn cursor(self, image: &Fat12Image) -> DirCursor {
        match self {
            ResolvedDir::Root => DirCursor::root(image),
            ResolvedDir::Sub { starting_cluster } => DirCursor::at_cluster(image, starting_cluster),
        }
    }
}

/// Splits `/a/b/c` into tokens; the bare root `/` yields an empty token list meaning
/// "the root". Relative paths are rejected.
pub fn tokenize(path: &str) -> Result<Vec<&str>> {
    if !path.starts_with('/') {
        return Err(Error::BadPath(path.to_string()));
    }
    Ok(path.split('/').filter(|s| !s.is_empty()).collect())
}

/// Resolves an absolute path to the directory it names.
pub fn resolve_dir(image: &Fat12Image, path: &str) -> Result<ResolvedDir> {
    Ok(resolve_dir_with_self_entry(image, path)?.0)
}

/// Resolves an absolute path to the directory it names, plus that directory's own
/// `(offset, entry)` pair as found in its *parent*'s directory region — the
/// authoritative slot a grandchild's `mkdir` must update, as opposed to the `.` mirror
/// living in the directory's own cluster. `None` for the root, which has no entry of
/// its own.
pub fn resolve_dir_with_self_entry(
    image: &Fat12Image,
    path: &str,
) -> Result<(ResolvedDir, Option<(u32, DirEntry)>)> {
    let tokens = tokenize(path)?;
    let mut current = ResolvedDir::Root;
    let mut self_entry = None;
    for token in tokens {
        let found = find_in_dir(image, current, token)?
            .ok_or_else(|| Error::NoSuchPath(path.to_string()))?;
        if !found.1.is_directory() {
            return Err(Error::NoSuchPath(path.to_string()));
        }
        current = ResolvedDir::Sub {
            starting_cluster: found.1.starting_cluster.get() as u32,
        };
        self_entry = Some(found);
    }
    Ok((current, self_entry))
}

/// Splits off the final path component, resolving everything before it.
pub fn resolve_parent_and_name<'p>(path: &'p str) -> Result<(&'p str, &'p str)> {
    let tokens = tokenize(path)?;
    let name = tokens.last().ok_or_else(|| Error::BadPath(path.to_string()))?;
    let name_start = path.rfind(name).unwrap();
    let parent = if name_start == 1 { "/" } else { &path[..name_start - 1] };
    Ok((parent, name))
}

/// Finds a non-free entry whose space-trimmed name equals `token`, case-sensitive.
pub fn find_in_dir(
    image: &Fat12Image,
    dir: ResolvedDir,
    token: &str,
) -> Result<Option<(u32, DirEntry)>> {
    let slots = dir.cursor(image).collect_all(image)?;
    Ok(slots
        .into_iter()
        .find(|(_, entry)| !entry.is_free() && entry.display_name() == token))
}

/// First free (or "no more entries") slot in the directory; used by C7/C8 to place a
/// new entry without scanning twice.
pub fn find_free_slot(image: &Fat12Image, dir: ResolvedDir) -> Result<Option<u32>> {
    let slots = dir.cursor(image).collect_all(image)?;
    Ok(slots.into_iter().find(|(_, entry)| entry.is_free()).map(|(o, _)| o))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenizes_absolute_paths() {
        assert_eq!(tokenize("/a/b/c").unwrap(), vec!["a", "b", "c"]);
        assert_eq!(tokenize("/").unwrap(), Vec::<&str>::new());
    }

    #[test]
    fn rejects_relative_paths() {
        assert!(tokenize("a/b").is_err());
    }

    #[test]
    fn splits_parent_and_name() {
        assert_eq!(resolve_parent_and_name("/usr/ysa").unwrap(), ("/usr", "ysa"));
        assert_eq!(resolve_parent_and_name("/usr").unwrap(), ("/", "usr"));
    }

    #[test]
    fn resolve_dir_with_self_entry_distinguishes_root_from_subdirectory() {
        use crate::image::{Fat12Image, ImageSizeKb};

        let dir = tempfile::tempdir().unwrap();
        let mut image = Fat12Image::format(dir.path().join("image.img"), ImageSizeKb::One).unwrap();
        crate::dir_ops::mkdir(&mut image, "/usr").unwrap();

        let (_, root_self) = resolve_dir_with_self_entry(&image, "/").unwrap();
        assert!(root_self.is_none());

        let (_, usr_self) = resolve_dir_with_self_entry(&image, "/usr").unwrap();
        let (offset, entry) = usr_self.unwrap();
        assert_eq!(entry.display_name(), "usr");
        assert_eq!(image.read_dir_entry(offset).unwrap().display_name(), "usr");
    }
}
