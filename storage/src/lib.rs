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

//! Whole-file host bridge for the image lifecycle (C9) and the file operations (C8).
//!
//! The engine owns a single in-memory buffer for the whole session; this crate is the
//! only place that touches `std::fs` on its behalf, mirroring the teacher's split
//! between a filesystem crate and a dedicated data-storage crate.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use fat12_err::{Error, Result};
use log::{error, info};

/// Reads an entire image file into memory.
pub fn read_image(path: &Path) -> Result<Vec<u8>> {
    let mut file = File::open(path).map_err(|source| Error::IoFailed {
        path: path.to_path_buf(),
        source,
    })?;
    let mut buffer = Vec::new();
    file.read_to_end(&mut buffer).map_err(|source| Error::IoFailed {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(buffer)
}

/// Writes the image buffer back atomically: write to a sibling temp file, then rename
/// over the original. On failure the original file is left untouched.
pub fn flush_image(path: &Path, buffer: &[u8]) -> Result<()> {
    let tmp_path = sibling_temp_path(path);
    (|| -> std::io::Result<()> {
        let mut tmp = File::create(&tmp_path)?;
        tmp.write_all(buffer)?;
        tmp.sync_all()?;
        fs::rename(&tmp_path, path)?;
        Ok(())
    })()
    .map_err(|source| {
        let _ = fs::remove_file(&tmp_path);
        error!("flush of {} failed: {source}", path.display());
        Error::FlushFailed {
            path: path.to_path_buf(),
            source,
        }
    })?;
    info!("flushed image to {}", path.display());
    Ok(())
}

fn sibling_temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Reads a host file in full, for `write` (C8 step 1).
pub fn read_host_file(path: &Path) -> Result<Vec<u8>> {
    let mut file = File::open(path).map_err(|source| Error::IoFailed {
        path: path.to_path_buf(),
        source,
    })?;
    let mut buffer = Vec::new();
    file.read_to_end(&mut buffer).map_err(|source| Error::IoFailed {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(buffer)
}

/// Writes the content of an image file out to a regular host file, for `read` (C8).
pub fn write_host_file(path: &Path, content: &[u8]) -> Result<()> {
    let mut file = File::create(path).map_err(|source| Error::IoFailed {
        path: path.to_path_buf(),
        source,
    })?;
    file.write_all(content).map_err(|source| Error::IoFailed {
        path: path.to_path_buf(),
        source,
    })
}

/// Attribute bits (0x01 readable, 0x02 writable) derived from user-read/user-write mode
/// bits of the host file, for `write` (C8 step 7).
pub fn host_permission_bits(path: &Path) -> Result<u8> {
    let mode = fs::metadata(path)
        .map_err(|source| Error::IoFailed {
            path: path.to_path_buf(),
            source,
        })?
        .permissions()
        .mode();

    let mut bits = 0u8;
    if mode & 0o400 != 0 {
        bits |= 0x01;
    }
    if mode & 0o200 != 0 {
        bits |= 0x02;
    }
    Ok(bits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    #[test]
    fn round_trips_an_image_through_flush_and_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("image.img");
        flush_image(&path, b"hello image").unwrap();
        assert_eq!(read_image(&path).unwrap(), b"hello image");
    }

    #[test]
    fn flush_replaces_existing_file_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("image.img");
        flush_image(&path, b"first").unwrap();
        flush_image(&path, b"second").unwrap();
        assert_eq!(read_image(&path).unwrap(), b"second");
        assert!(!dir.path().join("image.img.tmp").exists());
    }

    #[test]
    fn host_permission_bits_reflect_user_rw() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("host.txt");
        let mut f = File::create(&path).unwrap();
        f.write_all(b"x").unwrap();
        let mut perms = f.metadata().unwrap().permissions();
        perms.set_mode(0o600);
        fs::set_permissions(&path, perms).unwrap();

        assert_eq!(host_permission_bits(&path).unwrap(), 0x01 | 0x02);
    }

    #[test]
    fn read_only_host_file_yields_readable_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("host.txt");
        fs::write(&path, b"x").unwrap();
        let mut perms = fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o400);
        fs::set_permissions(&path, perms).unwrap();

        assert_eq!(host_permission_bits(&path).unwrap(), 0x01);
    }
}
