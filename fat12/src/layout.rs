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

//! Byte-exact on-disk records (C1): boot sector, directory entry, geometry constants.
//!
//! Layout matches §3 of the governing specification with two resolved ambiguities:
//! the directory entry's 2 reserved bytes are dropped to land at exactly 32 bytes
//! (the full 6-byte password field is kept), and `bytes_per_sector` is fixed at 512
//! regardless of block size, with `sectors_per_cluster` carrying the rest of the
//! block-size scaling.

use chrono::{Datelike, Local, Timelike};
use zerocopy::little_endian::{U16, U32};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// OEM name stamped into every freshly formatted image.
pub const OEM_NAME: &[u8; 8] = b"GTUFAT12";

/// Fixed sector size; block size scales via `sectors_per_cluster` instead.
pub const BYTES_PER_SECTOR: u16 = 512;

/// Count of FAT copies carried on every image.
pub const NUM_FATS: u8 = 2;

/// Root directory entry count, fixed per §3/§6.
pub const ROOT_ENTRY_COUNT: u16 = 224;

/// Sectors occupied by one FAT copy, fixed per §6 (S1 requires `bpb_fatsz16` stay at 9
/// for both supported image sizes: FAT capacity is bytes-per-fat-sector-independent).
pub const SECTORS_PER_FAT: u16 = 9;

/// Media descriptor byte for fixed (non-removable) media.
pub const MEDIA_DESCRIPTOR: u8 = 0xF8;

/// Total addressable clusters for a 12-bit FAT.
pub const TOTAL_CLUSTERS: u32 = 4096;

/// First two cluster indices are reserved and never allocated.
pub const FIRST_DATA_CLUSTER: u32 = 2;

#[repr(C)]
#[derive(Clone, Copy, Debug, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct BootSector {
    pub bs_jmpboot: [u8; 3],
    pub bs_oemname: [u8; 8],
    pub bpb_bytspersec: U16,
    pub bpb_secperclus: u8,
    pub bpb_rsvdseccnt: U16,
    pub bpb_numfats: u8,
    pub bpb_rootentcnt: U16,
    pub bpb_totsec16: U16,
    pub bpb_media: u8,
    pub bpb_fatsz16: U16,
    _reserved: [u8; 12],
}

const _: () = assert!(std::mem::size_of::<BootSector>() == 36);

impl BootSector {
    pub fn new(sectors_per_cluster: u8, total_sectors: u32) -> Self {
        BootSector {
            bs_jmpboot: [0xEB, 0x00, 0x90],
            bs_oemname: *OEM_NAME,
            bpb_bytspersec: U16::new(BYTES_PER_SECTOR),
            bpb_secperclus: sectors_per_cluster,
            bpb_rsvdseccnt: U16::new(1),
            bpb_numfats: NUM_FATS,
            bpb_rootentcnt: U16::new(ROOT_ENTRY_COUNT),
            bpb_totsec16: U16::new(total_sectors as u16),
            bpb_media: MEDIA_DESCRIPTOR,
            bpb_fatsz16: U16::new(SECTORS_PER_FAT),
            _reserved: [0; 12],
        }
    }

    pub fn bytes_per_sector(&self) -> u32 {
        self.bpb_bytspersec.get() as u32
    }

    pub fn sectors_per_cluster(&self) -> u32 {
        self.bpb_secperclus as u32
    }

    pub fn block_size(&self) -> u32 {
        self.bytes_per_sector() * self.sectors_per_cluster()
    }

    pub fn fat_size_bytes(&self) -> u32 {
        self.bpb_fatsz16.get() as u32 * self.bytes_per_sector()
    }

    pub fn root_entry_count(&self) -> u32 {
        self.bpb_rootentcnt.get() as u32
    }

    pub fn reserved_bytes(&self) -> u32 {
        self.bpb_rsvdseccnt.get() as u32 * self.bytes_per_sector()
    }

    pub fn fat1_start(&self) -> u32 {
        self.reserved_bytes()
    }

    pub fn fat2_start(&self) -> u32 {
        self.fat1_start() + self.fat_size_bytes()
    }

    pub fn root_dir_start(&self) -> u32 {
        self.fat2_start() + self.fat_size_bytes()
    }

    pub fn root_dir_bytes(&self) -> u32 {
        self.root_entry_count() * DIR_ENTRY_LEN as u32
    }

    pub fn data_area_start(&self) -> u32 {
        self.root_dir_start() + self.root_dir_bytes()
    }

    pub fn total_bytes(&self) -> u32 {
        self.bpb_totsec16.get() as u32 * self.bytes_per_sector()
    }

    /// Capacity of the allocator, in entries: `fatSizeBytes * 2 / 3` per §4.3.
    pub fn fat_capacity(&self) -> u32 {
        self.fat_size_bytes() * 2 / 3
    }
}

pub const DIR_ENTRY_LEN: usize = 32;

pub const ATTR_READABLE: u8 = 0x01;
pub const ATTR_WRITABLE: u8 = 0x02;
pub const ATTR_SYSTEM: u8 = 0x04;
pub const ATTR_VOLUME_ID: u8 = 0x08;
pub const ATTR_DIRECTORY: u8 = 0x10;
pub const ATTR_ARCHIVE: u8 = 0x20;
pub const ATTR_PASSWORD: u8 = 0x40;

/// A 32-bit, two-word FAT timestamp pair: `time` (HHHHH MMMMMM SSSSS, seconds/2) and
/// `date` (YYYYYYY MMMM DDDDD, year since 1980).
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct Timestamp {
    pub time: U16,
    pub date: U16,
}

impl Timestamp {
    pub fn now() -> Self {
        let now = Local::now();
        let time = ((now.hour() as u16) << 11)
            | ((now.minute() as u16) << 5)
            | ((now.second() / 2) as u16);
        let date = (((now.year() - 1980).max(0) as u16) << 9)
            | ((now.month() as u16) << 5)
            | (now.day() as u16);
        Timestamp {
            time: U16::new(time),
            date: U16::new(date),
        }
    }
}

/// A 32-byte directory entry. `_reserved` drops the spec's two unused reserved bytes
/// from the field list so the record lands exactly on 32 bytes; `password` keeps the
/// full 6-byte field.
#[repr(C)]
#[derive(Clone, Copy, Debug, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct DirEntry {
    pub name: [u8; 8],
    pub ext: [u8; 3],
    pub password: [u8; 6],
    pub attr: u8,
    pub created: Timestamp,
    pub modified: Timestamp,
    pub starting_cluster: U16,
    pub file_size: U32,
}

const _: () = assert!(std::mem::size_of::<DirEntry>() == DIR_ENTRY_LEN);

impl DirEntry {
    pub fn free() -> Self {
        DirEntry {
            name: [0x00; 8],
            ext: [0x20; 3],
            password: [0; 6],
            attr: 0,
            created: Timestamp::default(),
            modified: Timestamp::default(),
            starting_cluster: U16::new(0),
            file_size: U32::new(0),
        }
    }

    pub fn is_free(&self) -> bool {
        matches!(self.name[0], 0x00 | 0xE5)
    }

    /// `0x00` additionally means "no more entries follow in this directory".
    pub fn is_end_marker(&self) -> bool {
        self.name[0] == 0x00
    }

    pub fn is_directory(&self) -> bool {
        self.attr & ATTR_DIRECTORY != 0
    }

    pub fn is_readable(&self) -> bool {
        self.attr & ATTR_READABLE != 0
    }

    pub fn is_writable(&self) -> bool {
        self.attr & ATTR_WRITABLE != 0
    }

    /// Space-trimmed name, 8.3 joined with `.` when an extension is present.
    pub fn display_name(&self) -> String {
        let name = trim_trailing_spaces(&self.name);
        let ext = trim_trailing_spaces(&self.ext);
        if ext.is_empty() {
            name
        } else {
            format!("{name}.{ext}")
        }
    }

    /// Sets the raw 8-byte name field from an already space-padded, at-most-8-byte
    /// component (the engine does not support an extension-bearing token beyond the
    /// literal filename characters given).
    pub fn set_raw_name(&mut self, raw: &[u8; 8]) {
        self.name = *raw;
    }
}

fn trim_trailing_spaces(field: &[u8]) -> String {
    let end = field.iter().rposition(|&b| b != 0x20).map_or(0, |i| i + 1);
    String::from_utf8_lossy(&field[..end]).into_owned()
}

/// Packs a directory component (already validated to be ASCII and <= 8 bytes) into an
/// 8-byte space-padded field, per §4.6/§4.7 (no long-name or dotted-extension support).
pub fn pack_name(component: &str) -> [u8; 8] {
    let mut field = [0x20u8; 8];
    let bytes = component.as_bytes();
    field[..bytes.len()].copy_from_slice(bytes);
    field
}
