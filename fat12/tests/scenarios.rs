//! End-to-end seed scenarios and cross-module persistence checks.

use fat12::dir_ops::{list_dir, mkdir};
use fat12::fat;
use fat12::file_ops::{chmod, read_file, write_file};
use fat12::image::{Fat12Image, ImageSizeKb};

fn image_path(dir: &tempfile::TempDir) -> std::path::PathBuf {
    dir.path().join("image.img")
}

/// S1: a freshly formatted 1.0KB-block image is exactly 4 MiB, carries the expected
/// OEM id, 512 bytes-per-sector, and media descriptor byte.
#[test]
fn s1_format_one_produces_expected_geometry() {
    let dir = tempfile::tempdir().unwrap();
    let path = image_path(&dir);
    {
        let _image = Fat12Image::format(path.clone(), ImageSizeKb::One).unwrap();
    }
    let bytes = std::fs::read(&path).unwrap();
    assert_eq!(bytes.len(), 4 * 1024 * 1024);
    assert_eq!(&bytes[0x03..0x0B], b"GTUFAT12");
    assert_eq!(u16::from_le_bytes([bytes[0x0B], bytes[0x0C]]), 0x0200);
    assert_eq!(bytes[0x15], 0xF8);
}

/// S2: `mkdir /usr` places a directory slot with the expected name, attribute, size,
/// and an allocated starting cluster marked EOC in the FAT.
#[test]
fn s2_mkdir_populates_root_slot_and_allocates_cluster() {
    let dir = tempfile::tempdir().unwrap();
    let mut image = Fat12Image::format(image_path(&dir), ImageSizeKb::One).unwrap();
    mkdir(&mut image, "/usr").unwrap();

    let entries = list_dir(&image, "/").unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].display_name(), "usr");
    assert_eq!(entries[0].attr, fat12::layout::ATTR_DIRECTORY);
    assert_eq!(entries[0].attr, 0x10);
    assert_eq!(entries[0].file_size.get(), 0);

    let cluster = entries[0].starting_cluster.get() as u32;
    assert!((2..4094).contains(&cluster));
    assert_eq!(image.read_fat(cluster).unwrap(), fat::EOC);
}

/// S3: iterating `/usr` after `mkdir /usr/ysa` yields `.`, `..`, then `ysa` in order.
#[test]
fn s3_subdirectory_listing_starts_with_dot_entries() {
    let dir = tempfile::tempdir().unwrap();
    let mut image = Fat12Image::format(image_path(&dir), ImageSizeKb::One).unwrap();
    mkdir(&mut image, "/usr").unwrap();
    mkdir(&mut image, "/usr/ysa").unwrap();

    let entries = list_dir(&image, "/usr").unwrap();
    assert_eq!(entries[0].display_name(), ".");
    assert_eq!(entries[1].display_name(), "..");
    assert_eq!(entries[1].starting_cluster.get(), 0);
    assert_eq!(entries[2].display_name(), "ysa");
}

/// S4: `mkdir /nope/x` fails no-such-path and leaves the image bytes unchanged.
#[test]
fn s4_mkdir_missing_parent_leaves_image_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let path = image_path(&dir);
    let mut image = Fat12Image::format(path.clone(), ImageSizeKb::One).unwrap();
    image.flush().unwrap();
    let before = std::fs::read(&path).unwrap();

    let err = mkdir(&mut image, "/nope/x");
    assert!(matches!(err, Err(fat12_err::Error::NoSuchPath(_))));
    image.flush().unwrap();

    let after = std::fs::read(&path).unwrap();
    assert_eq!(before, after);
}

/// S5: a second `mkdir /a` reports already-exists.
#[test]
fn s5_duplicate_mkdir_reports_already_exists() {
    let dir = tempfile::tempdir().unwrap();
    let mut image = Fat12Image::format(image_path(&dir), ImageSizeKb::One).unwrap();
    mkdir(&mut image, "/a").unwrap();
    let err = mkdir(&mut image, "/a");
    assert!(matches!(err, Err(fat12_err::Error::AlreadyExists(_))));
}

/// S6: writing then reading a 100-byte file round-trips byte-identical content with
/// the correct size field.
#[test]
fn s6_write_then_read_round_trips_content() {
    let dir = tempfile::tempdir().unwrap();
    let mut image = Fat12Image::format(image_path(&dir), ImageSizeKb::One).unwrap();
    let content = vec![0x42u8; 100];
    write_file(&mut image, "/f", &content, 0x01 | 0x02).unwrap();

    let entries = list_dir(&image, "/").unwrap();
    assert_eq!(entries[0].file_size.get(), 100);

    let read_back = read_file(&image, "/f").unwrap();
    assert_eq!(read_back, content);
}

/// S7: clearing the readable bit denies a read; restoring it succeeds again.
#[test]
fn s7_chmod_gates_read_permission() {
    let dir = tempfile::tempdir().unwrap();
    let mut image = Fat12Image::format(image_path(&dir), ImageSizeKb::One).unwrap();
    write_file(&mut image, "/f", b"data", 0x01 | 0x02).unwrap();

    chmod(&mut image, "/f", "-r").unwrap();
    assert!(matches!(
        read_file(&image, "/f"),
        Err(fat12_err::Error::PermissionDenied(_))
    ));

    chmod(&mut image, "/f", "+r").unwrap();
    assert_eq!(read_file(&image, "/f").unwrap(), b"data");
}

/// Property 5 / invariant 5: FAT1 and FAT2 stay byte-identical after mutation and flush.
#[test]
fn fat_copies_stay_mirrored_after_mutation() {
    let dir = tempfile::tempdir().unwrap();
    let path = image_path(&dir);
    {
        let mut image = Fat12Image::format(path.clone(), ImageSizeKb::One).unwrap();
        mkdir(&mut image, "/a").unwrap();
        mkdir(&mut image, "/a/b").unwrap();
        image.mirror_fat().unwrap();
        image.flush().unwrap();
    }
    let bytes = std::fs::read(&path).unwrap();
    let image = Fat12Image::load(path.clone()).unwrap();
    let fat1_start = image.boot().fat1_start() as usize;
    let fat2_start = image.boot().fat2_start() as usize;
    let fat_len = image.boot().fat_size_bytes() as usize;
    assert_eq!(
        &bytes[fat1_start..fat1_start + fat_len],
        &bytes[fat2_start..fat2_start + fat_len]
    );
    drop(image);
}

/// Property 6: formatting, flushing, reloading, and flushing again yields a
/// byte-identical file.
#[test]
fn idempotent_format_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = image_path(&dir);
    {
        let image = Fat12Image::format(path.clone(), ImageSizeKb::Half).unwrap();
        image.flush().unwrap();
    }
    let first = std::fs::read(&path).unwrap();
    {
        let image = Fat12Image::load(path.clone()).unwrap();
        image.flush().unwrap();
    }
    let second = std::fs::read(&path).unwrap();
    assert_eq!(first, second);
}

/// Property 7: operations followed by flush and reload observe the same tree.
#[test]
fn persistence_round_trip_preserves_tree_and_content() {
    let dir = tempfile::tempdir().unwrap();
    let path = image_path(&dir);
    {
        let mut image = Fat12Image::format(path.clone(), ImageSizeKb::One).unwrap();
        mkdir(&mut image, "/usr").unwrap();
        write_file(&mut image, "/usr/f", b"persisted", 0x01 | 0x02).unwrap();
        image.flush().unwrap();
    }
    let image = Fat12Image::load(path).unwrap();
    let entries = list_dir(&image, "/usr").unwrap();
    assert_eq!(entries[2].display_name(), "f");
    assert_eq!(read_file(&image, "/usr/f").unwrap(), b"persisted");
}
