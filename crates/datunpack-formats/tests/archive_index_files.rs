//! Integration tests for record table parsing and magic probing on real files

#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

use datunpack_formats::{
    ArchiveEntry, ArchiveIndex, FileType, FormatError, RECORD_SIZE, detect_file_type,
    read_entries,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::io::Cursor;
use std::path::PathBuf;
use tempfile::TempDir;

fn record(hash: u32, offset: i32, size: i32) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&hash.to_le_bytes());
    out.extend_from_slice(&offset.to_le_bytes());
    out.extend_from_slice(&size.to_le_bytes());
    out
}

fn write_archive(dir: &TempDir, data: &[u8]) -> PathBuf {
    let path = dir.path().join("test.dat");
    std::fs::write(&path, data).expect("write archive");
    path
}

#[test]
fn reads_entries_and_probes_payloads() {
    let dir = tempfile::tempdir().expect("tempdir");

    // Two records, sentinel, then payloads starting at byte 36
    let mut data = record(0xCAFE_BABE, 36, 4);
    data.extend(record(0x0BAD_F00D, 40, 8));
    data.extend(record(0, 0, 0));
    data.extend_from_slice(&[0x89, 0x50, 0x4E, 0x47]);
    data.extend_from_slice(b"DDS \0\0\0\0");
    let path = write_archive(&dir, &data);

    let entries = read_entries(&path).expect("entries");
    assert_eq!(
        entries,
        vec![
            ArchiveEntry::new(0xCAFE_BABE, 36, 4),
            ArchiveEntry::new(0x0BAD_F00D, 40, 8),
        ]
    );

    assert_eq!(detect_file_type(&path, &entries[0]), FileType::Png);
    assert_eq!(detect_file_type(&path, &entries[1]), FileType::Dds);
}

#[test]
fn bytes_after_sentinel_are_never_entries() {
    let dir = tempfile::tempdir().expect("tempdir");

    let mut data = record(1, 24, 0);
    data.extend(record(0, 0, 0));
    // Looks like a valid record, but sits after the sentinel
    data.extend(record(2, 0, 12));
    let path = write_archive(&dir, &data);

    let index = ArchiveIndex::parse_file(&path).expect("index");
    assert_eq!(index.entries(), &[ArchiveEntry::new(1, 24, 0)]);
}

#[test]
fn empty_file_has_no_entries() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_archive(&dir, &[]);

    assert!(read_entries(&path).expect("entries").is_empty());
}

#[test]
fn missing_file_is_archive_not_found() {
    let dir = tempfile::tempdir().expect("tempdir");
    let result = read_entries(&dir.path().join("nope.dat"));

    assert!(matches!(result, Err(FormatError::ArchiveNotFound(_))));
}

#[test]
fn payload_shorter_than_magic_uses_default_type() {
    let dir = tempfile::tempdir().expect("tempdir");

    let mut data = record(5, 24, 3);
    data.extend(record(0, 0, 0));
    data.extend_from_slice(&[0x89, 0x50, 0x4E]);
    let path = write_archive(&dir, &data);

    let entries = read_entries(&path).expect("entries");
    let file_type = detect_file_type(&path, &entries[0]);
    assert_eq!(file_type, FileType::Unknown);
    assert_eq!(file_type.extension(), ".bin");
}

fn any_record() -> impl Strategy<Value = (u32, i32, i32)> {
    (1u32..=u32::MAX, any::<i32>(), any::<i32>())
}

proptest! {
    /// Negative sizes vanish, everything else survives in order
    #[test]
    fn negative_sizes_are_dropped(records in prop::collection::vec(any_record(), 0..32)) {
        let mut data = Vec::new();
        for (hash, offset, size) in &records {
            data.extend(record(*hash, *offset, *size));
        }

        let index = ArchiveIndex::parse(&mut Cursor::new(data)).unwrap();

        let expected: Vec<ArchiveEntry> = records
            .iter()
            .filter(|(_, _, size)| *size >= 0)
            .map(|(hash, offset, size)| {
                ArchiveEntry::new(*hash, i64::from(*offset), i64::from(*size))
            })
            .collect();
        prop_assert_eq!(index.entries(), expected.as_slice());
        prop_assert_eq!(index.skipped(), records.len() - expected.len());
    }

    /// Trailing bytes shorter than a record never produce an entry
    #[test]
    fn partial_tail_is_ignored(tail in prop::collection::vec(any::<u8>(), 0..RECORD_SIZE as usize)) {
        let mut data = record(9, 0, 1);
        data.extend(tail);

        let index = ArchiveIndex::parse(&mut Cursor::new(data)).unwrap();
        prop_assert_eq!(index.len(), 1);
    }
}
