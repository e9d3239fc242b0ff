//! DAT archive record table
//!
//! A DAT archive starts with a table of fixed-size little-endian records:
//!
//! ```text
//! hash:   u32 LE   Name hash (see [`crate::hash`])
//! offset: i32 LE   Absolute payload offset within the same file
//! size:   i32 LE   Payload size in bytes
//! ```
//!
//! The table ends at the first all-zero record or when fewer than
//! [`RECORD_SIZE`] bytes remain. Records with a negative size are skipped.

use crate::error::{FormatError, Result};
use binrw::{BinRead, BinReaderExt};
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;
use tracing::{debug, warn};

/// Size of one index record in bytes
pub const RECORD_SIZE: u64 = 12;

/// Raw index record as stored on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq, BinRead)]
#[br(little)]
pub struct IndexRecord {
    /// Name hash
    pub hash: u32,
    /// Payload offset
    pub offset: i32,
    /// Payload size, negative values mark discarded records
    pub size: i32,
}

impl IndexRecord {
    /// Whether this is the all-zero end-of-table record
    pub const fn is_sentinel(&self) -> bool {
        self.hash == 0 && self.offset == 0 && self.size == 0
    }
}

/// A payload stored in the archive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArchiveEntry {
    /// Name hash of the original asset path
    pub hash: u32,
    /// Absolute payload offset
    pub offset: i64,
    /// Payload size in bytes, never negative
    pub size: i64,
}

impl ArchiveEntry {
    /// Create a new entry
    pub const fn new(hash: u32, offset: i64, size: i64) -> Self {
        Self { hash, offset, size }
    }

    /// Uppercase, zero-padded hexadecimal form of the hash
    pub fn hash_hex(&self) -> String {
        hex::encode_upper(self.hash.to_be_bytes())
    }
}

impl From<IndexRecord> for ArchiveEntry {
    fn from(record: IndexRecord) -> Self {
        Self {
            hash: record.hash,
            offset: i64::from(record.offset),
            size: i64::from(record.size),
        }
    }
}

/// Parsed record table of a DAT archive
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchiveIndex {
    entries: Vec<ArchiveEntry>,
    skipped: usize,
}

impl ArchiveIndex {
    /// Parse the record table of the archive at `path`
    pub fn parse_file(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                FormatError::ArchiveNotFound(path.to_path_buf())
            } else {
                FormatError::IndexRead(format!("cannot open {}: {e}", path.display()))
            }
        })?;

        let mut reader = BufReader::new(file);
        Self::parse(&mut reader)
    }

    /// Parse a record table from the start of a reader
    pub fn parse<R: Read + Seek>(reader: &mut R) -> Result<Self> {
        let length = reader.seek(SeekFrom::End(0))?;
        reader.seek(SeekFrom::Start(0))?;

        let mut entries = Vec::new();
        let mut skipped = 0;
        let mut position = 0u64;

        while position + RECORD_SIZE <= length {
            let record: IndexRecord = reader.read_le()?;
            position += RECORD_SIZE;

            if record.is_sentinel() {
                debug!("End-of-table record at offset {}", position - RECORD_SIZE);
                break;
            }

            if record.size < 0 {
                warn!(
                    "Skipping entry {:08X} with negative size {}",
                    record.hash, record.size
                );
                skipped += 1;
                continue;
            }

            entries.push(ArchiveEntry::from(record));
        }

        debug!(
            "Parsed {} index entries ({} skipped) from {} bytes",
            entries.len(),
            skipped,
            length
        );

        Ok(Self { entries, skipped })
    }

    /// Entries in file order, duplicates included
    pub fn entries(&self) -> &[ArchiveEntry] {
        &self.entries
    }

    /// Consume the index, returning its entries
    pub fn into_entries(self) -> Vec<ArchiveEntry> {
        self.entries
    }

    /// Number of records dropped for having a negative size
    pub const fn skipped(&self) -> usize {
        self.skipped
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the index holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over entries in file order
    pub fn iter(&self) -> impl Iterator<Item = &ArchiveEntry> {
        self.entries.iter()
    }
}

/// Read the entries of the archive at `path`
pub fn read_entries(path: &Path) -> Result<Vec<ArchiveEntry>> {
    ArchiveIndex::parse_file(path).map(ArchiveIndex::into_entries)
}
