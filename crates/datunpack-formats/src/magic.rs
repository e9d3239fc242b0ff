//! Payload type detection by magic number
//!
//! The first four bytes of a payload, read as a little-endian `u32`, decide
//! the extension given to the extracted file. Anything unrecognised, too
//! short or unreadable falls back to [`DEFAULT_EXTENSION`].

use crate::index::ArchiveEntry;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use tracing::trace;

/// Extension used when no magic number matches
pub const DEFAULT_EXTENSION: &str = ".bin";

/// `89 50 4E 47`
pub const MAGIC_PNG: u32 = 0x474E_5089;
/// `DDS `
pub const MAGIC_DDS: u32 = 0x2053_4444;
/// `EOMJ`
pub const MAGIC_OBJ: u32 = 0x4A4D_4F45;
/// Proprietary format tagged with a leading `2`
pub const MAGIC_FMT_02: u32 = 0x0000_0002;

/// Payload type recognised from its magic number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileType {
    /// PNG image
    Png,
    /// DirectDraw surface texture
    Dds,
    /// Model data
    Obj,
    /// Proprietary format 2
    Format02,
    /// Anything else
    Unknown,
}

impl FileType {
    /// All recognised types with their magic numbers
    pub const TABLE: [(u32, Self); 4] = [
        (MAGIC_PNG, Self::Png),
        (MAGIC_DDS, Self::Dds),
        (MAGIC_OBJ, Self::Obj),
        (MAGIC_FMT_02, Self::Format02),
    ];

    /// Classify a little-endian magic number
    pub fn from_magic(magic: u32) -> Self {
        Self::TABLE
            .iter()
            .find(|(value, _)| *value == magic)
            .map_or(Self::Unknown, |(_, file_type)| *file_type)
    }

    /// Classify the first four bytes of a payload
    pub fn from_header(header: &[u8]) -> Self {
        match header {
            [a, b, c, d, ..] => Self::from_magic(u32::from_le_bytes([*a, *b, *c, *d])),
            _ => Self::Unknown,
        }
    }

    /// Extension including the leading dot
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Png => ".png",
            Self::Dds => ".dds",
            Self::Obj => ".obj",
            Self::Format02 => ".fmt_02",
            Self::Unknown => DEFAULT_EXTENSION,
        }
    }
}

/// Detect the type of an entry's payload from a seekable reader
pub fn sniff<R: Read + Seek>(reader: &mut R, entry: &ArchiveEntry) -> FileType {
    if entry.size < 4 {
        return FileType::Unknown;
    }
    let Ok(offset) = u64::try_from(entry.offset) else {
        return FileType::Unknown;
    };

    let mut header = [0u8; 4];
    let read = reader
        .seek(SeekFrom::Start(offset))
        .and_then(|_| reader.read_exact(&mut header));

    match read {
        Ok(()) => FileType::from_header(&header),
        Err(e) => {
            trace!("Cannot read magic of {:08X}: {e}", entry.hash);
            FileType::Unknown
        }
    }
}

/// Detect the type of an entry's payload, opening the archive for the probe
pub fn detect_file_type(archive_path: &Path, entry: &ArchiveEntry) -> FileType {
    if entry.size < 4 {
        return FileType::Unknown;
    }

    match File::open(archive_path) {
        Ok(mut file) => sniff(&mut file, entry),
        Err(e) => {
            trace!("Cannot open {} for magic probe: {e}", archive_path.display());
            FileType::Unknown
        }
    }
}

/// Extension for an entry's payload
pub fn detect_extension(archive_path: &Path, entry: &ArchiveEntry) -> &'static str {
    detect_file_type(archive_path, entry).extension()
}
