//! Format parsers for hash-addressed DAT archives
//!
//! A DAT archive is a single file holding a table of fixed-size records
//! followed by concatenated payloads. Records carry no names, only a 32-bit
//! hash of the original asset path, so recovering names means hashing
//! candidate paths and matching them against the table.
//!
//! # Components
//!
//! - [`hash`]: the bit-serial name hash used by the record table
//! - [`index`]: record table parsing into [`ArchiveEntry`] values
//! - [`magic`]: payload type detection by magic number
//!
//! # Examples
//!
//! ```
//! use datunpack_formats::{ArchiveIndex, FileType, dat_hash};
//! use std::io::Cursor;
//!
//! let mut archive = Vec::new();
//! archive.extend_from_slice(&0xCAFE_BABEu32.to_le_bytes());
//! archive.extend_from_slice(&24i32.to_le_bytes());
//! archive.extend_from_slice(&4i32.to_le_bytes());
//! archive.extend_from_slice(&[0u8; 12]);
//! archive.extend_from_slice(&[0x89, b'P', b'N', b'G']);
//!
//! let index = ArchiveIndex::parse(&mut Cursor::new(&archive)).unwrap();
//! assert_eq!(index.len(), 1);
//! assert_eq!(index.entries()[0].hash_hex(), "CAFEBABE");
//! assert_eq!(FileType::from_header(&archive[24..]), FileType::Png);
//! assert_eq!(dat_hash(""), 1);
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod hash;
pub mod index;
pub mod magic;

pub use error::{FormatError, Result};
pub use hash::{dat_hash, hash_bytes};
pub use index::{ArchiveEntry, ArchiveIndex, IndexRecord, RECORD_SIZE, read_entries};
pub use magic::{DEFAULT_EXTENSION, FileType, detect_extension, detect_file_type};
