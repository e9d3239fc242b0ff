//! Error types for DAT format parsing

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reading DAT archive structures
#[derive(Debug, Error)]
pub enum FormatError {
    /// The archive file does not exist
    #[error("Archive not found: {}", .0.display())]
    ArchiveNotFound(PathBuf),

    /// The record table could not be read
    #[error("Failed to read archive index: {0}")]
    IndexRead(String),

    /// I/O error while reading the archive
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Binary decoding error
    #[error("Binary format error: {0}")]
    BinRw(#[from] binrw::Error),
}

/// Result type for format operations
pub type Result<T> = std::result::Result<T, FormatError>;
