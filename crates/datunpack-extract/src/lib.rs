//! Name recovery and extraction for hash-addressed DAT archives.
//!
//! DAT archives identify each payload only by a 32-bit hash of its original
//! path. This crate reverses those hashes against a word list of candidate
//! names and streams every payload into a directory tree:
//!
//! - [`NameIndex`]: hash to name reverse index, built once on a worker
//! - [`WordList`]: candidate names loaded from disk
//! - [`extractor`]: bounded-memory copy of one payload range
//! - [`Unpacker`]: drives a whole run and reports [`ProgressEvent`]s
//!
//! Entries whose hash has no known name land in the unknown bucket as
//! `__Unknown/<HASH><ext>`.
//!
//! # Example
//!
//! ```rust,ignore
//! use datunpack_extract::{NameIndex, Unpacker, UnpackConfig, WordList};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let names = Arc::new(NameIndex::new());
//! names.clone().spawn_build_from_file("FileNames.list".into()).await?;
//!
//! let unpacker = Arc::new(Unpacker::new(names, UnpackConfig::default()));
//! let (handle, mut events) = unpacker.spawn("data.dat".into(), "out".into(), Default::default());
//! while let Some(event) = events.recv().await {
//!     println!("{event}");
//! }
//! let summary = handle.await??;
//! println!("Extracted {} of {} entries", summary.extracted, summary.total);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

use std::path::PathBuf;
use thiserror::Error;

// Configuration
pub mod config;

// Single-entry extraction
pub mod extractor;

// Hash to name reverse index
pub mod names;

// Progress events and cancellation
pub mod progress;

// Run orchestration
pub mod unpacker;

// Word list loading
pub mod wordlist;

pub use config::UnpackConfig;
pub use names::{BuildOutcome, BuildStatus, NameIndex};
pub use progress::{CancellationToken, ProgressEvent, ProgressSink};
pub use unpacker::{UnpackSummary, Unpacker, relative_path_for};
pub use wordlist::WordList;

/// Result type for unpack operations.
pub type Result<T> = std::result::Result<T, UnpackError>;

/// Errors that can occur while unpacking an archive.
#[derive(Debug, Error)]
pub enum UnpackError {
    /// The archive file does not exist.
    #[error("Archive not found: {}", .0.display())]
    ArchiveNotFound(PathBuf),

    /// The record table could not be read.
    #[error("Failed to read archive index: {0}")]
    IndexRead(String),

    /// One entry could not be written.
    #[error("Error extracting {}: {source}", .path.display())]
    Extraction {
        /// Destination of the failed entry
        path: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },

    /// The word list is missing or unreadable.
    #[error("Hash list unavailable: {0}")]
    HashListUnavailable(String),

    /// The name index build has not reached a terminal state.
    #[error("Hash list loading not finished")]
    NotReady,

    /// Another extraction is already running on this unpacker.
    #[error("An extraction is already running")]
    AlreadyRunning,

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<datunpack_formats::FormatError> for UnpackError {
    fn from(err: datunpack_formats::FormatError) -> Self {
        use datunpack_formats::FormatError;

        match err {
            FormatError::ArchiveNotFound(path) => Self::ArchiveNotFound(path),
            FormatError::IndexRead(msg) => Self::IndexRead(msg),
            FormatError::Io(e) => Self::IndexRead(e.to_string()),
            FormatError::BinRw(e) => Self::IndexRead(e.to_string()),
        }
    }
}

impl UnpackError {
    /// Whether the error only affects a single entry
    pub const fn is_per_entry(&self) -> bool {
        matches!(self, Self::Extraction { .. })
    }
}
