//! Configuration for extraction runs

use crate::{Result, UnpackError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default copy chunk size (512 KiB)
pub const DEFAULT_CHUNK_SIZE: usize = 512 * 1024;

/// Default name of the unknown bucket directory
pub const DEFAULT_UNKNOWN_DIR: &str = "__Unknown";

/// Configuration for an [`Unpacker`](crate::Unpacker)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnpackConfig {
    /// Bytes copied per read/write step when streaming a payload
    pub chunk_size: usize,

    /// Block until the name index build settles instead of failing with
    /// [`UnpackError::NotReady`]
    pub wait_for_names: bool,

    /// Directory under the destination root for unresolved entries
    pub unknown_dir: String,

    /// Create the unknown bucket up front when no names are available
    pub create_unknown_dir: bool,
}

impl Default for UnpackConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            wait_for_names: false,
            unknown_dir: DEFAULT_UNKNOWN_DIR.to_string(),
            create_unknown_dir: true,
        }
    }
}

impl UnpackConfig {
    /// Create a configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a configuration from JSON, missing fields take their defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| UnpackError::Config(format!("invalid configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            UnpackError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json_str(&json)
    }

    /// Check that all values are usable
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(UnpackError::Config("chunk_size must be non-zero".into()));
        }
        if self.unknown_dir.trim().is_empty() {
            return Err(UnpackError::Config("unknown_dir must not be empty".into()));
        }
        Ok(())
    }

    /// Set the copy chunk size
    #[must_use]
    pub const fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Block on the name index instead of rejecting early runs
    #[must_use]
    pub const fn with_wait_for_names(mut self, wait: bool) -> Self {
        self.wait_for_names = wait;
        self
    }

    /// Set the unknown bucket directory name
    #[must_use]
    pub fn with_unknown_dir<S: Into<String>>(mut self, dir: S) -> Self {
        self.unknown_dir = dir.into();
        self
    }

    /// Enable or disable pre-creating the unknown bucket
    #[must_use]
    pub const fn with_create_unknown_dir(mut self, create: bool) -> Self {
        self.create_unknown_dir = create;
        self
    }
}
