//! Candidate name lists
//!
//! A word list is a plain text file with one candidate asset path per line.
//! Lists collected by the community are not consistently encoded, so the
//! file is decoded as UTF-8 first and as Latin-1 when that fails. Lines end with
//! `\n`, `\r\n` or a lone `\r`, are trimmed, and blank lines are ignored.

use crate::{Result, UnpackError};
use std::path::Path;
use tracing::{debug, info};

/// Ordered list of candidate names
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WordList {
    names: Vec<String>,
}

impl WordList {
    /// Create a word list from in-memory candidates, dropping blank entries
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names = names
            .into_iter()
            .map(|name| name.as_ref().trim().to_string())
            .filter(|name| !name.is_empty())
            .collect();
        Self { names }
    }

    /// Parse a word list from raw file contents
    pub fn parse(bytes: &[u8]) -> Self {
        match std::str::from_utf8(bytes) {
            Ok(text) => Self::from_names(text.split(['\r', '\n'])),
            Err(e) => {
                debug!("Word list is not UTF-8 ({e}), decoding as Latin-1");
                let text: String = bytes.iter().map(|&b| char::from(b)).collect();
                Self::from_names(text.split(['\r', '\n']))
            }
        }
    }

    /// Load a word list from disk
    ///
    /// A missing or unreadable file is reported as
    /// [`UnpackError::HashListUnavailable`].
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| {
            UnpackError::HashListUnavailable(format!("{}: {e}", path.display()))
        })?;

        let list = Self::parse(&bytes);
        info!("Loaded {} candidate names from {}", list.len(), path.display());
        Ok(list)
    }

    /// Candidate names in file order
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Number of candidates
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// `true` if there are no candidates
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_skips_blank_lines_and_trims() {
        let list = WordList::parse(b"data\\a.png\r\n\n   \n  models/b.obj  \n");
        assert_eq!(list.names(), &["data\\a.png", "models/b.obj"]);
    }

    #[test]
    fn test_carriage_return_line_endings() {
        let list = WordList::parse(b"data\\a.png\rmodels/b.obj\r\rlast.dds");
        assert_eq!(list.names(), &["data\\a.png", "models/b.obj", "last.dds"]);
    }

    #[test]
    fn test_latin1_fallback() {
        // 0xE9 alone is invalid UTF-8
        let list = WordList::parse(b"caf\xE9.dds\nplain.png");
        assert_eq!(list.names(), &["caf\u{e9}.dds", "plain.png"]);
    }

    #[test]
    fn test_utf8_preferred() {
        let list = WordList::parse("caf\u{e9}.dds".as_bytes());
        assert_eq!(list.names(), &["caf\u{e9}.dds"]);
    }

    #[test]
    fn test_missing_file_is_unavailable() {
        let dir = tempfile::tempdir().expect("tempdir");
        let result = WordList::load(dir.path().join("FileNames.list"));
        assert!(matches!(result, Err(UnpackError::HashListUnavailable(_))));
    }

    #[test]
    fn test_empty_file_is_empty_list() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("FileNames.list");
        std::fs::write(&path, b"").expect("write");

        let list = WordList::load(&path).expect("load");
        assert!(list.is_empty());
    }
}
