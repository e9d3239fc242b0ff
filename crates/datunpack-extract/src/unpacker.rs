//! Extraction run orchestration
//!
//! An [`Unpacker`] reads an archive's record table, resolves an output path
//! for every entry from the [`NameIndex`] and the payload's magic number,
//! and streams each payload into the destination tree. A failure on one
//! entry is reported and the run moves on to the next entry; only a missing
//! or unreadable archive aborts the run.

use crate::config::UnpackConfig;
use crate::extractor::extract_with_chunk_size;
use crate::names::{BuildOutcome, NameIndex};
use crate::progress::{CancellationToken, ProgressEvent, ProgressSink};
use crate::{Result, UnpackError};
use datunpack_formats::{ArchiveEntry, ArchiveIndex, detect_extension};
use std::path::{Component, MAIN_SEPARATOR, Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Interval between cancellation checks while waiting for the name index
const NAMES_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Totals for one extraction run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnpackSummary {
    /// Entries in the record table
    pub total: usize,
    /// Entries written successfully
    pub extracted: usize,
    /// Entries that failed to extract
    pub failed: usize,
    /// Entries whose hash resolved to a known name
    pub named: usize,
    /// Records dropped for having a negative size
    pub skipped: usize,
    /// The run stopped early on request
    pub cancelled: bool,
}

/// Drives extraction of whole archives
#[derive(Debug)]
pub struct Unpacker {
    names: Arc<NameIndex>,
    config: UnpackConfig,
    extracting: AtomicBool,
}

impl Unpacker {
    /// Create an unpacker resolving names through `names`
    pub fn new(names: Arc<NameIndex>, config: UnpackConfig) -> Self {
        Self {
            names,
            config,
            extracting: AtomicBool::new(false),
        }
    }

    /// Whether a run is currently in progress
    pub fn is_extracting(&self) -> bool {
        self.extracting.load(Ordering::Acquire)
    }

    /// Extract every entry of `archive_path` under `destination_root`
    ///
    /// Emits one [`ProgressEvent::Path`] per entry attempted, an
    /// [`ProgressEvent::Error`] per failed entry and always finishes with a
    /// single [`ProgressEvent::Done`]. Fatal errors are reported to the sink
    /// and returned.
    pub fn run(
        &self,
        archive_path: &Path,
        destination_root: &Path,
        sink: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<UnpackSummary> {
        let result = self.run_inner(archive_path, destination_root, sink, cancel);
        if let Err(e) = &result {
            warn!("Unpacking {} failed: {e}", archive_path.display());
            sink.on_error(&e.to_string());
        }
        sink.on_done();
        result
    }

    /// Run on a blocking worker, streaming events through a channel
    pub fn spawn(
        self: &Arc<Self>,
        archive_path: PathBuf,
        destination_root: PathBuf,
        cancel: CancellationToken,
    ) -> (
        JoinHandle<Result<UnpackSummary>>,
        mpsc::UnboundedReceiver<ProgressEvent>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        let this = Arc::clone(self);
        let handle = tokio::task::spawn_blocking(move || {
            this.run(&archive_path, &destination_root, &tx, &cancel)
        });
        (handle, rx)
    }

    /// Output path of an entry relative to the destination root
    pub fn resolve_path(&self, archive_path: &Path, entry: &ArchiveEntry) -> String {
        self.resolve(archive_path, entry).1
    }

    /// Recovered name, if any, and output path of an entry
    fn resolve(&self, archive_path: &Path, entry: &ArchiveEntry) -> (Option<String>, String) {
        let name = self.names.lookup(entry.hash);
        let extension = detect_extension(archive_path, entry);
        let relative =
            relative_path_for(name.as_deref(), entry, extension, &self.config.unknown_dir);
        (name, relative)
    }

    fn run_inner(
        &self,
        archive_path: &Path,
        destination_root: &Path,
        sink: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<UnpackSummary> {
        self.config.validate()?;
        let _guard = RunGuard::acquire(&self.extracting).ok_or(UnpackError::AlreadyRunning)?;
        let Some(names_outcome) = self.ensure_names_ready(cancel)? else {
            sink.on_warning("Cancelled while waiting for the name index");
            return Ok(UnpackSummary {
                cancelled: true,
                ..UnpackSummary::default()
            });
        };

        let index = ArchiveIndex::parse_file(archive_path)?;
        let mut summary = UnpackSummary {
            total: index.len(),
            skipped: index.skipped(),
            ..UnpackSummary::default()
        };

        info!(
            "Read {} entries from {}",
            summary.total,
            archive_path.display()
        );
        if summary.skipped > 0 {
            sink.on_warning(&format!(
                "Skipped {} entries with negative size",
                summary.skipped
            ));
        }
        if index.is_empty() {
            sink.on_warning("No file entries found in the archive.");
            return Ok(summary);
        }

        std::fs::create_dir_all(destination_root)?;
        if self.config.create_unknown_dir
            && (names_outcome != BuildOutcome::Succeeded || self.names.is_empty())
        {
            let unknown = destination_root.join(&self.config.unknown_dir);
            if let Err(e) = std::fs::create_dir_all(&unknown) {
                warn!("Cannot create {}: {e}", unknown.display());
            }
        }

        for (position, entry) in index.iter().enumerate() {
            if cancel.is_cancelled() {
                sink.on_warning(&format!(
                    "Cancelled after {position} of {} entries",
                    summary.total
                ));
                summary.cancelled = true;
                break;
            }

            let (name, relative) = self.resolve(archive_path, entry);
            if name.is_some() {
                summary.named += 1;
            }

            debug!(
                "[UNPACKING {}/{}]: {relative}",
                position + 1,
                summary.total
            );
            sink.on_path(&relative);

            let destination = safe_join(destination_root, &relative);
            match extract_with_chunk_size(
                archive_path,
                &destination,
                entry.offset,
                entry.size,
                self.config.chunk_size,
            ) {
                Ok(_) => summary.extracted += 1,
                Err(e @ UnpackError::ArchiveNotFound(_)) => return Err(e),
                Err(e) => {
                    warn!("{e}");
                    sink.on_error(&e.to_string());
                    summary.failed += 1;
                }
            }
        }

        info!(
            "Unpacking completed: {} extracted, {} failed, {} named of {} entries",
            summary.extracted, summary.failed, summary.named, summary.total
        );
        Ok(summary)
    }

    /// Settled build outcome, or `None` if cancelled while waiting for it
    fn ensure_names_ready(&self, cancel: &CancellationToken) -> Result<Option<BuildOutcome>> {
        let outcome = self.names.outcome();
        if outcome.is_settled() {
            return Ok(Some(outcome));
        }
        if !self.config.wait_for_names {
            return Err(UnpackError::NotReady);
        }

        debug!("Waiting for name index build to settle");
        loop {
            if let Some(outcome) = self.names.wait_settled_for(NAMES_POLL_INTERVAL) {
                return Ok(Some(outcome));
            }
            if cancel.is_cancelled() {
                return Ok(None);
            }
        }
    }
}

/// Clears the extracting flag when a run ends
struct RunGuard<'a>(&'a AtomicBool);

impl<'a> RunGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Output path of an entry relative to the destination root
///
/// A known name keeps its directories, loses its own extension and gains
/// the detected one. Unknown entries go to `<unknown_dir>/<HASH><ext>`.
/// Separators are normalised to the platform separator.
pub fn relative_path_for(
    name: Option<&str>,
    entry: &ArchiveEntry,
    extension: &str,
    unknown_dir: &str,
) -> String {
    let relative = match name {
        Some(name) => format!("{}{extension}", strip_extension(name)),
        None => format!("{unknown_dir}/{}{extension}", entry.hash_hex()),
    };
    normalize_separators(&relative)
}

/// Remove the extension of the last path component
///
/// Leading dots of the file name do not start an extension.
pub fn strip_extension(name: &str) -> &str {
    let base_start = name.rfind(['/', '\\']).map_or(0, |i| i + 1);
    let base = &name[base_start..];
    let leading_dots = base.len() - base.trim_start_matches('.').len();

    match base[leading_dots..].rfind('.') {
        Some(dot) => &name[..base_start + leading_dots + dot],
        None => name,
    }
}

fn normalize_separators(path: &str) -> String {
    path.chars()
        .map(|c| if c == '/' || c == '\\' { MAIN_SEPARATOR } else { c })
        .collect()
}

/// Join a relative path onto `root`, dropping components that would escape it
fn safe_join(root: &Path, relative: &str) -> PathBuf {
    let mut path = root.to_path_buf();
    for component in Path::new(relative).components() {
        if let Component::Normal(part) = component {
            path.push(part);
        }
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    fn sep(path: &str) -> String {
        normalize_separators(path)
    }

    #[test]
    fn test_unknown_path() {
        let entry = ArchiveEntry::new(0xCAFE_BABE, 12, 4);
        assert_eq!(
            relative_path_for(None, &entry, ".png", "__Unknown"),
            sep("__Unknown/CAFEBABE.png")
        );

        let entry = ArchiveEntry::new(0xAB, 12, 4);
        assert_eq!(
            relative_path_for(None, &entry, ".bin", "__Unknown"),
            sep("__Unknown/000000AB.bin")
        );
    }

    #[test]
    fn test_known_name_replaces_extension() {
        let entry = ArchiveEntry::new(1, 0, 0);
        assert_eq!(
            relative_path_for(Some("data\\textures\\hero.tga"), &entry, ".dds", "__Unknown"),
            sep("data/textures/hero.dds")
        );
        assert_eq!(
            relative_path_for(Some("models/tree"), &entry, ".obj", "__Unknown"),
            sep("models/tree.obj")
        );
    }

    #[test]
    fn test_strip_extension() {
        assert_eq!(strip_extension("a/b.c.png"), "a/b.c");
        assert_eq!(strip_extension("dir.v2/file"), "dir.v2/file");
        assert_eq!(strip_extension(".hidden"), ".hidden");
        assert_eq!(strip_extension("dir\\.cfg.bak"), "dir\\.cfg");
        assert_eq!(strip_extension("plain"), "plain");
    }

    #[test]
    fn test_safe_join_stays_inside_root() {
        let root = Path::new("/out");
        assert_eq!(
            safe_join(root, &sep("../../etc/passwd.bin")),
            Path::new("/out/etc/passwd.bin")
        );
        assert_eq!(
            safe_join(root, &sep("/abs/./file.png")),
            Path::new("/out/abs/file.png")
        );
    }

    #[test]
    fn test_not_ready_before_build() {
        let dir = tempfile::tempdir().expect("tempdir");
        let unpacker = Unpacker::new(Arc::new(NameIndex::new()), UnpackConfig::default());
        let sink = Mutex::new(Vec::<ProgressEvent>::new());

        let result = unpacker.run(
            &dir.path().join("a.dat"),
            dir.path(),
            &sink,
            &CancellationToken::new(),
        );

        assert!(matches!(result, Err(UnpackError::NotReady)));
        let events = sink.into_inner();
        assert_eq!(events.last(), Some(&ProgressEvent::Done));
        assert!(matches!(events[0], ProgressEvent::Error(_)));
        assert!(!unpacker.is_extracting());
    }

    #[test]
    fn test_single_flight() {
        let dir = tempfile::tempdir().expect("tempdir");
        let names = Arc::new(NameIndex::new());
        names.mark_unavailable();
        let unpacker = Unpacker::new(names, UnpackConfig::default());

        let guard = RunGuard::acquire(&unpacker.extracting).expect("first acquire");
        assert!(unpacker.is_extracting());

        let result = unpacker.run(
            &dir.path().join("a.dat"),
            dir.path(),
            &Mutex::new(Vec::<ProgressEvent>::new()),
            &CancellationToken::new(),
        );
        assert!(matches!(result, Err(UnpackError::AlreadyRunning)));

        drop(guard);
        assert!(!unpacker.is_extracting());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let names = Arc::new(NameIndex::new());
        names.mark_unavailable();
        let unpacker = Unpacker::new(names, UnpackConfig::default().with_chunk_size(0));

        let result = unpacker.run(
            &dir.path().join("a.dat"),
            dir.path(),
            &Mutex::new(Vec::<ProgressEvent>::new()),
            &CancellationToken::new(),
        );
        assert!(matches!(result, Err(UnpackError::Config(_))));
    }

    #[test]
    fn test_cancel_while_waiting_for_names() {
        let dir = tempfile::tempdir().expect("tempdir");
        let unpacker = Unpacker::new(
            Arc::new(NameIndex::new()),
            UnpackConfig::default().with_wait_for_names(true),
        );
        let cancel = CancellationToken::new();
        let canceller = {
            let cancel = cancel.clone();
            std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(100));
                cancel.cancel();
            })
        };

        let sink = Mutex::new(Vec::<ProgressEvent>::new());
        let summary = unpacker
            .run(&dir.path().join("a.dat"), dir.path(), &sink, &cancel)
            .expect("cancelled run");
        canceller.join().expect("canceller");

        assert!(summary.cancelled);
        assert_eq!(summary.total, 0);
        assert!(!unpacker.is_extracting());
        let events = sink.into_inner();
        assert!(matches!(events[0], ProgressEvent::Warning(_)));
        assert_eq!(events.last(), Some(&ProgressEvent::Done));
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn test_resolve_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let archive = dir.path().join("a.dat");
        let tree = datunpack_formats::dat_hash("models/tree.obj");

        let mut data = Vec::new();
        for (hash, offset) in [(tree, 36i32), (0xCAFE_BABE, 40)] {
            data.extend_from_slice(&hash.to_le_bytes());
            data.extend_from_slice(&offset.to_le_bytes());
            data.extend_from_slice(&4i32.to_le_bytes());
        }
        data.extend_from_slice(&[0u8; 12]);
        data.extend_from_slice(&[0x45, 0x4F, 0x4D, 0x4A]);
        data.extend_from_slice(&[0x89, 0x50, 0x4E, 0x47]);
        std::fs::write(&archive, data).expect("write archive");

        let names = Arc::new(NameIndex::new());
        names.build(&["models/tree.obj"]);
        let unpacker = Unpacker::new(names, UnpackConfig::default());

        assert_eq!(
            unpacker.resolve_path(&archive, &ArchiveEntry::new(tree, 36, 4)),
            sep("models/tree.obj")
        );
        assert_eq!(
            unpacker.resolve_path(&archive, &ArchiveEntry::new(0xCAFE_BABE, 40, 4)),
            sep("__Unknown/CAFEBABE.png")
        );
    }
}
