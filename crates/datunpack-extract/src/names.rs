//! Hash to name reverse index
//!
//! The index maps DAT name hashes back to candidate names. Each candidate is
//! hashed twice, once lowercased and once uppercased, because archives were
//! built from paths in either case. Both hashes map to the candidate in its
//! original case.
//!
//! The index is built once per instance, normally on a blocking worker, and
//! publishes a [`BuildStatus`] that observers can poll without waiting on the
//! builder. Lookups return `None` until the build has succeeded.

use crate::wordlist::WordList;
use datunpack_formats::dat_hash;
use parking_lot::{Condvar, Mutex, RwLock};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Number of progress updates published over a full build
const PROGRESS_STEPS: usize = 200;

/// Terminal state of a name index build
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildOutcome {
    /// Not built yet, or still building
    Pending,
    /// Built, possibly with zero names
    Succeeded,
    /// The word list was unavailable; lookups always miss
    Failed,
}

impl BuildOutcome {
    /// Whether the build has reached a terminal state
    pub const fn is_settled(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// Snapshot of build progress
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BuildStatus {
    /// A build is currently running
    pub in_progress: bool,
    /// Fraction of candidates processed, `0.0..=1.0`
    pub fraction: f64,
}

#[derive(Debug)]
struct BuildState {
    in_progress: bool,
    fraction: f64,
    outcome: BuildOutcome,
}

/// Reverse index from name hash to candidate name
#[derive(Debug)]
pub struct NameIndex {
    names: RwLock<HashMap<u32, String>>,
    state: Mutex<BuildState>,
    settled: Condvar,
    collisions: AtomicUsize,
}

impl Default for NameIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl NameIndex {
    /// Create an empty, unbuilt index
    pub fn new() -> Self {
        Self {
            names: RwLock::new(HashMap::new()),
            state: Mutex::new(BuildState {
                in_progress: false,
                fraction: 0.0,
                outcome: BuildOutcome::Pending,
            }),
            settled: Condvar::new(),
            collisions: AtomicUsize::new(0),
        }
    }

    /// Build the index from candidate names
    ///
    /// Does nothing if the index has already been built or a build is
    /// running. Empty candidates are skipped. When two candidates produce the
    /// same hash the later one wins.
    #[allow(clippy::cast_precision_loss)]
    pub fn build<S: AsRef<str>>(&self, candidates: &[S]) -> BuildOutcome {
        if !self.try_begin() {
            return self.outcome();
        }

        let total = candidates.len();
        let interval = (total / PROGRESS_STEPS).max(1);
        let mut names = HashMap::with_capacity(total * 2);
        let mut collisions = 0usize;

        for (i, candidate) in candidates.iter().enumerate() {
            let candidate = candidate.as_ref();
            if !candidate.is_empty() {
                let lower = dat_hash(&candidate.to_lowercase());
                let upper = dat_hash(&candidate.to_uppercase());

                collisions += insert_name(&mut names, lower, candidate);
                if upper != lower {
                    collisions += insert_name(&mut names, upper, candidate);
                }
            }

            let processed = i + 1;
            if processed % interval == 0 && processed < total {
                self.publish_fraction(processed as f64 / total as f64);
            }
        }

        let count = names.len();
        *self.names.write() = names;
        self.collisions.store(collisions, Ordering::Relaxed);

        info!(
            "Name index built: {} hashes from {} candidates ({} collisions)",
            count, total, collisions
        );

        self.finish(BuildOutcome::Succeeded)
    }

    /// Load a word list from disk and build the index from it
    ///
    /// A missing word list settles the build as [`BuildOutcome::Failed`];
    /// extraction can still proceed with every entry in the unknown bucket.
    pub fn build_from_file(&self, path: &std::path::Path) -> BuildOutcome {
        match WordList::load(path) {
            Ok(list) => self.build(list.names()),
            Err(e) => {
                warn!("{e}. Proceeding without known names.");
                self.mark_unavailable()
            }
        }
    }

    /// Settle the build as failed without any names
    ///
    /// Does nothing if the index has already settled or is building.
    pub fn mark_unavailable(&self) -> BuildOutcome {
        if !self.try_begin() {
            return self.outcome();
        }
        self.finish(BuildOutcome::Failed)
    }

    /// Build on a blocking worker
    pub fn spawn_build(self: Arc<Self>, candidates: Vec<String>) -> JoinHandle<BuildOutcome> {
        tokio::task::spawn_blocking(move || self.build(&candidates))
    }

    /// Load a word list and build on a blocking worker
    pub fn spawn_build_from_file(self: Arc<Self>, path: PathBuf) -> JoinHandle<BuildOutcome> {
        tokio::task::spawn_blocking(move || self.build_from_file(&path))
    }

    /// Look up the candidate name for a hash
    ///
    /// Always `None` unless the build has succeeded.
    pub fn lookup(&self, hash: u32) -> Option<String> {
        if self.outcome() != BuildOutcome::Succeeded {
            return None;
        }
        self.names.read().get(&hash).cloned()
    }

    /// Current build progress, never blocks on the builder
    pub fn status(&self) -> BuildStatus {
        let state = self.state.lock();
        BuildStatus {
            in_progress: state.in_progress,
            fraction: state.fraction,
        }
    }

    /// Current build outcome
    pub fn outcome(&self) -> BuildOutcome {
        self.state.lock().outcome
    }

    /// Whether the build has reached a terminal state
    pub fn is_settled(&self) -> bool {
        self.outcome().is_settled()
    }

    /// Block until the build reaches a terminal state
    pub fn wait_settled(&self) -> BuildOutcome {
        let mut state = self.state.lock();
        while !state.outcome.is_settled() {
            self.settled.wait(&mut state);
        }
        state.outcome
    }

    /// Block until the build settles or `timeout` elapses
    pub fn wait_settled_for(&self, timeout: Duration) -> Option<BuildOutcome> {
        let mut state = self.state.lock();
        if !state.outcome.is_settled() {
            let _ = self
                .settled
                .wait_while_for(&mut state, |s| !s.outcome.is_settled(), timeout);
        }
        state.outcome.is_settled().then_some(state.outcome)
    }

    /// Number of distinct hashes in the index
    pub fn len(&self) -> usize {
        self.names.read().len()
    }

    /// `true` if the index holds no names
    pub fn is_empty(&self) -> bool {
        self.names.read().is_empty()
    }

    /// Hash collisions between different candidates seen during the build
    pub fn collisions(&self) -> usize {
        self.collisions.load(Ordering::Relaxed)
    }

    fn try_begin(&self) -> bool {
        let mut state = self.state.lock();
        if state.in_progress || state.outcome.is_settled() {
            debug!("Name index build skipped: already built or building");
            return false;
        }
        state.in_progress = true;
        state.fraction = 0.0;
        true
    }

    fn publish_fraction(&self, fraction: f64) {
        let mut state = self.state.lock();
        if fraction > state.fraction {
            state.fraction = fraction.min(1.0);
        }
    }

    fn finish(&self, outcome: BuildOutcome) -> BuildOutcome {
        let mut state = self.state.lock();
        state.fraction = 1.0;
        state.in_progress = false;
        state.outcome = outcome;
        self.settled.notify_all();
        outcome
    }
}

/// Insert a mapping, returning 1 if it replaced a different name
fn insert_name(names: &mut HashMap<u32, String>, hash: u32, candidate: &str) -> usize {
    match names.insert(hash, candidate.to_string()) {
        Some(previous) if previous != candidate => {
            debug!("Hash collision {hash:08X}: {previous} <-> {candidate}");
            1
        }
        _ => 0,
    }
}
