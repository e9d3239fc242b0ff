//! Progress events and cooperative cancellation
//!
//! An extraction run reports what it is doing through a [`ProgressSink`].
//! The usual sink is the sending half of a tokio channel, drained by
//! whatever presentation layer the caller has.

use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;

/// Event emitted during an extraction run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// An entry is about to be extracted to this relative path
    Path(String),
    /// Recoverable condition worth reporting
    Warning(String),
    /// An entry or the whole run failed
    Error(String),
    /// The run is over; always the last event of a run
    Done,
}

impl fmt::Display for ProgressEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(path) => write!(f, "{path}"),
            Self::Warning(msg) => write!(f, "WARNING: {msg}"),
            Self::Error(msg) => write!(f, "ERROR: {msg}"),
            Self::Done => write!(f, "Done"),
        }
    }
}

/// Receiver of progress events
pub trait ProgressSink: Send + Sync {
    /// Deliver one event
    fn emit(&self, event: ProgressEvent);

    /// Report the relative path of the entry being extracted
    fn on_path(&self, relative_path: &str) {
        self.emit(ProgressEvent::Path(relative_path.to_string()));
    }

    /// Report a recoverable condition
    fn on_warning(&self, message: &str) {
        self.emit(ProgressEvent::Warning(message.to_string()));
    }

    /// Report a failure
    fn on_error(&self, message: &str) {
        self.emit(ProgressEvent::Error(message.to_string()));
    }

    /// Report the end of the run
    fn on_done(&self) {
        self.emit(ProgressEvent::Done);
    }
}

impl ProgressSink for mpsc::UnboundedSender<ProgressEvent> {
    fn emit(&self, event: ProgressEvent) {
        // A dropped receiver only means nobody is watching
        let _ = self.send(event);
    }
}

impl ProgressSink for Mutex<Vec<ProgressEvent>> {
    fn emit(&self, event: ProgressEvent) {
        self.lock().push(event);
    }
}

impl<T: ProgressSink + ?Sized> ProgressSink for Arc<T> {
    fn emit(&self, event: ProgressEvent) {
        (**self).emit(event);
    }
}

/// Cancellation flag shared between a run and its caller
///
/// Checked between entries, never in the middle of one, so a cancelled run
/// leaves no partially written file behind.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a new cancellation token
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// Check if cancellation has been requested
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}
