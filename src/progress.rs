//! Progress reporting and cooperative cancellation
//!
//! Long recursions poll [`ExecutionMonitor::check_canceled`] at subtree
//! granularity and unwind with [`CanceledExecution`] when the user aborted.

use parking_lot::Mutex;
use std::error::Error;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

/// Signal raised when execution was canceled by the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanceledExecution {
    message: String,
}

impl CanceledExecution {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CanceledExecution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Execution canceled: {}", self.message)
    }
}

impl Error for CanceledExecution {}

/// Narrow progress/cancel contract consumed by save and load
pub trait ExecutionMonitor: Send + Sync {
    /// Fails with [`CanceledExecution`] if cancellation was requested
    fn check_canceled(&self) -> Result<(), CanceledExecution>;

    /// Report progress in `[0, 1]` with a short message
    fn report_progress(&self, fraction: f64, message: &str);
}

/// Monitor that never cancels and discards progress
#[derive(Debug, Default, Clone, Copy)]
pub struct NullMonitor;

impl ExecutionMonitor for NullMonitor {
    fn check_canceled(&self) -> Result<(), CanceledExecution> {
        Ok(())
    }

    fn report_progress(&self, _fraction: f64, _message: &str) {}
}

/// Monitor backed by a cancel flag that other threads may raise
#[derive(Debug, Default)]
pub struct CancelFlagMonitor {
    canceled: AtomicBool,
    last_progress: Mutex<Option<(f64, String)>>,
}

impl CancelFlagMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; observed at the next poll
    pub fn cancel(&self) {
        self.canceled.store(true, Ordering::SeqCst);
    }

    pub fn is_canceled(&self) -> bool {
        self.canceled.load(Ordering::SeqCst)
    }

    /// Most recent progress report, if any
    pub fn last_progress(&self) -> Option<(f64, String)> {
        self.last_progress.lock().clone()
    }
}

impl ExecutionMonitor for CancelFlagMonitor {
    fn check_canceled(&self) -> Result<(), CanceledExecution> {
        if self.is_canceled() {
            Err(CanceledExecution::new("canceled by user"))
        } else {
            Ok(())
        }
    }

    fn report_progress(&self, fraction: f64, message: &str) {
        *self.last_progress.lock() = Some((fraction.clamp(0.0, 1.0), message.to_string()));
    }
}
