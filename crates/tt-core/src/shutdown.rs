//! Cooperative interrupt flag.
//!
//! Set from the SIGINT handler and polled at directory and slice
//! boundaries, so an interrupted run stops between blocking operations and
//! the open delivery channel is torn down by its owner going out of scope.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared flag raised when the process is asked to stop.
#[derive(Debug, Clone, Default)]
pub struct ShutdownFlag(Arc<AtomicBool>);

impl ShutdownFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the flag. Safe to call from a signal handler thread.
    pub fn set(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
