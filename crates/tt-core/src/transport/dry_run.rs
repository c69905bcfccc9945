//! Recording sink used in place of a live transport.
//!
//! Selected by `--dry-run`: batches are counted and logged instead of
//! sent, so a tree can be walked end to end without a reachable broker.
//! Completion markers are still written, exactly as with a live send.

use tracing::{debug, info};

use super::{DeliveryChannel, DeliveryError};

/// Sink that records each serialized batch without transmitting it.
#[derive(Debug, Default)]
pub struct DryRunChannel {
    batches: usize,
    bytes: usize,
}

impl DryRunChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Batches accepted so far.
    pub fn batches(&self) -> usize {
        self.batches
    }

    /// Total serialized bytes accepted so far.
    pub fn bytes(&self) -> usize {
        self.bytes
    }
}

impl DeliveryChannel for DryRunChannel {
    fn send(&mut self, batch: &str) -> Result<(), DeliveryError> {
        self.batches += 1;
        self.bytes += batch.len();
        debug!(batch = self.batches, bytes = batch.len(), "dry-run batch");
        Ok(())
    }
}

impl Drop for DryRunChannel {
    fn drop(&mut self) {
        if self.batches > 0 {
            info!(
                batches = self.batches,
                bytes = self.bytes,
                "dry-run complete, nothing was sent"
            );
        }
    }
}
