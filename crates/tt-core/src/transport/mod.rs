//! The delivery channel boundary.
//!
//! A [`DeliveryChannel`] transmits one serialized batch at a time and
//! reports success or failure; everything upstream of it is
//! transport-agnostic. One channel is opened per run, shared by every
//! directory, and used by exactly one caller at a time. Teardown of the
//! underlying resource is tied to ownership, so it happens on every exit
//! path.

pub mod dry_run;
pub mod rabbit;

pub use dry_run::DryRunChannel;
pub use rabbit::RabbitChannel;

/// Errors surfaced by a delivery channel.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("broker connection failed: {0}")]
    Connect(String),

    #[error("publish failed: {0}")]
    Publish(String),
}

impl From<DeliveryError> for tt_common::Error {
    fn from(err: DeliveryError) -> Self {
        tt_common::Error::Delivery(err.to_string())
    }
}

/// Transmits one serialized batch to the downstream archive.
pub trait DeliveryChannel {
    /// Hand one UTF-8 JSON batch to the transport. `Ok` means the batch
    /// was durably accepted; any failure means it was not, and the caller
    /// must not send further batches for the current directory.
    fn send(&mut self, batch: &str) -> Result<(), DeliveryError>;
}
