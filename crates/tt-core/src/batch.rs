//! Payload batching and sequential delivery.
//!
//! A directory's accepted records are sliced into fixed-size,
//! order-preserving chunks; each chunk is serialized independently as a
//! JSON array and handed to the delivery channel in order. The first
//! failed send halts the remaining sends for that directory.

use tracing::debug;

use tt_common::{Error, FlowRecord, Result};

use crate::shutdown::ShutdownFlag;
use crate::transport::DeliveryChannel;

/// Maximum records per delivery call.
pub const SLICE_SIZE: usize = 100;

/// Serialize one slice as a UTF-8 JSON array of record objects.
pub fn serialize_slice(slice: &[FlowRecord]) -> Result<String> {
    Ok(serde_json::to_string(slice)?)
}

/// Deliver a directory's payload, slice by slice, in order.
///
/// Returns the number of batches sent. An empty payload is a successful
/// no-op. A send failure maps to [`Error::Delivery`]; slices already sent
/// are not retracted.
pub fn deliver(
    payload: &[FlowRecord],
    channel: &mut dyn DeliveryChannel,
    shutdown: &ShutdownFlag,
) -> Result<usize> {
    if payload.is_empty() {
        debug!("no payload to deliver");
        return Ok(0);
    }
    let mut sent = 0;
    for slice in payload.chunks(SLICE_SIZE) {
        if shutdown.is_set() {
            return Err(Error::Interrupted);
        }
        let body = serialize_slice(slice)?;
        channel
            .send(&body)
            .map_err(|e| Error::Delivery(e.to_string()))?;
        sent += 1;
        debug!(batch = sent, records = slice.len(), "batch delivered");
    }
    Ok(sent)
}
