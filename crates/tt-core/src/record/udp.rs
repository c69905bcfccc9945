//! Datagram-variant (udp) record derivation.
//!
//! Unlike the stream variant there is no flow-level clock: duration, byte
//! and packet counters, and the start timestamp are all direction-specific,
//! and the end timestamp is derived as start + duration.

use serde_json::Map;

use tt_common::{Direction, FlowRecord, Protocol, RecordValues};

use super::{
    build_meta, directional_count, directional_milliseconds, ms_to_secs, ms_to_unix_secs, rate,
    RecordError,
};
use crate::parse::SanitizedRow;

pub(super) fn build(
    row: &SanitizedRow,
    direction: Direction,
    sensor_id: &str,
) -> Result<FlowRecord, RecordError> {
    let duration = ms_to_secs(directional_milliseconds(row, direction, "durat")?);
    let start = ms_to_unix_secs(directional_milliseconds(row, direction, "first_abs")?);
    let end = start + duration.round() as i64;

    let num_bits = directional_count(row, direction, "bytes_all")? * 8;
    let num_packets = directional_count(row, direction, "pkts_all")?;

    let values = RecordValues {
        duration,
        num_bits,
        num_packets,
        bits_per_second: rate(num_bits as f64, duration),
        packets_per_second: rate(num_packets as f64, duration),
        extra: Map::new(),
    };
    let meta = build_meta(row, Protocol::Udp, direction, sensor_id)?;
    Ok(FlowRecord::new(values, meta, start, end))
}
