//! Directional flow record derivation.
//!
//! Each protocol variant is a pure function `(row, direction) -> record`
//! invoked once per direction with no shared state between the two
//! invocations. Validation is by explicit precondition: every required
//! input must be present and numeric before anything is constructed, and a
//! failed precondition drops only that single directional record.

mod tcp;
mod udp;

use tt_common::record::FLOW_TYPE;
use tt_common::{Direction, FlowRecord, Protocol, RecordMeta};

use crate::parse::numeric::round3;
use crate::parse::{CellValue, SanitizedRow};

/// Why one directional record could not be derived from a row.
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("missing field {0}")]
    Missing(String),

    #[error("field {field} is not numeric: {value:?}")]
    NotNumeric { field: String, value: String },

    #[error("field {field} out of range: {value}")]
    OutOfRange { field: String, value: String },
}

/// Derive one directional record from a sanitized row.
///
/// The protocol set is closed, so this dispatches once per call instead of
/// going through a trait object.
pub fn build_record(
    protocol: Protocol,
    row: &SanitizedRow,
    direction: Direction,
    sensor_id: &str,
) -> Result<FlowRecord, RecordError> {
    match protocol {
        Protocol::Tcp => tcp::build(row, direction, sensor_id),
        Protocol::Udp => udp::build(row, direction, sensor_id),
    }
}

// ── Field preconditions ─────────────────────────────────────────────────

fn required(row: &SanitizedRow, field: &str) -> Result<CellValue, RecordError> {
    row.value(field)
        .ok_or_else(|| RecordError::Missing(field.to_string()))
}

/// Any numeric value.
fn numeric(row: &SanitizedRow, field: &str) -> Result<f64, RecordError> {
    match required(row, field)? {
        CellValue::Int(i) => Ok(i as f64),
        CellValue::Float(f) => Ok(f),
        CellValue::Text(s) => Err(RecordError::NotNumeric {
            field: field.to_string(),
            value: s,
        }),
    }
}

/// Any integer-valued number (window scales and segment sizes may be
/// negative sentinels in tstat output, so no sign restriction here).
fn integer(row: &SanitizedRow, field: &str) -> Result<i64, RecordError> {
    let value = required(row, field)?;
    value.as_i64().ok_or_else(|| RecordError::NotNumeric {
        field: field.to_string(),
        value: value.to_string(),
    })
}

/// A numeric metric value, preserving its integer/float form for output.
fn metric(row: &SanitizedRow, field: &str) -> Result<CellValue, RecordError> {
    match required(row, field)? {
        CellValue::Text(s) => Err(RecordError::NotNumeric {
            field: field.to_string(),
            value: s,
        }),
        value => Ok(value),
    }
}

/// A non-negative integer counter (bytes, packets).
fn count(row: &SanitizedRow, field: &str) -> Result<i64, RecordError> {
    let value = integer(row, field)?;
    if value < 0 {
        return Err(RecordError::OutOfRange {
            field: field.to_string(),
            value: value.to_string(),
        });
    }
    Ok(value)
}

/// A non-negative millisecond quantity (durations, absolute timestamps).
fn milliseconds(row: &SanitizedRow, field: &str) -> Result<f64, RecordError> {
    let ms = numeric(row, field)?;
    if ms < 0.0 {
        return Err(RecordError::OutOfRange {
            field: field.to_string(),
            value: ms.to_string(),
        });
    }
    Ok(ms)
}

fn directional_count(
    row: &SanitizedRow,
    direction: Direction,
    key: &str,
) -> Result<i64, RecordError> {
    count(row, &SanitizedRow::directional_key(direction, key))
}

fn directional_milliseconds(
    row: &SanitizedRow,
    direction: Direction,
    key: &str,
) -> Result<f64, RecordError> {
    milliseconds(row, &SanitizedRow::directional_key(direction, key))
}

fn address(row: &SanitizedRow, field: &str) -> Result<String, RecordError> {
    match row.get(field) {
        Some(s) if !s.is_empty() => Ok(s.to_string()),
        _ => Err(RecordError::Missing(field.to_string())),
    }
}

fn port(row: &SanitizedRow, field: &str) -> Result<u16, RecordError> {
    let value = count(row, field)?;
    u16::try_from(value).map_err(|_| RecordError::OutOfRange {
        field: field.to_string(),
        value: value.to_string(),
    })
}

// ── Shared derivation pieces ────────────────────────────────────────────

/// Meta stanza for one direction: inbound frames the client side as the
/// source, outbound frames the server side as the source.
fn build_meta(
    row: &SanitizedRow,
    protocol: Protocol,
    direction: Direction,
    sensor_id: &str,
) -> Result<RecordMeta, RecordError> {
    let (src_ip, src_port, dst_ip, dst_port) = match direction {
        Direction::In => (
            address(row, "c_ip")?,
            port(row, "c_port")?,
            address(row, "s_ip")?,
            port(row, "s_port")?,
        ),
        Direction::Out => (
            address(row, "s_ip")?,
            port(row, "s_port")?,
            address(row, "c_ip")?,
            port(row, "c_port")?,
        ),
    };
    Ok(RecordMeta {
        src_ip,
        src_port,
        dst_ip,
        dst_port,
        protocol,
        sensor_id: sensor_id.to_string(),
        flow_type: FLOW_TYPE.to_string(),
    })
}

/// Milliseconds to seconds, rounded to 2 decimals.
fn ms_to_secs(ms: f64) -> f64 {
    (ms / 10.0).round() / 100.0
}

/// Absolute milliseconds to integer unix seconds.
fn ms_to_unix_secs(ms: f64) -> i64 {
    (ms / 1000.0).round() as i64
}

/// Per-second rate; a zero duration floors to 0 instead of failing.
fn rate(amount: f64, duration_secs: f64) -> f64 {
    if duration_secs == 0.0 {
        0.0
    } else {
        round3(amount / duration_secs)
    }
}
