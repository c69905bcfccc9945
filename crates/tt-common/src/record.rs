//! The flow record wire schema.
//!
//! A `FlowRecord` is one direction of one observed flow, shaped for the
//! downstream archive: a `type`/`interval` envelope, a `values` stanza with
//! the measured quantities, a `meta` stanza identifying the endpoints and
//! the sensor, and integer start/end timestamps in unix seconds.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Record type constant carried by every record.
pub const RECORD_TYPE: &str = "flow";

/// Reporting interval in seconds carried by every record.
pub const INTERVAL_SECS: u32 = 600;

/// Record family tag carried in the meta stanza.
pub const FLOW_TYPE: &str = "tstat";

/// Transport-layer protocol of an observed flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Tcp,
    Udp,
}

impl Protocol {
    /// The protocols a tstat output directory can contain logs for.
    pub const ALL: [Protocol; 2] = [Protocol::Tcp, Protocol::Udp];

    /// Fixed name of the tstat log file for this protocol.
    pub fn log_file(&self) -> &'static str {
        match self {
            Protocol::Tcp => "log_tcp_complete",
            Protocol::Udp => "log_udp_complete",
        }
    }
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Protocol::Tcp => write!(f, "tcp"),
            Protocol::Udp => write!(f, "udp"),
        }
    }
}

/// Direction of a flow record relative to the observing host.
///
/// `In` frames the flow from the client side, `Out` from the server side;
/// both are derived from the same log row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    In,
    Out,
}

impl Direction {
    /// Both directions, in emission order.
    pub const BOTH: [Direction; 2] = [Direction::In, Direction::Out];

    /// Column-family prefix this direction reads its counters from.
    ///
    /// Inbound records read the client-side (`c_`) columns, outbound the
    /// server-side (`s_`) columns.
    pub fn prefix(&self) -> &'static str {
        match self {
            Direction::In => "c_",
            Direction::Out => "s_",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::In => write!(f, "in"),
            Direction::Out => write!(f, "out"),
        }
    }
}

/// The measured quantities of one directional record.
///
/// The base set is shared by every protocol; protocol-specific metrics
/// (the `tcp_*` family) ride along in `extra` and serialize inline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordValues {
    /// Flow duration in seconds.
    pub duration: f64,
    /// Unique payload bits carried in this direction.
    pub num_bits: i64,
    /// Data packets carried in this direction.
    pub num_packets: i64,
    /// num_bits / duration; 0 when the duration is 0.
    pub bits_per_second: f64,
    /// num_packets / duration; 0 when the duration is 0.
    pub packets_per_second: f64,
    /// Protocol-specific metrics, serialized as sibling fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The meta stanza identifying the endpoints and the sensor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordMeta {
    pub src_ip: String,
    pub src_port: u16,
    pub dst_ip: String,
    pub dst_port: u16,
    pub protocol: Protocol,
    /// Configured sensor identifier, or the local hostname if unset.
    pub sensor_id: String,
    /// Always [`FLOW_TYPE`].
    pub flow_type: String,
}

/// One direction of one observed flow, ready for delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowRecord {
    /// Always [`RECORD_TYPE`].
    #[serde(rename = "type")]
    pub record_type: String,
    /// Always [`INTERVAL_SECS`].
    pub interval: u32,
    pub values: RecordValues,
    pub meta: RecordMeta,
    /// Flow start, integer unix seconds.
    pub start: i64,
    /// Flow end, integer unix seconds. Never precedes `start`.
    pub end: i64,
}

impl FlowRecord {
    /// Assemble a record, filling in the constant envelope fields.
    pub fn new(values: RecordValues, meta: RecordMeta, start: i64, end: i64) -> Self {
        Self {
            record_type: RECORD_TYPE.to_string(),
            interval: INTERVAL_SECS,
            values,
            meta,
            start,
            end,
        }
    }

    /// Unique bits carried by this record; the volume filter keys on this.
    pub fn num_bits(&self) -> i64 {
        self.values.num_bits
    }
}
