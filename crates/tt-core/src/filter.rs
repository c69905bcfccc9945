//! Byte-volume filtering of derived records.

use tt_common::FlowRecord;

/// Bits in one megabyte, as the volume threshold is configured.
pub const BITS_PER_MEGABYTE: i64 = 8_000_000;

/// Keeps a record only when it carries at least the configured volume.
///
/// A threshold of 0 megabytes disables filtering; every valid record
/// passes.
#[derive(Debug, Clone, Copy)]
pub struct VolumeFilter {
    min_bits: i64,
}

impl VolumeFilter {
    pub fn from_megabytes(megabytes: u64) -> Self {
        let min_bits = i64::try_from(megabytes)
            .unwrap_or(i64::MAX)
            .saturating_mul(BITS_PER_MEGABYTE);
        Self { min_bits }
    }

    pub fn accepts(&self, record: &FlowRecord) -> bool {
        record.num_bits() >= self.min_bits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;
    use tt_common::{record::FLOW_TYPE, Protocol, RecordMeta, RecordValues};

    fn record_with_bits(num_bits: i64) -> FlowRecord {
        let values = RecordValues {
            duration: 1.0,
            num_bits,
            num_packets: 1,
            bits_per_second: num_bits as f64,
            packets_per_second: 1.0,
            extra: Map::new(),
        };
        let meta = RecordMeta {
            src_ip: "198.51.100.7".to_string(),
            src_port: 1,
            dst_ip: "203.0.113.9".to_string(),
            dst_port: 2,
            protocol: Protocol::Udp,
            sensor_id: "s".to_string(),
            flow_type: FLOW_TYPE.to_string(),
        };
        FlowRecord::new(values, meta, 0, 1)
    }

    #[test]
    fn test_zero_threshold_keeps_everything() {
        let filter = VolumeFilter::from_megabytes(0);
        assert!(filter.accepts(&record_with_bits(0)));
        assert!(filter.accepts(&record_with_bits(1)));
    }

    #[test]
    fn test_boundary_is_inclusive() {
        let filter = VolumeFilter::from_megabytes(5);
        assert!(filter.accepts(&record_with_bits(5 * BITS_PER_MEGABYTE)));
        assert!(!filter.accepts(&record_with_bits(5 * BITS_PER_MEGABYTE - 1)));
    }
}
