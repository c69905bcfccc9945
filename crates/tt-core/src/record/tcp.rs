//! Stream-variant (tcp) record derivation.
//!
//! The flow-level clock (`durat`, `first`, `last`) is shared by both
//! directions; byte and packet counters and the `tcp_*` metric family are
//! direction-specific, except for the two cross-peer metrics: the
//! maximum-segment-size takes the smaller of the two peers' advertised
//! values and the selective-acknowledgement count takes the larger.

use serde_json::Map;

use tt_common::{Direction, FlowRecord, Protocol, RecordValues};

use super::{
    build_meta, count, directional_count, integer, metric, milliseconds, ms_to_secs,
    ms_to_unix_secs, rate, RecordError,
};
use crate::parse::SanitizedRow;

/// Direction-specific tcp metrics: output key → tstat column suffix.
const DIRECTIONAL_METRICS: &[(&str, &str)] = &[
    ("tcp_rexmit_bytes", "bytes_retx"),
    ("tcp_rexmit_pkts", "pkts_retx"),
    ("tcp_rtt_avg", "rtt_avg"),
    ("tcp_rtt_min", "rtt_min"),
    ("tcp_rtt_max", "rtt_max"),
    ("tcp_rtt_std", "rtt_std"),
    ("tcp_pkts_rto", "rtx_RTO"),
    ("tcp_pkts_fs", "rtx_FR"),
    ("tcp_pkts_reor", "reordering"),
    ("tcp_pkts_dup", "net_dup"),
    ("tcp_pkts_unk", "unknown"),
    ("tcp_pkts_fc", "flow_control"),
    ("tcp_pkts_unrto", "unnece_rtx_RTO"),
    ("tcp_pkts_unfs", "unnece_rtx_FR"),
    ("tcp_cwin_min", "cwin_min"),
    ("tcp_cwin_max", "cwin_max"),
    ("tcp_out_seq_pkts", "pkts_ooo"),
    ("tcp_window_scale", "win_scl"),
    ("tcp_win_min", "win_min"),
    ("tcp_win_max", "win_max"),
    ("tcp_initial_cwin", "cwin_ini"),
];

pub(super) fn build(
    row: &SanitizedRow,
    direction: Direction,
    sensor_id: &str,
) -> Result<FlowRecord, RecordError> {
    // Flow-level clock, shared by both directions.
    let duration = ms_to_secs(milliseconds(row, "durat")?);
    let start = ms_to_unix_secs(milliseconds(row, "first")?);
    let end = ms_to_unix_secs(milliseconds(row, "last")?);
    if end < start {
        return Err(RecordError::OutOfRange {
            field: "last".to_string(),
            value: end.to_string(),
        });
    }

    let num_bits = directional_count(row, direction, "bytes_uniq")? * 8;
    let num_packets = directional_count(row, direction, "pkts_data")?;

    let mut extra = Map::new();
    for (key, column) in DIRECTIONAL_METRICS {
        let field = SanitizedRow::directional_key(direction, column);
        extra.insert((*key).to_string(), metric(row, &field)?.to_json());
    }
    let mss = integer(row, "c_mss")?.min(integer(row, "s_mss")?);
    extra.insert("tcp_mss".to_string(), mss.into());
    let sack_cnt = count(row, "c_sack_cnt")?.max(count(row, "s_sack_cnt")?);
    extra.insert("tcp_sack_cnt".to_string(), sack_cnt.into());

    let values = RecordValues {
        duration,
        num_bits,
        num_packets,
        bits_per_second: rate(num_bits as f64, duration),
        packets_per_second: rate(num_packets as f64, duration),
        extra,
    };
    let meta = build_meta(row, Protocol::Tcp, direction, sensor_id)?;
    Ok(FlowRecord::new(values, meta, start, end))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Cells of a complete, well-formed tcp row.
    fn base_pairs() -> Vec<(String, String)> {
        let mut pairs: Vec<(String, String)> = [
            ("c_ip", "198.51.100.7"),
            ("c_port", "40412"),
            ("s_ip", "203.0.113.9"),
            ("s_port", "443"),
            ("durat", "5360.326"),
            ("first", "1500000000000.0"),
            ("last", "1500000005360.33"),
            ("c_bytes_uniq", "1000"),
            ("s_bytes_uniq", "52000"),
            ("c_pkts_data", "12"),
            ("s_pkts_data", "48"),
            ("c_mss", "1460"),
            ("s_mss", "1380"),
            ("c_sack_cnt", "3"),
            ("s_sack_cnt", "9"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        for (_, column) in DIRECTIONAL_METRICS {
            // Distinct values per side so direction mix-ups show up.
            pairs.push((format!("c_{column}"), "1".to_string()));
            pairs.push((format!("s_{column}"), "2".to_string()));
        }
        pairs
    }

    fn row_from(pairs: &[(String, String)]) -> SanitizedRow {
        let borrowed: Vec<(&str, &str)> = pairs
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        SanitizedRow::from_pairs(&borrowed)
    }

    fn tcp_row() -> SanitizedRow {
        row_from(&base_pairs())
    }

    /// The base row with one cell replaced.
    fn row_with(key: &str, value: &str) -> SanitizedRow {
        let mut pairs = base_pairs();
        for pair in &mut pairs {
            if pair.0 == key {
                pair.1 = value.to_string();
            }
        }
        row_from(&pairs)
    }

    /// The base row with one cell removed entirely.
    fn row_without(key: &str) -> SanitizedRow {
        let pairs: Vec<_> = base_pairs().into_iter().filter(|p| p.0 != key).collect();
        row_from(&pairs)
    }

    #[test]
    fn test_inbound_reads_client_counters() {
        let record = build(&tcp_row(), Direction::In, "sensor-01").unwrap();
        assert_eq!(record.values.num_bits, 8 * 1000);
        assert_eq!(record.values.num_packets, 12);
        assert_eq!(record.meta.src_ip, "198.51.100.7");
        assert_eq!(record.meta.src_port, 40412);
        assert_eq!(record.meta.dst_ip, "203.0.113.9");
        assert_eq!(record.values.extra["tcp_rexmit_bytes"], 1);
    }

    #[test]
    fn test_outbound_reads_server_counters() {
        let record = build(&tcp_row(), Direction::Out, "sensor-01").unwrap();
        assert_eq!(record.values.num_bits, 8 * 52000);
        assert_eq!(record.values.num_packets, 48);
        assert_eq!(record.meta.src_ip, "203.0.113.9");
        assert_eq!(record.meta.src_port, 443);
        assert_eq!(record.values.extra["tcp_rexmit_bytes"], 2);
    }

    #[test]
    fn test_duration_is_shared_and_rounded() {
        let inbound = build(&tcp_row(), Direction::In, "s").unwrap();
        let outbound = build(&tcp_row(), Direction::Out, "s").unwrap();
        assert_eq!(inbound.values.duration, 5.36);
        assert_eq!(inbound.values.duration, outbound.values.duration);
    }

    #[test]
    fn test_timestamps_convert_to_unix_seconds() {
        let record = build(&tcp_row(), Direction::In, "s").unwrap();
        assert_eq!(record.start, 1_500_000_000);
        assert_eq!(record.end, 1_500_000_005);
        assert!(record.start <= record.end);
    }

    #[test]
    fn test_cross_peer_metrics() {
        let record = build(&tcp_row(), Direction::In, "s").unwrap();
        // Smaller of the two advertised segment sizes, larger of the two
        // selective-acknowledgement counts.
        assert_eq!(record.values.extra["tcp_mss"], 1380);
        assert_eq!(record.values.extra["tcp_sack_cnt"], 9);
    }

    #[test]
    fn test_rates_follow_direction() {
        let record = build(&tcp_row(), Direction::In, "s").unwrap();
        assert_eq!(
            record.values.bits_per_second,
            (8000.0_f64 / 5.36 * 1000.0).round() / 1000.0
        );
    }

    #[test]
    fn test_missing_direction_counter_drops_only_that_direction() {
        let row = row_without("c_bytes_uniq");
        assert!(matches!(
            build(&row, Direction::In, "s"),
            Err(RecordError::Missing(_))
        ));
        assert!(build(&row, Direction::Out, "s").is_ok());
    }

    #[test]
    fn test_non_numeric_counter_is_rejected() {
        let row = row_with("c_bytes_uniq", "-");
        assert!(matches!(
            build(&row, Direction::In, "s"),
            Err(RecordError::NotNumeric { .. })
        ));
        assert!(build(&row, Direction::Out, "s").is_ok());
    }

    #[test]
    fn test_non_numeric_shared_clock_drops_both_directions() {
        let row = row_with("durat", "n/a");
        assert!(build(&row, Direction::In, "s").is_err());
        assert!(build(&row, Direction::Out, "s").is_err());
    }

    #[test]
    fn test_end_before_start_is_rejected() {
        let row = row_with("last", "1499999990000.0");
        assert!(matches!(
            build(&row, Direction::In, "s"),
            Err(RecordError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_metric_family_is_complete() {
        let record = build(&tcp_row(), Direction::In, "s").unwrap();
        // 21 directional metrics plus the two cross-peer ones.
        assert_eq!(record.values.extra.len(), DIRECTIONAL_METRICS.len() + 2);
        assert!(record.values.extra.contains_key("tcp_initial_cwin"));
        assert!(record.values.extra.contains_key("tcp_window_scale"));
    }
}
