//! Directory walking and the per-directory completion state machine.
//!
//! A leaf directory (name ending in `.out`) moves through a small state
//! machine: no recognized logs means not applicable; a `.processed` marker
//! means already delivered and the logs are never read; otherwise the
//! directory's whole payload is derived, batched, and sent, and only full
//! success writes the marker. A delivery failure withholds the marker,
//! is recorded in the summary, and the walk continues with the next
//! directory — already-sent batches are not retracted, so a later retry
//! re-sends the whole directory.
//!
//! The marker path is a pure function of the directory path; processed
//! state is never cached in memory.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{debug, error, info, warn};

use tt_common::{Direction, Error, FlowRecord, Protocol, Result};

use crate::batch;
use crate::filter::VolumeFilter;
use crate::parse::{LogReader, RowError};
use crate::record::build_record;
use crate::shutdown::ShutdownFlag;
use crate::transport::DeliveryChannel;

/// Completion marker written into a leaf directory once delivered.
pub const MARKER_FILE: &str = ".processed";

/// Suffix identifying a tstat output directory.
pub const DIR_SUFFIX: &str = ".out";

/// Marker path for a leaf directory.
pub fn marker_path(dir: &Path) -> PathBuf {
    dir.join(MARKER_FILE)
}

/// Terminal status of one leaf directory for this run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirStatus {
    /// No recognized log files present.
    NotApplicable,
    /// Marker already present; logs were not read.
    AlreadyDone,
    /// Whole payload delivered this run; marker written.
    Done,
    /// A batch failed; marker withheld, directory stays eligible.
    Failed,
}

/// Counters and failures accumulated over one walk.
#[derive(Debug, Default)]
pub struct WalkSummary {
    /// Leaf directories that contained recognized logs.
    pub visited: usize,
    /// Directories fully delivered and marked this run.
    pub delivered: usize,
    /// Directories skipped because their marker was already present.
    pub already_done: usize,
    /// Leaf directories with no recognized logs.
    pub not_applicable: usize,
    /// Records delivered this run.
    pub records: usize,
    /// Batches delivered this run.
    pub batches: usize,
    /// Rows or directional records rejected with a warning.
    pub rejected: usize,
    /// Directories whose delivery failed, with the failure text.
    pub failures: Vec<(PathBuf, String)>,
}

impl WalkSummary {
    /// True when no directory failed delivery.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Drives the pipeline over a directory tree, strictly sequentially.
pub struct Walker<'a> {
    channel: &'a mut dyn DeliveryChannel,
    filter: VolumeFilter,
    sensor_id: String,
    shutdown: ShutdownFlag,
}

impl<'a> Walker<'a> {
    pub fn new(
        channel: &'a mut dyn DeliveryChannel,
        filter: VolumeFilter,
        sensor_id: String,
        shutdown: ShutdownFlag,
    ) -> Self {
        Self {
            channel,
            filter,
            sensor_id,
            shutdown,
        }
    }

    /// Walk the tree depth-first and process every leaf directory.
    pub fn walk(&mut self, root: &Path) -> Result<WalkSummary> {
        if !root.is_dir() {
            return Err(Error::InvalidPath(root.display().to_string()));
        }
        let mut summary = WalkSummary::default();
        self.visit(root, &mut summary)?;
        Ok(summary)
    }

    fn visit(&mut self, dir: &Path, summary: &mut WalkSummary) -> Result<()> {
        if self.shutdown.is_set() {
            return Err(Error::Interrupted);
        }

        let is_leaf = dir
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with(DIR_SUFFIX));
        if is_leaf {
            self.process_directory(dir, summary)?;
        }

        // Deterministic order: children sorted by name.
        let mut children: Vec<PathBuf> = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                children.push(entry.path());
            }
        }
        children.sort();
        for child in children {
            self.visit(&child, summary)?;
        }
        Ok(())
    }

    /// Run one leaf directory through the state machine.
    pub fn process_directory(
        &mut self,
        dir: &Path,
        summary: &mut WalkSummary,
    ) -> Result<DirStatus> {
        let logs: Vec<(Protocol, PathBuf)> = Protocol::ALL
            .iter()
            .filter_map(|p| {
                let path = dir.join(p.log_file());
                path.is_file().then(|| (*p, path))
            })
            .collect();

        if logs.is_empty() {
            summary.not_applicable += 1;
            return Ok(DirStatus::NotApplicable);
        }
        summary.visited += 1;

        let marker = marker_path(dir);
        if marker.exists() {
            debug!(dir = %dir.display(), "already processed, skipping");
            summary.already_done += 1;
            return Ok(DirStatus::AlreadyDone);
        }

        info!(dir = %dir.display(), logs = logs.len(), "processing");
        for protocol in Protocol::ALL.iter().filter(|p| !logs.iter().any(|(q, _)| q == *p)) {
            debug!(dir = %dir.display(), log = protocol.log_file(), "log not present");
        }

        let mut payload = Vec::new();
        for (protocol, path) in &logs {
            self.collect_log(*protocol, path, &mut payload, summary)?;
        }

        match batch::deliver(&payload, self.channel, &self.shutdown) {
            Ok(batches) => {
                self.write_marker(&marker)?;
                summary.delivered += 1;
                summary.records += payload.len();
                summary.batches += batches;
                info!(
                    dir = %dir.display(),
                    records = payload.len(),
                    batches,
                    "directory delivered"
                );
                Ok(DirStatus::Done)
            }
            Err(Error::Delivery(msg)) => {
                error!(dir = %dir.display(), error = %msg, "delivery failed, marker withheld");
                summary.failures.push((dir.to_path_buf(), msg));
                Ok(DirStatus::Failed)
            }
            Err(other) => Err(other),
        }
    }

    /// Read one log and append its accepted records to the payload.
    fn collect_log(
        &mut self,
        protocol: Protocol,
        path: &Path,
        payload: &mut Vec<FlowRecord>,
        summary: &mut WalkSummary,
    ) -> Result<()> {
        debug!(log = %path.display(), "reading");
        let reader = LogReader::open(path)?;
        for row in reader {
            let row = match row {
                Ok(row) => row,
                Err(RowError::ShortRow {
                    line,
                    expected,
                    found,
                }) => {
                    warn!(
                        log = %path.display(),
                        line, expected, found,
                        "bad row, skipping"
                    );
                    summary.rejected += 1;
                    continue;
                }
                Err(RowError::Io(e)) => return Err(Error::Io(e)),
            };
            for direction in Direction::BOTH {
                match build_record(protocol, &row, direction, &self.sensor_id) {
                    Ok(record) => {
                        if self.filter.accepts(&record) {
                            payload.push(record);
                        }
                    }
                    Err(e) => {
                        warn!(
                            log = %path.display(),
                            %direction,
                            error = %e,
                            "record dropped"
                        );
                        summary.rejected += 1;
                    }
                }
            }
        }
        Ok(())
    }

    fn write_marker(&self, marker: &Path) -> Result<()> {
        // Presence is the state; the content is informational only.
        fs::write(marker, format!("processed {}\n", Utc::now().to_rfc3339()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::testing::{FailingChannel, RecordingChannel};
    use tempfile::TempDir;

    const UDP_HEADER: &str = "#c_ip:1 c_port:2 s_ip:3 s_port:4 c_first_abs:5 c_durat:6 \
                              c_bytes_all:7 c_pkts_all:8 s_first_abs:9 s_durat:10 \
                              s_bytes_all:11 s_pkts_all:12";

    fn udp_row(client_bytes: u64) -> String {
        format!(
            "10.1.0.1 5001 10.2.0.2 53 1500000000000.0 2000.0 {client_bytes} 10 \
             1500000000100.0 1500.0 4096 8"
        )
    }

    fn write_udp_log(dir: &Path, rows: usize) {
        let mut content = String::from(UDP_HEADER);
        content.push('\n');
        for _ in 0..rows {
            content.push_str(&udp_row(1000));
            content.push('\n');
        }
        fs::write(dir.join("log_udp_complete"), content).unwrap();
    }

    fn leaf(tmp: &TempDir, name: &str) -> PathBuf {
        let dir = tmp.path().join(name);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn walker<'a>(channel: &'a mut dyn DeliveryChannel) -> Walker<'a> {
        Walker::new(
            channel,
            VolumeFilter::from_megabytes(0),
            "sensor-01".to_string(),
            ShutdownFlag::new(),
        )
    }

    #[test]
    fn test_directory_without_logs_is_not_applicable() {
        let tmp = TempDir::new().unwrap();
        let dir = leaf(&tmp, "empty.out");
        let mut channel = RecordingChannel::default();
        let mut summary = WalkSummary::default();
        let status = walker(&mut channel)
            .process_directory(&dir, &mut summary)
            .unwrap();
        assert_eq!(status, DirStatus::NotApplicable);
        assert!(!marker_path(&dir).exists());
        assert!(channel.batches.is_empty());
    }

    #[test]
    fn test_processing_delivers_and_writes_marker() {
        let tmp = TempDir::new().unwrap();
        let dir = leaf(&tmp, "run.out");
        write_udp_log(&dir, 3);
        let mut channel = RecordingChannel::default();
        let mut summary = WalkSummary::default();
        let status = walker(&mut channel)
            .process_directory(&dir, &mut summary)
            .unwrap();
        assert_eq!(status, DirStatus::Done);
        assert!(marker_path(&dir).exists());
        // Three rows, two directions each.
        assert_eq!(summary.records, 6);
        assert_eq!(channel.batches.len(), 1);
    }

    #[test]
    fn test_marker_short_circuits_before_reading_logs() {
        let tmp = TempDir::new().unwrap();
        let dir = leaf(&tmp, "done.out");
        write_udp_log(&dir, 3);
        fs::write(marker_path(&dir), "processed\n").unwrap();
        let mut channel = RecordingChannel::default();
        let mut summary = WalkSummary::default();
        let status = walker(&mut channel)
            .process_directory(&dir, &mut summary)
            .unwrap();
        assert_eq!(status, DirStatus::AlreadyDone);
        assert!(channel.batches.is_empty());
    }

    #[test]
    fn test_two_runs_deliver_exactly_once() {
        let tmp = TempDir::new().unwrap();
        let dir = leaf(&tmp, "run.out");
        write_udp_log(&dir, 2);
        let mut channel = RecordingChannel::default();

        let summary = walker(&mut channel).walk(tmp.path()).unwrap();
        assert_eq!(summary.delivered, 1);
        let after_first = channel.batches.len();

        let summary = walker(&mut channel).walk(tmp.path()).unwrap();
        assert_eq!(summary.delivered, 0);
        assert_eq!(summary.already_done, 1);
        assert_eq!(channel.batches.len(), after_first);
    }

    #[test]
    fn test_failure_withholds_marker_and_walk_continues() {
        let tmp = TempDir::new().unwrap();
        let failing = leaf(&tmp, "a.out");
        write_udp_log(&failing, 2);
        let healthy = leaf(&tmp, "b.out");
        write_udp_log(&healthy, 2);

        // Every send fails: both directories fail, neither is marked.
        let mut channel = FailingChannel::failing_after(0);
        let summary = walker(&mut channel).walk(tmp.path()).unwrap();
        assert_eq!(summary.failures.len(), 2);
        assert!(!summary.is_clean());
        assert!(!marker_path(&failing).exists());
        assert!(!marker_path(&healthy).exists());

        // Retry with a healthy channel re-sends everything.
        let mut channel = RecordingChannel::default();
        let summary = walker(&mut channel).walk(tmp.path()).unwrap();
        assert_eq!(summary.delivered, 2);
        assert_eq!(summary.records, 8);
        assert!(marker_path(&failing).exists());
        assert!(marker_path(&healthy).exists());
    }

    #[test]
    fn test_malformed_row_is_skipped_not_fatal() {
        let tmp = TempDir::new().unwrap();
        let dir = leaf(&tmp, "run.out");
        let mut content = String::from(UDP_HEADER);
        content.push('\n');
        content.push_str("10.1.0.1 5001\n"); // short row
        content.push_str(&udp_row(1000));
        content.push('\n');
        fs::write(dir.join("log_udp_complete"), content).unwrap();

        let mut channel = RecordingChannel::default();
        let mut summary = WalkSummary::default();
        let status = walker(&mut channel)
            .process_directory(&dir, &mut summary)
            .unwrap();
        assert_eq!(status, DirStatus::Done);
        assert_eq!(summary.rejected, 1);
        assert_eq!(summary.records, 2);
        assert!(marker_path(&dir).exists());
    }

    #[test]
    fn test_empty_payload_still_marks_done() {
        let tmp = TempDir::new().unwrap();
        let dir = leaf(&tmp, "quiet.out");
        // Header only, no data rows.
        fs::write(
            dir.join("log_udp_complete"),
            format!("{UDP_HEADER}\n"),
        )
        .unwrap();
        let mut channel = RecordingChannel::default();
        let mut summary = WalkSummary::default();
        let status = walker(&mut channel)
            .process_directory(&dir, &mut summary)
            .unwrap();
        assert_eq!(status, DirStatus::Done);
        assert!(marker_path(&dir).exists());
        assert!(channel.batches.is_empty());
    }

    #[test]
    fn test_volume_filter_drops_small_flows() {
        let tmp = TempDir::new().unwrap();
        let dir = leaf(&tmp, "run.out");
        write_udp_log(&dir, 2);
        let mut channel = RecordingChannel::default();
        let mut walker = Walker::new(
            &mut channel,
            VolumeFilter::from_megabytes(1),
            "sensor-01".to_string(),
            ShutdownFlag::new(),
        );
        let mut summary = WalkSummary::default();
        let status = walker.process_directory(&dir, &mut summary).unwrap();
        // All flows are tiny: nothing delivered, directory still done.
        assert_eq!(status, DirStatus::Done);
        assert_eq!(summary.records, 0);
        assert!(marker_path(&dir).exists());
    }

    #[test]
    fn test_walk_rejects_missing_root() {
        let mut channel = RecordingChannel::default();
        let result = walker(&mut channel).walk(Path::new("/nonexistent/tree"));
        assert!(matches!(result, Err(Error::InvalidPath(_))));
    }

    #[test]
    fn test_interrupt_aborts_walk() {
        let tmp = TempDir::new().unwrap();
        let dir = leaf(&tmp, "run.out");
        write_udp_log(&dir, 1);
        let mut channel = RecordingChannel::default();
        let shutdown = ShutdownFlag::new();
        shutdown.set();
        let mut walker = Walker::new(
            &mut channel,
            VolumeFilter::from_megabytes(0),
            "sensor-01".to_string(),
            shutdown,
        );
        assert!(matches!(
            walker.walk(tmp.path()),
            Err(Error::Interrupted)
        ));
        assert!(!marker_path(&dir).exists());
    }

    #[test]
    fn test_nested_leaves_are_found() {
        let tmp = TempDir::new().unwrap();
        let nested = tmp.path().join("2026_08").join("host1").join("run.out");
        fs::create_dir_all(&nested).unwrap();
        write_udp_log(&nested, 1);
        let mut channel = RecordingChannel::default();
        let summary = walker(&mut channel).walk(tmp.path()).unwrap();
        assert_eq!(summary.delivered, 1);
        assert!(marker_path(&nested).exists());
    }
}
