//! Summary of a persisted CSV log, replayed through the live aggregator.

use std::path::Path;

use crate::core::monitor::{read_log, AggregateSnapshot, DecodeErrors, LoggedRow, StatsAggregator};
use crate::core::monitor::{MetricRecord, ObservedAt};
use crate::error::Result;

#[derive(Debug, Clone, PartialEq)]
pub struct LogReport {
    pub rows: usize,
    pub first_timestamp: Option<String>,
    pub last_timestamp: Option<String>,
    pub fps_samples: u64,
    pub max_delay_events: usize,
    pub decode_error_lines: usize,
    pub decode_errors: DecodeErrors,
    /// Aggregates as they stood after the last row
    pub summary: AggregateSnapshot,
}

/// Build a report from rows already read from a log
pub fn summarize(rows: &[LoggedRow]) -> LogReport {
    let aggregator = StatsAggregator::new();
    let mut max_delay_events = 0;
    let mut decode_error_lines = 0;
    let mut decode_errors = DecodeErrors::default();

    for row in rows {
        // The persisted columns are the record; the raw line is not re-read
        let record = MetricRecord::new(
            ObservedAt::now(),
            row.fps,
            row.speed,
            row.missed_packets,
            row.max_delay_reached,
            row.decode_errors,
            row.raw_log_line.clone(),
        );
        aggregator.update(&record);

        if row.max_delay_reached {
            max_delay_events += 1;
        }
        if let Some(errs) = row.decode_errors {
            decode_error_lines += 1;
            decode_errors.dc = decode_errors.dc.saturating_add(errs.dc);
            decode_errors.ac = decode_errors.ac.saturating_add(errs.ac);
            decode_errors.mv = decode_errors.mv.saturating_add(errs.mv);
        }
    }

    let last_timestamp = rows.last().map(|r| r.timestamp.clone());

    LogReport {
        rows: rows.len(),
        first_timestamp: rows.first().map(|r| r.timestamp.clone()),
        last_timestamp: last_timestamp.clone(),
        fps_samples: aggregator.fps_count(),
        max_delay_events,
        decode_error_lines,
        decode_errors,
        summary: aggregator.snapshot(0.0, last_timestamp.unwrap_or_default()),
    }
}

pub fn report_file<P: AsRef<Path>>(path: P) -> Result<LogReport> {
    Ok(summarize(&read_log(path)?))
}
