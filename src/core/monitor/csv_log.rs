//! Append-only CSV log of every parsed probe line.
//!
//! # Examples
//!
//! ```no_run
//! use rtspmon::core::monitor::{csv_log::CsvLogWriter, parser};
//!
//! let mut log = CsvLogWriter::open("stream_log.csv")?;
//! log.append(&parser::parse("frame= 120 fps= 25.0 speed=1.02x"))?;
//! log.close()?;
//! # Ok::<(), rtspmon::MonitorError>(())
//! ```

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use crate::error::{MonitorError, Result};

use super::record::{DecodeErrors, MetricRecord};

pub const HEADER: [&str; 7] = [
    "timestamp",
    "fps",
    "speed",
    "missed_packets",
    "max_delay_reached",
    "decode_errors",
    "raw_log_line",
];

/// Float with a guaranteed decimal point (`25.0`, not `25`)
fn format_float(value: f64) -> String {
    format!("{:?}", value)
}

fn persistence_error(path: &Path, action: &str, err: impl std::fmt::Display) -> MonitorError {
    MonitorError::persistence(format!("Failed to {} {}: {}", action, path.display(), err))
}

/// Writes one CSV row per record and flushes each row to disk
pub struct CsvLogWriter {
    path: PathBuf,
    writer: csv::Writer<File>,
    rows_written: u64,
}

impl CsvLogWriter {
    /// Open `path` for appending. The header row is written only when the
    /// file is new (or empty), so earlier sessions' rows are preserved.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|e| persistence_error(parent, "create directory", e))?;
            }
        }

        let needs_header = fs::metadata(&path).map(|m| m.len() == 0).unwrap_or(true);

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| persistence_error(&path, "open log file", e))?;

        let writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        let mut log = Self {
            path,
            writer,
            rows_written: 0,
        };

        if needs_header {
            log.writer
                .write_record(HEADER)
                .map_err(|e| persistence_error(&log.path, "write header to", e))?;
            log.sync()?;
        }

        log::debug!("Opened CSV log {:?} (new: {})", log.path, needs_header);
        Ok(log)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rows appended through this handle (header excluded)
    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    pub fn append(&mut self, record: &MetricRecord) -> Result<()> {
        let row = [
            record.observed_at().wall_string(),
            record.fps().map(format_float).unwrap_or_default(),
            record.speed().map(format_float).unwrap_or_default(),
            record
                .missed_packets()
                .map(|n| n.to_string())
                .unwrap_or_default(),
            if record.max_delay() { "1" } else { "0" }.to_string(),
            record
                .decode_errors()
                .map(|d| d.to_string())
                .unwrap_or_default(),
            record.raw_line().to_string(),
        ];

        self.writer
            .write_record(&row)
            .map_err(|e| persistence_error(&self.path, "append to", e))?;
        self.sync()?;
        self.rows_written += 1;
        Ok(())
    }

    /// Flush buffered bytes and push them to stable storage
    fn sync(&mut self) -> Result<()> {
        self.writer
            .flush()
            .map_err(|e| persistence_error(&self.path, "flush", e))?;
        self.writer
            .get_ref()
            .sync_data()
            .map_err(|e| persistence_error(&self.path, "sync", e))
    }

    pub fn close(mut self) -> Result<()> {
        self.sync()?;
        log::debug!(
            "Closed CSV log {:?} after {} rows",
            self.path,
            self.rows_written
        );
        Ok(())
    }
}

/// Where the ingestion loop persists parsed records
pub trait RecordSink: Send {
    fn append(&mut self, record: &MetricRecord) -> Result<()>;

    /// Flush and release the destination
    fn close(self: Box<Self>) -> Result<()>;
}

impl RecordSink for CsvLogWriter {
    fn append(&mut self, record: &MetricRecord) -> Result<()> {
        CsvLogWriter::append(self, record)
    }

    fn close(self: Box<Self>) -> Result<()> {
        CsvLogWriter::close(*self)
    }
}

/// One row read back from a CSV log
#[derive(Debug, Clone, PartialEq)]
pub struct LoggedRow {
    pub timestamp: String,
    pub fps: Option<f64>,
    pub speed: Option<f64>,
    pub missed_packets: Option<u64>,
    pub max_delay_reached: bool,
    pub decode_errors: Option<DecodeErrors>,
    pub raw_log_line: String,
}

fn optional<T: std::str::FromStr>(field: &str) -> Option<T> {
    let field = field.trim();
    if field.is_empty() {
        None
    } else {
        field.parse().ok()
    }
}

/// Read every data row of a CSV log
pub fn read_log<P: AsRef<Path>>(path: P) -> Result<Vec<LoggedRow>> {
    let path = path.as_ref();
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .map_err(|e| persistence_error(path, "open", e))?;

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| persistence_error(path, "read", e))?;
        if record.len() != HEADER.len() {
            return Err(MonitorError::persistence(format!(
                "{}: expected {} columns, found {}",
                path.display(),
                HEADER.len(),
                record.len()
            )));
        }

        rows.push(LoggedRow {
            timestamp: record[0].to_string(),
            fps: optional(&record[1]),
            speed: optional(&record[2]),
            missed_packets: optional(&record[3]),
            max_delay_reached: record[4].trim() == "1",
            decode_errors: DecodeErrors::from_composite(&record[5]),
            raw_log_line: record[6].to_string(),
        });
    }

    Ok(rows)
}
