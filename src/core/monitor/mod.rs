//! Stream monitoring core.
//!
//! Supervises the probe process, turns its diagnostic lines into metric
//! records, aggregates them and appends every record to a CSV log.

pub mod config;
pub mod csv_log;
pub mod events;
pub mod executable;
pub mod history;
pub mod log_buffer;
pub mod parser;
pub mod record;
pub mod session;
pub mod stats;
pub mod supervisor;

pub use config::{MonitorConfig, DEFAULT_LOG_PATH};
pub use csv_log::{read_log, CsvLogWriter, LoggedRow, RecordSink};
pub use events::{LineClass, MonitorEvent, RawLine};
pub use executable::{resolve_executable, DEFAULT_PROBE};
pub use history::{SeriesMetric, SnapshotSeries, Trend};
pub use log_buffer::LogBuffer;
pub use record::{DecodeErrors, MetricRecord, ObservedAt};
pub use session::{
    ingest_lines, EventReceiver, EventSender, IngestContext, MonitorSession, SessionOptions,
    SessionState,
};
pub use stats::{AggregateSnapshot, StatsAggregator, SPEED_WINDOW};
pub use supervisor::{build_args, ProbeLines, ProbeProcess, SupervisorOptions};
