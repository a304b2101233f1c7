// Core business logic module

pub mod config;
pub mod monitor;
pub mod report;

// Re-export commonly used items
pub use config::{Overrides, Settings};
pub use monitor::{MonitorConfig, MonitorEvent, MonitorSession, SessionOptions, SessionState};
pub use report::{report_file, LogReport};
