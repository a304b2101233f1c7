// rtspmon Library - Public API

// Re-export error types
pub mod error;
pub use error::{MonitorError, Result};

// Module declarations
pub mod commands;
pub mod core;
pub mod ui;

// Re-export commonly used types
pub use crate::core::config::Settings;
pub use crate::core::monitor::{MonitorConfig, MonitorEvent, MonitorSession, SessionOptions};

// Initialize logging. The live line stream goes to stdout, so the default
// level stays at warn; RUST_LOG overrides it.
pub fn init_logging() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Warn)
        .parse_default_env()
        .init();
}
