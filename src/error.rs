use std::io;
use thiserror::Error;

/// Error type for the stream monitor
#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Probe executable not found: {0}")]
    ExecutableNotFound(String),

    #[error("Probe failed to start: {message}")]
    Launch {
        message: String,
        /// Diagnostic text the probe printed before it exited
        diagnostics: String,
    },

    #[error("Log persistence error: {0}")]
    Persistence(String),

    #[error("Runtime error: {0}")]
    Runtime(String),
}

/// Result type alias for the stream monitor
pub type Result<T> = std::result::Result<T, MonitorError>;

impl From<csv::Error> for MonitorError {
    fn from(err: csv::Error) -> Self {
        MonitorError::Persistence(err.to_string())
    }
}

impl MonitorError {
    /// Create a config error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        MonitorError::Config(msg.into())
    }

    /// Create an executable-not-found error
    pub fn executable_not_found<S: Into<String>>(msg: S) -> Self {
        MonitorError::ExecutableNotFound(msg.into())
    }

    /// Create a launch error carrying the probe's captured diagnostics
    pub fn launch<S: Into<String>, D: Into<String>>(msg: S, diagnostics: D) -> Self {
        MonitorError::Launch {
            message: msg.into(),
            diagnostics: diagnostics.into(),
        }
    }

    /// Create a persistence error
    pub fn persistence<S: Into<String>>(msg: S) -> Self {
        MonitorError::Persistence(msg.into())
    }

    pub fn runtime<S: Into<String>>(msg: S) -> Self {
        MonitorError::Runtime(msg.into())
    }

    /// Whether the user can fix this by changing input (path, url, params)
    pub fn is_user_correctable(&self) -> bool {
        matches!(
            self,
            MonitorError::Config(_) | MonitorError::ExecutableNotFound(_)
        )
    }
}
