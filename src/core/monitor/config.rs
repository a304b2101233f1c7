use std::path::PathBuf;

use crate::error::{MonitorError, Result};

pub const DEFAULT_LOG_PATH: &str = "stream_log.csv";

/// Everything a monitoring session needs to start
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorConfig {
    /// Probe executable; looked up on PATH when absent
    pub executable_path: Option<PathBuf>,
    pub target_url: String,
    pub log_path: PathBuf,
    /// Extra probe arguments, shell-quoted
    pub extra_args: String,
}

impl MonitorConfig {
    pub fn new<S: Into<String>>(target_url: S) -> Self {
        Self {
            executable_path: None,
            target_url: target_url.into(),
            log_path: PathBuf::from(DEFAULT_LOG_PATH),
            extra_args: String::new(),
        }
    }

    pub fn with_executable<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.executable_path = Some(path.into());
        self
    }

    pub fn with_log_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.log_path = path.into();
        self
    }

    pub fn with_extra_args<S: Into<String>>(mut self, args: S) -> Self {
        self.extra_args = args.into();
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.target_url.trim().is_empty() {
            return Err(MonitorError::config("a stream URL is required"));
        }
        if self.log_path.as_os_str().is_empty() {
            return Err(MonitorError::config("log path must not be empty"));
        }
        self.extra_args_tokens().map(|_| ())
    }

    /// Split `extra_args` the way a POSIX shell would
    pub fn extra_args_tokens(&self) -> Result<Vec<String>> {
        if self.extra_args.trim().is_empty() {
            return Ok(Vec::new());
        }
        shlex::split(&self.extra_args).ok_or_else(|| {
            MonitorError::config(format!(
                "could not parse extra probe arguments (unbalanced quotes?): {}",
                self.extra_args
            ))
        })
    }
}
