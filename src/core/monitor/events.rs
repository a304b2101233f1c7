//! Messages published by a monitoring session to its consumer.

use std::fmt;

use super::session::SessionState;
use super::stats::AggregateSnapshot;

/// Display hint for a raw probe line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineClass {
    Error,
    Warning,
    Fps,
    Speed,
    Decode,
    Plain,
}

impl LineClass {
    /// Case-insensitive substring checks, first match wins
    pub fn classify(text: &str) -> Self {
        let lower = text.to_lowercase();
        if lower.contains("max delay reached") {
            LineClass::Error
        } else if lower.contains("missed") {
            LineClass::Warning
        } else if lower.contains("fps=") {
            LineClass::Fps
        } else if lower.contains("speed=") {
            LineClass::Speed
        } else if lower.contains("concealing") || lower.contains("decode") {
            LineClass::Decode
        } else {
            LineClass::Plain
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LineClass::Error => "error",
            LineClass::Warning => "warning",
            LineClass::Fps => "fps",
            LineClass::Speed => "speed",
            LineClass::Decode => "decode",
            LineClass::Plain => "plain",
        }
    }
}

/// A probe line as published to the consumer
#[derive(Debug, Clone, PartialEq)]
pub struct RawLine {
    pub timestamp: String,
    pub text: String,
    pub class: LineClass,
}

impl RawLine {
    pub fn new(timestamp: String, text: String) -> Self {
        let class = LineClass::classify(&text);
        Self {
            timestamp,
            text,
            class,
        }
    }
}

impl fmt::Display for RawLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.timestamp, self.text)
    }
}

#[derive(Debug, Clone)]
pub enum MonitorEvent {
    RawLine(RawLine),
    Snapshot(AggregateSnapshot),
    /// Errors and notices for the user
    Diagnostic { timestamp: String, message: String },
    StateChanged(SessionState),
    /// Last event of a session
    Stopped,
}
