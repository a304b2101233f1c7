use chrono::{DateTime, Local};
use std::fmt;
use std::time::Instant;

/// ISO-8601 local timestamp with microseconds, the format used in the CSV log
/// and as correlation key between snapshots and raw lines.
pub fn format_wall_clock(at: &DateTime<Local>) -> String {
    at.format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}

/// Point in time a line was observed, both monotonic and wall-clock
#[derive(Debug, Clone, Copy)]
pub struct ObservedAt {
    pub instant: Instant,
    pub wall: DateTime<Local>,
}

impl ObservedAt {
    pub fn now() -> Self {
        Self {
            instant: Instant::now(),
            wall: Local::now(),
        }
    }

    pub fn wall_string(&self) -> String {
        format_wall_clock(&self.wall)
    }
}

/// Counts from an ffmpeg "concealing N DC, N AC, N MV errors" line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DecodeErrors {
    pub dc: u64,
    pub ac: u64,
    pub mv: u64,
}

impl DecodeErrors {
    pub fn total(&self) -> u64 {
        self.dc.saturating_add(self.ac).saturating_add(self.mv)
    }

    /// Parse the composite `DC=<n>,AC=<n>,MV=<n>` form written to the log
    pub fn from_composite(s: &str) -> Option<Self> {
        let mut dc = None;
        let mut ac = None;
        let mut mv = None;

        for part in s.split(',') {
            let (key, value) = part.trim().split_once('=')?;
            let value = value.trim().parse::<u64>().ok()?;
            match key.trim() {
                "DC" => dc = Some(value),
                "AC" => ac = Some(value),
                "MV" => mv = Some(value),
                _ => return None,
            }
        }

        Some(Self {
            dc: dc?,
            ac: ac?,
            mv: mv?,
        })
    }
}

impl fmt::Display for DecodeErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DC={},AC={},MV={}", self.dc, self.ac, self.mv)
    }
}

/// One parsed observation from a single probe diagnostic line.
///
/// Fields are private so a record cannot change after the parser built it.
#[derive(Debug, Clone)]
pub struct MetricRecord {
    observed_at: ObservedAt,
    fps: Option<f64>,
    speed: Option<f64>,
    missed_packets: Option<u64>,
    max_delay: bool,
    decode_errors: Option<DecodeErrors>,
    raw_line: String,
}

impl MetricRecord {
    pub(crate) fn new(
        observed_at: ObservedAt,
        fps: Option<f64>,
        speed: Option<f64>,
        missed_packets: Option<u64>,
        max_delay: bool,
        decode_errors: Option<DecodeErrors>,
        raw_line: String,
    ) -> Self {
        Self {
            observed_at,
            fps,
            speed,
            missed_packets,
            max_delay,
            decode_errors,
            raw_line,
        }
    }

    pub fn observed_at(&self) -> &ObservedAt {
        &self.observed_at
    }

    pub fn fps(&self) -> Option<f64> {
        self.fps
    }

    pub fn speed(&self) -> Option<f64> {
        self.speed
    }

    pub fn missed_packets(&self) -> Option<u64> {
        self.missed_packets
    }

    pub fn max_delay(&self) -> bool {
        self.max_delay
    }

    pub fn decode_errors(&self) -> Option<DecodeErrors> {
        self.decode_errors
    }

    pub fn raw_line(&self) -> &str {
        &self.raw_line
    }

    /// True if no metric at all was extracted from the line
    pub fn is_empty(&self) -> bool {
        self.fps.is_none()
            && self.speed.is_none()
            && self.missed_packets.is_none()
            && !self.max_delay
            && self.decode_errors.is_none()
    }
}
