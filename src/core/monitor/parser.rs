//! Extraction of typed metrics from ffmpeg diagnostic lines.
//!
//! Every rule runs independently against the same line. A pattern that
//! matches but carries a malformed number leaves only that field empty.

use once_cell::sync::Lazy;
use regex::Regex;

use super::record::{DecodeErrors, MetricRecord, ObservedAt};

static FPS_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"fps=\s*([\d.]+)").expect("fps pattern is valid"));
static SPEED_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"speed=\s*([\d.]+)x").expect("speed pattern is valid"));
static MISSED_PACKETS_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"missed (\d+) packets").expect("missed pattern is valid"));
static DECODE_ERROR_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"concealing (\d+) DC,\s*(\d+) AC,\s*(\d+) MV errors")
        .expect("decode error pattern is valid")
});

const MAX_DELAY_PHRASE: &str = "max delay reached";

/// Parse a line, stamping it with the current time
pub fn parse(line: &str) -> MetricRecord {
    parse_at(line, ObservedAt::now())
}

/// Parse a line observed at a known instant
pub fn parse_at(line: &str, observed_at: ObservedAt) -> MetricRecord {
    let line = line.trim();

    let fps = capture(&FPS_PATTERN, line, "fps");
    let speed = capture(&SPEED_PATTERN, line, "speed");
    let missed_packets = capture(&MISSED_PACKETS_PATTERN, line, "missed packets");
    let max_delay = line.contains(MAX_DELAY_PHRASE);
    let decode_errors = capture_decode_errors(line);

    MetricRecord::new(
        observed_at,
        fps,
        speed,
        missed_packets,
        max_delay,
        decode_errors,
        line.to_string(),
    )
}

/// First capture group of the first match, parsed as `T`
fn capture<T: std::str::FromStr>(pattern: &Regex, line: &str, field: &str) -> Option<T> {
    let raw = pattern.captures(line)?.get(1)?.as_str();
    match raw.parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            log::debug!("Ignoring malformed {} value {:?}", field, raw);
            None
        }
    }
}

fn capture_decode_errors(line: &str) -> Option<DecodeErrors> {
    let caps = DECODE_ERROR_PATTERN.captures(line)?;
    let number = |i: usize| caps.get(i)?.as_str().parse::<u64>().ok();

    match (number(1), number(2), number(3)) {
        (Some(dc), Some(ac), Some(mv)) => Some(DecodeErrors { dc, ac, mv }),
        _ => {
            log::debug!("Ignoring malformed decode error counts in {:?}", line);
            None
        }
    }
}
