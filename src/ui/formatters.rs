use colored::{ColoredString, Colorize};

use crate::core::monitor::{LineClass, RawLine, SessionState, Trend};

/// Colour a probe line by its classification
pub fn format_raw_line(line: &RawLine) -> ColoredString {
    let text = line.to_string();
    match line.class {
        LineClass::Error => text.red(),
        LineClass::Warning => text.yellow(),
        LineClass::Fps => text.green(),
        LineClass::Speed => text.blue(),
        LineClass::Decode => text.magenta(),
        LineClass::Plain => text.normal(),
    }
}

pub fn format_state(state: SessionState) -> ColoredString {
    match state {
        SessionState::Idle => "Idle".dimmed(),
        SessionState::Starting => "Starting...".cyan(),
        SessionState::Running => "Monitoring...".green(),
        SessionState::Stopping => "Stopping...".yellow(),
        SessionState::Failed => "Failed".red().bold(),
    }
}

/// Seconds as `HH:MM:SS`
pub fn format_elapsed(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    format!(
        "{:02}:{:02}:{:02}",
        total / 3600,
        (total % 3600) / 60,
        total % 60
    )
}

/// Trend direction with slope per minute
pub fn format_trend(trend: Option<Trend>) -> String {
    match trend {
        None => "n/a".to_string(),
        Some(t) => {
            let per_minute = t.slope * 60.0;
            let arrow = if per_minute.abs() < 1e-6 {
                "→"
            } else if per_minute > 0.0 {
                "↗"
            } else {
                "↘"
            };
            format!("{} {:+.3}/min", arrow, per_minute)
        }
    }
}
