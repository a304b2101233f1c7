use anyhow::{Context, Result};
use colored::Colorize;
use std::path::PathBuf;

use crate::core::report::report_file;

/// Execute the report command over a CSV log
pub fn execute(matches: &clap::ArgMatches) -> Result<()> {
    let path = matches
        .get_one::<String>("log")
        .map(PathBuf::from)
        .context("Log file is required")?;

    if !path.exists() {
        return Err(anyhow::anyhow!("The file '{}' does not exist", path.display()));
    }

    let report = report_file(&path)
        .with_context(|| format!("Failed to read log {}", path.display()))?;

    println!();
    println!("{} {}", "Log report:".cyan().bold(), path.display());
    println!();
    println!("  {} {}", "Rows:".cyan(), report.rows);
    if let (Some(first), Some(last)) = (&report.first_timestamp, &report.last_timestamp) {
        println!("  {} {} .. {}", "Span:".cyan(), first, last);
    }
    println!(
        "  {} {:.2} ({} samples)",
        "Avg FPS:".cyan(),
        report.summary.average_fps,
        report.fps_samples
    );
    println!(
        "  {} {:.2}x (last {} samples)",
        "Avg Speed:".cyan(),
        report.summary.average_speed,
        crate::core::monitor::SPEED_WINDOW
    );

    let missed = report.summary.cumulative_missed_packets;
    let missed_text = format!("{}", missed);
    println!(
        "  {} {}",
        "Missed packets:".cyan(),
        if missed > 0 { missed_text.yellow() } else { missed_text.normal() }
    );

    let delays = format!("{}", report.max_delay_events);
    println!(
        "  {} {}",
        "Max delay reached:".cyan(),
        if report.max_delay_events > 0 { delays.red() } else { delays.normal() }
    );
    println!(
        "  {} {} lines ({})",
        "Decode errors:".cyan(),
        report.decode_error_lines,
        report.decode_errors
    );
    println!();

    Ok(())
}
