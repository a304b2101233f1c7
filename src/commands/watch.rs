//! `rtspmon watch` - live monitoring of one stream.

use anyhow::{Context, Result};
use clap::ArgMatches;
use colored::Colorize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tokio::sync::mpsc::error::TryRecvError;

use crate::core::config::{Overrides, Settings};
use crate::core::monitor::{
    LogBuffer, MonitorConfig, MonitorEvent, MonitorSession, SeriesMetric, SessionOptions,
    SessionState,
};
use crate::error::MonitorError;
use crate::ui::{format_elapsed, format_raw_line, format_state, format_trend};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

pub fn execute(matches: &ArgMatches) -> Result<()> {
    let url = matches
        .get_one::<String>("url")
        .context("Stream URL is required")?;

    let overrides = Overrides {
        ffmpeg_path: matches.get_one::<String>("ffmpeg").cloned(),
        output_csv: matches.get_one::<String>("output").cloned(),
        ffmpeg_params: matches.get_one::<String>("params").cloned(),
    };
    let quiet = matches.get_flag("quiet");
    let save_log = matches.get_one::<String>("save-log");

    let settings = Settings::load().unwrap_or_else(|e| {
        log::warn!("Using default settings: {}", e);
        Settings::default()
    });
    let config = settings.monitor_config(url, &overrides);

    // Setup Ctrl+C handler
    let stop_flag = Arc::new(AtomicBool::new(false));
    let stop_flag_clone = stop_flag.clone();
    ctrlc::set_handler(move || {
        stop_flag_clone.store(true, Ordering::Relaxed);
    })
    .map_err(|e| anyhow::anyhow!("Failed to set Ctrl+C handler: {}", e))?;

    print_header(&config);

    let (mut session, mut events) = MonitorSession::new(SessionOptions::default())?;
    if let Err(err) = session.start(&config) {
        if let MonitorError::Launch { diagnostics, .. } = &err {
            if !diagnostics.is_empty() {
                eprintln!("{}", "Probe output:".red().bold());
                eprintln!("{}", diagnostics.dimmed());
            }
        }
        if err.is_user_correctable() {
            println!(
                "{}",
                "Check the stream URL and probe settings ('rtspmon config show')".yellow()
            );
        }
        return Err(anyhow::Error::new(err).context("Failed to start monitoring"));
    }

    println!("{}", "Press Ctrl+C to stop monitoring".dimmed());
    println!();

    let mut buffer = LogBuffer::new();
    let mut stop_requested = false;

    loop {
        if !stop_requested && stop_flag.load(Ordering::Relaxed) {
            println!();
            println!("{}", "Stopping probe...".yellow().bold());
            session.stop();
            stop_requested = true;
        }

        match events.try_recv() {
            Ok(MonitorEvent::RawLine(line)) => {
                if !quiet {
                    println!("{}", format_raw_line(&line));
                }
                buffer.push(line);
            }
            Ok(MonitorEvent::Snapshot(snapshot)) => {
                println!(
                    "{} {}",
                    format!("[{}]", format_elapsed(snapshot.elapsed_seconds)).dimmed(),
                    snapshot.status_line().cyan().bold()
                );
            }
            Ok(MonitorEvent::Diagnostic { message, .. }) => {
                eprintln!("{}", message.red());
            }
            Ok(MonitorEvent::StateChanged(state)) => {
                log::debug!("Session state: {}", format_state(state));
            }
            Ok(MonitorEvent::Stopped) => {
                println!("{}", "Monitoring stopped.".yellow());
                break;
            }
            Err(TryRecvError::Empty) => thread::sleep(POLL_INTERVAL),
            Err(TryRecvError::Disconnected) => break,
        }
    }

    session.stop();
    print_summary(&session, &config);

    if let Some(path) = save_log {
        buffer
            .save(path)
            .with_context(|| format!("Failed to save log to {}", path))?;
        println!("{} {}", "Log saved to".green(), path);
    }

    Ok(())
}

fn print_header(config: &MonitorConfig) {
    println!();
    println!("{}", "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━".cyan());
    println!("{}", "  RTSP Stream Monitor".cyan().bold());
    println!("{}", "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━".cyan());
    println!();
    println!("{} {}", "Stream:".cyan(), config.target_url);
    println!("{} {}", "CSV log:".cyan(), config.log_path.display());
    match &config.executable_path {
        Some(path) => println!("{} {}", "Probe:".cyan(), path.display()),
        None => println!("{} {}", "Probe:".cyan(), "ffmpeg (from PATH)".dimmed()),
    }
    if !config.extra_args.is_empty() {
        println!("{} {}", "Extra params:".cyan(), config.extra_args);
    }
    println!();
}

fn print_summary(session: &MonitorSession, config: &MonitorConfig) {
    let series = session.series();
    let aggregator = session.aggregator();

    println!();
    println!("{}", "Session summary".cyan().bold());

    if let Some(last) = series.last() {
        println!("  {} {}", "Duration:".cyan(), format_elapsed(last.elapsed_seconds));
        println!("  {} {:.2}", "Avg FPS:".cyan(), last.average_fps);
        println!("  {} {:.2}x", "Avg Speed:".cyan(), last.average_speed);
    }
    println!(
        "  {} {}",
        "Missed packets:".cyan(),
        aggregator.cumulative_missed_packets()
    );
    println!("  {} {}", "FPS samples:".cyan(), aggregator.fps_count());

    for metric in [
        SeriesMetric::AverageFps,
        SeriesMetric::AverageSpeed,
        SeriesMetric::MissedPackets,
    ] {
        println!(
            "  {} {}",
            format!("{} trend:", metric.label()).cyan(),
            format_trend(series.trend(metric))
        );
    }

    if session.state() != SessionState::Idle {
        log::warn!("Session still {} after stop", session.state().as_str());
    }
    println!(
        "  {} {}",
        "Rows appended to:".cyan(),
        config.log_path.display()
    );
}
