use anyhow::Result;
use clap::{Arg, Command};

use rtspmon::commands;

fn main() -> Result<()> {
    rtspmon::init_logging();

    let matches = Command::new("rtspmon")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Monitor an RTSP stream through ffmpeg and log its health")
        .disable_version_flag(true)
        .arg(
            Arg::new("version")
                .short('v')
                .short_alias('V')
                .long("version")
                .help("Print version information")
                .action(clap::ArgAction::SetTrue)
        )
        .subcommand(
            Command::new("watch")
                .about("Monitor a stream until it ends or Ctrl+C is pressed")
                .arg(
                    Arg::new("url")
                        .help("Stream URL passed to the probe with -i")
                        .required(true)
                        .index(1)
                )
                .arg(
                    Arg::new("ffmpeg")
                        .short('e')
                        .long("ffmpeg")
                        .value_name("PATH")
                        .help("Path to the ffmpeg executable (defaults to ffmpeg on PATH)")
                )
                .arg(
                    Arg::new("output")
                        .short('o')
                        .long("output")
                        .value_name("CSV")
                        .help("CSV log to append to (default: stream_log.csv)")
                )
                .arg(
                    Arg::new("params")
                        .short('p')
                        .long("params")
                        .value_name("PARAMS")
                        .allow_hyphen_values(true)
                        .help("Additional ffmpeg parameters, shell-quoted (e.g. \"-rtsp_transport tcp\")")
                )
                .arg(
                    Arg::new("save-log")
                        .long("save-log")
                        .value_name("FILE")
                        .help("Save the received probe lines to a text file when monitoring ends")
                )
                .arg(
                    Arg::new("quiet")
                        .short('q')
                        .long("quiet")
                        .help("Only print periodic statistics, not every probe line")
                        .action(clap::ArgAction::SetTrue)
                )
        )
        .subcommand(
            Command::new("report")
                .about("Summarize a CSV log written by 'rtspmon watch'")
                .arg(
                    Arg::new("log")
                        .help("Path to the CSV log")
                        .required(true)
                        .index(1)
                )
        )
        .subcommand(
            Command::new("config")
                .about("Manage saved defaults (use 'rtspmon config --help' for subcommands)")
                .subcommand_required(true)
                .arg_required_else_help(true)
                .subcommand(
                    Command::new("show")
                        .about("Show saved settings")
                )
                .subcommand(
                    Command::new("set-ffmpeg")
                        .about("Set the default ffmpeg executable")
                        .arg(
                            Arg::new("path")
                                .help("Path to ffmpeg")
                                .required(true)
                                .index(1)
                        )
                )
                .subcommand(
                    Command::new("set-output")
                        .about("Set the default CSV log path")
                        .arg(
                            Arg::new("path")
                                .help("Path to the CSV log")
                                .required(true)
                                .index(1)
                        )
                )
                .subcommand(
                    Command::new("set-params")
                        .about("Set default additional ffmpeg parameters")
                        .arg(
                            Arg::new("params")
                                .help("Shell-quoted parameters")
                                .required(true)
                                .allow_hyphen_values(true)
                                .index(1)
                        )
                )
                .subcommand(
                    Command::new("reset")
                        .about("Forget all saved settings")
                )
        )
        .subcommand(
            Command::new("version")
                .about("Shows version information")
        )
        .get_matches();

    if matches.get_flag("version") {
        return commands::version();
    }

    match matches.subcommand() {
        Some(("watch", sub_matches)) => commands::watch(sub_matches)?,
        Some(("report", sub_matches)) => commands::report(sub_matches)?,
        Some(("config", sub_matches)) => commands::config::execute(sub_matches)?,
        Some(("version", _)) => commands::version()?,
        _ => {
            println!("Welcome to rtspmon!");
            println!("Use 'rtspmon --help' for more information.");
        }
    }

    Ok(())
}
