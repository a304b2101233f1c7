use crate::core::config::Settings;
use anyhow::{Context, Result};
use colored::Colorize;
use std::path::Path;

/// Setting kinds handled by `rtspmon config set-*`
enum SettingType {
    Ffmpeg,
    Output,
    Params,
}

impl SettingType {
    fn name(&self) -> &'static str {
        match self {
            SettingType::Ffmpeg => "FFmpeg path",
            SettingType::Output => "Output CSV",
            SettingType::Params => "FFmpeg params",
        }
    }

    fn apply(&self, settings: &mut Settings, value: String) {
        match self {
            SettingType::Ffmpeg => settings.set_ffmpeg_path(value),
            SettingType::Output => settings.set_output_csv(value),
            SettingType::Params => settings.set_ffmpeg_params(value),
        }
    }
}

pub fn execute(matches: &clap::ArgMatches) -> Result<()> {
    match matches.subcommand() {
        Some(("show", _)) => show(),
        Some(("set-ffmpeg", sub)) => set(sub, "path", SettingType::Ffmpeg),
        Some(("set-output", sub)) => set(sub, "path", SettingType::Output),
        Some(("set-params", sub)) => set(sub, "params", SettingType::Params),
        Some(("reset", _)) => reset(),
        _ => {
            println!("Use 'rtspmon config --help' for more information.");
            Ok(())
        }
    }
}

fn show() -> Result<()> {
    let settings = Settings::load()?;
    let unset = || "(not set)".dimmed().to_string();

    println!("{}", "Saved settings".cyan().bold());
    println!(
        "  {} {}",
        "FFmpeg path:".cyan(),
        settings.get_ffmpeg_path().cloned().unwrap_or_else(unset)
    );
    println!(
        "  {} {}",
        "Output CSV:".cyan(),
        settings.get_output_csv().cloned().unwrap_or_else(unset)
    );
    println!(
        "  {} {}",
        "FFmpeg params:".cyan(),
        settings.get_ffmpeg_params().cloned().unwrap_or_else(unset)
    );
    println!(
        "  {} {}",
        "Stored in:".dimmed(),
        Settings::get_config_path()?.display().to_string().dimmed()
    );
    Ok(())
}

fn set(matches: &clap::ArgMatches, arg: &str, kind: SettingType) -> Result<()> {
    let value = matches
        .get_one::<String>(arg)
        .with_context(|| format!("{} value is required", kind.name()))?
        .clone();

    match kind {
        SettingType::Ffmpeg if !Path::new(&value).is_file() => {
            println!(
                "{}",
                format!("⚠️  Warning: '{}' is not an existing file", value).yellow()
            );
        }
        SettingType::Params if shlex::split(&value).is_none() => {
            return Err(anyhow::anyhow!(
                "Could not parse params (unbalanced quotes?): {}",
                value
            ));
        }
        _ => {}
    }

    let mut settings = Settings::load()?;
    kind.apply(&mut settings, value.clone());
    settings.save()?;

    println!("{} {} = {}", "✓".green(), kind.name(), value);
    Ok(())
}

fn reset() -> Result<()> {
    Settings::default().save()?;
    println!("{}", "✓ Settings reset to defaults".green());
    Ok(())
}
