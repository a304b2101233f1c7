use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::monitor::{MonitorConfig, DEFAULT_LOG_PATH};

/// User defaults for `rtspmon watch`, persisted between runs
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub ffmpeg_path: Option<String>,
    #[serde(default)]
    pub output_csv: Option<String>,
    #[serde(default)]
    pub ffmpeg_params: Option<String>,
}

/// Per-invocation values that take precedence over saved settings
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub ffmpeg_path: Option<String>,
    pub output_csv: Option<String>,
    pub ffmpeg_params: Option<String>,
}

impl Settings {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Settings::default());
        }

        let data = fs::read(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        if data.is_empty() {
            return Ok(Settings::default());
        }

        // A config written by an incompatible version falls back to defaults
        Ok(serde_json::from_slice(&data).unwrap_or_else(|e| {
            log::warn!("Ignoring unreadable config {:?}: {}", path, e);
            Settings::default()
        }))
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let data = serde_json::to_vec_pretty(self).context("Failed to serialize config")?;

        fs::write(path, data)
            .with_context(|| format!("Failed to write config file: {:?}", path))?;

        Ok(())
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir =
            dirs::config_dir().with_context(|| "Could not determine config directory")?;

        Ok(config_dir.join("rtspmon").join("config.json"))
    }

    pub fn set_ffmpeg_path(&mut self, path: String) {
        self.ffmpeg_path = Some(path);
    }

    pub fn get_ffmpeg_path(&self) -> Option<&String> {
        self.ffmpeg_path.as_ref()
    }

    pub fn set_output_csv(&mut self, path: String) {
        self.output_csv = Some(path);
    }

    pub fn get_output_csv(&self) -> Option<&String> {
        self.output_csv.as_ref()
    }

    pub fn set_ffmpeg_params(&mut self, params: String) {
        self.ffmpeg_params = Some(params);
    }

    pub fn get_ffmpeg_params(&self) -> Option<&String> {
        self.ffmpeg_params.as_ref()
    }

    /// Session config for `url`: overrides first, then saved settings, then
    /// built-in defaults. Blank values count as unset.
    pub fn monitor_config(&self, url: &str, overrides: &Overrides) -> MonitorConfig {
        fn pick(first: &Option<String>, second: &Option<String>) -> Option<String> {
            first
                .iter()
                .chain(second.iter())
                .map(|s| s.trim())
                .find(|s| !s.is_empty())
                .map(str::to_string)
        }

        let mut config = MonitorConfig::new(url.trim()).with_log_path(
            pick(&overrides.output_csv, &self.output_csv)
                .unwrap_or_else(|| DEFAULT_LOG_PATH.to_string()),
        );

        if let Some(path) = pick(&overrides.ffmpeg_path, &self.ffmpeg_path) {
            config = config.with_executable(path);
        }
        if let Some(params) = pick(&overrides.ffmpeg_params, &self.ffmpeg_params) {
            config = config.with_extra_args(params);
        }

        config
    }
}
