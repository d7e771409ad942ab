use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::state::SessionState;

/// File names inside the scratch directory are fixed; only the directory
/// itself is configurable.
const RECORDING_FILE_NAME: &str = "recording.wav";
const PID_FILE_NAME: &str = "recording_pid";

#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    #[serde(default = "default_marker_path")]
    pub marker_path: PathBuf,

    #[serde(default = "default_control_path")]
    pub control_path: PathBuf,

    #[serde(default = "default_scratch_dir")]
    pub scratch_dir: PathBuf,

    #[serde(default = "default_capture_program")]
    pub capture_program: String,

    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    #[serde(default = "default_channels")]
    pub channels: u16,

    #[serde(default = "default_notifications")]
    pub notifications: bool,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_marker_path() -> PathBuf {
    PathBuf::from("/tmp/whisper_recording")
}

fn default_control_path() -> PathBuf {
    PathBuf::from("/tmp/whisper_control")
}

fn default_scratch_dir() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join("dev/s2t/tmp")
}

fn default_capture_program() -> String {
    "rec".to_string()
}

fn default_sample_rate() -> u32 {
    44100
}

fn default_channels() -> u16 {
    2
}

fn default_notifications() -> bool {
    true
}

fn default_poll_interval_ms() -> u64 {
    100
}

impl Default for Config {
    fn default() -> Self {
        Self {
            marker_path: default_marker_path(),
            control_path: default_control_path(),
            scratch_dir: default_scratch_dir(),
            capture_program: default_capture_program(),
            sample_rate: default_sample_rate(),
            channels: default_channels(),
            notifications: default_notifications(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl Config {
    /// Load configuration from the default location (~/.config/s2t/config.json)
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            tracing::info!(
                "Config file not found at {:?}, creating default config",
                config_path
            );
            let config = Self::default();
            config.save()?;
            return Ok(config);
        }

        let contents = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

        let config: Self = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {:?}", config_path))?;

        tracing::info!("Loaded config from {:?}", config_path);
        Ok(config)
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        // Create parent directory if it doesn't exist
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let contents = serde_json::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(&config_path, contents)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;

        tracing::info!("Saved config to {:?}", config_path);
        Ok(())
    }

    /// Get the path to the configuration file
    fn config_path() -> Result<PathBuf> {
        let config_dir = if let Ok(dir) = std::env::var("XDG_CONFIG_HOME") {
            PathBuf::from(dir)
        } else {
            let home = std::env::var("HOME").context("HOME environment variable not set")?;
            PathBuf::from(home).join(".config")
        };

        Ok(config_dir.join("s2t").join("config.json"))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.capture_program.is_empty() {
            return Err(anyhow::anyhow!("capture_program cannot be empty"));
        }

        if self.sample_rate == 0 {
            return Err(anyhow::anyhow!("sample_rate must be nonzero"));
        }

        if self.channels == 0 {
            return Err(anyhow::anyhow!("channels must be nonzero"));
        }

        if self.poll_interval_ms == 0 {
            return Err(anyhow::anyhow!("poll_interval_ms must be nonzero"));
        }

        Ok(())
    }

    pub fn recording_path(&self) -> PathBuf {
        self.scratch_dir.join(RECORDING_FILE_NAME)
    }

    pub fn pid_path(&self) -> PathBuf {
        self.scratch_dir.join(PID_FILE_NAME)
    }

    pub fn session_state(&self) -> SessionState {
        SessionState::new(self.marker_path.clone(), self.control_path.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let config = Config::default();

        config.validate().unwrap();
        assert_eq!(config.marker_path, PathBuf::from("/tmp/whisper_recording"));
        assert_eq!(config.control_path, PathBuf::from("/tmp/whisper_control"));
        assert!(config.recording_path().ends_with("recording.wav"));
        assert!(config.pid_path().ends_with("recording_pid"));
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut config = Config::default();
        config.capture_program = String::new();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.sample_rate = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.channels = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();

        assert_eq!(config.sample_rate, 44100);
        assert_eq!(config.channels, 2);
        assert_eq!(config.capture_program, "rec");
        assert!(config.notifications);
    }
}
