//! Configuration management for call-scribe.
//!
//! Handles loading and saving TOML configuration files with cross-platform
//! paths, lazy validation, and atomic write operations.

use crate::{
    AppError, AppResult,
    config::{AudioConfig, RecordingConfig, WhisperConfig},
};

use std::{
    fs,
    io::Write,
    panic::Location,
    path::{Path, PathBuf},
};

use error_location::ErrorLocation;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

/// Main configuration struct.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Whisper model configuration.
    pub whisper: WhisperConfig,
    /// Audio device configuration.
    #[serde(default)]
    pub audio: AudioConfig,
    /// Recording session configuration.
    #[serde(default)]
    pub recording: RecordingConfig,
}

impl Config {
    /// Load configuration, creating a default file if none exists.
    ///
    /// An explicit `override_path` (the optional positional CLI argument)
    /// must point at an existing file; the default location is created with
    /// defaults on first run.
    ///
    /// Note: this does NOT check that the model file exists. That is
    /// validated separately at startup so the error message can say what to
    /// download and where.
    #[track_caller]
    #[instrument]
    pub fn load(override_path: Option<&Path>) -> AppResult<Self> {
        let config_path = match override_path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        if config_path.exists() {
            let contents = fs::read_to_string(&config_path).map_err(|e| AppError::ConfigError {
                reason: format!("Failed to read config: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

            let config: Config = toml::from_str(&contents).map_err(|e| AppError::ConfigError {
                reason: format!("Failed to parse config: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

            info!(config_path = ?config_path, "Configuration loaded");

            Ok(config)
        } else if override_path.is_some() {
            Err(AppError::ConfigError {
                reason: format!("Config file not found: {:?}", config_path),
                location: ErrorLocation::from(Location::caller()),
            })
        } else {
            info!("No config found, creating default");
            Self::create_default()
        }
    }

    /// Save configuration to the default location using atomic write pattern.
    ///
    /// Writes to a temporary file first, then renames to prevent corruption
    /// if the process crashes during the write.
    #[track_caller]
    #[instrument]
    pub fn save(&self) -> AppResult<()> {
        let config_path = Self::config_path()?;

        let contents = toml::to_string_pretty(self).map_err(|e| AppError::ConfigError {
            reason: format!("Failed to serialize config: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        // Atomic write: write to temp file then rename
        let temp_path = config_path.with_extension("toml.tmp");

        let mut temp_file = fs::File::create(&temp_path).map_err(|e| AppError::ConfigError {
            reason: format!("Failed to create temp config file: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        temp_file
            .write_all(contents.as_bytes())
            .map_err(|e| AppError::ConfigError {
                reason: format!("Failed to write temp config file: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        temp_file.sync_all().map_err(|e| AppError::ConfigError {
            reason: format!("Failed to sync temp config file: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        fs::rename(&temp_path, &config_path).map_err(|e| AppError::ConfigError {
            reason: format!("Failed to rename temp config to final: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        info!(config_path = ?config_path, "Configuration saved (atomic write)");

        Ok(())
    }

    #[track_caller]
    fn config_path() -> AppResult<PathBuf> {
        let proj_dirs =
            directories::ProjectDirs::from("com", "call-scribe", "Call-Scribe").ok_or_else(
                || AppError::ConfigError {
                    reason: "Failed to get config directory".to_string(),
                    location: ErrorLocation::from(Location::caller()),
                },
            )?;

        let config_dir = proj_dirs.config_dir();

        if !config_dir.exists() {
            fs::create_dir_all(config_dir)?;
            debug!(config_dir = ?config_dir, "Created config directory");
        }

        Ok(config_dir.join("config.toml"))
    }

    #[track_caller]
    fn create_default() -> AppResult<Self> {
        let proj_dirs =
            directories::ProjectDirs::from("com", "call-scribe", "Call-Scribe").ok_or_else(
                || AppError::ConfigError {
                    reason: "Failed to get project directories".to_string(),
                    location: ErrorLocation::from(Location::caller()),
                },
            )?;

        let data_dir = proj_dirs.data_dir();
        let model_path = data_dir.join("models").join("ggml-base.bin");

        let config = Config {
            whisper: WhisperConfig {
                model_path: model_path.clone(),
                use_gpu: crate::config::DEFAULT_USE_GPU,
            },
            audio: AudioConfig::default(),
            recording: RecordingConfig::default(),
        };

        config.save()?;

        warn!(
            model_path = ?model_path,
            "Default config created. Whisper model must be downloaded before recording."
        );

        Ok(config)
    }
}
