use crate::config::{default_language, default_output_dir};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Recording session configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordingConfig {
    /// Root folder that per-session folders are created under.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Default transcription language code (changeable at runtime).
    #[serde(default = "default_language")]
    pub language: String,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            language: default_language(),
        }
    }
}
