mod audio_config;
#[allow(clippy::module_inception)]
mod config;
mod recording_config;
mod whisper_config;

pub(crate) use {
    audio_config::AudioConfig, config::Config, recording_config::RecordingConfig,
    whisper_config::WhisperConfig,
};

use std::path::PathBuf;

pub(crate) const DEFAULT_OUTPUT_DIR: &str = "audio";
pub(crate) const DEFAULT_USE_GPU: bool = true;

pub(crate) fn default_use_gpu() -> bool {
    DEFAULT_USE_GPU
}

pub(crate) fn default_output_dir() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT_DIR)
}

pub(crate) fn default_language() -> String {
    call_scribe_core::language::DEFAULT_LANGUAGE.to_string()
}
