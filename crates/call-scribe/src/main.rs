//! Call-Scribe: record microphone audio and transcribe it with a local
//! Whisper model, one timestamped session folder per recording.

mod app;
mod app_command;
mod config;
mod error;

pub(crate) use {
    app::App,
    app_command::AppCommand,
    error::{AppError, Result as AppResult},
};

use crate::config::Config;

use std::path::PathBuf;

use call_scribe_core::{AudioCapturer, LazyEngine, SessionManager};
use tracing::error;

/// Application entry point.
fn main() {
    tracing_subscriber::fmt()
        .with_env_filter("call_scribe=info")
        .init();

    // Optional positional argument: path to an alternate config file.
    let config_override = std::env::args().nth(1).map(PathBuf::from);

    let config = match Config::load(config_override.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to load config: {:?}", e);
            std::process::exit(1);
        }
    };

    // Model weights load lazily on the first transcription, but a missing
    // file is fatal now: without a model no transcription can ever succeed.
    let engine = LazyEngine::new(config.whisper.model_path.clone(), config.whisper.use_gpu);
    if let Err(e) = engine.validate_model_path() {
        error!("Model validation failed: {:?}", e);
        std::process::exit(1);
    }

    let capture = AudioCapturer::new(config.audio.selected_device.clone());

    let manager = match SessionManager::new(
        Box::new(capture),
        Box::new(engine),
        config.recording.output_dir.clone(),
        &config.recording.language,
    ) {
        Ok(m) => m,
        Err(e) => {
            error!("Failed to create SessionManager: {:?}", e);
            std::process::exit(1);
        }
    };

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            error!("Failed to create tokio runtime: {:?}", e);
            std::process::exit(1);
        }
    };

    // The root future is never spawned, so the !Send capture stream can stay
    // inside the session manager for the whole loop.
    if let Err(e) = rt.block_on(App::new(manager).run()) {
        error!(error = ?e, "Fatal error");
        std::process::exit(1);
    }
}
