//! Call-scribe Core Library
//!
//! Recording-session lifecycle for a microphone-to-transcript pipeline built
//! on CPAL, Rubato, Hound, and Whisper. Each start/stop cycle produces a
//! timestamped session folder holding a 16 kHz mono WAV file and, when
//! transcription succeeds, a plain-text transcript.
//!
//! # Example
//!
//! ```no_run
//! use call_scribe_core::{AudioCapturer, CoreResult, LazyEngine, SessionManager};
//!
//! use std::{path::PathBuf, thread::sleep, time::Duration};
//!
//! fn main() -> CoreResult<()> {
//!     let capture = AudioCapturer::new(None);
//!     let engine = LazyEngine::new(PathBuf::from("models/ggml-base.bin"), true);
//!     let mut manager =
//!         SessionManager::new(Box::new(capture), Box::new(engine), PathBuf::from("audio"), "pt")?;
//!
//!     manager.start_recording()?;
//!     sleep(Duration::from_secs(3));
//!     let finished = manager.stop_recording()?;
//!     let transcript = manager.transcribe_to_file(&finished)?;
//!
//!     println!("Transcribed: {}", transcript);
//!     Ok(())
//! }
//! ```

mod audio;
mod error;
pub mod language;
mod session;

pub use {
    audio::{AudioCapturer, CaptureSource, CapturedAudio, LazyEngine, SttEngine, Transcriber},
    error::{AudioError, Result as CoreResult},
    session::{FinishedSession, SessionManager, SessionPaths, SessionState},
};

#[cfg(test)]
mod tests;
