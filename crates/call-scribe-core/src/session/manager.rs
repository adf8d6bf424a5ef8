use crate::{
    AudioError, CoreResult,
    audio::{CaptureSource, CapturedAudio, Resampler, Transcriber, resampler},
    language,
    session::{SessionPaths, wav},
};

use std::{
    fs,
    panic::Location,
    path::PathBuf,
    time::{Duration, Instant},
};

use chrono::{Local, NaiveDateTime};
use error_location::ErrorLocation;
use tracing::{debug, info, instrument, warn};

/// Lifecycle state of the single allowed recording session.
#[derive(Debug)]
pub enum SessionState {
    /// No session in progress.
    Idle,
    /// Audio is being captured in the background.
    Recording {
        /// File layout computed when the session started.
        paths: SessionPaths,
        /// When capture began, for duration logging.
        started_at: Instant,
    },
}

/// A session whose audio has been flushed to disk and which is ready for
/// transcription.
///
/// Holding the 16 kHz samples here lets transcription run (and fail)
/// without re-reading the WAV file; the file on disk is already complete.
pub struct FinishedSession {
    /// File layout of the finished session.
    pub paths: SessionPaths,
    /// 16 kHz mono samples exactly as written to the WAV file.
    pub samples: Vec<f32>,
    /// Wall time spent recording.
    pub duration: Duration,
}

/// Owns the recording lifecycle: one session at a time, timestamped folder
/// per session, WAV always written before transcription is attempted.
///
/// Collaborators come in behind [`CaptureSource`] and [`Transcriber`] so the
/// lifecycle can be exercised without a microphone or a model.
pub struct SessionManager {
    capture: Box<dyn CaptureSource>,
    engine: Box<dyn Transcriber>,
    output_root: PathBuf,
    language: String,
    state: SessionState,
}

impl SessionManager {
    /// Create a manager writing sessions under `output_root`.
    ///
    /// # Errors
    ///
    /// Returns [`AudioError::UnsupportedLanguage`] if `language` is not a
    /// recognized code.
    #[track_caller]
    pub fn new(
        capture: Box<dyn CaptureSource>,
        engine: Box<dyn Transcriber>,
        output_root: PathBuf,
        language: &str,
    ) -> CoreResult<Self> {
        if !language::is_supported(language) {
            return Err(AudioError::UnsupportedLanguage {
                code: language.to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        info!(output_root = ?output_root, language = language, "SessionManager initialized");

        Ok(Self {
            capture,
            engine,
            output_root,
            language: language.to_string(),
            state: SessionState::Idle,
        })
    }

    /// Whether a session is currently recording.
    pub fn is_recording(&self) -> bool {
        matches!(self.state, SessionState::Recording { .. })
    }

    /// The language code future transcriptions will use.
    pub fn language(&self) -> &str {
        &self.language
    }

    /// Switch the transcription language for future sessions.
    ///
    /// # Errors
    ///
    /// Returns [`AudioError::UnsupportedLanguage`] for unknown codes; the
    /// current language is left unchanged.
    #[track_caller]
    #[instrument(skip(self))]
    pub fn set_language(&mut self, code: &str) -> CoreResult<()> {
        if !language::is_supported(code) {
            return Err(AudioError::UnsupportedLanguage {
                code: code.to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        self.language = code.to_string();
        info!(language = code, "Transcription language changed");

        Ok(())
    }

    /// Start a new recording session timestamped with the current wall clock.
    ///
    /// # Errors
    ///
    /// Returns [`AudioError::AlreadyRecording`] if a session is in progress,
    /// [`AudioError::StorageError`] if the session folder cannot be created,
    /// or a device error if the microphone cannot be opened. On device
    /// failure the just-created folder is removed and state stays Idle.
    #[track_caller]
    pub fn start_recording(&mut self) -> CoreResult<SessionPaths> {
        self.start_recording_at(Local::now().naive_local())
    }

    #[track_caller]
    #[instrument(skip(self))]
    pub(crate) fn start_recording_at(&mut self, at: NaiveDateTime) -> CoreResult<SessionPaths> {
        if self.is_recording() {
            return Err(AudioError::AlreadyRecording {
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let paths = SessionPaths::new(&self.output_root, at);

        fs::create_dir_all(&paths.folder).map_err(|e| AudioError::StorageError {
            path: paths.folder.clone(),
            source: e,
            location: ErrorLocation::from(Location::caller()),
        })?;

        if let Err(e) = self.capture.start() {
            // No frames were captured; don't leave an empty folder behind.
            remove_session_folder(&paths);
            return Err(e);
        }

        info!(
            folder = ?paths.folder,
            timestamp = %paths.timestamp,
            "Recording session started"
        );

        self.state = SessionState::Recording {
            paths: paths.clone(),
            started_at: Instant::now(),
        };

        Ok(paths)
    }

    /// Stop the current session: halt capture, drain the buffered frames,
    /// resample to 16 kHz, and write the WAV file.
    ///
    /// The WAV is written before any transcription is attempted, so the
    /// recording survives engine failures.
    ///
    /// # Errors
    ///
    /// Returns [`AudioError::NotRecording`] when Idle (no files are touched)
    /// and [`AudioError::NoAudioCaptured`] when the buffer came back empty.
    /// On any error path where no audio file reached disk the session folder
    /// is removed.
    #[track_caller]
    #[instrument(skip(self))]
    pub fn stop_recording(&mut self) -> CoreResult<FinishedSession> {
        let (paths, started_at) = match std::mem::replace(&mut self.state, SessionState::Idle) {
            SessionState::Idle => {
                return Err(AudioError::NotRecording {
                    location: ErrorLocation::from(Location::caller()),
                });
            }
            SessionState::Recording { paths, started_at } => (paths, started_at),
        };

        let captured = match self.capture.stop() {
            Ok(c) => c,
            Err(e) => {
                remove_session_folder(&paths);
                return Err(e);
            }
        };

        if captured.samples.is_empty() {
            remove_session_folder(&paths);
            return Err(AudioError::NoAudioCaptured {
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let samples = match resample_for_engine(captured) {
            Ok(samples) => samples,
            Err(e) => {
                remove_session_folder(&paths);
                return Err(e);
            }
        };

        if let Err(e) = wav::write_wav(&paths.audio_file, &samples, resampler::TARGET_SAMPLE_RATE) {
            remove_session_folder(&paths);
            return Err(e);
        }

        let duration = started_at.elapsed();

        info!(
            audio_file = ?paths.audio_file,
            sample_count = samples.len(),
            duration_ms = duration.as_millis(),
            "Recording session stopped, audio saved"
        );

        Ok(FinishedSession {
            paths,
            samples,
            duration,
        })
    }

    /// Transcribe a finished session's samples with the current language.
    ///
    /// **WARNING**: CPU-intensive; blocks for seconds to minutes depending
    /// on model size and recording length. Callers that must stay responsive
    /// run this on a blocking thread and decide afterwards whether to write
    /// the transcript.
    #[track_caller]
    #[instrument(skip(self, session))]
    pub fn transcribe(&mut self, session: &FinishedSession) -> CoreResult<String> {
        let start = Instant::now();
        let text = self.engine.transcribe(&session.samples, &self.language)?;

        info!(
            duration_ms = start.elapsed().as_millis(),
            text_len = text.len(),
            language = %self.language,
            "Transcription complete"
        );

        Ok(text)
    }

    /// Write a session's transcript next to its audio file.
    #[track_caller]
    pub fn write_transcript(&self, session: &FinishedSession, text: &str) -> CoreResult<()> {
        fs::write(&session.paths.transcript_file, text).map_err(|e| {
            AudioError::StorageError {
                path: session.paths.transcript_file.clone(),
                source: e,
                location: ErrorLocation::from(Location::caller()),
            }
        })?;

        info!(
            transcript_file = ?session.paths.transcript_file,
            "Transcript saved"
        );

        Ok(())
    }

    /// Transcribe a finished session and write the transcript file.
    ///
    /// On engine failure no transcript file is written (not even an empty
    /// marker); the WAV file is retained either way.
    #[track_caller]
    pub fn transcribe_to_file(&mut self, session: &FinishedSession) -> CoreResult<String> {
        let text = self.transcribe(session)?;
        self.write_transcript(session, &text)?;
        Ok(text)
    }
}

/// Resample captured audio to the engine's 16 kHz, or pass it through when
/// the device already delivers that rate.
fn resample_for_engine(captured: CapturedAudio) -> CoreResult<Vec<f32>> {
    if captured.sample_rate == resampler::TARGET_SAMPLE_RATE {
        return Ok(captured.samples);
    }

    let mut resampler = Resampler::new(captured.sample_rate)?;
    let resampled = resampler.resample(&captured.samples)?;

    debug!(
        original_len = captured.samples.len(),
        resampled_len = resampled.len(),
        input_rate = captured.sample_rate,
        "Audio resampled"
    );

    Ok(resampled)
}

/// Best-effort cleanup of a session folder that ended up with no audio.
fn remove_session_folder(paths: &SessionPaths) {
    if let Err(e) = fs::remove_dir(&paths.folder) {
        warn!(folder = ?paths.folder, error = %e, "Failed to remove empty session folder");
    }
}
