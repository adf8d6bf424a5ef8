use crate::{
    AudioError, CoreResult,
    audio::{CaptureSource, CapturedAudio, Transcriber},
    session::SessionManager,
};

use std::{
    panic::Location,
    path::PathBuf,
    sync::{Arc, Mutex},
};

use chrono::{NaiveDate, NaiveDateTime};
use error_location::ErrorLocation;
use tempfile::TempDir;

/// Capture stub that hands back pre-scripted chunks, concatenated in order.
struct ScriptedCapture {
    chunks: Vec<Vec<f32>>,
    sample_rate: u32,
    fail_start: bool,
    started: bool,
}

impl ScriptedCapture {
    fn with_chunks(chunks: Vec<Vec<f32>>) -> Self {
        Self {
            chunks,
            // 16 kHz keeps the resampler out of the way so the WAV holds the
            // scripted chunks verbatim.
            sample_rate: 16000,
            fail_start: false,
            started: false,
        }
    }

    fn failing() -> Self {
        Self {
            chunks: Vec::new(),
            sample_rate: 16000,
            fail_start: true,
            started: false,
        }
    }
}

impl CaptureSource for ScriptedCapture {
    #[track_caller]
    fn start(&mut self) -> CoreResult<()> {
        if self.fail_start {
            return Err(AudioError::NoMicrophoneFound {
                location: ErrorLocation::from(Location::caller()),
            });
        }
        self.started = true;
        Ok(())
    }

    fn stop(&mut self) -> CoreResult<CapturedAudio> {
        self.started = false;
        Ok(CapturedAudio {
            samples: self.chunks.concat(),
            sample_rate: self.sample_rate,
        })
    }
}

/// Transcriber stub that records the language it was called with.
struct StubEngine {
    reply: Option<String>,
    last_language: Arc<Mutex<Option<String>>>,
}

impl StubEngine {
    fn replying(text: &str) -> (Self, Arc<Mutex<Option<String>>>) {
        let last_language = Arc::new(Mutex::new(None));
        (
            Self {
                reply: Some(text.to_string()),
                last_language: Arc::clone(&last_language),
            },
            last_language,
        )
    }

    fn failing() -> Self {
        Self {
            reply: None,
            last_language: Arc::new(Mutex::new(None)),
        }
    }
}

impl Transcriber for StubEngine {
    #[track_caller]
    fn transcribe(&mut self, _samples: &[f32], language: &str) -> CoreResult<String> {
        *self
            .last_language
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = Some(language.to_string());

        match &self.reply {
            Some(text) => Ok(text.clone()),
            None => Err(AudioError::TranscriptionFailed {
                source: "stubbed engine failure".into(),
                location: ErrorLocation::from(Location::caller()),
            }),
        }
    }
}

#[allow(clippy::unwrap_used)]
fn sample_time() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 11, 3)
        .unwrap()
        .and_hms_opt(14, 31, 48)
        .unwrap()
}

#[allow(clippy::unwrap_used)]
fn manager_with(
    capture: ScriptedCapture,
    engine: StubEngine,
    root: PathBuf,
) -> SessionManager {
    SessionManager::new(Box::new(capture), Box::new(engine), root, "pt").unwrap()
}

/// WHAT: A full start/stop cycle produces the documented folder and files
/// WHY: This is the end-to-end recording contract the tool exists for
#[test]
#[allow(clippy::unwrap_used)]
fn given_three_chunks_when_recording_session_completes_then_files_exact() {
    // Given: A manager whose capture yields three distinct chunks
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("audio");
    let chunks = vec![vec![0.1f32; 4], vec![0.2f32; 4], vec![0.3f32; 4]];
    let (engine, _lang) = StubEngine::replying("hello world");
    let mut manager = manager_with(ScriptedCapture::with_chunks(chunks.clone()), engine, root.clone());

    // When: Starting at a fixed timestamp, stopping, then transcribing
    manager.start_recording_at(sample_time()).unwrap();
    let finished = manager.stop_recording().unwrap();
    let text = manager.transcribe_to_file(&finished).unwrap();

    // Then: Folder and files carry the session timestamp
    let folder = root.join("call_20251103_143148");
    assert!(folder.is_dir());
    let wav_path = folder.join("call_recording_20251103_143148.wav");
    let txt_path = folder.join("call_transcript_20251103_143148.txt");
    assert!(wav_path.is_file());
    assert!(txt_path.is_file());

    // Then: The WAV holds exactly the three chunks concatenated in order
    let read: Vec<i16> = hound::WavReader::open(&wav_path)
        .unwrap()
        .into_samples::<i16>()
        .map(|s| s.unwrap())
        .collect();
    let expected: Vec<i16> = chunks
        .concat()
        .iter()
        .map(|&s: &f32| (s.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16)
        .collect();
    assert_eq!(read, expected);

    // Then: The transcript is the engine's verbatim output, no framing
    assert_eq!(text, "hello world");
    assert_eq!(std::fs::read_to_string(&txt_path).unwrap(), "hello world");
    assert!(!manager.is_recording());
}

/// WHAT: stop while Idle is a rejected no-op
/// WHY: Typing stop twice must not crash or touch the filesystem or language
#[test]
#[allow(clippy::unwrap_used)]
fn given_idle_manager_when_stopping_then_not_recording_error_and_no_files() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("audio");
    let (engine, _lang) = StubEngine::replying("unused");
    let mut manager = manager_with(ScriptedCapture::with_chunks(vec![]), engine, root.clone());

    let result = manager.stop_recording();

    assert!(matches!(result, Err(AudioError::NotRecording { .. })));
    assert!(!root.exists());
    assert_eq!(manager.language(), "pt");
}

/// WHAT: start while Recording is rejected without disturbing the session
/// WHY: Exactly one session may record at a time
#[test]
#[allow(clippy::unwrap_used)]
fn given_recording_manager_when_starting_again_then_already_recording_error() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("audio");
    let (engine, _lang) = StubEngine::replying("unused");
    let chunks = vec![vec![0.5f32; 8]];
    let mut manager = manager_with(ScriptedCapture::with_chunks(chunks), engine, root);

    manager.start_recording_at(sample_time()).unwrap();
    let second = manager.start_recording_at(sample_time());

    // Then: Second start rejected; the original session still stops cleanly
    assert!(matches!(second, Err(AudioError::AlreadyRecording { .. })));
    let finished = manager.stop_recording().unwrap();
    assert_eq!(finished.samples.len(), 8);
}

/// WHAT: Capture failure on start leaves no folder behind
/// WHY: A failed start must leave the state Idle and the disk clean
#[test]
#[allow(clippy::unwrap_used)]
fn given_unavailable_device_when_starting_then_idle_and_folder_removed() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("audio");
    let (engine, _lang) = StubEngine::replying("unused");
    let mut manager = manager_with(ScriptedCapture::failing(), engine, root.clone());

    let result = manager.start_recording_at(sample_time());

    assert!(matches!(result, Err(AudioError::NoMicrophoneFound { .. })));
    assert!(!manager.is_recording());
    assert!(!root.join("call_20251103_143148").exists());
}

/// WHAT: An empty capture buffer writes nothing and removes the folder
/// WHY: stop only succeeds with a non-empty buffer
#[test]
#[allow(clippy::unwrap_used)]
fn given_empty_buffer_when_stopping_then_no_audio_captured_and_no_folder() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("audio");
    let (engine, _lang) = StubEngine::replying("unused");
    let mut manager = manager_with(ScriptedCapture::with_chunks(vec![]), engine, root.clone());

    manager.start_recording_at(sample_time()).unwrap();
    let result = manager.stop_recording();

    assert!(matches!(result, Err(AudioError::NoAudioCaptured { .. })));
    assert!(!root.join("call_20251103_143148").exists());
}

/// WHAT: A WAV write failure surfaces StorageError and leaves no folder
/// WHY: A session whose audio never reached disk must not leave debris
#[test]
#[allow(clippy::unwrap_used)]
fn given_wav_write_failure_when_stopping_then_storage_error_and_no_folder() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("audio");
    let (engine, _lang) = StubEngine::replying("unused");
    let chunks = vec![vec![0.4f32; 8]];
    let mut manager = manager_with(ScriptedCapture::with_chunks(chunks), engine, root.clone());

    let paths = manager.start_recording_at(sample_time()).unwrap();
    // The folder vanishing underneath the session makes the WAV write fail.
    std::fs::remove_dir(&paths.folder).unwrap();

    let result = manager.stop_recording();

    assert!(matches!(result, Err(AudioError::StorageError { .. })));
    assert!(!paths.folder.exists());
    assert!(!manager.is_recording());
}

/// WHAT: The configured language is handed to the engine
/// WHY: setLanguage must affect the next transcription
#[test]
#[allow(clippy::unwrap_used)]
fn given_language_changed_when_transcribing_then_engine_sees_new_code() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("audio");
    let (engine, last_language) = StubEngine::replying("ok");
    let chunks = vec![vec![0.1f32; 4]];
    let mut manager = manager_with(ScriptedCapture::with_chunks(chunks), engine, root);

    manager.set_language("en").unwrap();
    manager.start_recording_at(sample_time()).unwrap();
    let finished = manager.stop_recording().unwrap();
    manager.transcribe_to_file(&finished).unwrap();

    assert_eq!(
        last_language.lock().unwrap().as_deref(),
        Some("en")
    );
}

/// WHAT: An unsupported code is rejected and the language kept
/// WHY: Invalid input must not corrupt session state
#[test]
#[allow(clippy::unwrap_used)]
fn given_unsupported_code_when_setting_language_then_rejected_unchanged() {
    let temp = TempDir::new().unwrap();
    let (engine, _lang) = StubEngine::replying("unused");
    let mut manager = manager_with(
        ScriptedCapture::with_chunks(vec![]),
        engine,
        temp.path().join("audio"),
    );

    let result = manager.set_language("xx");

    assert!(
        matches!(result, Err(AudioError::UnsupportedLanguage { ref code, .. }) if code == "xx")
    );
    assert_eq!(manager.language(), "pt");
}

/// WHAT: Transcription failure keeps the WAV and writes no transcript
/// WHY: The audio is the artifact of record; the engine is best-effort
#[test]
#[allow(clippy::unwrap_used)]
fn given_failing_engine_when_transcribing_then_wav_kept_and_no_transcript() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("audio");
    let chunks = vec![vec![0.2f32; 16]];
    let mut manager = manager_with(ScriptedCapture::with_chunks(chunks), StubEngine::failing(), root.clone());

    manager.start_recording_at(sample_time()).unwrap();
    let finished = manager.stop_recording().unwrap();
    let result = manager.transcribe_to_file(&finished);

    // Then: Engine error surfaces; WAV exists and is non-empty; no .txt
    assert!(matches!(result, Err(AudioError::TranscriptionFailed { .. })));
    let wav_path = root.join("call_20251103_143148/call_recording_20251103_143148.wav");
    assert!(wav_path.is_file());
    assert!(std::fs::metadata(&wav_path).unwrap().len() > 44);
    assert!(
        !root
            .join("call_20251103_143148/call_transcript_20251103_143148.txt")
            .exists()
    );
}

/// WHAT: Constructing a manager with a bad default language fails
/// WHY: The default must be validated like any user input
#[test]
#[allow(clippy::unwrap_used)]
fn given_bad_language_when_creating_manager_then_unsupported_language_error() {
    let temp = TempDir::new().unwrap();
    let (engine, _lang) = StubEngine::replying("unused");

    let result = SessionManager::new(
        Box::new(ScriptedCapture::with_chunks(vec![])),
        Box::new(engine),
        temp.path().join("audio"),
        "klingon",
    );

    assert!(matches!(
        result,
        Err(AudioError::UnsupportedLanguage { .. })
    ));
}
