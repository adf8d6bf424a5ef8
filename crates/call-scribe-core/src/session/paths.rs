use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;

/// Wall-clock format baked into folder and file names: `YYYYMMDD_HHMMSS`.
pub(crate) const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// On-disk layout of one recording session.
///
/// ```text
/// <root>/call_<timestamp>/
///   call_recording_<timestamp>.wav
///   call_transcript_<timestamp>.txt
/// ```
#[derive(Debug, Clone)]
pub struct SessionPaths {
    /// Timestamp string shared by the folder and both files.
    pub timestamp: String,
    /// Per-session folder under the output root.
    pub folder: PathBuf,
    /// Uncompressed PCM recording.
    pub audio_file: PathBuf,
    /// UTF-8 transcript, written only when transcription succeeds.
    pub transcript_file: PathBuf,
}

impl SessionPaths {
    /// Compute the layout for a session started at `at`.
    pub fn new(root: &Path, at: NaiveDateTime) -> Self {
        let timestamp = at.format(TIMESTAMP_FORMAT).to_string();
        let folder = root.join(format!("call_{}", timestamp));
        let audio_file = folder.join(format!("call_recording_{}.wav", timestamp));
        let transcript_file = folder.join(format!("call_transcript_{}.txt", timestamp));

        Self {
            timestamp,
            folder,
            audio_file,
            transcript_file,
        }
    }
}
