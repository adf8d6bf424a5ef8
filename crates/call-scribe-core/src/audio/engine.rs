use crate::{AudioError, CoreResult};

use std::{
    panic::Location,
    path::{Path, PathBuf},
};

use error_location::ErrorLocation;
use tracing::{debug, info, instrument};
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

/// Seam between the session manager and the speech-to-text model.
///
/// `language` is a two-letter code already validated against
/// [`crate::language`]; implementations transcribe the 16 kHz mono samples
/// and return the verbatim text.
pub trait Transcriber {
    /// Transcribe 16 kHz mono samples in the given language.
    fn transcribe(&mut self, samples: &[f32], language: &str) -> CoreResult<String>;
}

/// Whisper-backed transcription engine.
pub struct SttEngine {
    ctx: WhisperContext,
}

impl SttEngine {
    /// Load the Whisper model from disk.
    ///
    /// # Errors
    ///
    /// Returns [`AudioError::ModelNotFound`] if the file is missing and
    /// [`AudioError::ModelLoadFailed`] if whisper-rs rejects it.
    #[track_caller]
    #[instrument(skip(model_path))]
    pub fn new<P: AsRef<Path>>(model_path: P, use_gpu: bool) -> CoreResult<Self> {
        let path = model_path.as_ref();

        if !path.exists() {
            return Err(AudioError::ModelNotFound {
                path: path.to_path_buf(),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let mut ctx_params = WhisperContextParameters::default();
        ctx_params.use_gpu(use_gpu);

        let ctx = WhisperContext::new_with_params(
            path.to_str().ok_or(AudioError::ModelNotFound {
                path: path.to_path_buf(),
                location: ErrorLocation::from(Location::caller()),
            })?,
            ctx_params,
        )
        .map_err(|e| AudioError::ModelLoadFailed {
            source: Box::new(e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        info!(model_path = ?path, use_gpu = use_gpu, "Whisper model loaded");

        Ok(Self { ctx })
    }
}

impl Transcriber for SttEngine {
    #[track_caller]
    #[instrument(skip(self, samples))]
    fn transcribe(&mut self, samples: &[f32], language: &str) -> CoreResult<String> {
        if samples.is_empty() {
            return Err(AudioError::NoAudioCaptured {
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });

        params.set_language(Some(language));
        params.set_print_progress(false);
        params.set_print_special(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);
        params.set_suppress_blank(true);
        params.set_suppress_nst(true);

        let mut state = self
            .ctx
            .create_state()
            .map_err(|e| AudioError::TranscriptionFailed {
                source: Box::new(e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        state
            .full(params, samples)
            .map_err(|e| AudioError::TranscriptionFailed {
                source: Box::new(e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        let num_segments = state.full_n_segments();

        // Pre-allocate: ~256 bytes per segment covers typical speech with a
        // single allocation.
        let mut result = String::with_capacity(num_segments as usize * 256);

        for i in 0..num_segments {
            let segment = state
                .get_segment(i)
                .ok_or_else(|| AudioError::TranscriptionFailed {
                    source: format!("Failed to get segment {}", i).into(),
                    location: ErrorLocation::from(Location::caller()),
                })?;

            result.push_str(&segment.to_string());
            result.push(' ');
        }

        let transcription = result.trim().to_string();

        debug!(
            sample_count = samples.len(),
            segment_count = num_segments,
            text_len = transcription.len(),
            language = language,
            "Transcription complete"
        );

        Ok(transcription)
    }
}

/// Memoized one-time model load.
///
/// The Whisper model is large and slow to load, so it is loaded on the first
/// transcription and then reused for every session in the process. A load
/// failure is surfaced as [`AudioError::ModelLoadFailed`] and leaves the
/// engine unloaded; the caller decides whether to retry or abort.
pub struct LazyEngine {
    model_path: PathBuf,
    use_gpu: bool,
    inner: Option<SttEngine>,
}

impl LazyEngine {
    /// Create an engine that will load the model at `model_path` on first use.
    pub fn new(model_path: PathBuf, use_gpu: bool) -> Self {
        Self {
            model_path,
            use_gpu,
            inner: None,
        }
    }

    /// Check that the model file exists without loading it.
    ///
    /// Call at startup so a misconfigured path fails before the first
    /// session rather than after audio has been recorded.
    #[track_caller]
    pub fn validate_model_path(&self) -> CoreResult<()> {
        if !self.model_path.exists() {
            return Err(AudioError::ModelNotFound {
                path: self.model_path.clone(),
                location: ErrorLocation::from(Location::caller()),
            });
        }
        Ok(())
    }

    #[track_caller]
    fn engine(&mut self) -> CoreResult<&mut SttEngine> {
        if self.inner.is_none() {
            info!(model_path = ?self.model_path, "Loading Whisper model (first transcription)");
            self.inner = Some(SttEngine::new(&self.model_path, self.use_gpu)?);
        }

        // Just populated above; the only early return is the load error.
        match self.inner.as_mut() {
            Some(engine) => Ok(engine),
            None => Err(AudioError::ModelLoadFailed {
                source: "engine missing after load".into(),
                location: ErrorLocation::from(Location::caller()),
            }),
        }
    }
}

impl Transcriber for LazyEngine {
    #[track_caller]
    fn transcribe(&mut self, samples: &[f32], language: &str) -> CoreResult<String> {
        self.engine()?.transcribe(samples, language)
    }
}
