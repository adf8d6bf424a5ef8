pub(crate) mod capture;
mod engine;
pub(crate) mod resampler;

pub(crate) use resampler::Resampler;

pub use {
    capture::{AudioCapturer, CaptureSource, CapturedAudio},
    engine::{LazyEngine, SttEngine, Transcriber},
};
