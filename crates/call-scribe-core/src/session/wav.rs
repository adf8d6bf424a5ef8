use crate::{AudioError, CoreResult};

use std::{panic::Location, path::Path};

use error_location::ErrorLocation;
use tracing::debug;

/// Write mono f32 samples as a standard 16-bit PCM WAV file.
///
/// Samples are clamped to [-1.0, 1.0] and scaled to i16, preserving capture
/// order exactly.
#[track_caller]
pub(crate) fn write_wav(path: &Path, samples: &[f32], sample_rate: u32) -> CoreResult<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path, spec).map_err(|e| AudioError::StorageError {
        path: path.to_path_buf(),
        source: std::io::Error::other(e),
        location: ErrorLocation::from(Location::caller()),
    })?;

    for &sample in samples {
        let value = (sample.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16;
        writer
            .write_sample(value)
            .map_err(|e| AudioError::StorageError {
                path: path.to_path_buf(),
                source: std::io::Error::other(e),
                location: ErrorLocation::from(Location::caller()),
            })?;
    }

    writer.finalize().map_err(|e| AudioError::StorageError {
        path: path.to_path_buf(),
        source: std::io::Error::other(e),
        location: ErrorLocation::from(Location::caller()),
    })?;

    debug!(path = ?path, sample_count = samples.len(), sample_rate = sample_rate, "WAV file written");

    Ok(())
}
