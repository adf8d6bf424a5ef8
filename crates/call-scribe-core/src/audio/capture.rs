use crate::{AudioError, CoreResult};

use std::{
    collections::VecDeque,
    panic::Location,
    sync::{
        atomic::{AtomicBool, Ordering},
        {Arc, Mutex},
    },
};

use cpal::{
    Stream, StreamConfig,
    traits::{DeviceTrait, HostTrait, StreamTrait},
};
use error_location::ErrorLocation;
use tracing::{debug, error, info, instrument};

/// Maximum samples to buffer (5 minutes at 48kHz mono).
/// Prevents unbounded memory growth during long recordings.
///
/// **Memory footprint at max capacity:**
/// - 48,000 Hz * 60s * 5 min * 4 bytes/f32 = ~58MB
/// - This is a hard upper bound; typical sessions are shorter
pub(crate) const MAX_BUFFER_SAMPLES: usize = 48_000 * 60 * 5;

/// Mono audio drained from a capture source when it stops.
pub struct CapturedAudio {
    /// Samples in capture order, already downmixed to mono.
    pub samples: Vec<f32>,
    /// Sample rate the device delivered the samples at.
    pub sample_rate: u32,
}

/// Seam between the session manager and the physical microphone.
///
/// `start` must fail (not panic) when no device can be opened, leaving the
/// source in a state where `start` can be retried. `stop` is the rendezvous
/// point: it halts the background capture and hands over everything buffered
/// since `start`, in capture order.
pub trait CaptureSource {
    /// Open the device and begin buffering frames in the background.
    fn start(&mut self) -> CoreResult<()>;

    /// Halt capture and drain the buffered frames.
    fn stop(&mut self) -> CoreResult<CapturedAudio>;
}

/// CPAL-backed microphone capture.
///
/// The device is opened in [`CaptureSource::start`], not at construction, so
/// a missing or permission-denied microphone fails that start attempt only.
/// The cpal callback runs on its own audio thread and only appends to the
/// sample buffer; it never touches file IO or stdin.
pub struct AudioCapturer {
    /// Device to open by name; `None` selects the host default input.
    device_name: Option<String>,
    stream: Option<Stream>,
    sample_rate: u32,
    channels: u16,
    samples: Arc<Mutex<VecDeque<f32>>>,
    /// Signals the audio callback to stop writing. Set to `true` before
    /// dropping the stream to ensure no in-flight callback writes after
    /// the lock is acquired in `stop()`.
    shutdown: Arc<AtomicBool>,
}

impl AudioCapturer {
    /// Create a capturer for the named device, or the default input device.
    pub fn new(device_name: Option<String>) -> Self {
        Self {
            device_name,
            stream: None,
            sample_rate: 0,
            channels: 0,
            samples: Arc::new(Mutex::new(VecDeque::with_capacity(MAX_BUFFER_SAMPLES))),
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    #[track_caller]
    fn open_device(&self) -> CoreResult<cpal::Device> {
        let host = cpal::default_host();

        match &self.device_name {
            None => host
                .default_input_device()
                .ok_or(AudioError::NoMicrophoneFound {
                    location: ErrorLocation::from(Location::caller()),
                }),
            Some(name) => {
                let mut devices = host.input_devices().map_err(|e| AudioError::DeviceError {
                    reason: format!("Failed to enumerate input devices: {}", e),
                    location: ErrorLocation::from(Location::caller()),
                })?;

                devices
                    .find(|d| d.name().is_ok_and(|n| &n == name))
                    .ok_or_else(|| AudioError::DeviceError {
                        reason: format!("Input device not found: {}", name),
                        location: ErrorLocation::from(Location::caller()),
                    })
            }
        }
    }
}

impl CaptureSource for AudioCapturer {
    #[track_caller]
    #[instrument(skip(self))]
    fn start(&mut self) -> CoreResult<()> {
        let device = self.open_device()?;

        let config = device
            .default_input_config()
            .map_err(|e| AudioError::DeviceError {
                reason: format!("Failed to get config: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        let config: StreamConfig = config.into();
        self.sample_rate = config.sample_rate;
        self.channels = config.channels;

        let samples = Arc::clone(&self.samples);
        let shutdown = Arc::clone(&self.shutdown);

        // Reset shutdown flag for new recording session
        self.shutdown.store(false, Ordering::Release);

        // Clear previous samples
        samples
            .lock()
            .map_err(|e| AudioError::DeviceError {
                reason: format!("Failed to lock samples: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?
            .clear();

        let stream = device
            .build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    // Check shutdown flag before acquiring lock. This provides
                    // explicit synchronization: once stop() sets this flag,
                    // no new samples will be written even if CPAL fires one
                    // more callback before the stream is dropped.
                    if shutdown.load(Ordering::Acquire) {
                        return;
                    }
                    // Recover from lock poison rather than silently dropping audio.
                    // A poisoned mutex means a previous holder panicked, but the
                    // VecDeque data is still valid and usable.
                    let mut buf = samples.lock().unwrap_or_else(|e| {
                        error!("Sample buffer lock poisoned, recovering: {}", e);
                        e.into_inner()
                    });
                    buf.extend(data.iter().copied());
                    // Ring buffer: O(1) amortized drop of oldest samples via VecDeque
                    while buf.len() > MAX_BUFFER_SAMPLES {
                        buf.pop_front();
                    }
                },
                |err| {
                    error!("Audio stream error: {}", err);
                },
                None,
            )
            .map_err(|e| AudioError::DeviceError {
                reason: format!("Failed to build stream: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        stream.play().map_err(|e| AudioError::DeviceError {
            reason: format!("Failed to start stream: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        self.stream = Some(stream);
        info!(
            sample_rate = self.sample_rate,
            channels = self.channels,
            "Audio capture started"
        );

        Ok(())
    }

    #[track_caller]
    #[instrument(skip(self))]
    fn stop(&mut self) -> CoreResult<CapturedAudio> {
        // Signal callback to stop writing BEFORE dropping the stream.
        // Even if CPAL's Stream::drop() is asynchronous on some backend, the
        // callback will observe this flag and return early, preventing writes
        // after we acquire the lock below.
        self.shutdown.store(true, Ordering::Release);

        if let Some(stream) = self.stream.take() {
            drop(stream);
            // Brief yield to ensure any in-flight callback observes the
            // shutdown flag and completes. On most CPAL backends drop() is
            // synchronous and joins the audio thread already.
            std::thread::sleep(std::time::Duration::from_millis(5));
            info!("Audio capture stopped");
        }

        let interleaved: Vec<f32> = self
            .samples
            .lock()
            .map_err(|e| AudioError::DeviceError {
                reason: format!("Failed to lock samples: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?
            .iter()
            .copied()
            .collect();

        let samples = downmix_to_mono(&interleaved, self.channels);

        debug!(
            interleaved_count = interleaved.len(),
            mono_count = samples.len(),
            channels = self.channels,
            "Captured audio samples"
        );

        Ok(CapturedAudio {
            samples,
            sample_rate: self.sample_rate,
        })
    }
}

/// Average interleaved multi-channel frames down to mono, preserving frame
/// order. Mono input is returned unchanged.
pub(crate) fn downmix_to_mono(interleaved: &[f32], channels: u16) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }

    let channels = channels as usize;
    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}
