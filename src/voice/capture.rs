//! Audio capture from microphone

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, SampleRate, Stream, StreamConfig};

use crate::{Error, Result};

/// Sample rate for audio capture (16kHz for speech)
pub const SAMPLE_RATE: u32 = 16000;

/// Sample window retained for the visualizer tap
const TAP_CAPACITY: usize = 4096;

/// Input sample format negotiated once at acquisition, never renegotiated
/// mid-capture. f32 is preferred; i16 is the documented fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleEncoding {
    F32,
    I16,
}

/// Finalized encoded capture output: 16-bit PCM WAV bytes
#[derive(Debug, Clone, Default)]
pub struct AudioArtifact {
    /// Encoded WAV container (empty on immediate stop)
    pub bytes: Vec<u8>,
    /// Number of captured samples
    pub sample_count: usize,
    /// Capture sample rate
    pub sample_rate: u32,
}

impl AudioArtifact {
    /// True when no samples were captured
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.sample_count == 0
    }
}

/// Shared live tail of the capture stream, read by the visualizer cadence
/// task. Bounded; old samples are discarded as new ones arrive.
#[derive(Clone, Default)]
pub struct SampleTap {
    inner: Arc<Mutex<VecDeque<f32>>>,
}

impl SampleTap {
    /// Append samples, discarding the oldest past the window capacity
    pub fn push(&self, samples: &[f32]) {
        if let Ok(mut window) = self.inner.lock() {
            for &s in samples {
                if window.len() == TAP_CAPACITY {
                    window.pop_front();
                }
                window.push_back(s);
            }
        }
    }

    /// Snapshot of up to the `n` most recent samples
    #[must_use]
    pub fn latest(&self, n: usize) -> Vec<f32> {
        self.inner.lock().map_or_else(
            |_| Vec::new(),
            |window| {
                let skip = window.len().saturating_sub(n);
                window.iter().skip(skip).copied().collect()
            },
        )
    }
}

/// Source of capture streams. The production implementation opens the
/// default microphone; tests substitute scripted sample feeds.
#[async_trait(?Send)]
pub trait CaptureBackend {
    /// Acquire a microphone stream
    ///
    /// # Errors
    ///
    /// Returns [`Error::PermissionDenied`] if the host refuses the stream
    async fn acquire(&self) -> Result<Box<dyn CaptureStream>>;
}

/// An active capture stream. Finishing never fails once acquired: it yields
/// whatever bytes were captured and releases the underlying hardware.
pub trait CaptureStream {
    /// Live sample tail for the visualizer
    fn tap(&self) -> SampleTap;

    /// Stop capturing and finalize the audio artifact
    fn finish(self: Box<Self>) -> AudioArtifact;
}

/// Captures audio from the default input device
pub struct MicBackend;

#[async_trait(?Send)]
impl CaptureBackend for MicBackend {
    async fn acquire(&self) -> Result<Box<dyn CaptureStream>> {
        MicStream::open().map(|s| Box::new(s) as Box<dyn CaptureStream>)
    }
}

/// A live cpal input stream accumulating mono 16kHz samples
pub struct MicStream {
    // Held so the stream keeps running; dropped on finish
    _stream: Stream,
    buffer: Arc<Mutex<Vec<f32>>>,
    tap: SampleTap,
    encoding: SampleEncoding,
}

impl MicStream {
    /// Open the default input device and start capturing
    ///
    /// # Errors
    ///
    /// Returns [`Error::PermissionDenied`] if the host refuses the stream,
    /// [`Error::Audio`] if no suitable input config exists
    pub fn open() -> Result<Self> {
        let host = cpal::default_host();

        let device = host.default_input_device().ok_or_else(|| {
            Error::PermissionDenied("no input device available".to_string())
        })?;

        let (config, encoding) = negotiate_input(&device)?;

        let buffer = Arc::new(Mutex::new(Vec::new()));
        let tap = SampleTap::default();

        let stream = build_input_stream(&device, &config, encoding, &buffer, &tap)?;
        stream
            .play()
            .map_err(|e| Error::PermissionDenied(e.to_string()))?;

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            sample_rate = SAMPLE_RATE,
            ?encoding,
            "audio capture started"
        );

        Ok(Self {
            _stream: stream,
            buffer,
            tap,
            encoding,
        })
    }

    /// The sample format fixed at acquisition
    #[must_use]
    pub const fn encoding(&self) -> SampleEncoding {
        self.encoding
    }
}

impl CaptureStream for MicStream {
    fn tap(&self) -> SampleTap {
        self.tap.clone()
    }

    fn finish(self: Box<Self>) -> AudioArtifact {
        let samples = self
            .buffer
            .lock()
            .map(|mut buf| std::mem::take(&mut *buf))
            .unwrap_or_default();

        drop(self._stream);
        tracing::debug!(samples = samples.len(), "audio capture stopped");

        finalize_artifact(&samples, SAMPLE_RATE)
    }
}

/// Pick an input config: mono at 16kHz, f32 preferred then i16
fn negotiate_input(device: &Device) -> Result<(StreamConfig, SampleEncoding)> {
    let configs: Vec<_> = device
        .supported_input_configs()
        .map_err(|e| Error::PermissionDenied(e.to_string()))?
        .collect();

    for (format, encoding) in [
        (SampleFormat::F32, SampleEncoding::F32),
        (SampleFormat::I16, SampleEncoding::I16),
    ] {
        let found = configs.iter().find(|c| {
            c.channels() == 1
                && c.sample_format() == format
                && c.min_sample_rate() <= SampleRate(SAMPLE_RATE)
                && c.max_sample_rate() >= SampleRate(SAMPLE_RATE)
        });

        if let Some(c) = found {
            let config = c
                .clone()
                .with_sample_rate(SampleRate(SAMPLE_RATE))
                .config();
            return Ok((config, encoding));
        }
    }

    Err(Error::Audio("no suitable input config found".to_string()))
}

/// Build the input stream for the negotiated format
fn build_input_stream(
    device: &Device,
    config: &StreamConfig,
    encoding: SampleEncoding,
    buffer: &Arc<Mutex<Vec<f32>>>,
    tap: &SampleTap,
) -> Result<Stream> {
    let err_fn = |err| {
        tracing::error!(error = %err, "audio capture error");
    };

    let stream = match encoding {
        SampleEncoding::F32 => {
            let buffer = Arc::clone(buffer);
            let tap = tap.clone();
            device.build_input_stream(
                config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    if let Ok(mut buf) = buffer.lock() {
                        buf.extend_from_slice(data);
                    }
                    tap.push(data);
                },
                err_fn,
                None,
            )
        }
        SampleEncoding::I16 => {
            let buffer = Arc::clone(buffer);
            let tap = tap.clone();
            device.build_input_stream(
                config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    let converted: Vec<f32> =
                        data.iter().map(|&s| f32::from(s) / 32768.0).collect();
                    if let Ok(mut buf) = buffer.lock() {
                        buf.extend_from_slice(&converted);
                    }
                    tap.push(&converted);
                },
                err_fn,
                None,
            )
        }
    };

    stream.map_err(|e| Error::PermissionDenied(e.to_string()))
}

/// Encode captured samples into the finished artifact. Encoding into an
/// in-memory WAV cannot reasonably fail; if it does the artifact carries
/// zero bytes and the failure is logged.
#[must_use]
pub fn finalize_artifact(samples: &[f32], sample_rate: u32) -> AudioArtifact {
    let bytes = match samples_to_wav(samples, sample_rate) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(error = %e, "failed to encode capture artifact");
            Vec::new()
        }
    };

    AudioArtifact {
        bytes,
        sample_count: samples.len(),
        sample_rate,
    }
}

/// Convert f32 samples to WAV bytes for the transcription endpoint
///
/// # Errors
///
/// Returns error if WAV encoding fails
pub fn samples_to_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer =
            hound::WavWriter::new(&mut cursor, spec).map_err(|e| Error::Audio(e.to_string()))?;

        for &sample in samples {
            // Convert f32 [-1.0, 1.0] to i16
            #[allow(clippy::cast_possible_truncation)]
            let sample_i16 = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
            writer
                .write_sample(sample_i16)
                .map_err(|e| Error::Audio(e.to_string()))?;
        }

        writer.finalize().map_err(|e| Error::Audio(e.to_string()))?;
    }

    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tap_keeps_only_the_newest_window() {
        let tap = SampleTap::default();
        tap.push(&vec![0.1; TAP_CAPACITY]);
        tap.push(&[0.9, 0.9]);

        let latest = tap.latest(4);
        assert_eq!(latest.len(), 4);
        assert_eq!(&latest[2..], &[0.9, 0.9]);
    }

    #[test]
    fn tap_latest_handles_short_window() {
        let tap = SampleTap::default();
        tap.push(&[0.5, 0.5]);
        assert_eq!(tap.latest(256).len(), 2);
    }

    #[test]
    fn empty_capture_yields_zero_length_artifact() {
        let artifact = finalize_artifact(&[], SAMPLE_RATE);
        assert!(artifact.is_empty());
        // A WAV header still frames the empty payload
        assert_eq!(&artifact.bytes[0..4], b"RIFF");
    }
}
