//! Audio playback to speakers

use std::io::Cursor;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, StreamConfig};

use crate::{Error, Result};

/// Sample rate for playback (matches common synthesized-speech output)
const PLAYBACK_SAMPLE_RATE: u32 = 24000;

/// Plays a synthesized reply. The production implementation drives the
/// default output device; tests substitute a recording fake.
#[async_trait]
pub trait Player: Send + Sync {
    /// Play an MP3 reply to completion
    ///
    /// # Errors
    ///
    /// Returns error if decoding or playback fails
    async fn play(&self, audio: &[u8]) -> Result<()>;
}

/// Plays audio to the default output device
pub struct SpeakerPlayer;

#[async_trait]
impl Player for SpeakerPlayer {
    async fn play(&self, audio: &[u8]) -> Result<()> {
        let samples = decode_mp3(audio)?;
        Self::play_samples(samples).await
    }
}

impl SpeakerPlayer {
    /// Play raw f32 samples to completion.
    ///
    /// The cpal output stream is built and polled inside `spawn_blocking`
    /// so the async scheduler is never blocked.
    ///
    /// # Errors
    ///
    /// Returns error if the output device cannot be opened
    pub async fn play_samples(samples: Vec<f32>) -> Result<()> {
        if samples.is_empty() {
            return Ok(());
        }

        tokio::task::spawn_blocking(move || play_samples_blocking(&samples))
            .await
            .map_err(|e| Error::Audio(format!("playback task failed: {e}")))?
    }
}

/// Drive the output stream until the sample cursor runs out
fn play_samples_blocking(samples: &[f32]) -> Result<()> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| Error::Audio("no output device available".to_string()))?;

    let supported_config = device
        .supported_output_configs()
        .map_err(|e| Error::Audio(e.to_string()))?
        .find(|c| {
            c.channels() == 1
                && c.min_sample_rate() <= SampleRate(PLAYBACK_SAMPLE_RATE)
                && c.max_sample_rate() >= SampleRate(PLAYBACK_SAMPLE_RATE)
        })
        .or_else(|| {
            // Fallback: try stereo
            device.supported_output_configs().ok()?.find(|c| {
                c.channels() == 2
                    && c.min_sample_rate() <= SampleRate(PLAYBACK_SAMPLE_RATE)
                    && c.max_sample_rate() >= SampleRate(PLAYBACK_SAMPLE_RATE)
            })
        })
        .ok_or_else(|| Error::Audio("no suitable output config found".to_string()))?;

    let config: StreamConfig = supported_config
        .with_sample_rate(SampleRate(PLAYBACK_SAMPLE_RATE))
        .config();
    let channels = config.channels as usize;

    let cursor = Arc::new(Mutex::new(0usize));
    let finished = Arc::new(Mutex::new(false));

    let samples_shared = Arc::new(samples.to_vec());
    let samples_cb = Arc::clone(&samples_shared);
    let cursor_cb = Arc::clone(&cursor);
    let finished_cb = Arc::clone(&finished);

    let stream = device
        .build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                let mut pos = match cursor_cb.lock() {
                    Ok(pos) => pos,
                    Err(_) => return,
                };

                for frame in data.chunks_mut(channels) {
                    let sample = if *pos < samples_cb.len() {
                        let s = samples_cb[*pos];
                        *pos += 1;
                        s
                    } else {
                        if let Ok(mut done) = finished_cb.lock() {
                            *done = true;
                        }
                        0.0
                    };

                    for out in frame.iter_mut() {
                        *out = sample;
                    }
                }
            },
            |err| {
                tracing::error!(error = %err, "audio playback error");
            },
            None,
        )
        .map_err(|e| Error::Audio(e.to_string()))?;

    stream.play().map_err(|e| Error::Audio(e.to_string()))?;

    // Wait for the cursor to drain, bounded by the nominal duration
    let sample_count = samples_shared.len();
    let duration_ms = (sample_count as u64 * 1000) / u64::from(PLAYBACK_SAMPLE_RATE);
    let start = std::time::Instant::now();
    let timeout = std::time::Duration::from_millis(duration_ms + 500);

    loop {
        if finished.lock().map(|done| *done).unwrap_or(true) {
            break;
        }
        if start.elapsed() > timeout {
            break;
        }
        std::thread::sleep(std::time::Duration::from_millis(50));
    }

    // Let the device ring out before tearing the stream down
    std::thread::sleep(std::time::Duration::from_millis(100));

    drop(stream);
    tracing::debug!(samples = sample_count, "playback complete");

    Ok(())
}

/// Decode MP3 bytes to f32 samples
fn decode_mp3(mp3_data: &[u8]) -> Result<Vec<f32>> {
    let mut decoder = minimp3::Decoder::new(Cursor::new(mp3_data));
    let mut samples = Vec::new();

    loop {
        match decoder.next_frame() {
            Ok(frame) => {
                // Convert i16 samples to f32, downmixing stereo
                let frame_samples: Vec<f32> = if frame.channels == 2 {
                    frame
                        .data
                        .chunks(2)
                        .map(|chunk| {
                            let left = f32::from(chunk[0]) / 32768.0;
                            let right =
                                f32::from(chunk.get(1).copied().unwrap_or(chunk[0])) / 32768.0;
                            (left + right) / 2.0
                        })
                        .collect()
                } else {
                    frame.data.iter().map(|&s| f32::from(s) / 32768.0).collect()
                };

                samples.extend(frame_samples);
            }
            Err(minimp3::Error::Eof) => break,
            Err(e) => return Err(Error::Audio(format!("MP3 decode error: {e}"))),
        }
    }

    Ok(samples)
}
