//! Live amplitude visualization
//!
//! Taps the capture stream, runs a fixed-size FFT at the display refresh
//! cadence, and publishes a 16-bar frame through a watch channel. Slow
//! consumers see stale frames overwritten, never a backlog.

use std::sync::Arc;
use std::time::Duration;

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::voice::capture::SampleTap;

/// Number of bars in a frame, left-to-right over ascending frequency
pub const BAR_COUNT: usize = 16;

/// FFT length; yields `FFT_SIZE / 2` frequency bins
const FFT_SIZE: usize = 256;

/// Cadence matched to a 60Hz display refresh
const FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// dB range mapped onto bar values 0..100
const MIN_DB: f32 = -100.0;
const MAX_DB: f32 = -30.0;

/// One visualization frame: bar heights normalized to [0, 100]
#[derive(Debug, Clone, PartialEq)]
pub struct VisualizationFrame {
    pub bars: [f32; BAR_COUNT],
}

impl VisualizationFrame {
    /// An all-zero frame (idle / stopped)
    #[must_use]
    pub const fn silent() -> Self {
        Self {
            bars: [0.0; BAR_COUNT],
        }
    }
}

impl Default for VisualizationFrame {
    fn default() -> Self {
        Self::silent()
    }
}

/// Transforms a window of samples into a visualization frame
pub struct SpectrumAnalyzer {
    fft: Arc<dyn Fft<f32>>,
    hann_window: Vec<f32>,
}

impl SpectrumAnalyzer {
    #[must_use]
    pub fn new() -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(FFT_SIZE);

        #[allow(clippy::cast_precision_loss)]
        let hann_window: Vec<f32> = (0..FFT_SIZE)
            .map(|i| {
                0.5 * (1.0
                    - (2.0 * std::f32::consts::PI * i as f32 / (FFT_SIZE - 1) as f32).cos())
            })
            .collect();

        Self { fft, hann_window }
    }

    /// Analyze the newest samples into a 16-bar frame.
    ///
    /// Shorter windows are zero-padded at the front, so an idle or
    /// just-started stream renders as silence rather than garbage.
    #[must_use]
    pub fn analyze(&self, samples: &[f32]) -> VisualizationFrame {
        let mut buffer = vec![Complex::new(0.0f32, 0.0); FFT_SIZE];
        let tail = &samples[samples.len().saturating_sub(FFT_SIZE)..];
        let offset = FFT_SIZE - tail.len();
        for (i, &s) in tail.iter().enumerate() {
            buffer[offset + i] = Complex::new(s * self.hann_window[offset + i], 0.0);
        }

        self.fft.process(&mut buffer);

        // Positive-frequency magnitudes
        #[allow(clippy::cast_precision_loss)]
        let magnitudes: Vec<f32> = buffer[..FFT_SIZE / 2]
            .iter()
            .map(|c| (c.re * c.re + c.im * c.im).sqrt() / FFT_SIZE as f32)
            .collect();

        // One bin per bar, evenly strided across the spectrum
        let stride = magnitudes.len() / BAR_COUNT;
        let mut bars = [0.0f32; BAR_COUNT];
        for (i, bar) in bars.iter_mut().enumerate() {
            let db = 20.0 * (magnitudes[i * stride] + f32::EPSILON).log10();
            *bar = ((db - MIN_DB) / (MAX_DB - MIN_DB) * 100.0).clamp(0.0, 100.0);
        }

        VisualizationFrame { bars }
    }
}

impl Default for SpectrumAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

/// Running cadence task publishing frames from a capture tap
pub struct VisualizerTask {
    handle: JoinHandle<()>,
    stop_tx: watch::Sender<bool>,
}

impl VisualizerTask {
    /// Spawn the cadence loop
    pub fn spawn(tap: SampleTap, frames: watch::Sender<VisualizationFrame>) -> Self {
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let analyzer = SpectrumAnalyzer::new();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(FRAME_INTERVAL);
            // Staleness over backlog: skip ticks the consumer missed
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = stop_rx.changed() => break,
                    _ = ticker.tick() => {
                        let window = tap.latest(FFT_SIZE);
                        let frame = analyzer.analyze(&window);
                        if frames.send(frame).is_err() {
                            break;
                        }
                    }
                }
            }

            // Clear the meter on the way out
            let _ = frames.send(VisualizationFrame::silent());
        });

        Self { handle, stop_tx }
    }

    /// Signal the cadence loop and wait for it to finish.
    ///
    /// No frame other than the final silent one is published after this
    /// returns.
    pub async fn stop(self) {
        let _ = self.stop_tx.send(true);
        let _ = self.handle.await;
    }
}
