//! Voice processing: capture, visualization, and playback

pub mod capture;
pub mod playback;
pub mod visualizer;

pub use capture::{
    finalize_artifact, samples_to_wav, AudioArtifact, CaptureBackend, CaptureStream, MicBackend,
    MicStream, SampleEncoding, SampleTap, SAMPLE_RATE,
};
pub use playback::{Player, SpeakerPlayer};
pub use visualizer::{SpectrumAnalyzer, VisualizationFrame, VisualizerTask, BAR_COUNT};
