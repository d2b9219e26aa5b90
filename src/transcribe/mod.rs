//! Transcription: remote speech-to-text with sticky on-device failover

pub mod on_device;
pub mod remote;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use crate::Result;

pub use on_device::{NoOnDeviceRecognizer, OnDeviceRecognizer, RecognitionSession};
pub use remote::RemoteTranscriber;

/// Sticky preference for on-device recognition.
///
/// Starts remote-preferred. Flips to on-device only when the remote
/// service explicitly signals that speech recognition is unavailable, and
/// never flips back for the life of the handle. Network errors and
/// malformed payloads do NOT flip it.
///
/// Clones share the flag, so every session started from the same client
/// observes the same preference.
#[derive(Debug, Clone, Default)]
pub struct FailoverPolicy {
    prefer_on_device: Arc<AtomicBool>,
}

impl FailoverPolicy {
    /// Whether on-device recognition is now preferred
    #[must_use]
    pub fn prefer_on_device(&self) -> bool {
        self.prefer_on_device.load(Ordering::Relaxed)
    }

    /// Record that the remote service lacks speech recognition
    pub fn set_prefer_on_device(&self) {
        self.prefer_on_device.store(true, Ordering::Relaxed);
    }
}

/// Which transcription engine a session will use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranscriptionPath {
    /// Host speech recognizer, transcript accumulates during capture
    OnDevice,
    /// Remote service, transcript arrives after capture finishes
    Remote,
}

/// Resolve the engine for a new session.
///
/// On-device is used only when it is both preferred and actually present
/// on the host; otherwise the session degrades to remote without changing
/// the stored preference.
#[must_use]
pub const fn select_path(prefer_on_device: bool, host_available: bool) -> TranscriptionPath {
    if prefer_on_device && host_available {
        TranscriptionPath::OnDevice
    } else {
        TranscriptionPath::Remote
    }
}

/// Result of sending captured audio through the command pipeline.
///
/// The remote service folds intent dispatch into transcription, so a
/// single call may already carry the reply text and synthesized audio.
#[derive(Debug, Clone, Default)]
pub struct CommandOutcome {
    /// What the user said
    pub transcript: String,
    /// Classified intent label
    pub intent: String,
    /// Reply text, when the service folded dispatch into this call
    pub reply_text: Option<String>,
    /// Synthesized reply audio (MP3), when the service provided it
    pub reply_audio: Option<Vec<u8>>,
}

/// Turns a finished audio artifact into a command outcome
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe captured audio and classify the command
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Unavailable`] when the service explicitly
    /// signals missing speech recognition, [`crate::Error::Network`] or
    /// [`crate::Error::MalformedResponse`] for transport and payload
    /// failures
    async fn transcribe(&self, audio: &[u8]) -> Result<CommandOutcome>;
}
