//! On-device speech recognition seam
//!
//! Recognition runs concurrently with capture: the transcript accumulates
//! while the microphone is live and is finalized when the session stops.
//! Hosts without a local recognizer plug in [`NoOnDeviceRecognizer`] and
//! every session degrades to the remote path.

use async_trait::async_trait;

use crate::{Error, Result};

/// Host speech recognizer, queried once per session
#[async_trait(?Send)]
pub trait OnDeviceRecognizer {
    /// Whether this host can recognize speech locally
    fn is_available(&self) -> bool;

    /// Begin recognizing alongside an active capture
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unavailable`] when the host has no recognizer
    async fn start(&self) -> Result<Box<dyn RecognitionSession>>;
}

/// A running recognition session tied to one capture
#[async_trait(?Send)]
pub trait RecognitionSession {
    /// Best transcript accumulated so far
    fn transcript(&self) -> String;

    /// Stop recognizing and return the final transcript
    ///
    /// # Errors
    ///
    /// Returns error if the recognizer failed mid-session
    async fn stop(self: Box<Self>) -> Result<String>;
}

/// Stand-in for hosts without local speech recognition
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOnDeviceRecognizer;

#[async_trait(?Send)]
impl OnDeviceRecognizer for NoOnDeviceRecognizer {
    fn is_available(&self) -> bool {
        false
    }

    async fn start(&self) -> Result<Box<dyn RecognitionSession>> {
        Err(Error::Unavailable(
            "no on-device speech recognizer on this host".to_string(),
        ))
    }
}
