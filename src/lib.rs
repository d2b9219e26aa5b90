//! Aura voice client library
//!
//! Push-to-talk voice interaction for an assistant service: capture speech
//! from the microphone, visualize it live, transcribe it remotely (with a
//! sticky on-device fallback), dispatch the command, and speak the reply.
//!
//! # Architecture
//!
//! - [`session`]: the state machine driving one voice interaction
//! - [`voice`]: microphone capture, spectrum visualization, playback
//! - [`transcribe`]: remote speech-to-text and the failover policy
//! - [`assistant`]: reply generation and speech synthesis client
//! - [`config`]: layered configuration (env over file over defaults)
//!
//! The session future is not `Send` because capture streams are tied to
//! the thread that opened them; run the controller on the main task.

pub mod assistant;
pub mod config;
pub mod error;
pub mod session;
pub mod transcribe;
pub mod voice;

pub use config::Config;
pub use error::{Error, ErrorKind, Result};
pub use session::{
    SessionComponents, SessionController, SessionEvent, SessionEvents, SessionSnapshot,
    SessionState,
};
pub use transcribe::{FailoverPolicy, TranscriptionPath};
pub use voice::{AudioArtifact, VisualizationFrame, BAR_COUNT};
