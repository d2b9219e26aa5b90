//! Shared fakes for session tests: every hardware and network seam is
//! replaced with a scripted implementation.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use aura_voice::assistant::{Assistant, Turn};
use aura_voice::session::{SessionEvent, SessionState};
use aura_voice::transcribe::{
    CommandOutcome, OnDeviceRecognizer, RecognitionSession, Transcriber,
};
use aura_voice::voice::{
    finalize_artifact, AudioArtifact, CaptureBackend, CaptureStream, Player, SampleTap,
    SAMPLE_RATE,
};
use aura_voice::{Error, Result};

/// Generate a sine wave at the capture rate
pub fn sine(frequency: f32, duration_secs: f32) -> Vec<f32> {
    let count = (SAMPLE_RATE as f32 * duration_secs) as usize;
    (0..count)
        .map(|i| {
            let t = i as f32 / SAMPLE_RATE as f32;
            0.5 * (2.0 * std::f32::consts::PI * frequency * t).sin()
        })
        .collect()
}

/// Scripted capture backend; yields fixed samples or refuses acquisition
pub struct FakeCapture {
    samples: Vec<f32>,
    deny: bool,
    pub finishes: Arc<AtomicUsize>,
}

impl FakeCapture {
    pub fn yielding(samples: Vec<f32>) -> Self {
        Self {
            samples,
            deny: false,
            finishes: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn denied() -> Self {
        Self {
            samples: Vec::new(),
            deny: true,
            finishes: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait(?Send)]
impl CaptureBackend for FakeCapture {
    async fn acquire(&self) -> Result<Box<dyn CaptureStream>> {
        if self.deny {
            return Err(Error::PermissionDenied(
                "microphone access refused".to_string(),
            ));
        }

        let tap = SampleTap::default();
        tap.push(&self.samples);

        Ok(Box::new(FakeStream {
            samples: self.samples.clone(),
            tap,
            finishes: Arc::clone(&self.finishes),
        }))
    }
}

struct FakeStream {
    samples: Vec<f32>,
    tap: SampleTap,
    finishes: Arc<AtomicUsize>,
}

impl CaptureStream for FakeStream {
    fn tap(&self) -> SampleTap {
        self.tap.clone()
    }

    fn finish(self: Box<Self>) -> AudioArtifact {
        self.finishes.fetch_add(1, Ordering::SeqCst);
        finalize_artifact(&self.samples, SAMPLE_RATE)
    }
}

/// Scripted remote transcriber; pops one response per call
#[derive(Default)]
pub struct FakeTranscriber {
    responses: Mutex<VecDeque<Result<CommandOutcome>>>,
    pub calls: AtomicUsize,
}

impl FakeTranscriber {
    pub fn scripted(responses: Vec<Result<CommandOutcome>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transcriber for FakeTranscriber {
    async fn transcribe(&self, _audio: &[u8]) -> Result<CommandOutcome> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(Error::Network("unscripted transcribe call".to_string())))
    }
}

/// Scripted host recognizer
pub struct FakeRecognizer {
    available: bool,
    transcript: String,
    pub starts: AtomicUsize,
}

impl FakeRecognizer {
    pub fn absent() -> Self {
        Self {
            available: false,
            transcript: String::new(),
            starts: AtomicUsize::new(0),
        }
    }

    pub fn recognizing(transcript: &str) -> Self {
        Self {
            available: true,
            transcript: transcript.to_string(),
            starts: AtomicUsize::new(0),
        }
    }
}

#[async_trait(?Send)]
impl OnDeviceRecognizer for FakeRecognizer {
    fn is_available(&self) -> bool {
        self.available
    }

    async fn start(&self) -> Result<Box<dyn RecognitionSession>> {
        if !self.available {
            return Err(Error::Unavailable("no recognizer".to_string()));
        }
        self.starts.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeRecognition {
            transcript: self.transcript.clone(),
        }))
    }
}

struct FakeRecognition {
    transcript: String,
}

#[async_trait(?Send)]
impl RecognitionSession for FakeRecognition {
    fn transcript(&self) -> String {
        self.transcript.clone()
    }

    async fn stop(self: Box<Self>) -> Result<String> {
        Ok(self.transcript)
    }
}

/// Scripted assistant; pops one reply / one synthesis per call
#[derive(Default)]
pub struct FakeAssistant {
    replies: Mutex<VecDeque<Result<String>>>,
    synth: Mutex<VecDeque<Result<Vec<u8>>>>,
    pub reply_calls: AtomicUsize,
    pub synth_calls: AtomicUsize,
    pub last_history_len: AtomicUsize,
}

impl FakeAssistant {
    pub fn silent() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn scripted(replies: Vec<Result<String>>, synth: Vec<Result<Vec<u8>>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            synth: Mutex::new(synth.into()),
            ..Self::default()
        })
    }

    pub fn reply_count(&self) -> usize {
        self.reply_calls.load(Ordering::SeqCst)
    }

    pub fn synth_count(&self) -> usize {
        self.synth_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Assistant for FakeAssistant {
    async fn reply(&self, _text: &str, history: &[Turn]) -> Result<String> {
        self.reply_calls.fetch_add(1, Ordering::SeqCst);
        self.last_history_len.store(history.len(), Ordering::SeqCst);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(Error::Network("unscripted reply call".to_string())))
    }

    async fn synthesize(&self, _text: &str) -> Result<Vec<u8>> {
        self.synth_calls.fetch_add(1, Ordering::SeqCst);
        self.synth
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Err(Error::SynthesisUnavailable(
                    "unscripted synthesize call".to_string(),
                ))
            })
    }
}

/// Records played payloads; optionally fails every play
#[derive(Default)]
pub struct RecordingPlayer {
    pub played: Mutex<Vec<Vec<u8>>>,
    fail: bool,
}

impl RecordingPlayer {
    pub fn working() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn broken() -> Arc<Self> {
        Arc::new(Self {
            played: Mutex::new(Vec::new()),
            fail: true,
        })
    }

    pub fn play_count(&self) -> usize {
        self.played.lock().unwrap().len()
    }
}

#[async_trait]
impl Player for RecordingPlayer {
    async fn play(&self, audio: &[u8]) -> Result<()> {
        self.played.lock().unwrap().push(audio.to_vec());
        if self.fail {
            return Err(Error::Audio("speaker exploded".to_string()));
        }
        Ok(())
    }
}

/// Drain every event currently queued
pub fn drain_events(
    rx: &mut tokio::sync::mpsc::UnboundedReceiver<SessionEvent>,
) -> Vec<SessionEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// The state transitions in event order
pub fn states(events: &[SessionEvent]) -> Vec<SessionState> {
    events
        .iter()
        .filter_map(|e| match e {
            SessionEvent::StateChanged(state) => Some(*state),
            _ => None,
        })
        .collect()
}

/// The capture ticks in event order
pub fn ticks(events: &[SessionEvent]) -> Vec<u64> {
    events
        .iter()
        .filter_map(|e| match e {
            SessionEvent::Tick { elapsed_seconds } => Some(*elapsed_seconds),
            _ => None,
        })
        .collect()
}

/// A typical folded voice-command outcome
pub fn folded_outcome(
    transcript: &str,
    intent: &str,
    reply: &str,
    audio: Option<Vec<u8>>,
) -> CommandOutcome {
    CommandOutcome {
        transcript: transcript.to_string(),
        intent: intent.to_string(),
        reply_text: Some(reply.to_string()),
        reply_audio: audio,
    }
}
