//! Voice session lifecycle
//!
//! One session runs capture, transcription, dispatch, synthesis, and
//! playback as a single pass through a fixed state machine. The controller
//! is single-threaded by design: capture streams are not `Send`, so the
//! session future runs on the main task while the visualizer cadence and
//! playback run on spawned tasks.

use std::cell::{Cell, RefCell};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, watch, Notify};
use tokio::time::{Duration, Instant};
use uuid::Uuid;

use crate::assistant::{Assistant, Turn};
use crate::config::VoiceConfig;
use crate::transcribe::{
    select_path, CommandOutcome, FailoverPolicy, OnDeviceRecognizer, Transcriber,
    TranscriptionPath,
};
use crate::voice::{
    AudioArtifact, CaptureBackend, Player, VisualizationFrame, VisualizerTask,
};
use crate::{Error, ErrorKind, Result};

/// Session lifecycle states, in the order a successful pass visits them.
/// Playing is skipped when there is no reply audio; Error is reached from
/// any state after Requesting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Requesting,
    Capturing,
    Stopping,
    Transcribing,
    Dispatching,
    Synthesizing,
    Playing,
    Error,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Requesting => "requesting",
            Self::Capturing => "capturing",
            Self::Stopping => "stopping",
            Self::Transcribing => "transcribing",
            Self::Dispatching => "dispatching",
            Self::Synthesizing => "synthesizing",
            Self::Playing => "playing",
            Self::Error => "error",
        };
        f.write_str(name)
    }
}

/// Summary of a completed session
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    /// Capture duration in whole seconds
    pub elapsed_seconds: u64,
    /// Size of the finalized capture artifact
    pub audio_bytes: usize,
    pub transcript: Option<String>,
    pub intent: Option<String>,
    pub reply_text: Option<String>,
    /// Whether a spoken reply was handed to the player
    pub spoke_reply: bool,
}

/// Events published while a session runs
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// The state machine advanced
    StateChanged(SessionState),
    /// One second of capture elapsed
    Tick { elapsed_seconds: u64 },
    /// The session finished and the controller is idle again
    Completed(SessionSnapshot),
    /// The session failed; the controller accepts a new start
    Failed { kind: ErrorKind, message: String },
}

/// Receiving ends handed to the frontend
pub struct SessionEvents {
    pub events: mpsc::UnboundedReceiver<SessionEvent>,
    pub frames: watch::Receiver<VisualizationFrame>,
}

/// Pluggable components driving a session
pub struct SessionComponents {
    pub capture: Box<dyn CaptureBackend>,
    pub recognizer: Box<dyn OnDeviceRecognizer>,
    pub transcriber: Arc<dyn Transcriber>,
    pub assistant: Arc<dyn Assistant>,
    pub player: Arc<dyn Player>,
}

/// Drives voice sessions through the state machine.
///
/// Not `Send`: capture streams are tied to the thread that opened them, so
/// the controller lives on the main task for its whole life.
pub struct SessionController {
    capture: Box<dyn CaptureBackend>,
    recognizer: Box<dyn OnDeviceRecognizer>,
    transcriber: Arc<dyn Transcriber>,
    assistant: Arc<dyn Assistant>,
    player: Arc<dyn Player>,
    failover: FailoverPolicy,
    voice: VoiceConfig,

    state: Cell<SessionState>,
    active: AtomicBool,
    stop: Arc<Notify>,
    history: RefCell<Vec<Turn>>,

    events: mpsc::UnboundedSender<SessionEvent>,
    frames: watch::Sender<VisualizationFrame>,
}

impl SessionController {
    /// Build a controller and the event streams its frontend consumes
    #[must_use]
    pub fn new(components: SessionComponents, voice: VoiceConfig) -> (Self, SessionEvents) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (frames_tx, frames_rx) = watch::channel(VisualizationFrame::silent());

        let controller = Self {
            capture: components.capture,
            recognizer: components.recognizer,
            transcriber: components.transcriber,
            assistant: components.assistant,
            player: components.player,
            failover: FailoverPolicy::default(),
            voice,
            state: Cell::new(SessionState::Idle),
            active: AtomicBool::new(false),
            stop: Arc::new(Notify::new()),
            history: RefCell::new(Vec::new()),
            events: events_tx,
            frames: frames_tx,
        };

        (
            controller,
            SessionEvents {
                events: events_rx,
                frames: frames_rx,
            },
        )
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state.get()
    }

    /// Whether a session is running
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// The sticky transcription failover policy for this controller
    #[must_use]
    pub const fn failover(&self) -> &FailoverPolicy {
        &self.failover
    }

    /// Handle that ends the capture phase, usable from any task
    #[must_use]
    pub fn stop_handle(&self) -> Arc<Notify> {
        Arc::clone(&self.stop)
    }

    /// End the capture phase of the running session, if any
    pub fn request_stop(&self) {
        self.stop.notify_waiters();
    }

    /// Run one full session.
    ///
    /// Returns `false` without side effects when a session is already
    /// running. Otherwise runs to completion or failure and returns `true`;
    /// the outcome is reported through the event stream.
    #[allow(clippy::future_not_send)]
    pub async fn run_session(&self) -> bool {
        if self
            .active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("session already active, start ignored");
            return false;
        }

        let id = Uuid::new_v4();
        tracing::info!(session = %id, "session started");
        self.set_state(SessionState::Requesting);

        match self.drive(id).await {
            Ok(snapshot) => {
                self.fold_history(&snapshot);
                tracing::info!(
                    session = %id,
                    elapsed = snapshot.elapsed_seconds,
                    transcript = snapshot.transcript.as_deref().unwrap_or(""),
                    "session completed"
                );
                self.emit(SessionEvent::Completed(snapshot));
                self.set_state(SessionState::Idle);
            }
            Err(e) => {
                tracing::warn!(session = %id, error = %e, "session failed");
                self.emit(SessionEvent::Failed {
                    kind: e.kind(),
                    message: e.to_string(),
                });
                self.set_state(SessionState::Error);
            }
        }

        self.active.store(false, Ordering::Release);
        true
    }

    /// One pass through the state machine
    #[allow(clippy::future_not_send, clippy::too_many_lines)]
    async fn drive(&self, id: Uuid) -> Result<SessionSnapshot> {
        let started_at = Utc::now();

        // Requesting: acquire the microphone, then pick the transcription
        // engine for this whole session.
        let stream = self.capture.acquire().await?;
        let path = select_path(
            self.failover.prefer_on_device(),
            self.recognizer.is_available(),
        );
        tracing::debug!(session = %id, ?path, "transcription path selected");

        let mut recognition = match path {
            TranscriptionPath::OnDevice => match self.recognizer.start().await {
                Ok(session) => Some(session),
                Err(e) => {
                    // The recognizer disappeared between the capability
                    // check and the start; degrade without flipping the
                    // stored preference back.
                    tracing::warn!(error = %e, "on-device recognizer failed to start");
                    None
                }
            },
            TranscriptionPath::Remote => None,
        };

        // Capturing: visualize at a fixed cadence and wait for either a
        // manual stop or the capture ceiling. Both exits share this one
        // path, so a ceiling stop is indistinguishable downstream.
        let visualizer = VisualizerTask::spawn(stream.tap(), self.frames.clone());
        self.set_state(SessionState::Capturing);

        let capture_started = Instant::now();
        let elapsed_seconds = {
            let stopped = self.stop.notified();
            tokio::pin!(stopped);

            let ceiling = tokio::time::sleep(self.voice.max_capture);
            tokio::pin!(ceiling);

            let mut ticker = tokio::time::interval_at(
                capture_started + Duration::from_secs(1),
                Duration::from_secs(1),
            );

            loop {
                tokio::select! {
                    () = &mut stopped => {
                        tracing::debug!(session = %id, "manual stop requested");
                        break;
                    }
                    () = &mut ceiling => {
                        tracing::debug!(session = %id, "capture ceiling reached");
                        break;
                    }
                    _ = ticker.tick() => {
                        let elapsed = capture_started.elapsed().as_secs();
                        self.emit(SessionEvent::Tick {
                            elapsed_seconds: elapsed,
                        });
                    }
                }
            }

            capture_started.elapsed().as_secs()
        };

        // Stopping: silence the meter, finalize the artifact, collect any
        // on-device transcript. Finishing a stream never fails.
        self.set_state(SessionState::Stopping);
        visualizer.stop().await;

        let on_device_transcript = match recognition.take() {
            Some(session) => match session.stop().await {
                Ok(text) => Some(text),
                Err(e) => {
                    tracing::warn!(error = %e, "on-device recognition failed");
                    None
                }
            },
            None => None,
        };

        let artifact = stream.finish();

        if artifact.is_empty() && on_device_transcript.as_deref().unwrap_or("").is_empty() {
            // Nothing usable was captured; report an empty session rather
            // than sending a zero-length clip anywhere.
            tracing::info!(session = %id, "nothing captured");
            return Ok(SessionSnapshot {
                id,
                started_at,
                elapsed_seconds,
                audio_bytes: 0,
                transcript: None,
                intent: None,
                reply_text: None,
                spoke_reply: false,
            });
        }

        // Transcribing
        self.set_state(SessionState::Transcribing);
        let (outcome, locally_dispatched) =
            match on_device_transcript.filter(|t| !t.is_empty()) {
                Some(transcript) => (
                    CommandOutcome {
                        transcript,
                        intent: "conversation".to_string(),
                        reply_text: None,
                        reply_audio: None,
                    },
                    true,
                ),
                None => {
                    let outcome = self.transcribe_remote(&artifact).await?;
                    let dispatched = outcome.reply_text.is_none();
                    (outcome, dispatched)
                }
            };

        // Dispatching: use the folded reply when the service provided one
        self.set_state(SessionState::Dispatching);
        let reply_text = match outcome.reply_text {
            Some(reply) => reply,
            None => {
                let history = self.recent_history();
                self.assistant
                    .reply(&outcome.transcript, &history)
                    .await?
            }
        };

        // Synthesizing: best effort, only when this client dispatched the
        // reply itself. A folded reply either came with audio or the
        // service already declined to synthesize it.
        self.set_state(SessionState::Synthesizing);
        let reply_audio = if !self.voice.speak_replies {
            None
        } else if let Some(audio) = outcome.reply_audio {
            Some(audio)
        } else if locally_dispatched {
            match self.assistant.synthesize(&reply_text).await {
                Ok(audio) => Some(audio),
                Err(e) => {
                    tracing::warn!(error = %e, "speech synthesis unavailable");
                    None
                }
            }
        } else {
            None
        };

        // Playing: skipped entirely without audio. A playback failure is
        // logged but never fails the session; the reply was delivered.
        let spoke_reply = match reply_audio {
            Some(audio) if !audio.is_empty() => {
                self.set_state(SessionState::Playing);
                match self.player.play(&audio).await {
                    Ok(()) => true,
                    Err(e) => {
                        tracing::warn!(error = %e, "reply playback failed");
                        false
                    }
                }
            }
            _ => false,
        };

        Ok(SessionSnapshot {
            id,
            started_at,
            elapsed_seconds,
            audio_bytes: artifact.bytes.len(),
            transcript: Some(outcome.transcript),
            intent: Some(outcome.intent),
            reply_text: Some(reply_text),
            spoke_reply,
        })
    }

    /// Remote transcription; an explicit capability signal flips the
    /// sticky failover before the error propagates.
    #[allow(clippy::future_not_send)]
    async fn transcribe_remote(&self, artifact: &AudioArtifact) -> Result<CommandOutcome> {
        match self.transcriber.transcribe(&artifact.bytes).await {
            Ok(outcome) => Ok(outcome),
            Err(e @ Error::Unavailable(_)) => {
                tracing::warn!("remote speech recognition unavailable, preferring on-device");
                self.failover.set_prefer_on_device();
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    fn set_state(&self, next: SessionState) {
        if self.state.get() != next {
            self.state.set(next);
            tracing::debug!(state = %next, "session state changed");
            self.emit(SessionEvent::StateChanged(next));
        }
    }

    fn emit(&self, event: SessionEvent) {
        // A closed frontend is not an error; the session still runs
        let _ = self.events.send(event);
    }

    fn fold_history(&self, snapshot: &SessionSnapshot) {
        let (Some(transcript), Some(reply)) = (&snapshot.transcript, &snapshot.reply_text)
        else {
            return;
        };

        let mut history = self.history.borrow_mut();
        history.push(Turn {
            user: transcript.clone(),
            assistant: reply.clone(),
        });

        let excess = history.len().saturating_sub(self.voice.history_turns);
        if excess > 0 {
            history.drain(..excess);
        }
    }

    fn recent_history(&self) -> Vec<Turn> {
        self.history.borrow().clone()
    }
}
