//! Aura voice client binary

use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use aura_voice::assistant::AssistantClient;
use aura_voice::session::{SessionComponents, SessionController, SessionEvent, SessionEvents};
use aura_voice::transcribe::{NoOnDeviceRecognizer, RemoteTranscriber};
use aura_voice::voice::{
    CaptureBackend, MicBackend, Player, SpeakerPlayer, VisualizationFrame,
};
use aura_voice::{Config, ErrorKind};

#[derive(Parser)]
#[command(name = "aura", about = "Push-to-talk voice client for an assistant service")]
struct Cli {
    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Assistant API base URL
    #[arg(long, env = "AURA_API_URL", global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the interactive voice loop (default)
    Run,
    /// Record from the microphone and report capture stats
    TestMic {
        /// Seconds to record
        #[arg(long, default_value_t = 3)]
        duration: u64,
    },
    /// Play a test tone through the speakers
    TestSpeaker,
    /// Synthesize text and play it
    TestTts {
        /// Text to speak
        #[arg(default_value = "Aura voice client is working.")]
        text: String,
    },
}

#[tokio::main(flavor = "current_thread")]
#[allow(clippy::future_not_send)]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = Config::load()?;
    if let Some(api_url) = cli.api_url {
        config.assistant.api_url = api_url;
    }

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => run(config).await,
        Command::TestMic { duration } => test_mic(duration).await,
        Command::TestSpeaker => test_speaker().await,
        Command::TestTts { text } => test_tts(&config, &text).await,
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "info,aura_voice=debug,aura=debug",
        _ => "debug,aura_voice=trace,aura=trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Interactive push-to-talk loop on the main task
#[allow(clippy::future_not_send)]
async fn run(config: Config) -> anyhow::Result<()> {
    tracing::info!(api_url = %config.assistant.api_url, "starting aura voice client");

    let components = SessionComponents {
        capture: Box::new(MicBackend),
        recognizer: Box::new(NoOnDeviceRecognizer),
        transcriber: Arc::new(RemoteTranscriber::new(&config.assistant.api_url)),
        assistant: Arc::new(AssistantClient::new(
            &config.assistant.api_url,
            &config.assistant.user_id,
        )),
        player: Arc::new(SpeakerPlayer),
    };

    let (controller, events) = SessionController::new(components, config.voice);
    tokio::spawn(render_events(events));

    let stop = controller.stop_handle();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        println!("Press Enter to talk, Enter again to stop (Ctrl+C quits)");
        if lines.next_line().await?.is_none() {
            break;
        }

        let session = controller.run_session();
        tokio::pin!(session);

        loop {
            tokio::select! {
                _ = &mut session => break,
                line = lines.next_line() => {
                    stop.notify_waiters();
                    if line?.is_none() {
                        break;
                    }
                }
            }
        }
    }

    Ok(())
}

/// Print session progress and the live meter to the terminal
async fn render_events(mut events: SessionEvents) {
    while let Some(event) = events.events.recv().await {
        match event {
            SessionEvent::StateChanged(state) => println!("[{state}]"),
            SessionEvent::Tick { elapsed_seconds } => {
                let frame = events.frames.borrow().clone();
                println!("  {elapsed_seconds:>2}s {}", render_meter(&frame));
            }
            SessionEvent::Completed(snapshot) => {
                if let Some(transcript) = &snapshot.transcript {
                    println!("you:  {transcript}");
                }
                if let (Some(intent), Some(reply)) = (&snapshot.intent, &snapshot.reply_text) {
                    println!("aura: {reply} ({intent})");
                }
                if snapshot.transcript.is_none() {
                    println!("(nothing captured)");
                }
            }
            SessionEvent::Failed { kind, message } => {
                let hint = match kind {
                    ErrorKind::PermissionDenied => "check microphone permissions",
                    ErrorKind::Network => "check the assistant service and try again",
                    ErrorKind::Unavailable => "remote recognition is unavailable",
                    ErrorKind::SynthesisUnavailable => "reply will be text only",
                    ErrorKind::Internal => "see logs for details",
                };
                println!("error: {message} ({hint})");
            }
        }
    }
}

/// Render a 16-bar frame as block characters
fn render_meter(frame: &VisualizationFrame) -> String {
    const BLOCKS: [char; 9] = [' ', '▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

    frame
        .bars
        .iter()
        .map(|&bar| {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let idx = ((bar / 100.0) * 8.0).round() as usize;
            BLOCKS[idx.min(8)]
        })
        .collect()
}

/// Record for a few seconds and report what the microphone produced
#[allow(clippy::future_not_send)]
async fn test_mic(duration: u64) -> anyhow::Result<()> {
    println!("Recording for {duration}s...");

    let stream = MicBackend.acquire().await?;
    let tap = stream.tap();

    tokio::time::sleep(Duration::from_secs(duration)).await;

    let peak = tap
        .latest(4096)
        .iter()
        .fold(0.0f32, |acc, &s| acc.max(s.abs()));
    let artifact = stream.finish();

    println!(
        "Captured {} samples ({} WAV bytes), recent peak {peak:.3}",
        artifact.sample_count,
        artifact.bytes.len()
    );
    if peak < 0.01 {
        println!("Peak is near zero; the microphone may be muted.");
    }

    Ok(())
}

/// Play one second of a 440Hz tone
async fn test_speaker() -> anyhow::Result<()> {
    println!("Playing test tone...");

    let samples: Vec<f32> = (0..24000)
        .map(|i| {
            #[allow(clippy::cast_precision_loss)]
            let t = i as f32 / 24000.0;
            0.3 * (2.0 * std::f32::consts::PI * 440.0 * t).sin()
        })
        .collect();

    SpeakerPlayer::play_samples(samples).await?;
    println!("Done.");
    Ok(())
}

/// Round-trip text through the synthesis endpoint and the speakers
async fn test_tts(config: &Config, text: &str) -> anyhow::Result<()> {
    use aura_voice::assistant::Assistant;

    println!("Synthesizing: {text}");

    let client = AssistantClient::new(&config.assistant.api_url, &config.assistant.user_id);
    let audio = client.synthesize(text).await?;
    println!("Received {} bytes of audio", audio.len());

    SpeakerPlayer.play(&audio).await?;
    println!("Done.");
    Ok(())
}
