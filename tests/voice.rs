//! Audio pipeline tests: WAV encoding, the visualizer cadence task, and
//! reply audio decoding.

mod common;

use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use tokio::sync::watch;

use aura_voice::assistant::decode_audio_base64;
use aura_voice::voice::{
    finalize_artifact, samples_to_wav, SampleTap, VisualizationFrame, VisualizerTask, BAR_COUNT,
    SAMPLE_RATE,
};

use common::sine;

#[test]
fn wav_output_round_trips_through_hound() {
    let samples = sine(440.0, 0.1);
    let wav = samples_to_wav(&samples, SAMPLE_RATE).unwrap();

    assert_eq!(&wav[0..4], b"RIFF");
    assert_eq!(&wav[8..12], b"WAVE");

    let reader = hound::WavReader::new(std::io::Cursor::new(wav)).unwrap();
    let spec = reader.spec();
    assert_eq!(spec.channels, 1);
    assert_eq!(spec.sample_rate, SAMPLE_RATE);
    assert_eq!(spec.bits_per_sample, 16);
    assert_eq!(reader.len() as usize, samples.len());
}

#[test]
fn wav_encoding_clamps_out_of_range_samples() {
    let wav = samples_to_wav(&[2.0, -2.0, 0.0], SAMPLE_RATE).unwrap();

    let mut reader = hound::WavReader::new(std::io::Cursor::new(wav)).unwrap();
    let decoded: Vec<i16> = reader.samples::<i16>().map(Result::unwrap).collect();
    assert_eq!(decoded, vec![32767, -32768, 0]);
}

#[test]
fn artifact_records_sample_count_and_rate() {
    let samples = sine(440.0, 0.25);
    let artifact = finalize_artifact(&samples, SAMPLE_RATE);

    assert!(!artifact.is_empty());
    assert_eq!(artifact.sample_count, samples.len());
    assert_eq!(artifact.sample_rate, SAMPLE_RATE);
    assert!(artifact.bytes.len() > artifact.sample_count * 2);
}

#[tokio::test(start_paused = true)]
async fn visualizer_publishes_frames_then_clears_on_stop() {
    let tap = SampleTap::default();
    tap.push(&sine(440.0, 0.1));

    let (tx, mut rx) = watch::channel(VisualizationFrame::silent());
    let task = VisualizerTask::spawn(tap, tx);

    rx.changed().await.unwrap();
    let live = rx.borrow_and_update().clone();
    assert_eq!(live.bars.len(), BAR_COUNT);
    assert!(live.bars.iter().any(|&b| b > 0.0));
    assert!(live.bars.iter().all(|&b| (0.0..=100.0).contains(&b)));

    task.stop().await;
    assert_eq!(*rx.borrow(), VisualizationFrame::silent());
}

#[tokio::test(start_paused = true)]
async fn visualizer_overwrites_rather_than_queueing() {
    let tap = SampleTap::default();
    tap.push(&sine(440.0, 0.1));

    let (tx, rx) = watch::channel(VisualizationFrame::silent());
    let task = VisualizerTask::spawn(tap, tx);

    // A consumer that never polls for half a second sees only one frame
    tokio::time::sleep(Duration::from_millis(500)).await;
    let frame = rx.borrow().clone();
    assert!(frame.bars.iter().any(|&b| b > 0.0));

    task.stop().await;
}

#[test]
fn chunked_base64_decode_matches_single_pass() {
    let payload: Vec<u8> = (0..4096u32).map(|i| (i % 251) as u8).collect();
    let encoded = STANDARD.encode(&payload);

    let decoded = decode_audio_base64(&encoded).unwrap();
    assert_eq!(decoded, STANDARD.decode(&encoded).unwrap());
    assert_eq!(decoded, payload);
}
