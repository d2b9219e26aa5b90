//! Remote speech-to-text and command dispatch client

use async_trait::async_trait;
use serde::Deserialize;

use crate::assistant::decode_audio_base64;
use crate::{Error, Result};

use super::{CommandOutcome, Transcriber};

/// Transcript the service reports when it has no speech recognition
const UNAVAILABLE_COMMAND: &str = "Speech recognition unavailable";

/// Wire shape of a voice-command response. Every field is optional so a
/// partial payload parses and gets classified here rather than in serde.
#[derive(Debug, Deserialize)]
struct VoiceCommandResponse {
    error: Option<String>,
    command: Option<String>,
    intent: Option<String>,
    response: Option<String>,
    audio: Option<String>,
}

/// Client for the remote `/api/voice-command` endpoint
pub struct RemoteTranscriber {
    client: reqwest::Client,
    base_url: String,
}

impl RemoteTranscriber {
    #[must_use]
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl Transcriber for RemoteTranscriber {
    async fn transcribe(&self, audio: &[u8]) -> Result<CommandOutcome> {
        let url = format!("{}/api/voice-command", self.base_url);

        let part = reqwest::multipart::Part::bytes(audio.to_vec())
            .file_name("recording.wav")
            .mime_str("audio/wav")
            .map_err(|e| Error::Network(e.to_string()))?;
        let form = reqwest::multipart::Form::new().part("audio", part);

        tracing::debug!(url = %url, bytes = audio.len(), "sending voice command");

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| Error::Network(format!("voice command request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::Network(format!("failed to read response body: {e}")))?;

        let parsed: VoiceCommandResponse = serde_json::from_str(&body).map_err(|_| {
            if status.is_success() {
                Error::MalformedResponse(format!("unparseable voice command response: {body}"))
            } else {
                Error::Network(format!("voice command returned {status}"))
            }
        })?;

        // An explicit capability signal is the only thing that counts as
        // unavailable; everything else is a retryable network failure.
        if let Some(error) = parsed.error {
            if error.to_lowercase().contains("unavailable") {
                return Err(Error::Unavailable(error));
            }
            return Err(Error::Network(error));
        }

        if !status.is_success() {
            return Err(Error::Network(format!("voice command returned {status}")));
        }

        let (Some(command), Some(intent)) = (parsed.command, parsed.intent) else {
            return Err(Error::MalformedResponse(
                "voice command response missing command or intent".to_string(),
            ));
        };

        if intent == "error" && command == UNAVAILABLE_COMMAND {
            return Err(Error::Unavailable(command));
        }

        let reply_audio = parsed
            .audio
            .map(|encoded| decode_audio_base64(&encoded))
            .transpose()?;

        tracing::info!(command = %command, intent = %intent, "voice command recognized");

        Ok(CommandOutcome {
            transcript: command,
            intent,
            reply_text: parsed.response,
            reply_audio,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_payload_parses() {
        let parsed: VoiceCommandResponse = serde_json::from_str(
            r#"{
                "command": "turn on the lights",
                "intent": "device_control",
                "response": "Done.",
                "audio": null,
                "format": "mp3",
                "timestamp": "2026-08-23T10:00:00Z"
            }"#,
        )
        .unwrap();

        assert_eq!(parsed.command.as_deref(), Some("turn on the lights"));
        assert_eq!(parsed.intent.as_deref(), Some("device_control"));
        assert_eq!(parsed.response.as_deref(), Some("Done."));
        assert!(parsed.audio.is_none());
        assert!(parsed.error.is_none());
    }

    #[test]
    fn error_payload_parses_without_command() {
        let parsed: VoiceCommandResponse =
            serde_json::from_str(r#"{"error": "Speech recognition unavailable"}"#).unwrap();
        assert!(parsed.command.is_none());
        assert!(parsed.error.is_some());
    }
}
