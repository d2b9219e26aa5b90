//! Assistant reply and speech synthesis client

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Base64 is decoded in fixed slices rather than one allocation-heavy pass
const DECODE_CHUNK: usize = 512;

/// One completed exchange folded into later reply requests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    /// What the user said
    pub user: String,
    /// What the assistant replied
    pub assistant: String,
}

/// Produces replies and synthesized speech for transcribed commands
#[async_trait]
pub trait Assistant: Send + Sync {
    /// Generate a reply to a transcribed command
    ///
    /// # Errors
    ///
    /// Returns [`Error::Network`] on transport failure,
    /// [`Error::MalformedResponse`] when the payload lacks a reply
    async fn reply(&self, text: &str, history: &[Turn]) -> Result<String>;

    /// Synthesize speech for a reply (best effort)
    ///
    /// # Errors
    ///
    /// Returns [`Error::SynthesisUnavailable`] on any failure; callers
    /// degrade to a text-only reply
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>>;
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
    user_id: &'a str,
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    history: &'a [Turn],
}

#[derive(Deserialize)]
struct ChatResponse {
    response: Option<String>,
    error: Option<String>,
}

#[derive(Serialize)]
struct TtsRequest<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct TtsResponse {
    audio: Option<String>,
}

/// HTTP client for the assistant's chat and TTS endpoints
pub struct AssistantClient {
    client: reqwest::Client,
    base_url: String,
    user_id: String,
}

impl AssistantClient {
    #[must_use]
    pub fn new(base_url: &str, user_id: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            user_id: user_id.to_string(),
        }
    }
}

#[async_trait]
impl Assistant for AssistantClient {
    async fn reply(&self, text: &str, history: &[Turn]) -> Result<String> {
        let url = format!("{}/api/chatbot", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&ChatRequest {
                message: text,
                user_id: &self.user_id,
                history,
            })
            .send()
            .await
            .map_err(|e| Error::Network(format!("chat request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Network(format!("chat endpoint returned {status}")));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::MalformedResponse(format!("unparseable chat response: {e}")))?;

        if let Some(error) = parsed.error {
            return Err(Error::Network(error));
        }

        parsed.response.ok_or_else(|| {
            Error::MalformedResponse("chat response missing reply text".to_string())
        })
    }

    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        let url = format!("{}/api/tts", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&TtsRequest { text })
            .send()
            .await
            .map_err(|e| Error::SynthesisUnavailable(format!("tts request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::SynthesisUnavailable(format!(
                "tts endpoint returned {status}"
            )));
        }

        let parsed: TtsResponse = response.json().await.map_err(|e| {
            Error::SynthesisUnavailable(format!("unparseable tts response: {e}"))
        })?;

        let encoded = parsed.audio.ok_or_else(|| {
            Error::SynthesisUnavailable("tts response missing audio".to_string())
        })?;

        decode_audio_base64(&encoded)
            .map_err(|e| Error::SynthesisUnavailable(format!("bad tts audio: {e}")))
    }
}

/// Decode base64-encoded reply audio in fixed 512-character slices.
///
/// Slice length is a multiple of four, so each slice is independently
/// valid base64 and the concatenation matches a single-pass decode.
///
/// # Errors
///
/// Returns [`Error::MalformedResponse`] if any slice is not valid base64
pub fn decode_audio_base64(encoded: &str) -> Result<Vec<u8>> {
    let mut bytes = Vec::with_capacity(encoded.len() / 4 * 3);

    for chunk in encoded.as_bytes().chunks(DECODE_CHUNK) {
        let decoded = STANDARD
            .decode(chunk)
            .map_err(|e| Error::MalformedResponse(format!("invalid base64 audio: {e}")))?;
        bytes.extend_from_slice(&decoded);
    }

    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_payload_longer_than_one_slice() {
        let original: Vec<u8> = (0..=255u8).cycle().take(2000).collect();
        let encoded = STANDARD.encode(&original);
        assert!(encoded.len() > DECODE_CHUNK);

        let decoded = decode_audio_base64(&encoded).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn decodes_short_payload() {
        let encoded = STANDARD.encode(b"hi");
        assert_eq!(decode_audio_base64(&encoded).unwrap(), b"hi");
    }

    #[test]
    fn rejects_garbage_base64() {
        assert!(decode_audio_base64("not base64!!!").is_err());
    }

    #[test]
    fn history_is_omitted_when_empty() {
        let body = serde_json::to_value(ChatRequest {
            message: "hello",
            user_id: "voice_user",
            history: &[],
        })
        .unwrap();

        assert!(body.get("history").is_none());
        assert_eq!(body["message"], "hello");
    }
}
