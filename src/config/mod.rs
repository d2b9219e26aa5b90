//! Configuration management for the aura voice client

pub mod file;

use std::time::Duration;

use crate::Result;

/// Default assistant API base URL
const DEFAULT_API_URL: &str = "http://localhost:5000";

/// Capture force-stop ceiling (seconds)
const DEFAULT_MAX_CAPTURE_SECS: u64 = 10;

/// Prior turns folded into reply requests
const DEFAULT_HISTORY_TURNS: usize = 8;

/// Aura voice client configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Assistant endpoints
    pub assistant: AssistantConfig,

    /// Voice session behavior
    pub voice: VoiceConfig,
}

/// Assistant endpoint configuration
#[derive(Debug, Clone)]
pub struct AssistantConfig {
    /// Base URL of the assistant API
    pub api_url: String,

    /// User identifier sent with reply requests
    pub user_id: String,
}

/// Voice session configuration
#[derive(Debug, Clone)]
pub struct VoiceConfig {
    /// Synthesize and play spoken replies
    pub speak_replies: bool,

    /// Capture force-stop ceiling
    pub max_capture: Duration,

    /// Prior conversation turns folded into reply requests
    pub history_turns: usize,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            speak_replies: true,
            max_capture: Duration::from_secs(DEFAULT_MAX_CAPTURE_SECS),
            history_turns: DEFAULT_HISTORY_TURNS,
        }
    }
}

impl Config {
    /// Load configuration (env > toml > default)
    ///
    /// # Errors
    ///
    /// Returns error if an override value cannot be parsed
    pub fn load() -> Result<Self> {
        let fc = file::load_config_file();

        let assistant = AssistantConfig {
            api_url: std::env::var("AURA_API_URL")
                .ok()
                .or(fc.assistant.api_url)
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            user_id: std::env::var("AURA_USER_ID")
                .ok()
                .or(fc.assistant.user_id)
                .unwrap_or_else(|| "voice_user".to_string()),
        };

        let max_capture_secs = match std::env::var("AURA_MAX_CAPTURE_SECS") {
            Ok(raw) => Some(raw.parse().map_err(|_| {
                crate::Error::Config(format!("invalid AURA_MAX_CAPTURE_SECS: {raw}"))
            })?),
            Err(_) => fc.voice.max_capture_secs,
        };

        let voice = VoiceConfig {
            speak_replies: std::env::var("AURA_SPEAK_REPLIES")
                .ok()
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .or(fc.voice.speak_replies)
                .unwrap_or(true),
            max_capture: Duration::from_secs(
                max_capture_secs.unwrap_or(DEFAULT_MAX_CAPTURE_SECS),
            ),
            history_turns: fc.voice.history_turns.unwrap_or(DEFAULT_HISTORY_TURNS),
        };

        Ok(Self { assistant, voice })
    }
}
