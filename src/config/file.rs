//! TOML configuration file loading
//!
//! Supports `~/.config/aura/config.toml` as a persistent config source.
//! All fields are optional — the file is a partial overlay on top of defaults.

use std::path::PathBuf;

use serde::Deserialize;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct AuraConfigFile {
    /// Assistant endpoint configuration
    #[serde(default)]
    pub assistant: AssistantFileConfig,

    /// Voice/audio configuration
    #[serde(default)]
    pub voice: VoiceFileConfig,
}

/// Assistant endpoint configuration
#[derive(Debug, Default, Deserialize)]
pub struct AssistantFileConfig {
    /// Base URL of the assistant API (e.g. `http://localhost:5000`)
    pub api_url: Option<String>,

    /// User identifier sent with reply requests
    pub user_id: Option<String>,
}

/// Voice processing configuration
#[derive(Debug, Default, Deserialize)]
pub struct VoiceFileConfig {
    /// Enable spoken replies (synthesis + playback)
    pub speak_replies: Option<bool>,

    /// Capture ceiling in seconds
    pub max_capture_secs: Option<u64>,

    /// Prior conversation turns folded into reply requests
    pub history_turns: Option<usize>,
}

/// Load the TOML config file from the standard path
///
/// Returns `AuraConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> AuraConfigFile {
    let Some(path) = config_file_path() else {
        return AuraConfigFile::default();
    };

    if !path.exists() {
        return AuraConfigFile::default();
    }

    match std::fs::read_to_string(&path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                AuraConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            AuraConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/aura/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("aura").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_partial_file() {
        let file: AuraConfigFile = toml::from_str(
            r#"
            [assistant]
            api_url = "http://localhost:5000"

            [voice]
            speak_replies = false
            "#,
        )
        .unwrap();

        assert_eq!(
            file.assistant.api_url.as_deref(),
            Some("http://localhost:5000")
        );
        assert_eq!(file.voice.speak_replies, Some(false));
        assert_eq!(file.voice.max_capture_secs, None);
    }

    #[test]
    fn empty_file_is_all_defaults() {
        let file: AuraConfigFile = toml::from_str("").unwrap();
        assert!(file.assistant.api_url.is_none());
        assert!(file.voice.history_turns.is_none());
    }
}
