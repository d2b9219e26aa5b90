//! Error types for the aura voice client

use thiserror::Error;

/// Result type alias for aura operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the voice client
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Microphone stream acquisition refused by the host
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Audio device or codec error
    #[error("audio error: {0}")]
    Audio(String),

    /// Transport or status failure talking to a remote endpoint
    #[error("network error: {0}")]
    Network(String),

    /// Remote returned an unparseable payload
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Remote explicitly signals a missing capability
    #[error("unavailable: {0}")]
    Unavailable(String),

    /// Speech synthesis capability absent or failed (never fatal)
    #[error("synthesis unavailable: {0}")]
    SynthesisUnavailable(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Coarse error classification surfaced to the UI layer alongside the
/// human-readable cause
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Stream acquisition refused; the user must retry
    PermissionDenied,
    /// Transport, status, or decode failure; a new session may retry
    Network,
    /// Remote capability missing; triggers the sticky failover
    Unavailable,
    /// Synthesis degraded to text-only reply
    SynthesisUnavailable,
    /// Everything else (config, io, audio device)
    Internal,
}

impl Error {
    /// Classify this error for the session event stream.
    ///
    /// Malformed payloads and reqwest transport failures are reported as
    /// network errors; only an explicit capability signal maps to
    /// [`ErrorKind::Unavailable`].
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::PermissionDenied(_) => ErrorKind::PermissionDenied,
            Self::Network(_) | Self::MalformedResponse(_) | Self::Http(_) => ErrorKind::Network,
            Self::Unavailable(_) => ErrorKind::Unavailable,
            Self::SynthesisUnavailable(_) => ErrorKind::SynthesisUnavailable,
            Self::Config(_)
            | Self::Audio(_)
            | Self::Io(_)
            | Self::Serialization(_)
            | Self::Toml(_) => ErrorKind::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_response_reports_as_network() {
        let err = Error::MalformedResponse("not json".to_string());
        assert_eq!(err.kind(), ErrorKind::Network);
    }

    #[test]
    fn unavailable_is_distinct_from_network() {
        let err = Error::Unavailable("speech recognition".to_string());
        assert_eq!(err.kind(), ErrorKind::Unavailable);
    }
}
