//! Error types for the Jarvis core

use thiserror::Error;

/// Result type alias for Jarvis operations
pub type Result<T> = std::result::Result<T, Error>;

/// Why a capture attempt produced no usable transcript
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RecognitionFailure {
    /// Audio was captured but nothing intelligible was said
    #[error("no speech detected")]
    NoSpeech,
    /// The speech-to-text service could not be reached or rejected the request
    #[error("recognition service unavailable")]
    ServiceUnavailable,
    /// The input device is missing or stopped delivering samples
    #[error("microphone unavailable")]
    Microphone,
}

/// Errors that can occur in the Jarvis core
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Audio device error
    #[error("audio error: {0}")]
    Audio(String),

    /// Speech-to-text error
    #[error("STT error: {0}")]
    Stt(String),

    /// Text-to-speech error
    #[error("TTS error: {0}")]
    Tts(String),

    /// Capture or transcription produced no utterance
    #[error("recognition failed: {0}")]
    Recognition(RecognitionFailure),

    /// External provider (weather, news, knowledge, vision) failed
    #[error("provider error: {0}")]
    Provider(String),

    /// Resource not found (unknown city, missing article)
    #[error("not found: {0}")]
    NotFound(String),

    /// Collaborator is not configured (missing API key, no helper)
    #[error("not configured: {0}")]
    NotConfigured(String),

    /// Operation is not supported on this platform
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// Process launch or termination failed
    #[error("process error: {0}")]
    Process(String),

    /// Another live process holds the instance lock
    #[error("already running with pid {pid}")]
    AlreadyRunning {
        /// Pid of the live holder
        pid: u32,
    },

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

impl Error {
    /// Disk and network failures that are logged and retried or skipped
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Io(_) | Self::Http(_) | Self::Recognition(_) | Self::Audio(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognition_failure_display() {
        let err = Error::Recognition(RecognitionFailure::NoSpeech);
        assert_eq!(err.to_string(), "recognition failed: no speech detected");
    }

    #[test]
    fn transient_classification() {
        let io = Error::Io(std::io::Error::other("disk full"));
        assert!(io.is_transient());
        assert!(Error::Recognition(RecognitionFailure::Microphone).is_transient());
        assert!(!Error::Stt("bad key".to_string()).is_transient());
        assert!(!Error::Config("bad".to_string()).is_transient());
        assert!(!Error::AlreadyRunning { pid: 7 }.is_transient());
    }
}
