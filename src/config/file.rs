//! TOML configuration file loading
//!
//! Supports `~/.config/jarvis/config.toml` as a persistent config source.
//! All fields are optional — the file is a partial overlay on top of defaults.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct JarvisConfigFile {
    /// Name the assistant answers to (e.g. "jarvis")
    #[serde(default)]
    pub assistant_name: Option<String>,

    /// Name used in greetings
    #[serde(default)]
    pub user_name: Option<String>,

    /// Directory holding state, memory and pid records
    #[serde(default)]
    pub data_dir: Option<String>,

    /// Command line of the main assistant process
    #[serde(default)]
    pub main_command: Option<Vec<String>>,

    /// Voice/audio configuration
    #[serde(default)]
    pub voice: VoiceFileConfig,

    /// Wake listener backoff tuning
    #[serde(default)]
    pub listener: ListenerFileConfig,

    /// API keys for external services
    #[serde(default)]
    pub api_keys: ApiKeysFileConfig,

    /// Sleep/wake phrase overrides
    #[serde(default)]
    pub phrases: PhrasesFileConfig,

    /// Provider settings (weather, news, knowledge, conversation)
    #[serde(default)]
    pub integrations: IntegrationsFileConfig,

    /// Application catalog overrides: name → command line
    #[serde(default)]
    pub apps: BTreeMap<String, Vec<String>>,

    /// Helper program for face/QR detection
    #[serde(default)]
    pub vision_command: Option<Vec<String>>,
}

/// Voice processing configuration
#[derive(Debug, Default, Deserialize)]
pub struct VoiceFileConfig {
    /// Enable microphone input and spoken replies
    pub enabled: Option<bool>,

    /// STT provider ("whisper" or "deepgram")
    pub stt_provider: Option<String>,

    /// STT model (e.g. "whisper-1")
    pub stt_model: Option<String>,

    /// TTS provider ("openai" or "elevenlabs")
    pub tts_provider: Option<String>,

    /// TTS model (e.g. "tts-1")
    pub tts_model: Option<String>,

    /// TTS voice identifier (e.g. "alloy")
    pub tts_voice: Option<String>,

    /// TTS speed multiplier
    pub tts_speed: Option<f32>,

    /// Seconds to wait for speech to start
    pub capture_timeout_secs: Option<u64>,

    /// Maximum seconds of a single phrase
    pub phrase_limit_secs: Option<u64>,

    /// Milliseconds of ambient audio used for calibration
    pub calibration_ms: Option<u64>,
}

/// Wake listener configuration
#[derive(Debug, Default, Deserialize)]
pub struct ListenerFileConfig {
    pub no_speech_backoff_ms: Option<u64>,
    pub service_backoff_ms: Option<u64>,
    pub error_backoff_ms: Option<u64>,
}

/// API keys configuration
#[derive(Debug, Default, Deserialize)]
pub struct ApiKeysFileConfig {
    pub openai: Option<String>,
    pub deepgram: Option<String>,
    pub elevenlabs: Option<String>,
    pub openweather: Option<String>,
    pub newsapi: Option<String>,
    pub conversation: Option<String>,
}

/// Phrase set overrides
#[derive(Debug, Default, Deserialize)]
pub struct PhrasesFileConfig {
    pub sleep: Option<Vec<String>>,
    pub wake: Option<Vec<String>>,
}

/// Provider endpoints and options
#[derive(Debug, Default, Deserialize)]
pub struct IntegrationsFileConfig {
    pub weather_url: Option<String>,
    pub news_url: Option<String>,
    pub news_country: Option<String>,
    pub knowledge_url: Option<String>,
    pub conversation_url: Option<String>,
    pub conversation_model: Option<String>,
}

/// Load the TOML config file from the standard path
///
/// Returns `JarvisConfigFile::default()` if the file doesn't exist or can't be parsed.
#[must_use]
pub fn load_config_file() -> JarvisConfigFile {
    let Some(path) = config_file_path() else {
        return JarvisConfigFile::default();
    };

    load_config_file_from(&path)
}

/// Load a config file from an explicit path, with the same fail-soft contract
#[must_use]
pub fn load_config_file_from(path: &Path) -> JarvisConfigFile {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no config file found, using defaults");
        return JarvisConfigFile::default();
    }

    match std::fs::read_to_string(path) {
        Ok(contents) => match toml::from_str(&contents) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to parse config file");
                JarvisConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to read config file");
            JarvisConfigFile::default()
        }
    }
}

/// Standard config file path (`~/.config/jarvis/config.toml` on Linux)
#[must_use]
pub fn config_file_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("JARVIS_CONFIG") {
        return Some(PathBuf::from(path));
    }

    directories::ProjectDirs::from("dev", "jarvis", "jarvis")
        .map(|d| d.config_dir().join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_parses_to_defaults() {
        let config: JarvisConfigFile = toml::from_str("").unwrap();
        assert!(config.assistant_name.is_none());
        assert!(config.apps.is_empty());
    }

    #[test]
    fn partial_overlay_parses() {
        let config: JarvisConfigFile = toml::from_str(
            r#"
            assistant_name = "friday"

            [voice]
            enabled = false
            capture_timeout_secs = 4

            [phrases]
            sleep = ["take a nap"]

            [apps]
            editor = ["code"]
            "#,
        )
        .unwrap();

        assert_eq!(config.assistant_name.as_deref(), Some("friday"));
        assert_eq!(config.voice.enabled, Some(false));
        assert_eq!(config.voice.capture_timeout_secs, Some(4));
        assert_eq!(config.phrases.sleep, Some(vec!["take a nap".to_string()]));
        assert_eq!(config.apps.get("editor"), Some(&vec!["code".to_string()]));
    }

    #[test]
    fn unparsable_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "assistant_name = [").unwrap();

        let config = load_config_file_from(&path);
        assert!(config.assistant_name.is_none());
    }
}
