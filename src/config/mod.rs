//! Configuration management for the Jarvis core
//!
//! Layers, lowest priority first: built-in defaults, the TOML file
//! (see [`file`]), then environment variables.

pub mod file;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::SecretString;

use crate::supervisor::LaunchTarget;
use crate::{Error, Result};

use file::JarvisConfigFile;

/// File name of the persisted sleep/awake flag
pub const STATE_FILE: &str = "jarvis_state.json";

/// File name of the persisted fact memory
pub const MEMORY_FILE: &str = "memory.json";

/// File name of the main-process pid record
pub const PID_FILE: &str = "jarvis_launcher.pid";

/// File name of the wake listener's single-instance lock
pub const LISTENER_LOCK_FILE: &str = "wake_listener.lock";

/// Jarvis configuration
#[derive(Debug)]
pub struct Config {
    /// Name the assistant answers to, lowercase
    pub assistant_name: String,

    /// Name used in greetings
    pub user_name: String,

    /// Path to data directory (state, memory, pid records, logs)
    pub data_dir: PathBuf,

    /// Command line of the main assistant process (`None` = this binary)
    pub main_command: Option<Vec<String>>,

    /// Voice configuration
    pub voice: VoiceConfig,

    /// Wake listener timing
    pub listener: ListenerConfig,

    /// API keys
    pub api_keys: ApiKeys,

    /// Sleep/wake phrase overrides
    pub phrases: PhraseOverrides,

    /// Provider endpoints
    pub integrations: IntegrationsConfig,

    /// Application catalog overrides
    pub apps: BTreeMap<String, Vec<String>>,

    /// Helper program for face/QR detection
    pub vision_command: Option<Vec<String>>,
}

/// Voice processing configuration
#[derive(Debug, Clone)]
pub struct VoiceConfig {
    /// Enable microphone input and spoken replies
    pub enabled: bool,

    /// STT provider ("whisper" or "deepgram")
    pub stt_provider: String,

    /// STT model (e.g. "whisper-1", "nova-2")
    pub stt_model: String,

    /// TTS provider ("openai" or "elevenlabs")
    pub tts_provider: String,

    /// TTS model
    pub tts_model: String,

    /// TTS voice identifier
    pub tts_voice: String,

    /// TTS speed multiplier (0.25 to 4.0)
    pub tts_speed: f32,

    /// Ambient audio sampled once for calibration
    pub calibration: Duration,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            stt_provider: "whisper".to_string(),
            stt_model: "whisper-1".to_string(),
            tts_provider: "openai".to_string(),
            tts_model: "tts-1".to_string(),
            tts_voice: "alloy".to_string(),
            tts_speed: 1.0,
            calibration: Duration::from_millis(1000),
        }
    }
}

/// Wake listener timing
#[derive(Debug, Clone)]
pub struct ListenerConfig {
    /// How long a capture waits for speech to start
    pub capture_timeout: Duration,

    /// Maximum length of one phrase
    pub phrase_limit: Duration,

    /// Pause after a capture with no intelligible speech
    pub no_speech_backoff: Duration,

    /// Pause after the recognition service was unreachable
    pub service_backoff: Duration,

    /// Pause after any other failure (microphone, IO)
    pub error_backoff: Duration,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            capture_timeout: Duration::from_secs(6),
            phrase_limit: Duration::from_secs(5),
            no_speech_backoff: Duration::from_millis(200),
            service_backoff: Duration::from_secs(2),
            error_backoff: Duration::from_secs(1),
        }
    }
}

/// API keys for external services
#[derive(Debug, Default)]
pub struct ApiKeys {
    /// `OpenAI` API key (Whisper STT and TTS)
    pub openai: Option<SecretString>,

    /// `Deepgram` API key (optional STT)
    pub deepgram: Option<SecretString>,

    /// `ElevenLabs` API key (optional TTS)
    pub elevenlabs: Option<SecretString>,

    /// `OpenWeatherMap` API key
    pub openweather: Option<SecretString>,

    /// `NewsAPI` key
    pub newsapi: Option<SecretString>,

    /// Key for the OpenAI-compatible conversation endpoint
    pub conversation: Option<SecretString>,
}

/// Sleep/wake phrase overrides
#[derive(Debug, Clone, Default)]
pub struct PhraseOverrides {
    pub sleep: Option<Vec<String>>,
    pub wake: Option<Vec<String>>,
}

/// Provider endpoints
#[derive(Debug, Clone)]
pub struct IntegrationsConfig {
    /// `OpenWeatherMap` base URL
    pub weather_url: String,

    /// `NewsAPI` base URL
    pub news_url: String,

    /// Country code for top headlines
    pub news_country: String,

    /// Wikipedia base URL
    pub knowledge_url: String,

    /// OpenAI-compatible chat endpoint; `None` disables the conversational fallback
    pub conversation_url: Option<String>,

    /// Model used by the conversational fallback
    pub conversation_model: String,
}

impl Default for IntegrationsConfig {
    fn default() -> Self {
        Self {
            weather_url: "https://api.openweathermap.org".to_string(),
            news_url: "https://newsapi.org".to_string(),
            news_country: "in".to_string(),
            knowledge_url: "https://en.wikipedia.org".to_string(),
            conversation_url: None,
            conversation_model: "gpt-4o-mini".to_string(),
        }
    }
}

/// Default data directory (`~/.local/share/jarvis` on Linux)
#[must_use]
pub fn default_data_dir() -> PathBuf {
    directories::ProjectDirs::from("dev", "jarvis", "jarvis")
        .map_or_else(|| PathBuf::from(".jarvis"), |d| d.data_dir().to_path_buf())
}

impl Config {
    /// Hermetic configuration rooted at `data_dir`, ignoring file and environment
    #[must_use]
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            assistant_name: "jarvis".to_string(),
            user_name: "User".to_string(),
            data_dir: data_dir.into(),
            main_command: None,
            voice: VoiceConfig::default(),
            listener: ListenerConfig::default(),
            api_keys: ApiKeys::default(),
            phrases: PhraseOverrides::default(),
            integrations: IntegrationsConfig::default(),
            apps: BTreeMap::new(),
            vision_command: None,
        }
    }

    /// Load configuration from defaults, the config file and the environment
    ///
    /// # Errors
    ///
    /// Returns error if the data directory cannot be created
    pub fn load() -> Result<Self> {
        Self::load_with_options(false)
    }

    /// Load configuration with explicit voice disable option
    ///
    /// # Errors
    ///
    /// Returns error if the data directory cannot be created
    pub fn load_with_options(disable_voice: bool) -> Result<Self> {
        let file = file::load_config_file();
        let mut config = Self::with_data_dir(default_data_dir());
        config.apply_file(file);
        config.apply_env();

        if disable_voice {
            tracing::info!("voice explicitly disabled via --disable-voice");
            config.voice.enabled = false;
        }

        std::fs::create_dir_all(&config.data_dir).map_err(|e| {
            Error::Config(format!(
                "failed to create data directory {}: {e}",
                config.data_dir.display()
            ))
        })?;

        Ok(config)
    }

    /// Overlay values present in the config file
    pub fn apply_file(&mut self, file: JarvisConfigFile) {
        if let Some(name) = file.assistant_name {
            self.assistant_name = name.trim().to_lowercase();
        }
        if let Some(user) = file.user_name {
            self.user_name = user;
        }
        if let Some(dir) = file.data_dir {
            self.data_dir = PathBuf::from(dir);
        }
        if file.main_command.is_some() {
            self.main_command = file.main_command;
        }

        let voice = file.voice;
        if let Some(enabled) = voice.enabled {
            self.voice.enabled = enabled;
        }
        if let Some(provider) = voice.stt_provider {
            self.voice.stt_provider = provider;
        }
        if let Some(model) = voice.stt_model {
            self.voice.stt_model = model;
        }
        if let Some(provider) = voice.tts_provider {
            self.voice.tts_provider = provider;
        }
        if let Some(model) = voice.tts_model {
            self.voice.tts_model = model;
        }
        if let Some(tts_voice) = voice.tts_voice {
            self.voice.tts_voice = tts_voice;
        }
        if let Some(speed) = voice.tts_speed {
            self.voice.tts_speed = speed.clamp(0.25, 4.0);
        }
        if let Some(secs) = voice.capture_timeout_secs {
            self.listener.capture_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = voice.phrase_limit_secs {
            self.listener.phrase_limit = Duration::from_secs(secs);
        }
        if let Some(ms) = voice.calibration_ms {
            self.voice.calibration = Duration::from_millis(ms);
        }

        let listener = file.listener;
        if let Some(ms) = listener.no_speech_backoff_ms {
            self.listener.no_speech_backoff = Duration::from_millis(ms);
        }
        if let Some(ms) = listener.service_backoff_ms {
            self.listener.service_backoff = Duration::from_millis(ms);
        }
        if let Some(ms) = listener.error_backoff_ms {
            self.listener.error_backoff = Duration::from_millis(ms);
        }

        let keys = file.api_keys;
        overlay_secret(&mut self.api_keys.openai, keys.openai);
        overlay_secret(&mut self.api_keys.deepgram, keys.deepgram);
        overlay_secret(&mut self.api_keys.elevenlabs, keys.elevenlabs);
        overlay_secret(&mut self.api_keys.openweather, keys.openweather);
        overlay_secret(&mut self.api_keys.newsapi, keys.newsapi);
        overlay_secret(&mut self.api_keys.conversation, keys.conversation);

        if file.phrases.sleep.is_some() {
            self.phrases.sleep = file.phrases.sleep;
        }
        if file.phrases.wake.is_some() {
            self.phrases.wake = file.phrases.wake;
        }

        let integrations = file.integrations;
        if let Some(url) = integrations.weather_url {
            self.integrations.weather_url = url;
        }
        if let Some(url) = integrations.news_url {
            self.integrations.news_url = url;
        }
        if let Some(country) = integrations.news_country {
            self.integrations.news_country = country;
        }
        if let Some(url) = integrations.knowledge_url {
            self.integrations.knowledge_url = url;
        }
        if integrations.conversation_url.is_some() {
            self.integrations.conversation_url = integrations.conversation_url;
        }
        if let Some(model) = integrations.conversation_model {
            self.integrations.conversation_model = model;
        }

        self.apps.extend(file.apps);
        if file.vision_command.is_some() {
            self.vision_command = file.vision_command;
        }
    }

    /// Overlay values present in the environment
    pub fn apply_env(&mut self) {
        if let Ok(name) = std::env::var("JARVIS_NAME") {
            self.assistant_name = name.trim().to_lowercase();
        }
        if let Ok(user) = std::env::var("JARVIS_USER") {
            self.user_name = user;
        }
        if let Ok(dir) = std::env::var("JARVIS_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }
        if let Ok(command) = std::env::var("JARVIS_MAIN_COMMAND") {
            let parts: Vec<String> = command
                .split_whitespace()
                .map(ToString::to_string)
                .collect();
            if !parts.is_empty() {
                self.main_command = Some(parts);
            }
        }
        if std::env::var("JARVIS_DISABLE_VOICE")
            .is_ok_and(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        {
            self.voice.enabled = false;
        }

        overlay_secret(
            &mut self.api_keys.openai,
            std::env::var("OPENAI_API_KEY").ok(),
        );
        overlay_secret(
            &mut self.api_keys.deepgram,
            std::env::var("DEEPGRAM_API_KEY").ok(),
        );
        overlay_secret(
            &mut self.api_keys.elevenlabs,
            std::env::var("ELEVENLABS_API_KEY").ok(),
        );
        overlay_secret(
            &mut self.api_keys.openweather,
            std::env::var("OPENWEATHER_API_KEY").ok(),
        );
        overlay_secret(&mut self.api_keys.newsapi, std::env::var("NEWS_API_KEY").ok());
        overlay_secret(
            &mut self.api_keys.conversation,
            std::env::var("JARVIS_CONVERSATION_API_KEY").ok(),
        );

        if let Ok(url) = std::env::var("JARVIS_CONVERSATION_URL") {
            self.integrations.conversation_url = Some(url);
        }
        if let Ok(model) = std::env::var("JARVIS_CONVERSATION_MODEL") {
            self.integrations.conversation_model = model;
        }
        if let Ok(cmd) = std::env::var("JARVIS_VISION_COMMAND") {
            let parts: Vec<String> = cmd.split_whitespace().map(ToString::to_string).collect();
            if !parts.is_empty() {
                self.vision_command = Some(parts);
            }
        }
    }

    /// Path of the persisted sleep/awake flag
    #[must_use]
    pub fn state_path(&self) -> PathBuf {
        self.data_dir.join(STATE_FILE)
    }

    /// Path of the persisted fact memory
    #[must_use]
    pub fn memory_path(&self) -> PathBuf {
        self.data_dir.join(MEMORY_FILE)
    }

    /// Path of the main-process pid record
    #[must_use]
    pub fn pid_path(&self) -> PathBuf {
        self.data_dir.join(PID_FILE)
    }

    /// Path of the wake listener's instance lock
    #[must_use]
    pub fn listener_lock_path(&self) -> PathBuf {
        self.data_dir.join(LISTENER_LOCK_FILE)
    }

    /// Directory for log files of detached processes
    #[must_use]
    pub fn log_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }

    /// Resolve the main assistant process command line
    ///
    /// # Errors
    ///
    /// Returns error if no command is configured and the current executable
    /// cannot be determined
    pub fn launch_target(&self) -> Result<LaunchTarget> {
        if let Some((program, args)) = self.main_command.as_ref().and_then(|c| c.split_first()) {
            return Ok(LaunchTarget::new(program, args.to_vec()));
        }

        let exe = std::env::current_exe()?;
        let log_file = self.log_dir().join("session.log");
        Ok(LaunchTarget::new(
            exe,
            vec![
                "--log-file".to_string(),
                log_file.display().to_string(),
                "session".to_string(),
                "--voice".to_string(),
            ],
        ))
    }

    /// Data directory as a path reference
    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

fn overlay_secret(slot: &mut Option<SecretString>, value: Option<String>) {
    if let Some(value) = value.filter(|v| !v.trim().is_empty()) {
        *slot = Some(SecretString::from(value));
    }
}
