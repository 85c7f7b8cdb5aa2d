//! Text-to-speech (TTS) processing

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

use crate::config::{ApiKeys, VoiceConfig};
use crate::{Error, Result};

const OPENAI_URL: &str = "https://api.openai.com";
const ELEVENLABS_URL: &str = "https://api.elevenlabs.io";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// TTS provider backend
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TtsProvider {
    OpenAI,
    ElevenLabs,
}

/// Synthesizes speech from text
pub struct TextToSpeech {
    client: reqwest::Client,
    api_key: SecretString,
    voice: String,
    speed: f32,
    model: String,
    provider: TtsProvider,
    base_url: String,
}

impl std::fmt::Debug for TextToSpeech {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextToSpeech")
            .field("provider", &self.provider)
            .field("voice", &self.voice)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl TextToSpeech {
    /// Create a new TTS instance using `OpenAI`
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing
    pub fn new_openai(
        api_key: SecretString,
        voice: String,
        speed: f32,
        model: String,
    ) -> Result<Self> {
        Self::build(api_key, voice, speed, model, TtsProvider::OpenAI, OPENAI_URL)
    }

    /// Create a new TTS instance using ElevenLabs
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing
    pub fn new_elevenlabs(api_key: SecretString, voice_id: String, model: String) -> Result<Self> {
        // ElevenLabs doesn't use speed in the same way
        Self::build(
            api_key,
            voice_id,
            1.0,
            model,
            TtsProvider::ElevenLabs,
            ELEVENLABS_URL,
        )
    }

    fn build(
        api_key: SecretString,
        voice: String,
        speed: f32,
        model: String,
        provider: TtsProvider,
        base_url: &str,
    ) -> Result<Self> {
        if api_key.expose_secret().is_empty() {
            return Err(Error::Config(format!("{provider:?} API key required for TTS")));
        }

        Ok(Self {
            client: reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?,
            api_key,
            voice,
            speed,
            model,
            provider,
            base_url: base_url.to_string(),
        })
    }

    /// Build from voice settings, using the key of the selected provider
    ///
    /// # Errors
    ///
    /// Returns error if the provider is unknown or its API key is missing
    pub fn from_config(voice: &VoiceConfig, keys: &ApiKeys) -> Result<Self> {
        let missing = |name: &str| Error::NotConfigured(format!("{name} API key required for TTS"));

        match voice.tts_provider.as_str() {
            "openai" => {
                let key = keys.openai.as_ref().ok_or_else(|| missing("OpenAI"))?;
                Self::new_openai(
                    SecretString::from(key.expose_secret().to_owned()),
                    voice.tts_voice.clone(),
                    voice.tts_speed,
                    voice.tts_model.clone(),
                )
            }
            "elevenlabs" => {
                let key = keys.elevenlabs.as_ref().ok_or_else(|| missing("ElevenLabs"))?;
                Self::new_elevenlabs(
                    SecretString::from(key.expose_secret().to_owned()),
                    voice.tts_voice.clone(),
                    voice.tts_model.clone(),
                )
            }
            other => Err(Error::Config(format!("unknown TTS provider: {other}"))),
        }
    }

    /// Point requests at a different host (proxies, tests)
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Synthesize text to speech
    ///
    /// # Returns
    ///
    /// Audio bytes (MP3 format)
    ///
    /// # Errors
    ///
    /// Returns error if synthesis fails
    pub async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        match self.provider {
            TtsProvider::OpenAI => self.synthesize_openai(text).await,
            TtsProvider::ElevenLabs => self.synthesize_elevenlabs(text).await,
        }
    }

    /// Synthesize using OpenAI TTS
    async fn synthesize_openai(&self, text: &str) -> Result<Vec<u8>> {
        #[derive(serde::Serialize)]
        struct TtsRequest<'a> {
            model: &'a str,
            input: &'a str,
            voice: &'a str,
            speed: f32,
        }

        let request = TtsRequest {
            model: &self.model,
            input: text,
            voice: &self.voice,
            speed: self.speed,
        };

        let response = self
            .client
            .post(format!("{}/v1/audio/speech", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Tts(format!("OpenAI TTS error {status}: {body}")));
        }

        let audio = response.bytes().await?;
        Ok(audio.to_vec())
    }

    /// Synthesize using ElevenLabs TTS
    async fn synthesize_elevenlabs(&self, text: &str) -> Result<Vec<u8>> {
        #[derive(serde::Serialize)]
        struct ElevenLabsRequest<'a> {
            text: &'a str,
            model_id: &'a str,
        }

        let url = format!(
            "{}/v1/text-to-speech/{}",
            self.base_url,
            urlencoding::encode(&self.voice)
        );

        let request = ElevenLabsRequest {
            text,
            model_id: &self.model,
        };

        let response = self
            .client
            .post(&url)
            .header("xi-api-key", self.api_key.expose_secret())
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Tts(format!("ElevenLabs TTS error {status}: {body}")));
        }

        let audio = response.bytes().await?;
        Ok(audio.to_vec())
    }
}
