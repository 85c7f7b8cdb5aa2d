//! Speech-to-text (STT) processing

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

use crate::config::{ApiKeys, VoiceConfig};
use crate::{Error, Result};

const WHISPER_URL: &str = "https://api.openai.com";
const DEEPGRAM_URL: &str = "https://api.deepgram.com";

/// Upper bound for one transcription request
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Response from OpenAI Whisper transcription API
#[derive(serde::Deserialize)]
struct WhisperResponse {
    text: String,
}

/// Response from Deepgram transcription API
#[derive(serde::Deserialize)]
struct DeepgramResponse {
    results: DeepgramResults,
}

#[derive(serde::Deserialize)]
struct DeepgramResults {
    channels: Vec<DeepgramChannel>,
}

#[derive(serde::Deserialize)]
struct DeepgramChannel {
    alternatives: Vec<DeepgramAlternative>,
}

#[derive(serde::Deserialize)]
struct DeepgramAlternative {
    transcript: String,
}

/// STT provider backend
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SttProvider {
    Whisper,
    Deepgram,
}

impl SttProvider {
    const fn default_url(self) -> &'static str {
        match self {
            Self::Whisper => WHISPER_URL,
            Self::Deepgram => DEEPGRAM_URL,
        }
    }
}

/// Transcribes speech to text
pub struct SpeechToText {
    client: reqwest::Client,
    api_key: SecretString,
    model: String,
    provider: SttProvider,
    base_url: String,
}

impl std::fmt::Debug for SpeechToText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpeechToText")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl SpeechToText {
    /// Create an STT client for `provider`
    ///
    /// # Errors
    ///
    /// Returns error if API key is empty or the HTTP client cannot be built
    pub fn new(provider: SttProvider, api_key: SecretString, model: String) -> Result<Self> {
        if api_key.expose_secret().is_empty() {
            return Err(Error::Config(format!("{provider:?} API key required for STT")));
        }

        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            client,
            api_key,
            model,
            provider,
            base_url: provider.default_url().to_string(),
        })
    }

    /// Build from voice settings, using the key of the selected provider
    ///
    /// # Errors
    ///
    /// Returns error if the provider is unknown or its API key is missing
    pub fn from_config(voice: &VoiceConfig, keys: &ApiKeys) -> Result<Self> {
        let (provider, key) = match voice.stt_provider.as_str() {
            "whisper" | "openai" => (SttProvider::Whisper, keys.openai.as_ref()),
            "deepgram" => (SttProvider::Deepgram, keys.deepgram.as_ref()),
            other => {
                return Err(Error::Config(format!("unknown STT provider: {other}")));
            }
        };

        let key = key.ok_or_else(|| {
            Error::NotConfigured(format!("{provider:?} API key required for STT"))
        })?;

        Self::new(
            provider,
            SecretString::from(key.expose_secret().to_owned()),
            voice.stt_model.clone(),
        )
    }

    /// Point requests at a different host (proxies, tests)
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Transcribe audio to text
    ///
    /// # Arguments
    ///
    /// * `audio` - WAV audio bytes
    ///
    /// # Errors
    ///
    /// Returns error if transcription fails
    pub async fn transcribe(&self, audio: &[u8]) -> Result<String> {
        match self.provider {
            SttProvider::Whisper => self.transcribe_whisper(audio).await,
            SttProvider::Deepgram => self.transcribe_deepgram(audio).await,
        }
    }

    /// Transcribe using OpenAI Whisper
    async fn transcribe_whisper(&self, audio: &[u8]) -> Result<String> {
        tracing::debug!(audio_bytes = audio.len(), "starting Whisper transcription");

        let form = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::bytes(audio.to_vec())
                    .file_name("audio.wav")
                    .mime_str("audio/wav")
                    .map_err(|e| Error::Stt(e.to_string()))?,
            )
            .text("model", self.model.clone());

        let response = self
            .client
            .post(format!("{}/v1/audio/transcriptions", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Whisper request failed");
                e
            })?;

        let status = response.status();
        tracing::debug!(status = %status, "received response");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Whisper API error");
            return Err(Error::Stt(format!("Whisper API error {status}: {body}")));
        }

        let result: WhisperResponse = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "failed to parse response");
            e
        })?;

        tracing::info!(transcript = %result.text, "transcription complete");
        Ok(result.text)
    }

    /// Transcribe using Deepgram
    async fn transcribe_deepgram(&self, audio: &[u8]) -> Result<String> {
        tracing::debug!(audio_bytes = audio.len(), "starting Deepgram transcription");

        let url = format!(
            "{}/v1/listen?model={}&punctuate=true",
            self.base_url,
            urlencoding::encode(&self.model)
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Token {}", self.api_key.expose_secret()))
            .header("Content-Type", "audio/wav")
            .body(audio.to_vec())
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Deepgram request failed");
                e
            })?;

        let status = response.status();
        tracing::debug!(status = %status, "received response");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Deepgram API error");
            return Err(Error::Stt(format!("Deepgram API error {status}: {body}")));
        }

        let result: DeepgramResponse = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "failed to parse Deepgram response");
            e
        })?;

        let transcript = result
            .results
            .channels
            .first()
            .and_then(|c| c.alternatives.first())
            .map(|a| a.transcript.clone())
            .unwrap_or_default();

        tracing::info!(transcript = %transcript, "transcription complete");
        Ok(transcript)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_key_is_rejected() {
        let err = SpeechToText::new(
            SttProvider::Whisper,
            SecretString::from(String::new()),
            "whisper-1".to_string(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn missing_provider_key_is_not_configured() {
        let voice = VoiceConfig::default();
        let err = SpeechToText::from_config(&voice, &ApiKeys::default()).unwrap_err();
        assert!(matches!(err, Error::NotConfigured(_)));
    }

    #[test]
    fn unknown_provider_is_config_error() {
        let voice = VoiceConfig {
            stt_provider: "vosk".to_string(),
            ..VoiceConfig::default()
        };
        let err = SpeechToText::from_config(&voice, &ApiKeys::default()).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
