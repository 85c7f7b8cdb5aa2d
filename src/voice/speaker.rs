//! Reply output

use async_trait::async_trait;

use super::playback::AudioPlayback;
use super::tts::TextToSpeech;
use crate::{Error, Result};

/// Delivers reply text to the user
#[async_trait]
pub trait Speaker: Send + Sync {
    /// Say `text`; returns once output has finished
    async fn speak(&self, text: &str) -> Result<()>;
}

/// Prints replies to stdout
#[derive(Debug, Clone)]
pub struct ConsoleSpeaker {
    label: String,
}

impl ConsoleSpeaker {
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }
}

#[async_trait]
impl Speaker for ConsoleSpeaker {
    async fn speak(&self, text: &str) -> Result<()> {
        println!("{}: {text}", self.label);
        Ok(())
    }
}

/// Prints replies and plays them through cloud TTS
#[derive(Debug)]
pub struct CloudSpeaker {
    console: ConsoleSpeaker,
    tts: TextToSpeech,
}

impl CloudSpeaker {
    #[must_use]
    pub fn new(label: impl Into<String>, tts: TextToSpeech) -> Self {
        Self {
            console: ConsoleSpeaker::new(label),
            tts,
        }
    }
}

#[async_trait]
impl Speaker for CloudSpeaker {
    async fn speak(&self, text: &str) -> Result<()> {
        self.console.speak(text).await?;

        let audio = self.tts.synthesize(text).await?;
        tracing::debug!(bytes = audio.len(), "synthesized reply");

        tokio::task::spawn_blocking(move || AudioPlayback::new()?.play_mp3_blocking(&audio))
            .await
            .map_err(|e| Error::Audio(format!("playback task failed: {e}")))?
    }
}
