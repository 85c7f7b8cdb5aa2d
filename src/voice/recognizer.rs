//! Turning microphone audio into utterances

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use super::capture::{AudioCapture, SAMPLE_RATE, samples_to_wav};
use super::endpoint::{EndpointState, SpeechEndpointer};
use super::stt::SpeechToText;
use crate::error::RecognitionFailure;
use crate::{Error, Result};

/// How often the capture buffer is drained
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Outcome of one bounded capture
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Heard {
    /// A transcribed utterance
    Speech(String),
    /// Nobody spoke before the timeout
    Silence,
}

/// Source of transcribed utterances
///
/// Failures are reported as `Error::Recognition`.
#[async_trait]
pub trait Recognizer: Send {
    /// Measure ambient noise once before listening
    async fn calibrate(&mut self, duration: Duration) -> Result<()>;

    /// Capture one phrase and transcribe it
    ///
    /// Waits at most `timeout` for speech to begin; a phrase is cut at
    /// `phrase_limit`.
    async fn listen(&mut self, timeout: Duration, phrase_limit: Duration) -> Result<Heard>;
}

/// Recognizer over the default microphone and a cloud STT service
pub struct MicrophoneRecognizer {
    capture: AudioCapture,
    endpointer: SpeechEndpointer,
    stt: SpeechToText,
}

impl MicrophoneRecognizer {
    /// Open the microphone
    ///
    /// # Errors
    ///
    /// Returns error if no input device can be opened
    pub fn new(stt: SpeechToText) -> Result<Self> {
        Ok(Self {
            capture: AudioCapture::start()?,
            endpointer: SpeechEndpointer::new(),
            stt,
        })
    }

    fn ensure_capturing(&self) -> Result<()> {
        if self.capture.is_capturing() {
            Ok(())
        } else {
            Err(Error::Recognition(RecognitionFailure::Microphone))
        }
    }
}

#[async_trait]
impl Recognizer for MicrophoneRecognizer {
    async fn calibrate(&mut self, duration: Duration) -> Result<()> {
        self.capture.clear_buffer();
        tokio::time::sleep(duration).await;
        self.ensure_capturing()?;

        let ambient = self.capture.take_buffer();
        self.endpointer.calibrate(&ambient);
        Ok(())
    }

    async fn listen(&mut self, timeout: Duration, phrase_limit: Duration) -> Result<Heard> {
        self.capture.clear_buffer();
        self.endpointer.reset();

        let started = Instant::now();
        let mut speech_started: Option<Instant> = None;

        loop {
            tokio::time::sleep(POLL_INTERVAL).await;
            self.ensure_capturing()?;

            let chunk = self.capture.take_buffer();
            match self.endpointer.process(&chunk) {
                EndpointState::Complete => break,
                EndpointState::Speaking => {
                    let since = *speech_started.get_or_insert_with(Instant::now);
                    if since.elapsed() >= phrase_limit {
                        tracing::debug!("phrase limit reached");
                        break;
                    }
                }
                EndpointState::Idle => {
                    speech_started = None;
                    if started.elapsed() >= timeout {
                        return Ok(Heard::Silence);
                    }
                }
            }
        }

        let speech = self.endpointer.take_speech();
        let wav = samples_to_wav(&speech, SAMPLE_RATE)?;

        match self.stt.transcribe(&wav).await {
            Ok(text) if text.trim().is_empty() => {
                Err(Error::Recognition(RecognitionFailure::NoSpeech))
            }
            Ok(text) => Ok(Heard::Speech(text)),
            Err(e) => {
                tracing::warn!(error = %e, "transcription failed");
                Err(Error::Recognition(RecognitionFailure::ServiceUnavailable))
            }
        }
    }
}
