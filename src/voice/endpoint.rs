//! Energy-based speech endpointing
//!
//! Finds the start and end of one spoken phrase in a stream of samples.
//! The threshold comes from ambient calibration.

use super::capture::SAMPLE_RATE;

/// Lower bound for the speech threshold after calibration
const MIN_ENERGY_THRESHOLD: f32 = 0.01;

/// Threshold used before calibration
const DEFAULT_ENERGY_THRESHOLD: f32 = 0.03;

/// Multiplier applied to ambient energy
const AMBIENT_MARGIN: f32 = 1.5;

/// Minimum duration of speech to accept (in samples at 16kHz)
const MIN_SPEECH_SAMPLES: usize = 4800; // 0.3 seconds

/// Silence duration to consider end of utterance (in samples)
const SILENCE_SAMPLES: usize = 8000; // 0.5 seconds

/// State of the endpointer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointState {
    /// Waiting for speech
    Idle,
    /// Speech started, accumulating
    Speaking,
    /// Enough speech followed by silence
    Complete,
}

/// Detects one phrase in an audio stream
#[derive(Debug)]
pub struct SpeechEndpointer {
    threshold: f32,
    state: EndpointState,
    speech_buffer: Vec<f32>,
    voiced_samples: usize,
    silence_counter: usize,
}

impl Default for SpeechEndpointer {
    fn default() -> Self {
        Self::new()
    }
}

impl SpeechEndpointer {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            threshold: DEFAULT_ENERGY_THRESHOLD,
            state: EndpointState::Idle,
            speech_buffer: Vec::new(),
            voiced_samples: 0,
            silence_counter: 0,
        }
    }

    /// Set the speech threshold from a sample of ambient noise
    pub fn calibrate(&mut self, ambient: &[f32]) {
        let ambient_energy = calculate_energy(ambient);
        self.threshold = (ambient_energy * AMBIENT_MARGIN).max(MIN_ENERGY_THRESHOLD);
        tracing::debug!(ambient_energy, threshold = self.threshold, "endpointer calibrated");
    }

    #[must_use]
    pub const fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Feed samples; returns the state after processing
    pub fn process(&mut self, samples: &[f32]) -> EndpointState {
        let energy = calculate_energy(samples);
        let is_speech = energy > self.threshold;

        match self.state {
            EndpointState::Idle => {
                if is_speech {
                    self.state = EndpointState::Speaking;
                    self.speech_buffer.clear();
                    self.speech_buffer.extend_from_slice(samples);
                    self.voiced_samples = samples.len();
                    self.silence_counter = 0;
                    tracing::trace!(energy, "speech detected");
                }
            }
            EndpointState::Speaking => {
                self.speech_buffer.extend_from_slice(samples);

                if is_speech {
                    self.voiced_samples += samples.len();
                    self.silence_counter = 0;
                } else {
                    self.silence_counter += samples.len();
                }

                if self.silence_counter > SILENCE_SAMPLES
                    && self.voiced_samples > MIN_SPEECH_SAMPLES
                {
                    tracing::debug!(samples = self.speech_buffer.len(), "speech segment complete");
                    self.state = EndpointState::Complete;
                } else if self.silence_counter > SILENCE_SAMPLES * 2 {
                    // A click or short noise, not a phrase
                    tracing::trace!("speech too short, resetting");
                    self.reset();
                }
            }
            EndpointState::Complete => {}
        }

        self.state
    }

    /// Whether speech has started
    #[must_use]
    pub fn in_speech(&self) -> bool {
        self.state != EndpointState::Idle
    }

    /// Take the accumulated phrase and return to idle
    pub fn take_speech(&mut self) -> Vec<f32> {
        let speech = std::mem::take(&mut self.speech_buffer);
        self.reset();
        speech
    }

    /// Seconds of audio accumulated in the current phrase
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn speech_secs(&self) -> f32 {
        self.speech_buffer.len() as f32 / SAMPLE_RATE as f32
    }

    pub fn reset(&mut self) {
        self.state = EndpointState::Idle;
        self.speech_buffer.clear();
        self.voiced_samples = 0;
        self.silence_counter = 0;
    }

    #[must_use]
    pub const fn state(&self) -> EndpointState {
        self.state
    }
}

/// Calculate RMS energy of audio samples
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn calculate_energy(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}
