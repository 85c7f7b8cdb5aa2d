//! Voice processing module
//!
//! Handles audio capture, speech endpointing, STT, TTS and playback.

mod capture;
mod endpoint;
mod playback;
mod recognizer;
mod speaker;
mod stt;
mod tts;

pub use capture::{AudioCapture, SAMPLE_RATE, samples_to_wav};
pub use endpoint::{EndpointState, SpeechEndpointer, calculate_energy};
pub use playback::{AudioPlayback, decode_mp3};
pub use recognizer::{Heard, MicrophoneRecognizer, Recognizer};
pub use speaker::{CloudSpeaker, ConsoleSpeaker, Speaker};
pub use stt::{SpeechToText, SttProvider};
pub use tts::{TextToSpeech, TtsProvider};
