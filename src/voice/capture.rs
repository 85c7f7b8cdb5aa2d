//! Audio capture from microphone
//!
//! The cpal stream is not `Send` on every host, so it is built and kept
//! alive on a dedicated thread that appends samples to a shared buffer.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, mpsc};
use std::thread::JoinHandle;
use std::time::Duration;

use cpal::SampleRate;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use crate::{Error, Result};

/// Sample rate for audio capture (16kHz for speech)
pub const SAMPLE_RATE: u32 = 16000;

/// Captures audio from the default input device
pub struct AudioCapture {
    buffer: Arc<Mutex<Vec<f32>>>,
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl AudioCapture {
    /// Open the default input device and start capturing
    ///
    /// # Errors
    ///
    /// Returns error if no suitable input device can be opened
    pub fn start() -> Result<Self> {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let running = Arc::new(AtomicBool::new(true));
        let (ready_tx, ready_rx) = mpsc::channel::<Result<()>>();

        let thread = {
            let buffer = Arc::clone(&buffer);
            let running = Arc::clone(&running);
            std::thread::Builder::new()
                .name("jarvis-capture".to_string())
                .spawn(move || capture_thread(&buffer, &running, &ready_tx))?
        };

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Self {
                buffer,
                running,
                thread: Some(thread),
            }),
            Ok(Err(e)) => {
                let _ = thread.join();
                Err(e)
            }
            Err(_) => Err(Error::Audio("capture thread exited during startup".to_string())),
        }
    }

    /// Get captured audio buffer and clear it
    ///
    /// Returns the audio samples captured since last call
    #[must_use]
    pub fn take_buffer(&self) -> Vec<f32> {
        self.buffer
            .lock()
            .map(|mut buf| std::mem::take(&mut *buf))
            .unwrap_or_default()
    }

    /// Clear the audio buffer
    pub fn clear_buffer(&self) {
        if let Ok(mut buf) = self.buffer.lock() {
            buf.clear();
        }
    }

    /// Whether the capture thread is still delivering samples
    #[must_use]
    pub fn is_capturing(&self) -> bool {
        self.running.load(Ordering::SeqCst)
            && self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Get the sample rate
    #[must_use]
    pub const fn sample_rate(&self) -> u32 {
        SAMPLE_RATE
    }

    /// Stop capturing audio
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
            tracing::debug!("audio capture stopped");
        }
    }
}

impl Drop for AudioCapture {
    fn drop(&mut self) {
        self.stop();
    }
}

fn capture_thread(
    buffer: &Arc<Mutex<Vec<f32>>>,
    running: &Arc<AtomicBool>,
    ready: &mpsc::Sender<Result<()>>,
) {
    let stream = match open_stream(Arc::clone(buffer), Arc::clone(running)) {
        Ok(stream) => stream,
        Err(e) => {
            running.store(false, Ordering::SeqCst);
            let _ = ready.send(Err(e));
            return;
        }
    };

    let _ = ready.send(Ok(()));
    tracing::debug!("audio capture started");

    while running.load(Ordering::SeqCst) {
        std::thread::sleep(Duration::from_millis(50));
    }

    drop(stream);
}

fn open_stream(buffer: Arc<Mutex<Vec<f32>>>, running: Arc<AtomicBool>) -> Result<cpal::Stream> {
    let host = cpal::default_host();

    let device = host
        .default_input_device()
        .ok_or_else(|| Error::Audio("no input device available".to_string()))?;

    let supported_config = device
        .supported_input_configs()
        .map_err(|e| Error::Audio(e.to_string()))?
        .find(|c| {
            c.channels() == 1
                && c.min_sample_rate() <= SampleRate(SAMPLE_RATE)
                && c.max_sample_rate() >= SampleRate(SAMPLE_RATE)
        })
        .ok_or_else(|| Error::Audio("no suitable audio config found".to_string()))?;

    let config = supported_config
        .with_sample_rate(SampleRate(SAMPLE_RATE))
        .config();

    tracing::debug!(
        device = device.name().unwrap_or_default(),
        sample_rate = SAMPLE_RATE,
        channels = config.channels,
        "audio capture initialized"
    );

    let stream = device
        .build_input_stream(
            &config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                if let Ok(mut buf) = buffer.lock() {
                    buf.extend_from_slice(data);
                }
            },
            move |err| {
                tracing::error!(error = %err, "audio capture error");
                running.store(false, Ordering::SeqCst);
            },
            None,
        )
        .map_err(|e| Error::Audio(e.to_string()))?;

    stream.play().map_err(|e| Error::Audio(e.to_string()))?;
    Ok(stream)
}

/// Convert f32 samples to WAV bytes for STT APIs
///
/// # Errors
///
/// Returns error if WAV encoding fails
pub fn samples_to_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer =
            hound::WavWriter::new(&mut cursor, spec).map_err(|e| Error::Audio(e.to_string()))?;

        for &sample in samples {
            #[allow(clippy::cast_possible_truncation)]
            let sample_i16 = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
            writer
                .write_sample(sample_i16)
                .map_err(|e| Error::Audio(e.to_string()))?;
        }

        writer.finalize().map_err(|e| Error::Audio(e.to_string()))?;
    }

    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wav_header_and_length() {
        let samples = vec![0.0f32, 0.5, -0.5, 1.0];
        let wav = samples_to_wav(&samples, SAMPLE_RATE).unwrap();

        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        // 44-byte header plus 2 bytes per sample
        assert_eq!(wav.len(), 44 + samples.len() * 2);
    }
}
