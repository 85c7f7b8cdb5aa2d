//! Audio playback to speakers
//!
//! Playback blocks the calling thread; async callers run it through
//! `tokio::task::spawn_blocking`.

use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleRate, StreamConfig};

use crate::{Error, Result};

/// Sample rate for playback (matches common TTS output)
const PLAYBACK_SAMPLE_RATE: u32 = 24000;

/// Plays audio to the default output device
pub struct AudioPlayback {
    device: Device,
    config: StreamConfig,
}

impl AudioPlayback {
    /// Create a new audio playback instance
    ///
    /// # Errors
    ///
    /// Returns error if audio device cannot be opened
    pub fn new() -> Result<Self> {
        let host = cpal::default_host();

        let device = host
            .default_output_device()
            .ok_or_else(|| Error::Audio("no output device available".to_string()))?;

        let supports = |channels: u16| {
            move |c: &cpal::SupportedStreamConfigRange| {
                c.channels() == channels
                    && c.min_sample_rate() <= SampleRate(PLAYBACK_SAMPLE_RATE)
                    && c.max_sample_rate() >= SampleRate(PLAYBACK_SAMPLE_RATE)
            }
        };

        let supported_config = device
            .supported_output_configs()
            .map_err(|e| Error::Audio(e.to_string()))?
            .find(supports(1))
            .or_else(|| device.supported_output_configs().ok()?.find(supports(2)))
            .ok_or_else(|| Error::Audio("no suitable output config found".to_string()))?;

        let config = supported_config
            .with_sample_rate(SampleRate(PLAYBACK_SAMPLE_RATE))
            .config();

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            sample_rate = PLAYBACK_SAMPLE_RATE,
            channels = config.channels,
            "audio playback initialized"
        );

        Ok(Self { device, config })
    }

    /// Decode MP3 bytes and play them to completion
    ///
    /// # Errors
    ///
    /// Returns error if decoding or playback fails
    pub fn play_mp3_blocking(&self, mp3_data: &[u8]) -> Result<()> {
        let samples = decode_mp3(mp3_data)?;
        self.play_samples_blocking(samples)
    }

    /// Play mono samples to completion
    ///
    /// # Errors
    ///
    /// Returns error if the output stream fails
    pub fn play_samples_blocking(&self, samples: Vec<f32>) -> Result<()> {
        if samples.is_empty() {
            return Ok(());
        }

        let channels = usize::from(self.config.channels);
        let sample_count = samples.len();
        let samples = Arc::new(samples);
        let position = Arc::new(AtomicUsize::new(0));

        let stream = {
            let samples = Arc::clone(&samples);
            let position = Arc::clone(&position);
            self.device
                .build_output_stream(
                    &self.config,
                    move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                        let mut pos = position.load(Ordering::Relaxed);
                        for frame in data.chunks_mut(channels) {
                            let sample = samples.get(pos).copied().unwrap_or(0.0);
                            frame.fill(sample);
                            if pos < samples.len() {
                                pos += 1;
                            }
                        }
                        position.store(pos, Ordering::Relaxed);
                    },
                    |err| {
                        tracing::error!(error = %err, "audio playback error");
                    },
                    None,
                )
                .map_err(|e| Error::Audio(e.to_string()))?
        };

        stream.play().map_err(|e| Error::Audio(e.to_string()))?;

        let duration_ms = (sample_count as u64 * 1000) / u64::from(PLAYBACK_SAMPLE_RATE);
        let timeout = Duration::from_millis(duration_ms + 500);
        let start = Instant::now();

        while position.load(Ordering::Relaxed) < sample_count && start.elapsed() < timeout {
            std::thread::sleep(Duration::from_millis(50));
        }

        // Let the device drain its last buffer
        std::thread::sleep(Duration::from_millis(100));

        drop(stream);
        tracing::debug!(samples = sample_count, "playback complete");

        Ok(())
    }
}

/// Decode MP3 bytes to mono f32 samples
///
/// # Errors
///
/// Returns error if the data is not valid MP3
pub fn decode_mp3(mp3_data: &[u8]) -> Result<Vec<f32>> {
    let mut decoder = minimp3::Decoder::new(Cursor::new(mp3_data));
    let mut samples = Vec::new();

    loop {
        match decoder.next_frame() {
            Ok(frame) => {
                if frame.channels == 2 {
                    samples.extend(frame.data.chunks(2).map(|chunk| {
                        let left = f32::from(chunk[0]) / 32768.0;
                        let right = f32::from(chunk.get(1).copied().unwrap_or(chunk[0])) / 32768.0;
                        f32::midpoint(left, right)
                    }));
                } else {
                    samples.extend(frame.data.iter().map(|&s| f32::from(s) / 32768.0));
                }
            }
            Err(minimp3::Error::Eof) => break,
            Err(e) => return Err(Error::Audio(format!("MP3 decode error: {e}"))),
        }
    }

    Ok(samples)
}
