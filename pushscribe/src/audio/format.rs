//! Fixed capture format and PCM framing
//!
//! Everything the session sees is mono, 16-bit signed little-endian PCM at a
//! fixed sample rate, delivered in fixed-size frames.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::audio::error::AudioResult;
use crate::audio::resampler::AudioResampler;

/// Default capture sample rate (Hz)
pub const SAMPLE_RATE: u32 = 16_000;

/// Capture is always mono
pub const CHANNELS: u16 = 1;

/// Capture is always 16-bit signed PCM
pub const BITS_PER_SAMPLE: u16 = 16;

/// Bytes per mono sample
pub const BYTES_PER_SAMPLE: usize = 2;

/// Default number of samples per delivered frame
pub const FRAME_SAMPLES: usize = 1024;

/// Capture format shared by the source, the session and the artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioFormat {
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Samples per frame
    pub frame_samples: usize,
}

impl AudioFormat {
    /// Create a format with the given rate and frame size
    pub fn new(sample_rate: u32, frame_samples: usize) -> Self {
        Self {
            sample_rate,
            frame_samples,
        }
    }

    /// Duration covered by `samples` mono samples
    ///
    /// Integer arithmetic, so a sample count that is exactly a whole number of
    /// milliseconds converts without rounding error.
    pub fn duration_of(&self, samples: u64) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        let nanos = samples as u128 * 1_000_000_000 / self.sample_rate as u128;
        Duration::from_nanos(nanos.min(u64::MAX as u128) as u64)
    }

    /// Number of samples needed to cover `duration`
    pub fn samples_for(&self, duration: Duration) -> u64 {
        (duration.as_nanos() * self.sample_rate as u128 / 1_000_000_000) as u64
    }

    /// Duration of one full frame
    pub fn frame_duration(&self) -> Duration {
        self.duration_of(self.frame_samples as u64)
    }
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self::new(SAMPLE_RATE, FRAME_SAMPLES)
    }
}

/// One immutable chunk of mono i16 little-endian PCM
///
/// Cloning shares the underlying bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFrame {
    bytes: Arc<[u8]>,
}

impl AudioFrame {
    /// Build a frame from raw little-endian bytes
    ///
    /// A trailing odd byte is dropped, a frame always holds whole samples.
    pub fn from_bytes(mut bytes: Vec<u8>) -> Self {
        let whole = bytes.len() - bytes.len() % BYTES_PER_SAMPLE;
        bytes.truncate(whole);
        Self {
            bytes: bytes.into(),
        }
    }

    /// Build a frame from samples
    pub fn from_samples(samples: &[i16]) -> Self {
        let bytes: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
        Self {
            bytes: bytes.into(),
        }
    }

    /// A frame of digital silence
    pub fn silence(samples: usize) -> Self {
        Self {
            bytes: vec![0u8; samples * BYTES_PER_SAMPLE].into(),
        }
    }

    /// Raw PCM bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Number of mono samples
    pub fn sample_count(&self) -> usize {
        self.bytes.len() / BYTES_PER_SAMPLE
    }

    /// Decode the samples
    pub fn samples(&self) -> impl Iterator<Item = i16> + '_ {
        self.bytes
            .chunks_exact(BYTES_PER_SAMPLE)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
    }

    /// Whether the frame holds no samples
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Converts device buffers of any size into fixed-size mono frames
///
/// Interleaved multi-channel input is averaged down to mono; float input is
/// clamped and scaled to i16. When the device rate differs from the capture
/// rate the mono signal goes through an [`AudioResampler`] first. Leftover
/// samples wait for the next buffer.
#[derive(Debug)]
pub struct FrameChunker {
    frame_samples: usize,
    input_channels: usize,
    pending: Vec<i16>,
    resampler: Option<AudioResampler>,
}

impl FrameChunker {
    /// Create a chunker for `input_channels` interleaved channels at the capture rate
    pub fn new(frame_samples: usize, input_channels: u16) -> Self {
        let frame_samples = frame_samples.max(1);
        Self {
            frame_samples,
            input_channels: usize::from(input_channels.max(1)),
            pending: Vec::with_capacity(frame_samples),
            resampler: None,
        }
    }

    /// Create a chunker for a device running at `input_rate`
    ///
    /// Frames come out at `output_rate`; equal rates skip resampling.
    pub fn with_resampler(
        frame_samples: usize,
        input_channels: u16,
        input_rate: u32,
        output_rate: u32,
    ) -> AudioResult<Self> {
        let mut chunker = Self::new(frame_samples, input_channels);
        if input_rate != output_rate {
            chunker.resampler = Some(AudioResampler::new(input_rate, output_rate)?);
        }
        Ok(chunker)
    }

    /// Whether device samples are converted to another rate
    pub fn is_resampling(&self) -> bool {
        self.resampler.is_some()
    }

    /// Push interleaved float samples in `[-1.0, 1.0]`
    pub fn push_f32(&mut self, data: &[f32], emit: impl FnMut(AudioFrame)) {
        let channels = self.input_channels;
        let mono = data
            .chunks(channels)
            .map(|group| group.iter().sum::<f32>() / group.len() as f32);

        match self.resampler.as_mut() {
            Some(resampler) => {
                let resampled = resample(resampler, mono);
                self.push_mono(resampled.into_iter().map(float_to_i16), emit);
            }
            None => self.push_mono(mono.map(float_to_i16), emit),
        }
    }

    /// Push interleaved i16 samples
    pub fn push_i16(&mut self, data: &[i16], emit: impl FnMut(AudioFrame)) {
        let channels = self.input_channels;
        let mono = data.chunks(channels).map(|group| {
            let sum: i32 = group.iter().map(|&s| i32::from(s)).sum();
            (sum / group.len() as i32) as i16
        });

        match self.resampler.as_mut() {
            Some(resampler) => {
                let resampled = resample(resampler, mono.map(|s| f32::from(s) / 32768.0));
                self.push_mono(resampled.into_iter().map(float_to_i16), emit);
            }
            None => self.push_mono(mono, emit),
        }
    }

    /// Samples waiting for a full frame
    pub fn pending_samples(&self) -> usize {
        self.pending.len()
    }

    /// Drop any partial frame and resampler state
    pub fn reset(&mut self) {
        self.pending.clear();
        if let Some(resampler) = self.resampler.as_mut() {
            resampler.reset();
        }
    }

    fn push_mono(&mut self, samples: impl Iterator<Item = i16>, mut emit: impl FnMut(AudioFrame)) {
        for sample in samples {
            self.pending.push(sample);
            if self.pending.len() == self.frame_samples {
                emit(AudioFrame::from_samples(&self.pending));
                self.pending.clear();
            }
        }
    }
}

fn float_to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * 32767.0) as i16
}

/// Runs on the device callback thread, so a failed buffer is logged and dropped
fn resample(resampler: &mut AudioResampler, mono: impl Iterator<Item = f32>) -> Vec<f32> {
    let input: Vec<f32> = mono.collect();
    resampler.process_buffered(&input).unwrap_or_else(|e| {
        warn!(error = %e, samples = input.len(), "Dropping device buffer");
        Vec::new()
    })
}
