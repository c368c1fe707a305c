use crate::audio::error::{AudioError, AudioResult};
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use std::fmt;
use tracing::{debug, info};

/// Mono sample rate converter
///
/// Wraps a rubato sinc resampler that consumes fixed 10 ms input chunks.
/// Device buffers rarely line up with that size, so [`process_buffered`]
/// keeps the remainder until the next call.
///
/// [`process_buffered`]: AudioResampler::process_buffered
pub struct AudioResampler {
    resampler: SincFixedIn<f32>,
    /// Input buffer for rubato (channels x samples)
    input_buffer: Vec<Vec<f32>>,
    /// Output buffer for rubato (channels x samples)
    output_buffer: Vec<Vec<f32>>,
    /// Samples waiting for a full input chunk
    pending: Vec<f32>,
    input_rate: u32,
    output_rate: u32,
    chunk_size: usize,
}

impl AudioResampler {
    /// Create a resampler from `input_rate` to `output_rate`
    ///
    /// # Errors
    /// Returns `AudioError::ResampleFailed` for a zero rate or when rubato
    /// rejects the ratio.
    ///
    /// # Example
    /// ```
    /// use pushscribe::audio::AudioResampler;
    ///
    /// let resampler = AudioResampler::new(48000, 16000).unwrap();
    /// assert_eq!(resampler.chunk_size(), 480);
    /// ```
    pub fn new(input_rate: u32, output_rate: u32) -> AudioResult<Self> {
        if input_rate == 0 || output_rate == 0 {
            return Err(AudioError::ResampleFailed(format!(
                "invalid rates {} Hz -> {} Hz",
                input_rate, output_rate
            )));
        }

        let ratio = output_rate as f64 / input_rate as f64;
        let chunk_size = (input_rate / 100).max(1) as usize;

        let params = SincInterpolationParameters {
            sinc_len: 256,
            f_cutoff: 0.95,
            interpolation: SincInterpolationType::Linear,
            oversampling_factor: 256,
            window: WindowFunction::BlackmanHarris2,
        };

        let resampler = SincFixedIn::<f32>::new(ratio, 2.0, params, chunk_size, 1)
            .map_err(|e| AudioError::ResampleFailed(format!("Failed to create resampler: {}", e)))?;

        let input_buffer = resampler.input_buffer_allocate(true);
        let output_buffer = resampler.output_buffer_allocate(true);

        info!(
            "Resampler created: {} Hz -> {} Hz, chunk_size={}, ratio={:.6}",
            input_rate, output_rate, chunk_size, ratio
        );

        Ok(Self {
            resampler,
            input_buffer,
            output_buffer,
            pending: Vec::with_capacity(chunk_size),
            input_rate,
            output_rate,
            chunk_size,
        })
    }

    /// Resample exactly one input chunk
    ///
    /// # Errors
    /// Returns `AudioError::ResampleFailed` if `input` is not `chunk_size`
    /// samples long or rubato fails.
    pub fn process(&mut self, input: &[f32]) -> AudioResult<Vec<f32>> {
        if input.len() != self.chunk_size {
            return Err(AudioError::ResampleFailed(format!(
                "Input size mismatch: expected {} samples, got {}",
                self.chunk_size,
                input.len()
            )));
        }

        self.input_buffer[0].copy_from_slice(input);
        let mut output = Vec::new();
        self.run_chunk(&mut output)?;
        Ok(output)
    }

    /// Resample an input of any length
    ///
    /// Whole chunks are converted immediately; the tail is kept for the next
    /// call. The result may be empty.
    pub fn process_buffered(&mut self, input: &[f32]) -> AudioResult<Vec<f32>> {
        self.pending.extend_from_slice(input);

        let mut output = Vec::new();
        while self.pending.len() >= self.chunk_size {
            self.input_buffer[0].copy_from_slice(&self.pending[..self.chunk_size]);
            self.pending.drain(..self.chunk_size);
            self.run_chunk(&mut output)?;
        }

        Ok(output)
    }

    /// Convert the chunk already copied into `input_buffer`
    fn run_chunk(&mut self, output: &mut Vec<f32>) -> AudioResult<()> {
        let (_used, generated) = self
            .resampler
            .process_into_buffer(&self.input_buffer, &mut self.output_buffer, None)
            .map_err(|e| AudioError::ResampleFailed(format!("Resampling failed: {}", e)))?;

        output.extend_from_slice(&self.output_buffer[0][..generated]);
        Ok(())
    }

    /// Drop buffered input and the filter history
    pub fn reset(&mut self) {
        debug!("Resetting resampler");
        self.resampler.reset();
        self.pending.clear();
    }

    /// Input sample rate
    pub fn input_rate(&self) -> u32 {
        self.input_rate
    }

    /// Output sample rate
    pub fn output_rate(&self) -> u32 {
        self.output_rate
    }

    /// Input samples consumed per rubato call
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Samples waiting for a full chunk
    pub fn pending_samples(&self) -> usize {
        self.pending.len()
    }
}

impl fmt::Debug for AudioResampler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioResampler")
            .field("input_rate", &self.input_rate)
            .field("output_rate", &self.output_rate)
            .field("chunk_size", &self.chunk_size)
            .field("pending", &self.pending.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(len: usize, step: f32) -> Vec<f32> {
        (0..len).map(|i| (i as f32 * step).sin()).collect()
    }

    #[test]
    fn test_resample_48k_to_16k() {
        let mut resampler = AudioResampler::new(48000, 16000).unwrap();
        assert_eq!(resampler.input_rate(), 48000);
        assert_eq!(resampler.output_rate(), 16000);
        assert_eq!(resampler.chunk_size(), 480);

        let output = resampler.process(&sine(480, 0.01)).unwrap();
        assert!(
            (output.len() as i32 - 160).abs() < 50,
            "Expected ~160 samples, got {}",
            output.len()
        );
        for &sample in &output {
            assert!(sample.abs() <= 1.001, "Sample value out of range: {}", sample);
        }
    }

    #[test]
    fn test_resample_44k_chunk_size() {
        let resampler = AudioResampler::new(44100, 16000).unwrap();
        assert_eq!(resampler.chunk_size(), 441);
    }

    #[test]
    fn test_zero_rate_rejected() {
        assert!(matches!(
            AudioResampler::new(0, 16000),
            Err(AudioError::ResampleFailed(_))
        ));
    }

    #[test]
    fn test_wrong_chunk_size_rejected() {
        let mut resampler = AudioResampler::new(48000, 16000).unwrap();
        assert!(resampler.process(&[0.0; 100]).is_err());
    }

    #[test]
    fn test_buffered_keeps_remainder() {
        let mut resampler = AudioResampler::new(48000, 16000).unwrap();

        let first = resampler.process_buffered(&[0.5; 200]).unwrap();
        assert!(first.is_empty());
        assert_eq!(resampler.pending_samples(), 200);

        let second = resampler.process_buffered(&[0.5; 400]).unwrap();
        assert!(!second.is_empty());
        assert_eq!(resampler.pending_samples(), 120);

        resampler.reset();
        assert_eq!(resampler.pending_samples(), 0);
    }

    #[test]
    fn test_one_second_yields_one_second() {
        let mut resampler = AudioResampler::new(48000, 16000).unwrap();
        let mut total = 0;
        for _ in 0..100 {
            total += resampler.process(&sine(480, 0.01)).unwrap().len();
        }
        assert!((total as i32 - 16000).abs() < 100, "got {}", total);
    }
}
