/// Microphone capture through cpal
#[cfg(feature = "cpal-input")]
pub mod capture;

/// Audio device enumeration
#[cfg(feature = "cpal-input")]
pub mod device;

/// Audio-related error types
pub mod error;

/// Capture format, frames and framing
pub mod format;

/// Sample rate conversion
pub mod resampler;

/// Audio source interface
pub mod source;

/// WAV encoding
pub mod wav;

// Re-export commonly used types
#[cfg(feature = "cpal-input")]
pub use capture::CpalSource;
#[cfg(feature = "cpal-input")]
pub use device::{get_default_input_device, list_input_devices, AudioDevice};
pub use error::{AudioError, AudioResult};
pub use format::{AudioFormat, AudioFrame, FrameChunker, FRAME_SAMPLES, SAMPLE_RATE};
pub use resampler::AudioResampler;
pub use source::{AudioSource, FrameSink};
pub use wav::{encode_wav, wav_spec, write_wav};
