use thiserror::Error;

/// Audio-related errors
#[derive(Error, Debug)]
pub enum AudioError {
    /// No audio input device found
    #[error("No audio input device found")]
    DeviceNotFound,

    /// The OS refused microphone access
    #[error("Microphone permission denied: {0}")]
    PermissionDenied(String),

    /// Device exists but cannot be opened right now
    #[error("Audio device is busy: {0}")]
    DeviceBusy(String),

    /// Device cannot deliver the fixed capture format
    #[error("Unsupported capture format: {0}")]
    UnsupportedFormat(String),

    /// Failed to build audio stream
    #[error("Failed to build audio stream: {0}")]
    StreamBuildFailed(String),

    /// Sample rate conversion failed
    #[error("Resample failed: {0}")]
    ResampleFailed(String),

    /// Audio stream error
    #[error("Audio stream error: {0}")]
    StreamError(String),

    /// Device name is invalid
    #[error("Device name is invalid UTF-8")]
    InvalidDeviceName,

    /// WAV encoding error
    #[error("WAV encoding error: {0}")]
    Wav(#[from] hound::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// cpal error
    #[cfg(feature = "cpal-input")]
    #[error("cpal error: {0}")]
    CpalError(#[from] cpal::DevicesError),

    /// Supported config error
    #[cfg(feature = "cpal-input")]
    #[error("Supported config error: {0}")]
    SupportedConfigError(#[from] cpal::SupportedStreamConfigsError),
}

impl AudioError {
    /// Whether the failure means the microphone could not be opened at all
    pub fn is_device_unavailable(&self) -> bool {
        matches!(
            self,
            AudioError::DeviceNotFound
                | AudioError::PermissionDenied(_)
                | AudioError::DeviceBusy(_)
                | AudioError::UnsupportedFormat(_)
                | AudioError::ResampleFailed(_)
                | AudioError::StreamBuildFailed(_)
                | AudioError::StreamError(_)
        )
    }
}

/// Result type for audio operations
pub type AudioResult<T> = Result<T, AudioError>;
