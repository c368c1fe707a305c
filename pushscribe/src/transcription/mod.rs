//! Speech-to-text boundary
//!
//! The remote transcription call is an opaque async function: it receives a
//! finished capture and returns text or a typed failure. Implementations live
//! outside this crate (HTTP clients, local models); the controller only
//! depends on the [`Transcriber`] trait.

use async_trait::async_trait;

use crate::session::CaptureArtifact;

/// One finished capture submitted for transcription
#[derive(Debug, Clone)]
pub struct TranscriptionRequest {
    /// Captured audio
    pub artifact: CaptureArtifact,
    /// ISO 639-1 language hint (None lets the service detect it)
    pub language: Option<String>,
}

impl TranscriptionRequest {
    /// Create a new request
    pub fn new(artifact: CaptureArtifact, language: Option<String>) -> Self {
        Self { artifact, language }
    }
}

/// Speech-to-text service
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use pushscribe::transcription::{Transcriber, TranscriptionError, TranscriptionRequest};
///
/// struct CountSamples;
///
/// #[async_trait]
/// impl Transcriber for CountSamples {
///     async fn transcribe(&self, request: TranscriptionRequest) -> Result<String, TranscriptionError> {
///         Ok(format!("{} samples", request.artifact.sample_count()))
///     }
/// }
/// ```
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe one capture
    async fn transcribe(&self, request: TranscriptionRequest) -> Result<String, TranscriptionError>;
}

/// Errors that can occur during transcription
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TranscriptionError {
    /// The captured audio could not be read or encoded
    #[error("Audio not available: {0}")]
    AudioMissing(String),

    /// The service rejected the credentials
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The service throttled the request
    #[error("Rate limited by the transcription service")]
    RateLimited,

    /// The service could not be reached
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// The service did not answer in time
    #[error("Transcription timed out")]
    Timeout,

    /// The service answered with no text
    #[error("Transcription returned no text")]
    EmptyResult,

    /// Any other failure
    #[error("Transcription failed: {0}")]
    Other(String),
}

impl TranscriptionError {
    /// Whether repeating the same request may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TranscriptionError::RateLimited
                | TranscriptionError::ConnectionFailed(_)
                | TranscriptionError::Timeout
        )
    }

    /// Short message suitable for a notification
    pub fn user_message(&self) -> &'static str {
        match self {
            TranscriptionError::AudioMissing(_) => "The recording could not be read.",
            TranscriptionError::AuthenticationFailed(_) => {
                "Invalid API key. Please check your configuration."
            }
            TranscriptionError::RateLimited => "Rate limit exceeded. Please wait and try again.",
            TranscriptionError::ConnectionFailed(_) => {
                "Could not connect to the transcription service."
            }
            TranscriptionError::Timeout => "Transcription timed out. Please try again.",
            TranscriptionError::EmptyResult => "No speech was detected.",
            TranscriptionError::Other(_) => "An unexpected error occurred. Please try again.",
        }
    }
}
