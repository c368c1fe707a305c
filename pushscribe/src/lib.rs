/// Audio capture modules
pub mod audio;

/// Configuration loading and validation
pub mod config;

/// Hotkey to recording to transcription glue
pub mod dictation;

/// Global hotkey state machine
pub mod hotkey;

/// Recording session lifecycle
pub mod session;

/// Speech-to-text boundary
pub mod transcription;

/// Utility modules
pub mod utils;

pub use config::AppConfig;
pub use dictation::{Collaborators, DictationController, DictationEvent};
pub use utils::error::{AppError, AppResult};
