//! Audio input source interface
//!
//! A source pushes [`AudioFrame`]s into a [`FrameSink`] from its own delivery
//! context (usually the driver's callback thread) between `open` and `close`.

use std::sync::Arc;

use crate::audio::error::AudioResult;
use crate::audio::format::{AudioFormat, AudioFrame};

/// Callback receiving frames from the source's delivery context
pub type FrameSink = Arc<dyn Fn(AudioFrame) + Send + Sync>;

/// Audio input source
pub trait AudioSource: Send {
    /// Start delivering frames of `format` to `sink`
    ///
    /// Fails when the device is missing, busy or access is denied.
    fn open(&mut self, format: AudioFormat, sink: FrameSink) -> AudioResult<()>;

    /// Stop delivering frames and release the device
    ///
    /// Safe to call when not open. After it returns no further frames are
    /// delivered.
    fn close(&mut self);

    /// Whether the source is currently delivering
    fn is_open(&self) -> bool;
}
