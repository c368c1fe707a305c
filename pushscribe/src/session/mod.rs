//! 录音会话模块
//!
//! 由热键信号驱动的音频采集生命周期
//!
//! # 功能
//!
//! - `begin` / `end` / `abort` 三个操作，`end` 与 `abort` 幂等
//! - 最短时长丢弃规则（严格小于最短时长返回 `None`）
//! - 最长时长看门狗：超时后走与 `end` 完全相同的路径，并把结果交给 [`ArtifactSink`]
//! - 代号（generation）过滤：旧录音的迟到帧和过期定时器都会被忽略
//!
//! # 使用方法
//!
//! ```
//! use std::sync::{Arc, Mutex};
//! use pushscribe::audio::{AudioFormat, AudioFrame, AudioResult, AudioSource, FrameSink};
//! use pushscribe::session::{CaptureSession, ManualTimer, RecordingPolicy};
//!
//! #[derive(Clone, Default)]
//! struct Feed(Arc<Mutex<Option<FrameSink>>>);
//!
//! impl AudioSource for Feed {
//!     fn open(&mut self, _format: AudioFormat, sink: FrameSink) -> AudioResult<()> {
//!         *self.0.lock().unwrap() = Some(sink);
//!         Ok(())
//!     }
//!     fn close(&mut self) {
//!         self.0.lock().unwrap().take();
//!     }
//!     fn is_open(&self) -> bool {
//!         self.0.lock().unwrap().is_some()
//!     }
//! }
//!
//! let feed = Feed::default();
//! let session = CaptureSession::new(
//!     Box::new(feed.clone()),
//!     Arc::new(ManualTimer::new()),
//!     RecordingPolicy::default(),
//! );
//!
//! session.begin().unwrap();
//! let sink = feed.0.lock().unwrap().clone().unwrap();
//! sink(AudioFrame::silence(16_000));
//!
//! let artifact = session.end().unwrap();
//! assert_eq!(artifact.duration().as_secs(), 1);
//! assert!(session.end().is_none());
//! ```

mod artifact;
mod capture;
mod error;
mod watchdog;

pub use artifact::{CaptureArtifact, TEMP_FILE_PREFIX};
pub use capture::{
    ArtifactSink, CaptureSession, EndOutcome, RecordingPolicy, SessionState, StopReason, MAX_DURATION,
    MIN_DURATION,
};
pub use error::{SessionError, SessionResult};
pub use watchdog::{ManualTimer, TimerHandle, TimerTask, TokioTimer, WatchdogTimer};
