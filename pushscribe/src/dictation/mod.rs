//! 听写模块
//!
//! 热键引擎、录音会话与转写之间的粘合层
//!
//! # 工作流程
//!
//! ```text
//! 1. 组合键按住 -> Activate
//!    └── CaptureSession::begin，事件 RecordingStarted
//!
//! 2. 组合键松开 -> Deactivate（或看门狗超时）
//!    └── CaptureSession::stop，事件 RecordingStopped
//!    └── 过短：事件 TooShort
//!    └── 否则：后台转写 -> TextOutput -> 事件 Transcribed / TranscriptionFailed
//!
//! 3. 录音中按下取消键 -> Cancel
//!    └── CaptureSession::abort，事件 RecordingCancelled
//! ```

mod controller;
mod event;
mod history;
mod output;

pub use controller::{Collaborators, DictationController, EVENT_CHANNEL_CAPACITY};
pub use event::DictationEvent;
pub use history::RecentTranscriptions;
pub use output::{MemoryOutput, TextOutput};
