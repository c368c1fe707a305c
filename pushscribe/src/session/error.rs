use thiserror::Error;

use crate::audio::AudioError;

/// 录音会话错误
#[derive(Error, Debug)]
pub enum SessionError {
    /// 已在录音中，本次 begin 被忽略
    #[error("A recording is already in progress")]
    AlreadyRecording,

    /// 无法打开音频输入，会话保持 Inactive
    #[error("Audio input unavailable: {0}")]
    DeviceUnavailable(#[source] AudioError),
}

/// 会话操作结果
pub type SessionResult<T> = Result<T, SessionError>;
