//! 热键相关错误类型

use thiserror::Error;

/// 热键相关错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HotkeyError {
    /// 无效的热键格式
    #[error("Invalid hotkey format: {0}")]
    InvalidFormat(String),

    /// 无法识别的按键名称
    #[error("Unknown key name '{0}'")]
    UnknownKey(String),

    /// 组合键为空
    #[error("Hotkey combination must contain at least one key")]
    EmptyCombination,

    /// 取消键与组合键冲突
    #[error("Cancel key '{0}' is part of the hotkey combination")]
    CancelKeyInCombination(String),

    /// 全局监听器已经附加
    #[error("Global key listener is already attached")]
    AlreadyListening,

    /// 全局监听器启动失败
    #[error("Failed to attach global key listener: {0}")]
    ListenerFailed(String),

    /// 按键名称表校验失败
    #[error("Key name table is inconsistent: {0}")]
    KeyTableInvalid(String),
}

/// 热键模块的结果类型
pub type HotkeyResult<T> = Result<T, HotkeyError>;
