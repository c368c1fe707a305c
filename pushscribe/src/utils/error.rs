//! 全局错误处理模块
//!
//! 提供统一的应用错误类型和用户友好的错误消息
//!
//! # 功能
//!
//! - 统一的 `AppError` 类型，聚合所有模块错误
//! - 用户友好的错误消息
//! - 错误代码，供宿主程序（托盘、通知）识别
//! - 错误恢复建议
//!
//! # 使用示例
//!
//! ```
//! use pushscribe::config::AppConfig;
//! use pushscribe::utils::error::{AppError, ErrorCode};
//!
//! fn load() -> Result<AppConfig, AppError> {
//!     Ok(AppConfig::from_json_str("{ \"recording\": { \"sample_rate\": 0 } }")?)
//! }
//!
//! assert_eq!(load().unwrap_err().code(), ErrorCode::ConfigInvalid);
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::audio::AudioError;
use crate::config::ConfigError;
use crate::hotkey::HotkeyError;
use crate::session::SessionError;
use crate::transcription::TranscriptionError;

/// 应用错误类型
///
/// 聚合所有模块的错误类型，提供统一的错误处理接口
#[derive(Error, Debug)]
pub enum AppError {
    /// 热键错误
    #[error("Hotkey error: {0}")]
    Hotkey(#[from] HotkeyError),

    /// 音频错误
    #[error("Audio error: {0}")]
    Audio(#[from] AudioError),

    /// 会话错误
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// 转写错误
    #[error("Transcription error: {0}")]
    Transcription(#[from] TranscriptionError),

    /// 配置错误
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// 内部错误
    #[error("Internal error: {0}")]
    Internal(String),
}

/// 错误代码
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // 热键错误
    /// 热键格式无效
    HotkeyInvalid,
    /// 全局监听器启动失败
    HotkeyListenerFailed,

    // 音频错误
    /// 找不到麦克风设备
    AudioDeviceNotFound,
    /// 麦克风权限被拒绝
    AudioPermissionDenied,
    /// 设备被占用或格式不支持
    AudioDeviceUnavailable,
    /// 音频流错误
    AudioStreamError,
    /// WAV 写入失败
    AudioWriteFailed,

    // 会话错误
    /// 已在录音
    SessionAlreadyRecording,

    // 转写错误
    /// API Key 无效
    TranscriptionAuthFailed,
    /// 请求过于频繁
    TranscriptionRateLimited,
    /// 无法连接服务
    TranscriptionConnectionFailed,
    /// 转写超时
    TranscriptionTimeout,
    /// 未识别到文本
    TranscriptionEmpty,
    /// 其他转写错误
    TranscriptionFailed,

    // 配置错误
    /// 配置加载失败
    ConfigLoadFailed,
    /// 配置无效
    ConfigInvalid,

    // 通用错误
    /// 内部错误
    InternalError,
}

/// 错误上下文信息
///
/// 提供用户友好的错误信息和恢复建议
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorContext {
    /// 错误代码
    pub code: ErrorCode,
    /// 用户友好的错误消息
    pub message: String,
    /// 详细错误信息（用于日志）
    pub detail: Option<String>,
    /// 恢复建议
    pub recovery_hint: Option<String>,
    /// 是否可恢复
    pub recoverable: bool,
}

impl ErrorContext {
    /// 创建新的错误上下文
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            detail: None,
            recovery_hint: None,
            recoverable: true,
        }
    }

    /// 设置详细信息
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// 设置恢复建议
    pub fn with_recovery_hint(mut self, hint: impl Into<String>) -> Self {
        self.recovery_hint = Some(hint.into());
        self
    }

    /// 标记为不可恢复
    pub fn not_recoverable(mut self) -> Self {
        self.recoverable = false;
        self
    }
}

impl AppError {
    /// 获取错误代码
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Hotkey(HotkeyError::ListenerFailed(_) | HotkeyError::AlreadyListening) => {
                ErrorCode::HotkeyListenerFailed
            }
            AppError::Hotkey(_) => ErrorCode::HotkeyInvalid,

            AppError::Audio(e) => audio_code(e),

            AppError::Session(SessionError::AlreadyRecording) => {
                ErrorCode::SessionAlreadyRecording
            }
            AppError::Session(SessionError::DeviceUnavailable(e)) => audio_code(e),

            AppError::Transcription(e) => match e {
                TranscriptionError::AuthenticationFailed(_) => ErrorCode::TranscriptionAuthFailed,
                TranscriptionError::RateLimited => ErrorCode::TranscriptionRateLimited,
                TranscriptionError::ConnectionFailed(_) => ErrorCode::TranscriptionConnectionFailed,
                TranscriptionError::Timeout => ErrorCode::TranscriptionTimeout,
                TranscriptionError::EmptyResult => ErrorCode::TranscriptionEmpty,
                TranscriptionError::AudioMissing(_) | TranscriptionError::Other(_) => {
                    ErrorCode::TranscriptionFailed
                }
            },

            AppError::Config(ConfigError::Io(_)) => ErrorCode::ConfigLoadFailed,
            AppError::Config(_) => ErrorCode::ConfigInvalid,

            AppError::Internal(_) => ErrorCode::InternalError,
        }
    }

    /// 获取用户友好的错误消息
    pub fn user_message(&self) -> String {
        match self.code() {
            ErrorCode::HotkeyInvalid => "热键设置无效，请检查组合键写法".to_string(),
            ErrorCode::HotkeyListenerFailed => "无法监听全局热键".to_string(),
            ErrorCode::AudioDeviceNotFound => "找不到麦克风设备，请检查音频设置".to_string(),
            ErrorCode::AudioPermissionDenied => "没有麦克风访问权限".to_string(),
            ErrorCode::AudioDeviceUnavailable => "麦克风暂时不可用，请重试".to_string(),
            ErrorCode::AudioStreamError => "音频录制出错，请重试".to_string(),
            ErrorCode::AudioWriteFailed => "无法保存录音".to_string(),
            ErrorCode::SessionAlreadyRecording => "正在录音中".to_string(),
            ErrorCode::TranscriptionAuthFailed => "API Key 无效，请在配置中更新".to_string(),
            ErrorCode::TranscriptionRateLimited => "请求过于频繁，请稍后重试".to_string(),
            ErrorCode::TranscriptionConnectionFailed => {
                "无法连接到转写服务，请检查网络连接".to_string()
            }
            ErrorCode::TranscriptionTimeout => "转写超时，请重试".to_string(),
            ErrorCode::TranscriptionEmpty => "没有识别到语音".to_string(),
            ErrorCode::TranscriptionFailed => "语音识别错误，请重试".to_string(),
            ErrorCode::ConfigLoadFailed => "无法读取配置文件".to_string(),
            ErrorCode::ConfigInvalid => "配置文件格式错误".to_string(),
            ErrorCode::InternalError => match self {
                AppError::Internal(msg) => format!("内部错误: {}", msg),
                _ => "内部错误".to_string(),
            },
        }
    }

    /// 获取完整的错误上下文
    pub fn context(&self) -> ErrorContext {
        let mut ctx = ErrorContext::new(self.code(), self.user_message())
            .with_detail(self.to_string());

        ctx.recovery_hint = self.recovery_hint();

        if !self.is_recoverable() {
            ctx = ctx.not_recoverable();
        }

        ctx
    }

    /// 获取恢复建议
    pub fn recovery_hint(&self) -> Option<String> {
        match self.code() {
            ErrorCode::AudioDeviceNotFound => {
                Some("请确保麦克风已连接，并在系统设置中选择正确的输入设备".to_string())
            }
            ErrorCode::AudioPermissionDenied => {
                Some("请在系统设置中允许应用访问麦克风".to_string())
            }
            ErrorCode::HotkeyListenerFailed => {
                Some("请在系统设置中为应用开启辅助功能（输入监控）权限".to_string())
            }
            ErrorCode::TranscriptionAuthFailed => {
                Some("请检查转写服务的 API Key".to_string())
            }
            ErrorCode::TranscriptionConnectionFailed | ErrorCode::TranscriptionRateLimited => {
                Some("请检查网络连接，或稍后重试".to_string())
            }
            _ => None,
        }
    }

    /// 检查错误是否可恢复
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            AppError::Config(_) | AppError::Hotkey(_) | AppError::Internal(_)
        )
    }

    /// 检查是否是认证错误
    pub fn is_auth_error(&self) -> bool {
        matches!(
            self,
            AppError::Transcription(TranscriptionError::AuthenticationFailed(_))
        )
    }

    /// 检查是否是权限错误
    pub fn is_permission_error(&self) -> bool {
        self.code() == ErrorCode::AudioPermissionDenied
    }
}

fn audio_code(err: &AudioError) -> ErrorCode {
    match err {
        AudioError::DeviceNotFound => ErrorCode::AudioDeviceNotFound,
        AudioError::PermissionDenied(_) => ErrorCode::AudioPermissionDenied,
        AudioError::DeviceBusy(_)
        | AudioError::UnsupportedFormat(_)
        | AudioError::ResampleFailed(_) => ErrorCode::AudioDeviceUnavailable,
        AudioError::Wav(_) | AudioError::Io(_) => ErrorCode::AudioWriteFailed,
        _ => ErrorCode::AudioStreamError,
    }
}

/// 应用结果类型
pub type AppResult<T> = Result<T, AppError>;

/// 将任意错误转换为内部错误
impl From<String> for AppError {
    fn from(msg: String) -> Self {
        AppError::Internal(msg)
    }
}

impl From<&str> for AppError {
    fn from(msg: &str) -> Self {
        AppError::Internal(msg.to_string())
    }
}
