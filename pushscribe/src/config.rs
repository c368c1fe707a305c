//! 应用配置模块
//!
//! 提供配置的加载、校验与运行时替换
//!
//! 配置只读：写回磁盘由宿主程序负责。
//!
//! # 使用示例
//!
//! ```
//! use pushscribe::config::{AppConfig, ConfigManager};
//!
//! let config = AppConfig::from_json_str(r#"{ "hotkey": { "combination": "ctrl+shift+space" } }"#).unwrap();
//! assert_eq!(config.recording.min_duration_ms, 500);
//!
//! let manager = ConfigManager::new(config);
//! assert_eq!(manager.get().hotkey.combination, "ctrl+shift+space");
//! ```

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::audio::{AudioFormat, FRAME_SAMPLES, SAMPLE_RATE};
use crate::hotkey::{HotkeyConfig, ResolvedHotkeys};
use crate::session::RecordingPolicy;

/// 最近转写记录的默认条数
pub const HISTORY_SIZE: usize = 5;

/// 配置错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    /// IO 错误
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON 反序列化错误
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// 配置值不合法
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// 配置结果类型
pub type ConfigResult<T> = Result<T, ConfigError>;

/// 应用配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// 热键配置
    pub hotkey: HotkeyConfig,
    /// 录音配置
    pub recording: RecordingConfig,
    /// 转写配置
    pub transcription: TranscriptionConfig,
}

/// 录音配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordingConfig {
    /// 采样率（Hz）
    pub sample_rate: u32,
    /// 每帧采样数
    pub frame_samples: usize,
    /// 最短时长（毫秒），更短的录音被丢弃
    pub min_duration_ms: u64,
    /// 最长时长（毫秒），超时自动停止
    pub max_duration_ms: u64,
    /// 输入设备 ID（None 表示默认设备）
    pub input_device: Option<String>,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            sample_rate: SAMPLE_RATE,
            frame_samples: FRAME_SAMPLES,
            min_duration_ms: 500,
            max_duration_ms: 120_000,
            input_device: None,
        }
    }
}

impl RecordingConfig {
    /// 转换为会话使用的策略
    pub fn policy(&self) -> RecordingPolicy {
        RecordingPolicy {
            format: AudioFormat::new(self.sample_rate, self.frame_samples),
            min_duration: Duration::from_millis(self.min_duration_ms),
            max_duration: Duration::from_millis(self.max_duration_ms),
        }
    }
}

/// 转写配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionConfig {
    /// 语言代码（ISO 639-1），None 表示自动检测
    pub language: Option<String>,
    /// 保留的最近转写条数
    pub history_size: usize,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            language: Some("en".to_string()),
            history_size: HISTORY_SIZE,
        }
    }
}

impl AppConfig {
    /// 从 JSON 字符串解析并校验
    ///
    /// 缺失的字段使用默认值。
    pub fn from_json_str(json: &str) -> ConfigResult<Self> {
        let config: AppConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// 从文件加载
    ///
    /// 文件不存在时返回默认配置。
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        tracing::debug!(path = %path.display(), "Loading config");

        if !path.exists() {
            tracing::info!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&content)?;
        tracing::info!(path = %path.display(), "Config loaded successfully");
        Ok(config)
    }

    /// 校验配置
    pub fn validate(&self) -> ConfigResult<()> {
        self.resolve_hotkeys()?;

        let recording = &self.recording;
        if recording.sample_rate == 0 {
            return Err(ConfigError::Invalid("sample_rate must be positive".to_string()));
        }
        if recording.frame_samples == 0 {
            return Err(ConfigError::Invalid("frame_samples must be positive".to_string()));
        }
        if recording.max_duration_ms == 0 {
            return Err(ConfigError::Invalid("max_duration_ms must be positive".to_string()));
        }
        if recording.min_duration_ms > recording.max_duration_ms {
            return Err(ConfigError::Invalid(format!(
                "min_duration_ms ({}) exceeds max_duration_ms ({})",
                recording.min_duration_ms, recording.max_duration_ms
            )));
        }

        if let Some(language) = &self.transcription.language {
            if language.trim().is_empty() {
                return Err(ConfigError::Invalid("language must not be empty".to_string()));
            }
        }
        if self.transcription.history_size == 0 {
            return Err(ConfigError::Invalid("history_size must be positive".to_string()));
        }

        Ok(())
    }

    /// 解析热键配置
    pub fn resolve_hotkeys(&self) -> ConfigResult<ResolvedHotkeys> {
        self.hotkey
            .resolve()
            .map_err(|e| ConfigError::Invalid(format!("hotkey: {}", e)))
    }
}

/// 配置管理器
///
/// 使用 ArcSwap 实现无锁读取
pub struct ConfigManager {
    config: ArcSwap<AppConfig>,
}

impl ConfigManager {
    /// 创建新的配置管理器
    pub fn new(config: AppConfig) -> Self {
        Self {
            config: ArcSwap::new(Arc::new(config)),
        }
    }

    /// 从文件加载并创建
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        AppConfig::load(path).map(Self::new)
    }

    /// 获取当前配置
    pub fn get(&self) -> Arc<AppConfig> {
        self.config.load_full()
    }

    /// 校验后替换配置
    pub fn update(&self, config: AppConfig) -> ConfigResult<()> {
        config.validate()?;
        self.config.store(Arc::new(config));
        tracing::info!("Config updated");
        Ok(())
    }

    /// 当前语言
    pub fn language(&self) -> Option<String> {
        self.config.load().transcription.language.clone()
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new(AppConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_config_default() {
        let config = AppConfig::default();

        assert_eq!(config.hotkey.combination, "alt+space");
        assert_eq!(config.hotkey.cancel, "escape");
        assert_eq!(config.recording.sample_rate, 16000);
        assert_eq!(config.recording.frame_samples, 1024);
        assert_eq!(config.recording.min_duration_ms, 500);
        assert_eq!(config.recording.max_duration_ms, 120_000);
        assert!(config.recording.input_device.is_none());
        assert_eq!(config.transcription.language, Some("en".to_string()));
        assert_eq!(config.transcription.history_size, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_recording_policy() {
        let policy = RecordingConfig::default().policy();
        assert_eq!(policy, RecordingPolicy::default());
    }

    #[test]
    fn test_config_partial_json() {
        // 缺失字段使用默认值填充
        let json = r#"{
            "recording": {
                "max_duration_ms": 30000
            }
        }"#;

        let config = AppConfig::from_json_str(json).unwrap();

        assert_eq!(config.recording.max_duration_ms, 30_000);
        assert_eq!(config.recording.min_duration_ms, 500);
        assert_eq!(config.hotkey.combination, "alt+space");
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::Invalid("test error".to_string());
        assert!(err.to_string().contains("test error"));

        let err = AppConfig::from_json_str("invalid").unwrap_err();
        assert!(err.to_string().contains("JSON"));
    }

    #[test]
    fn test_validate_rejects_min_above_max() {
        let mut config = AppConfig::default();
        config.recording.min_duration_ms = 5000;
        config.recording.max_duration_ms = 1000;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_validate_rejects_bad_hotkey() {
        let mut config = AppConfig::default();
        config.hotkey.combination = "alt+nosuchkey".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = AppConfig::default();
        config.hotkey.cancel = "space".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_manager_update() {
        let manager = ConfigManager::default();

        let mut config = AppConfig::default();
        config.transcription.language = Some("pt".to_string());
        manager.update(config).unwrap();
        assert_eq!(manager.language(), Some("pt".to_string()));

        let mut bad = AppConfig::default();
        bad.recording.sample_rate = 0;
        assert!(manager.update(bad).is_err());
        assert_eq!(manager.language(), Some("pt".to_string()));
    }
}
