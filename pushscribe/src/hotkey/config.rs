//! 热键配置模块
//!
//! 定义热键配置结构和默认值

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::combination::HotkeyCombination;
use super::error::{HotkeyError, HotkeyResult};
use super::key::KeyIdentity;

/// 录音期间吞掉哪些按键事件
///
/// 避免组合键的字符（例如空格）被输入到前台应用。
///
/// 策略只决定按下事件：`Armed` 期间按下的、被策略覆盖的键会被吞掉。
/// 松开事件跟随该键按下时的处理结果，按下被放行的键（例如在激活前
/// 按下的 Alt）松开时也放行，前台应用不会看到只有按下没有松开的修饰键。
/// 没有记录按下结果的键（监听器挂载前就已按住）在 `Armed` 期间按策略处理。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SuppressPolicy {
    /// 组合中的所有按键
    #[default]
    CombinationKeys,
    /// 只吞组合中的非修饰键
    NonModifierKeys,
    /// 显式列出的按键
    Keys(Vec<String>),
    /// 不吞任何事件
    Nothing,
}

/// 解析后的吞键策略
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Suppression {
    /// 组合中的所有按键
    CombinationKeys,
    /// 组合中的非修饰键
    NonModifierKeys,
    /// 固定按键集合
    Keys(BTreeSet<KeyIdentity>),
    /// 不吞任何事件
    Nothing,
}

impl Suppression {
    /// 在给定组合下，该键是否应被吞掉
    pub fn covers(&self, combination: &HotkeyCombination, key: &KeyIdentity) -> bool {
        match self {
            Suppression::CombinationKeys => combination.contains(key),
            Suppression::NonModifierKeys => combination.contains(key) && !key.is_modifier(),
            Suppression::Keys(keys) => keys.contains(key),
            Suppression::Nothing => false,
        }
    }
}

impl Default for Suppression {
    fn default() -> Self {
        Self::CombinationKeys
    }
}

impl SuppressPolicy {
    /// 解析为运行时策略
    pub fn resolve(&self) -> HotkeyResult<Suppression> {
        Ok(match self {
            SuppressPolicy::CombinationKeys => Suppression::CombinationKeys,
            SuppressPolicy::NonModifierKeys => Suppression::NonModifierKeys,
            SuppressPolicy::Keys(names) => Suppression::Keys(
                names
                    .iter()
                    .map(|name| name.parse::<KeyIdentity>())
                    .collect::<HotkeyResult<_>>()?,
            ),
            SuppressPolicy::Nothing => Suppression::Nothing,
        })
    }
}

/// 热键配置
///
/// # Examples
///
/// ```
/// use pushscribe::hotkey::HotkeyConfig;
///
/// let config = HotkeyConfig::default();
/// assert_eq!(config.combination, "alt+space");
///
/// let config = HotkeyConfig::new("ctrl+shift+r", "escape");
/// let resolved = config.resolve().unwrap();
/// assert_eq!(resolved.combination.len(), 3);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HotkeyConfig {
    /// 按住录音的组合键
    ///
    /// 默认值: "alt+space"
    pub combination: String,

    /// 录音期间取消的按键
    ///
    /// 默认值: "escape"
    pub cancel: String,

    /// 录音期间吞键策略
    pub suppress: SuppressPolicy,
}

/// 解析后的热键配置
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedHotkeys {
    /// 组合键
    pub combination: HotkeyCombination,
    /// 取消键
    pub cancel_key: KeyIdentity,
    /// 吞键策略
    pub suppression: Suppression,
}

impl HotkeyConfig {
    /// 创建新的热键配置
    pub fn new(combination: impl Into<String>, cancel: impl Into<String>) -> Self {
        Self {
            combination: combination.into(),
            cancel: cancel.into(),
            suppress: SuppressPolicy::default(),
        }
    }

    /// 设置吞键策略
    pub fn with_suppress(mut self, suppress: SuppressPolicy) -> Self {
        self.suppress = suppress;
        self
    }

    /// 解析并校验配置
    ///
    /// 取消键不能是组合键的一部分，否则按下组合的瞬间就会被取消。
    pub fn resolve(&self) -> HotkeyResult<ResolvedHotkeys> {
        let combination = HotkeyCombination::parse(&self.combination)?;
        let cancel_key: KeyIdentity = self.cancel.parse()?;

        if combination.contains(&cancel_key) {
            return Err(HotkeyError::CancelKeyInCombination(cancel_key.to_string()));
        }

        Ok(ResolvedHotkeys {
            combination,
            cancel_key,
            suppression: self.suppress.resolve()?,
        })
    }
}

impl Default for HotkeyConfig {
    /// 默认热键配置
    ///
    /// - 组合键: `alt+space`
    /// - 取消键: `escape`
    /// - 吞键: 组合中的所有按键
    fn default() -> Self {
        Self {
            combination: "alt+space".to_string(),
            cancel: "escape".to_string(),
            suppress: SuppressPolicy::default(),
        }
    }
}
