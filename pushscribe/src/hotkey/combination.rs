//! 组合键定义

use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::str::FromStr;

use super::error::{HotkeyError, HotkeyResult};
use super::key::KeyIdentity;

/// 触发录音的组合键
///
/// 无序、无重复、非空。
///
/// # Examples
///
/// ```
/// use pushscribe::hotkey::{HotkeyCombination, KeyIdentity};
///
/// let combo: HotkeyCombination = "option+space".parse().unwrap();
/// assert!(combo.contains(&KeyIdentity::Alt));
/// assert!(combo.contains(&KeyIdentity::Space));
/// assert_eq!(combo.to_string(), "alt+space");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HotkeyCombination {
    keys: BTreeSet<KeyIdentity>,
}

impl HotkeyCombination {
    /// 由按键集合创建组合键
    ///
    /// 集合为空时返回 [`HotkeyError::EmptyCombination`]。
    pub fn new(keys: impl IntoIterator<Item = KeyIdentity>) -> HotkeyResult<Self> {
        let keys: BTreeSet<KeyIdentity> = keys.into_iter().collect();
        if keys.is_empty() {
            return Err(HotkeyError::EmptyCombination);
        }
        Ok(Self { keys })
    }

    /// 解析 `"alt+space"` 形式的字符串
    pub fn parse(s: &str) -> HotkeyResult<Self> {
        if s.trim().is_empty() {
            return Err(HotkeyError::EmptyCombination);
        }

        let keys = s
            .split('+')
            .map(|part| {
                if part.trim().is_empty() {
                    Err(HotkeyError::InvalidFormat(s.to_string()))
                } else {
                    part.parse::<KeyIdentity>()
                }
            })
            .collect::<HotkeyResult<Vec<_>>>()?;

        Self::new(keys)
    }

    /// 是否包含指定键
    pub fn contains(&self, key: &KeyIdentity) -> bool {
        self.keys.contains(key)
    }

    /// 给定的按下集合是否覆盖整个组合
    pub fn is_held_in(&self, pressed: &HashSet<KeyIdentity>) -> bool {
        self.keys.iter().all(|key| pressed.contains(key))
    }

    /// 组合中的按键（有序）
    pub fn keys(&self) -> impl Iterator<Item = &KeyIdentity> {
        self.keys.iter()
    }

    /// 组合中的非修饰键
    pub fn non_modifier_keys(&self) -> impl Iterator<Item = &KeyIdentity> {
        self.keys.iter().filter(|key| !key.is_modifier())
    }

    /// 组合中按键数量
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// 组合永不为空，保留此方法以配合 `len`
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl Default for HotkeyCombination {
    /// 默认组合键：Option + Space
    fn default() -> Self {
        Self {
            keys: BTreeSet::from([KeyIdentity::Alt, KeyIdentity::Space]),
        }
    }
}

impl FromStr for HotkeyCombination {
    type Err = HotkeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for HotkeyCombination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.keys.iter().map(|key| key.to_string()).collect();
        f.write_str(&names.join("+"))
    }
}
