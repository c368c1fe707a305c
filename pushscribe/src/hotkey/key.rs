//! 按键标识与规范化
//!
//! 监听器适配器上报的是 [`RawKey`]，仍然区分左右修饰键；
//! 状态机内部只使用规范化后的 [`KeyIdentity`]，左右 Alt 视为同一个键。
//!
//! 规范化是穷尽的 `match`，由编译器保证每个原始键码都有归宿；
//! 供配置解析使用的名称表在引擎构造时通过 [`validate_key_table`] 校验。

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use super::error::{HotkeyError, HotkeyResult};

/// 规范化后的按键标识
///
/// 两个 `KeyIdentity` 相等当且仅当它们规范化到同一个键。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeyIdentity {
    /// Alt / Option（含 AltGr）
    Alt,
    /// Control
    Control,
    /// Shift
    Shift,
    /// Command / Windows / Super
    Meta,
    /// Fn
    Function,
    /// Caps Lock
    CapsLock,
    /// 空格
    Space,
    /// Escape
    Escape,
    /// 回车（含小键盘回车）
    Enter,
    /// Tab
    Tab,
    /// 退格
    Backspace,
    /// Delete
    Delete,
    /// 方向键 上
    Up,
    /// 方向键 下
    Down,
    /// 方向键 左
    Left,
    /// 方向键 右
    Right,
    /// Home
    Home,
    /// End
    End,
    /// Page Up
    PageUp,
    /// Page Down
    PageDown,
    /// Insert
    Insert,
    /// Print Screen
    PrintScreen,
    /// Scroll Lock
    ScrollLock,
    /// Pause / Break
    Pause,
    /// Num Lock
    NumLock,
    /// ISO 布局中左 Shift 旁的额外按键
    IntlBackslash,
    /// 小键盘按键，以其字符区分（`'0'`-`'9'`、`'+'`、`'-'`、`'*'`、`'/'`、`'.'`）
    Keypad(char),
    /// 功能键 F1-F24
    F(u8),
    /// 字符键（统一为小写）
    Char(char),
    /// 无法识别的平台键码
    Code(u32),
}

impl KeyIdentity {
    /// 是否为修饰键
    pub fn is_modifier(&self) -> bool {
        matches!(
            self,
            Self::Alt | Self::Control | Self::Shift | Self::Meta | Self::Function
        )
    }
}

/// 监听器上报的原始按键
///
/// 与平台无关，但保留左右修饰键的区别。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RawKey {
    AltLeft,
    AltRight,
    AltGr,
    ControlLeft,
    ControlRight,
    ShiftLeft,
    ShiftRight,
    MetaLeft,
    MetaRight,
    Function,
    CapsLock,
    Space,
    Escape,
    Return,
    KeypadEnter,
    Tab,
    Backspace,
    Delete,
    UpArrow,
    DownArrow,
    LeftArrow,
    RightArrow,
    Home,
    End,
    PageUp,
    PageDown,
    Insert,
    PrintScreen,
    ScrollLock,
    Pause,
    NumLock,
    IntlBackslash,
    Keypad(char),
    F(u8),
    Char(char),
    Unknown(u32),
}

impl RawKey {
    /// 规范化为 [`KeyIdentity`]
    pub fn normalize(self) -> KeyIdentity {
        match self {
            RawKey::AltLeft | RawKey::AltRight | RawKey::AltGr => KeyIdentity::Alt,
            RawKey::ControlLeft | RawKey::ControlRight => KeyIdentity::Control,
            RawKey::ShiftLeft | RawKey::ShiftRight => KeyIdentity::Shift,
            RawKey::MetaLeft | RawKey::MetaRight => KeyIdentity::Meta,
            RawKey::Function => KeyIdentity::Function,
            RawKey::CapsLock => KeyIdentity::CapsLock,
            RawKey::Space => KeyIdentity::Space,
            RawKey::Escape => KeyIdentity::Escape,
            RawKey::Return | RawKey::KeypadEnter => KeyIdentity::Enter,
            RawKey::Tab => KeyIdentity::Tab,
            RawKey::Backspace => KeyIdentity::Backspace,
            RawKey::Delete => KeyIdentity::Delete,
            RawKey::UpArrow => KeyIdentity::Up,
            RawKey::DownArrow => KeyIdentity::Down,
            RawKey::LeftArrow => KeyIdentity::Left,
            RawKey::RightArrow => KeyIdentity::Right,
            RawKey::Home => KeyIdentity::Home,
            RawKey::End => KeyIdentity::End,
            RawKey::PageUp => KeyIdentity::PageUp,
            RawKey::PageDown => KeyIdentity::PageDown,
            RawKey::Insert => KeyIdentity::Insert,
            RawKey::PrintScreen => KeyIdentity::PrintScreen,
            RawKey::ScrollLock => KeyIdentity::ScrollLock,
            RawKey::Pause => KeyIdentity::Pause,
            RawKey::NumLock => KeyIdentity::NumLock,
            RawKey::IntlBackslash => KeyIdentity::IntlBackslash,
            RawKey::Keypad(c) => KeyIdentity::Keypad(c),
            RawKey::F(n) => KeyIdentity::F(n),
            RawKey::Char(' ') => KeyIdentity::Space,
            RawKey::Char(c) => KeyIdentity::Char(lowercase(c)),
            RawKey::Unknown(code) => KeyIdentity::Code(code),
        }
    }
}

impl From<RawKey> for KeyIdentity {
    fn from(raw: RawKey) -> Self {
        raw.normalize()
    }
}

/// 规范名称与别名
///
/// 每个条目的第一个名称同时也是 `Display` 输出。
const KEY_NAMES: &[(&str, KeyIdentity)] = &[
    ("alt", KeyIdentity::Alt),
    ("option", KeyIdentity::Alt),
    ("opt", KeyIdentity::Alt),
    ("ctrl", KeyIdentity::Control),
    ("control", KeyIdentity::Control),
    ("shift", KeyIdentity::Shift),
    ("cmd", KeyIdentity::Meta),
    ("command", KeyIdentity::Meta),
    ("meta", KeyIdentity::Meta),
    ("super", KeyIdentity::Meta),
    ("win", KeyIdentity::Meta),
    ("fn", KeyIdentity::Function),
    ("capslock", KeyIdentity::CapsLock),
    ("space", KeyIdentity::Space),
    ("escape", KeyIdentity::Escape),
    ("esc", KeyIdentity::Escape),
    ("enter", KeyIdentity::Enter),
    ("return", KeyIdentity::Enter),
    ("tab", KeyIdentity::Tab),
    ("backspace", KeyIdentity::Backspace),
    ("delete", KeyIdentity::Delete),
    ("up", KeyIdentity::Up),
    ("down", KeyIdentity::Down),
    ("left", KeyIdentity::Left),
    ("right", KeyIdentity::Right),
    ("home", KeyIdentity::Home),
    ("end", KeyIdentity::End),
    ("pageup", KeyIdentity::PageUp),
    ("pagedown", KeyIdentity::PageDown),
    ("insert", KeyIdentity::Insert),
    ("ins", KeyIdentity::Insert),
    ("printscreen", KeyIdentity::PrintScreen),
    ("scrolllock", KeyIdentity::ScrollLock),
    ("pause", KeyIdentity::Pause),
    ("numlock", KeyIdentity::NumLock),
    ("intlbackslash", KeyIdentity::IntlBackslash),
    ("kp0", KeyIdentity::Keypad('0')),
    ("kp1", KeyIdentity::Keypad('1')),
    ("kp2", KeyIdentity::Keypad('2')),
    ("kp3", KeyIdentity::Keypad('3')),
    ("kp4", KeyIdentity::Keypad('4')),
    ("kp5", KeyIdentity::Keypad('5')),
    ("kp6", KeyIdentity::Keypad('6')),
    ("kp7", KeyIdentity::Keypad('7')),
    ("kp8", KeyIdentity::Keypad('8')),
    ("kp9", KeyIdentity::Keypad('9')),
    ("kp_plus", KeyIdentity::Keypad('+')),
    ("kp_minus", KeyIdentity::Keypad('-')),
    ("kp_multiply", KeyIdentity::Keypad('*')),
    ("kp_divide", KeyIdentity::Keypad('/')),
    ("kp_decimal", KeyIdentity::Keypad('.')),
    ("plus", KeyIdentity::Char('+')),
];

/// 左右区分的别名，解析时先经过 [`RawKey::normalize`]
const RAW_NAMES: &[(&str, RawKey)] = &[
    ("alt_l", RawKey::AltLeft),
    ("alt_r", RawKey::AltRight),
    ("alt_gr", RawKey::AltGr),
    ("ctrl_l", RawKey::ControlLeft),
    ("ctrl_r", RawKey::ControlRight),
    ("shift_l", RawKey::ShiftLeft),
    ("shift_r", RawKey::ShiftRight),
    ("cmd_l", RawKey::MetaLeft),
    ("cmd_r", RawKey::MetaRight),
    ("kp_enter", RawKey::KeypadEnter),
];

fn lowercase(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}

impl fmt::Display for KeyIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyIdentity::F(n) => write!(f, "f{}", n),
            KeyIdentity::Code(code) => write!(f, "code:{}", code),
            KeyIdentity::Char(c) => match KEY_NAMES.iter().find(|(_, k)| k == self) {
                Some((name, _)) => f.write_str(name),
                None => write!(f, "{}", c),
            },
            other => match KEY_NAMES.iter().find(|(_, k)| k == other) {
                Some((name, _)) => f.write_str(name),
                None => write!(f, "{:?}", other),
            },
        }
    }
}

impl FromStr for KeyIdentity {
    type Err = HotkeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_lowercase();
        if name.is_empty() {
            return Err(HotkeyError::UnknownKey(s.to_string()));
        }

        if let Some((_, key)) = KEY_NAMES.iter().find(|(alias, _)| *alias == name) {
            return Ok(*key);
        }
        if let Some((_, raw)) = RAW_NAMES.iter().find(|(alias, _)| *alias == name) {
            return Ok(raw.normalize());
        }

        if let Some(code) = name.strip_prefix("code:") {
            return code
                .parse::<u32>()
                .map(KeyIdentity::Code)
                .map_err(|_| HotkeyError::UnknownKey(s.to_string()));
        }

        if let Some(n) = name.strip_prefix('f').and_then(|n| n.parse::<u8>().ok()) {
            if (1..=24).contains(&n) {
                return Ok(KeyIdentity::F(n));
            }
        }

        let mut chars = name.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if !c.is_whitespace() => Ok(RawKey::Char(c).normalize()),
            _ => Err(HotkeyError::UnknownKey(s.to_string())),
        }
    }
}

/// 校验名称表
///
/// - 别名非空、小写、不含 `+`，且全局唯一
/// - 每个键的规范名称能解析回同一个键
/// - 每个左右别名规范化后的键都有规范名称
pub fn validate_key_table() -> HotkeyResult<()> {
    let mut seen = HashSet::new();
    let aliases = KEY_NAMES
        .iter()
        .map(|(name, _)| *name)
        .chain(RAW_NAMES.iter().map(|(name, _)| *name));

    for alias in aliases {
        if alias.is_empty() || alias != alias.to_lowercase() || alias.contains('+') {
            return Err(HotkeyError::KeyTableInvalid(format!(
                "malformed alias '{}'",
                alias
            )));
        }
        if !seen.insert(alias) {
            return Err(HotkeyError::KeyTableInvalid(format!(
                "duplicate alias '{}'",
                alias
            )));
        }
    }

    for (alias, key) in KEY_NAMES {
        let canonical = key.to_string();
        match canonical.parse::<KeyIdentity>() {
            Ok(parsed) if parsed == *key => {}
            _ => {
                return Err(HotkeyError::KeyTableInvalid(format!(
                    "canonical name '{}' of alias '{}' does not parse back",
                    canonical, alias
                )));
            }
        }
    }

    for (alias, raw) in RAW_NAMES {
        let key = raw.normalize();
        if !KEY_NAMES.iter().any(|(_, k)| *k == key) {
            return Err(HotkeyError::KeyTableInvalid(format!(
                "alias '{}' normalizes to {:?}, which has no canonical name",
                alias, key
            )));
        }
    }

    Ok(())
}
