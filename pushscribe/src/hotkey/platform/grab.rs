//! 基于 rdev 的全局键盘钩子
//!
//! rdev 的 `grab`/`listen` 会阻塞调用线程且无法停止，
//! 因此钩子线程在首次挂载时启动并常驻；挂载/卸载只是原子地替换
//! 投递目标，卸载永远不会等待钩子线程。
//!
//! - `grab`: 可以吞掉事件（macOS 需要辅助功能权限，Linux 需要 evdev 读权限）
//! - `listen`: 只监听，不能吞事件

use std::sync::Arc;
use std::thread;

use arc_swap::ArcSwapOption;
use rdev::{Event, EventType, Key};
use tracing::{error, info};

use crate::hotkey::error::{HotkeyError, HotkeyResult};
use crate::hotkey::key::RawKey;
use crate::hotkey::listener::{EventDisposition, KeyEvent, KeyEventSink, KeyListener};

/// 当前挂载的投递目标
struct SinkSlot(Arc<dyn KeyEventSink>);

/// rdev 全局监听器
pub struct RdevListener {
    target: Arc<ArcSwapOption<SinkSlot>>,
    intercept: bool,
    hook_started: bool,
}

impl RdevListener {
    /// 创建监听器
    ///
    /// `intercept` 为 `true` 时使用 `grab`，允许吞掉事件。
    pub fn new(intercept: bool) -> Self {
        Self {
            target: Arc::new(ArcSwapOption::empty()),
            intercept,
            hook_started: false,
        }
    }

    fn spawn_hook(&mut self) -> HotkeyResult<()> {
        let target = Arc::clone(&self.target);
        let intercept = self.intercept;

        thread::Builder::new()
            .name("pushscribe-key-hook".to_string())
            .spawn(move || {
                if intercept {
                    let result = rdev::grab(move |event: Event| {
                        match forward(&target, &event) {
                            EventDisposition::Suppress => None,
                            EventDisposition::Pass => Some(event),
                        }
                    });
                    if let Err(e) = result {
                        error!(error = ?e, "Keyboard grab terminated");
                    }
                } else {
                    let result = rdev::listen(move |event: Event| {
                        forward(&target, &event);
                    });
                    if let Err(e) = result {
                        error!(error = ?e, "Keyboard listener terminated");
                    }
                }
            })
            .map_err(|e| HotkeyError::ListenerFailed(e.to_string()))?;

        self.hook_started = true;
        info!(intercept, "Keyboard hook thread started");
        Ok(())
    }
}

impl KeyListener for RdevListener {
    fn attach(&mut self, sink: Arc<dyn KeyEventSink>) -> HotkeyResult<()> {
        self.target.store(Some(Arc::new(SinkSlot(sink))));
        if !self.hook_started {
            if let Err(e) = self.spawn_hook() {
                self.target.store(None);
                return Err(e);
            }
        }
        Ok(())
    }

    fn detach(&mut self) {
        self.target.store(None);
    }
}

fn forward(target: &ArcSwapOption<SinkSlot>, event: &Event) -> EventDisposition {
    let key_event = match event.event_type {
        EventType::KeyPress(key) => KeyEvent::Press(raw_key_from_rdev(key)),
        EventType::KeyRelease(key) => KeyEvent::Release(raw_key_from_rdev(key)),
        _ => return EventDisposition::Pass,
    };

    match target.load_full() {
        Some(slot) => slot.0.dispatch(key_event),
        None => EventDisposition::Pass,
    }
}

/// rdev 键码转换为 [`RawKey`]
pub fn raw_key_from_rdev(key: Key) -> RawKey {
    match key {
        Key::Alt => RawKey::AltLeft,
        Key::AltGr => RawKey::AltGr,
        Key::ControlLeft => RawKey::ControlLeft,
        Key::ControlRight => RawKey::ControlRight,
        Key::ShiftLeft => RawKey::ShiftLeft,
        Key::ShiftRight => RawKey::ShiftRight,
        Key::MetaLeft => RawKey::MetaLeft,
        Key::MetaRight => RawKey::MetaRight,
        Key::Function => RawKey::Function,
        Key::CapsLock => RawKey::CapsLock,
        Key::Space => RawKey::Space,
        Key::Escape => RawKey::Escape,
        Key::Return => RawKey::Return,
        Key::KpReturn => RawKey::KeypadEnter,
        Key::Tab => RawKey::Tab,
        Key::Backspace => RawKey::Backspace,
        Key::Delete => RawKey::Delete,
        Key::UpArrow => RawKey::UpArrow,
        Key::DownArrow => RawKey::DownArrow,
        Key::LeftArrow => RawKey::LeftArrow,
        Key::RightArrow => RawKey::RightArrow,
        Key::Home => RawKey::Home,
        Key::End => RawKey::End,
        Key::PageUp => RawKey::PageUp,
        Key::PageDown => RawKey::PageDown,
        Key::F1 => RawKey::F(1),
        Key::F2 => RawKey::F(2),
        Key::F3 => RawKey::F(3),
        Key::F4 => RawKey::F(4),
        Key::F5 => RawKey::F(5),
        Key::F6 => RawKey::F(6),
        Key::F7 => RawKey::F(7),
        Key::F8 => RawKey::F(8),
        Key::F9 => RawKey::F(9),
        Key::F10 => RawKey::F(10),
        Key::F11 => RawKey::F(11),
        Key::F12 => RawKey::F(12),
        Key::KeyA => RawKey::Char('a'),
        Key::KeyB => RawKey::Char('b'),
        Key::KeyC => RawKey::Char('c'),
        Key::KeyD => RawKey::Char('d'),
        Key::KeyE => RawKey::Char('e'),
        Key::KeyF => RawKey::Char('f'),
        Key::KeyG => RawKey::Char('g'),
        Key::KeyH => RawKey::Char('h'),
        Key::KeyI => RawKey::Char('i'),
        Key::KeyJ => RawKey::Char('j'),
        Key::KeyK => RawKey::Char('k'),
        Key::KeyL => RawKey::Char('l'),
        Key::KeyM => RawKey::Char('m'),
        Key::KeyN => RawKey::Char('n'),
        Key::KeyO => RawKey::Char('o'),
        Key::KeyP => RawKey::Char('p'),
        Key::KeyQ => RawKey::Char('q'),
        Key::KeyR => RawKey::Char('r'),
        Key::KeyS => RawKey::Char('s'),
        Key::KeyT => RawKey::Char('t'),
        Key::KeyU => RawKey::Char('u'),
        Key::KeyV => RawKey::Char('v'),
        Key::KeyW => RawKey::Char('w'),
        Key::KeyX => RawKey::Char('x'),
        Key::KeyY => RawKey::Char('y'),
        Key::KeyZ => RawKey::Char('z'),
        Key::Num0 => RawKey::Char('0'),
        Key::Num1 => RawKey::Char('1'),
        Key::Num2 => RawKey::Char('2'),
        Key::Num3 => RawKey::Char('3'),
        Key::Num4 => RawKey::Char('4'),
        Key::Num5 => RawKey::Char('5'),
        Key::Num6 => RawKey::Char('6'),
        Key::Num7 => RawKey::Char('7'),
        Key::Num8 => RawKey::Char('8'),
        Key::Num9 => RawKey::Char('9'),
        Key::Minus => RawKey::Char('-'),
        Key::Equal => RawKey::Char('='),
        Key::LeftBracket => RawKey::Char('['),
        Key::RightBracket => RawKey::Char(']'),
        Key::SemiColon => RawKey::Char(';'),
        Key::Quote => RawKey::Char('\''),
        Key::BackSlash => RawKey::Char('\\'),
        Key::Comma => RawKey::Char(','),
        Key::Dot => RawKey::Char('.'),
        Key::Slash => RawKey::Char('/'),
        Key::BackQuote => RawKey::Char('`'),
        Key::IntlBackslash => RawKey::IntlBackslash,
        Key::Insert => RawKey::Insert,
        Key::PrintScreen => RawKey::PrintScreen,
        Key::ScrollLock => RawKey::ScrollLock,
        Key::Pause => RawKey::Pause,
        Key::NumLock => RawKey::NumLock,
        Key::Kp0 => RawKey::Keypad('0'),
        Key::Kp1 => RawKey::Keypad('1'),
        Key::Kp2 => RawKey::Keypad('2'),
        Key::Kp3 => RawKey::Keypad('3'),
        Key::Kp4 => RawKey::Keypad('4'),
        Key::Kp5 => RawKey::Keypad('5'),
        Key::Kp6 => RawKey::Keypad('6'),
        Key::Kp7 => RawKey::Keypad('7'),
        Key::Kp8 => RawKey::Keypad('8'),
        Key::Kp9 => RawKey::Keypad('9'),
        Key::KpPlus => RawKey::Keypad('+'),
        Key::KpMinus => RawKey::Keypad('-'),
        Key::KpMultiply => RawKey::Keypad('*'),
        Key::KpDivide => RawKey::Keypad('/'),
        Key::KpDelete => RawKey::Keypad('.'),
        Key::Unknown(code) => RawKey::Unknown(code),
        // 新版本 rdev 增加的键：按变体名派生出各自独立的键码
        #[allow(unreachable_patterns)]
        other => RawKey::Unknown(unmapped_code(&other)),
    }
}

/// 为未显式映射的 rdev 键派生稳定且互不相同的键码
///
/// 对变体的 `Debug` 名称做 FNV-1a 散列并置最高位，
/// 与平台上报的原始键码（远小于 2^31）不会重叠。
fn unmapped_code(key: &Key) -> u32 {
    let name = format!("{:?}", key);
    let hash = name.bytes().fold(0x811c_9dc5_u32, |hash, byte| {
        (hash ^ u32::from(byte)).wrapping_mul(0x0100_0193)
    });
    hash | 0x8000_0000
}
