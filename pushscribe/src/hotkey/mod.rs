//! 热键管理模块
//!
//! 全局按住说话（push-to-talk）的热键状态机
//!
//! # 功能
//!
//! - 组合键按住：发出 `Activate`，开始录音
//! - 组合键任一键松开：发出 `Deactivate`，结束录音
//! - 录音期间按下取消键：发出 `Cancel`，丢弃录音
//! - 左右修饰键规范化、系统按键重复过滤
//! - 录音期间按策略吞掉组合键事件，避免字符进入前台应用
//!
//! # 使用方法
//!
//! ```
//! use std::sync::Arc;
//! use pushscribe::hotkey::{
//!     HotkeyConfig, HotkeyEngine, HotkeySignal, ManualListener, RawKey,
//! };
//!
//! let handler = |signal: HotkeySignal| -> anyhow::Result<()> {
//!     println!("signal: {:?}", signal);
//!     Ok(())
//! };
//!
//! let hotkeys = HotkeyConfig::default().resolve().unwrap();
//! let engine = HotkeyEngine::new(hotkeys, Arc::new(handler)).unwrap();
//!
//! let listener = ManualListener::new();
//! engine.start(Box::new(listener.clone())).unwrap();
//! listener.press(RawKey::AltLeft);
//! listener.press(RawKey::Space);
//! engine.stop();
//! ```

mod combination;
mod config;
mod engine;
mod error;
mod key;
mod listener;
pub mod platform;

pub use combination::HotkeyCombination;
pub use config::{HotkeyConfig, ResolvedHotkeys, SuppressPolicy, Suppression};
pub use engine::{EngineState, HotkeyEngine, HotkeyHandler, HotkeySignal};
pub use error::{HotkeyError, HotkeyResult};
pub use key::{validate_key_table, KeyIdentity, RawKey};
pub use listener::{EventDisposition, KeyEvent, KeyEventSink, KeyListener, ManualListener};
