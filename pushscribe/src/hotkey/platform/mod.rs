//! 平台监听器适配器
//!
//! ```text
//! platform/
//! ├── mod.rs          - 适配器入口
//! └── grab.rs         - 基于 rdev 的全局键盘钩子（feature = "global-listener"）
//! ```
//!
//! 进程内的 [`ManualListener`](super::ManualListener) 不依赖任何平台钩子，始终可用。

#[cfg(feature = "global-listener")]
mod grab;

#[cfg(feature = "global-listener")]
pub use grab::{raw_key_from_rdev, RdevListener};
