//! 全局按键监听器接口
//!
//! 状态机本身与平台无关，平台钩子通过 [`KeyListener`] 适配：
//! 适配器把收到的按下/松开事件交给 [`KeyEventSink`]，
//! 并根据返回的 [`EventDisposition`] 决定是否吞掉该事件。

use std::sync::{Arc, Mutex, PoisonError};

use super::error::HotkeyResult;
use super::key::RawKey;

/// 原始按键事件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEvent {
    /// 按下
    Press(RawKey),
    /// 松开
    Release(RawKey),
}

/// 事件处理结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventDisposition {
    /// 继续传递给前台应用
    Pass,
    /// 吞掉该事件
    Suppress,
}

/// 接收原始按键事件的能力接口
pub trait KeyEventSink: Send + Sync {
    /// 处理一次按下
    fn deliver_press(&self, key: RawKey);

    /// 处理一次松开
    fn deliver_release(&self, key: RawKey);

    /// 当前事件是否应被吞掉
    fn suppress_current(&self, event: KeyEvent) -> bool;

    /// 分发一个事件并给出处理结果
    ///
    /// 按下事件先处理再判断（补全组合的那个键也会被吞掉）；
    /// 松开事件先判断再处理（结束录音的那个键也会被吞掉）。
    fn dispatch(&self, event: KeyEvent) -> EventDisposition {
        let suppress = match event {
            KeyEvent::Press(key) => {
                self.deliver_press(key);
                self.suppress_current(event)
            }
            KeyEvent::Release(key) => {
                let suppress = self.suppress_current(event);
                self.deliver_release(key);
                suppress
            }
        };

        if suppress {
            EventDisposition::Suppress
        } else {
            EventDisposition::Pass
        }
    }
}

/// 全局监听器适配器
pub trait KeyListener: Send {
    /// 开始向 `sink` 投递事件
    fn attach(&mut self, sink: Arc<dyn KeyEventSink>) -> HotkeyResult<()>;

    /// 停止投递；不得阻塞等待投递线程
    fn detach(&mut self);
}

/// 进程内监听器
///
/// 由宿主程序（或测试）主动注入事件，适用于已有自己键盘钩子的场景。
/// 克隆出的句柄共享同一个挂载点。
#[derive(Clone, Default)]
pub struct ManualListener {
    sink: Arc<Mutex<Option<Arc<dyn KeyEventSink>>>>,
}

impl ManualListener {
    /// 创建未挂载的监听器
    pub fn new() -> Self {
        Self::default()
    }

    /// 是否已挂载
    pub fn is_attached(&self) -> bool {
        self.current().is_some()
    }

    /// 注入按下事件
    pub fn press(&self, key: RawKey) -> EventDisposition {
        self.inject(KeyEvent::Press(key))
    }

    /// 注入松开事件
    pub fn release(&self, key: RawKey) -> EventDisposition {
        self.inject(KeyEvent::Release(key))
    }

    /// 注入任意事件；未挂载时直接放行
    pub fn inject(&self, event: KeyEvent) -> EventDisposition {
        match self.current() {
            Some(sink) => sink.dispatch(event),
            None => EventDisposition::Pass,
        }
    }

    fn current(&self) -> Option<Arc<dyn KeyEventSink>> {
        self.sink
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl KeyListener for ManualListener {
    fn attach(&mut self, sink: Arc<dyn KeyEventSink>) -> HotkeyResult<()> {
        *self.sink.lock().unwrap_or_else(PoisonError::into_inner) = Some(sink);
        Ok(())
    }

    fn detach(&mut self) {
        self.sink.lock().unwrap_or_else(PoisonError::into_inner).take();
    }
}
