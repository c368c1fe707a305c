//! 热键状态机
//!
//! 从无序的按下/松开事件流中识别"组合键按住"与"组合键松开"，
//! 并发出三种边沿信号：[`HotkeySignal::Activate`]、
//! [`HotkeySignal::Deactivate`]、[`HotkeySignal::Cancel`]。
//!
//! 所有状态读写都在同一把互斥锁内完成；回调在释放锁之后调用，
//! 因此回调里再调用 [`HotkeyEngine::stop`] 不会死锁。

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tracing::{debug, error, info, trace, warn};

use super::combination::HotkeyCombination;
use super::config::{ResolvedHotkeys, Suppression};
use super::error::{HotkeyError, HotkeyResult};
use super::key::{validate_key_table, KeyIdentity, RawKey};
use super::listener::{KeyEvent, KeyEventSink, KeyListener};

/// 引擎发出的信号
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotkeySignal {
    /// 组合键已完整按住
    Activate,
    /// 组合中的某个键被松开
    Deactivate,
    /// 录音期间按下了取消键
    Cancel,
}

/// 引擎状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// 等待组合键
    Idle,
    /// 组合键已按住，尚未松开或取消
    Armed,
}

/// 信号处理器
///
/// 返回错误时引擎只记录日志并回到 `Idle`，不会把错误传给监听器。
pub trait HotkeyHandler: Send + Sync {
    fn on_signal(&self, signal: HotkeySignal) -> anyhow::Result<()>;
}

impl<F> HotkeyHandler for F
where
    F: Fn(HotkeySignal) -> anyhow::Result<()> + Send + Sync,
{
    fn on_signal(&self, signal: HotkeySignal) -> anyhow::Result<()> {
        self(signal)
    }
}

/// 受锁保护的引擎状态
struct EngineCore {
    state: EngineState,
    pressed: HashSet<KeyIdentity>,
    combination: HotkeyCombination,
    cancel_key: KeyIdentity,
    suppression: Suppression,
    /// 仍按住的键在首次按下时是否被吞掉，松开时沿用
    press_swallowed: HashMap<KeyIdentity, bool>,
    /// 每次进入 Armed 加一，用于判断回调失败时是否仍处于同一轮
    epoch: u64,
}

impl EngineCore {
    fn covers_now(&self, key: &KeyIdentity) -> bool {
        self.state == EngineState::Armed && self.suppression.covers(&self.combination, key)
    }
}

/// 热键引擎
pub struct HotkeyEngine {
    core: Mutex<EngineCore>,
    handler: Arc<dyn HotkeyHandler>,
    listener: Mutex<Option<Box<dyn KeyListener>>>,
}

impl HotkeyEngine {
    /// 创建引擎
    ///
    /// 构造时校验按键名称表。
    pub fn new(
        hotkeys: ResolvedHotkeys,
        handler: Arc<dyn HotkeyHandler>,
    ) -> HotkeyResult<Arc<Self>> {
        validate_key_table()?;

        info!(
            combination = %hotkeys.combination,
            cancel = %hotkeys.cancel_key,
            "HotkeyEngine initialized"
        );

        Ok(Arc::new(Self {
            core: Mutex::new(EngineCore {
                state: EngineState::Idle,
                pressed: HashSet::new(),
                combination: hotkeys.combination,
                cancel_key: hotkeys.cancel_key,
                suppression: hotkeys.suppression,
                press_swallowed: HashMap::new(),
                epoch: 0,
            }),
            handler,
            listener: Mutex::new(None),
        }))
    }

    /// 使用默认取消键（Escape）和默认吞键策略创建引擎
    pub fn with_combination(
        combination: HotkeyCombination,
        handler: Arc<dyn HotkeyHandler>,
    ) -> HotkeyResult<Arc<Self>> {
        Self::new(
            ResolvedHotkeys {
                combination,
                cancel_key: KeyIdentity::Escape,
                suppression: Suppression::default(),
            },
            handler,
        )
    }

    /// 替换组合键，只影响之后的事件
    pub fn configure(&self, combination: HotkeyCombination) {
        info!(combination = %combination, "Hotkey combination updated");
        self.lock().combination = combination;
    }

    /// 替换组合键、取消键和吞键策略
    pub fn apply(&self, hotkeys: ResolvedHotkeys) {
        let mut core = self.lock();
        info!(
            combination = %hotkeys.combination,
            cancel = %hotkeys.cancel_key,
            "Hotkey configuration applied"
        );
        core.combination = hotkeys.combination;
        core.cancel_key = hotkeys.cancel_key;
        core.suppression = hotkeys.suppression;
    }

    /// 挂载全局监听器
    ///
    /// 挂载前清空按下集合并回到 `Idle`。
    pub fn start(self: &Arc<Self>, mut listener: Box<dyn KeyListener>) -> HotkeyResult<()> {
        let mut slot = self.listener.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() {
            warn!("Listener already running");
            return Err(HotkeyError::AlreadyListening);
        }

        {
            let mut core = self.lock();
            core.pressed.clear();
            core.press_swallowed.clear();
            core.state = EngineState::Idle;
        }

        let sink: Arc<dyn KeyEventSink> = Arc::new(EngineSink {
            engine: Arc::downgrade(self),
        });
        listener.attach(sink)?;
        *slot = Some(listener);

        info!("Global key listener attached");
        Ok(())
    }

    /// 卸载全局监听器
    ///
    /// 如果当前处于 `Armed`，先发出一次 `Deactivate`，保证录音不会悬空。
    pub fn stop(&self) {
        let listener = self
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        let pending = {
            let mut core = self.lock();
            core.pressed.clear();
            core.press_swallowed.clear();
            if core.state == EngineState::Armed {
                core.state = EngineState::Idle;
                Some(core.epoch)
            } else {
                None
            }
        };

        if let Some(epoch) = pending {
            info!("Stopping while armed, releasing hotkey");
            self.emit(HotkeySignal::Deactivate, epoch);
        }

        if let Some(mut listener) = listener {
            listener.detach();
            info!("Global key listener detached");
        }
    }

    /// 处理按下事件
    pub fn on_press(&self, raw: RawKey) {
        let key = raw.normalize();

        let signal = {
            let mut core = self.lock();

            // 系统自动重复
            if !core.pressed.insert(key) {
                trace!(key = %key, "Ignoring key repeat");
                return;
            }
            debug!(raw = ?raw, key = %key, "Key pressed");

            if core.state == EngineState::Armed && key == core.cancel_key {
                core.state = EngineState::Idle;
                core.pressed.clear();
                Some((HotkeySignal::Cancel, core.epoch))
            } else if core.state == EngineState::Idle && core.combination.is_held_in(&core.pressed)
            {
                core.state = EngineState::Armed;
                core.epoch += 1;
                Some((HotkeySignal::Activate, core.epoch))
            } else {
                None
            }
        };

        if let Some((signal, epoch)) = signal {
            self.emit(signal, epoch);
        }
    }

    /// 处理松开事件
    pub fn on_release(&self, raw: RawKey) {
        let key = raw.normalize();

        let signal = {
            let mut core = self.lock();
            debug!(raw = ?raw, key = %key, "Key released");

            let signal = if core.state == EngineState::Armed && core.combination.contains(&key) {
                core.state = EngineState::Idle;
                Some((HotkeySignal::Deactivate, core.epoch))
            } else {
                None
            };

            core.pressed.remove(&key);
            signal
        };

        if let Some((signal, epoch)) = signal {
            self.emit(signal, epoch);
        }
    }

    /// 当前事件是否应被吞掉
    ///
    /// 按下：只在 `Armed` 时吞键，范围由吞键策略决定，首次按下的结果被记住。
    /// 松开：沿用该键首次按下时的结果，保证按下与松开要么都放行、要么都被吞掉。
    pub fn should_suppress(&self, event: KeyEvent) -> bool {
        let mut core = self.lock();
        match event {
            KeyEvent::Press(raw) => {
                let key = raw.normalize();
                let swallow = core.covers_now(&key);
                core.press_swallowed.entry(key).or_insert(swallow);
                swallow
            }
            KeyEvent::Release(raw) => {
                let key = raw.normalize();
                match core.press_swallowed.remove(&key) {
                    Some(swallowed) => swallowed,
                    None => core.covers_now(&key),
                }
            }
        }
    }

    /// 当前状态
    pub fn state(&self) -> EngineState {
        self.lock().state
    }

    /// 当前按下的键
    pub fn pressed_keys(&self) -> HashSet<KeyIdentity> {
        self.lock().pressed.clone()
    }

    /// 当前组合键
    pub fn combination(&self) -> HotkeyCombination {
        self.lock().combination.clone()
    }

    /// 是否已挂载监听器
    pub fn is_listening(&self) -> bool {
        self.listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    fn emit(&self, signal: HotkeySignal, epoch: u64) {
        info!(signal = ?signal, "Hotkey signal");

        if let Err(e) = self.handler.on_signal(signal) {
            error!(signal = ?signal, error = %e, "Hotkey handler failed");

            // 同一轮里仍是 Armed 才复位，不影响之后新开始的一轮
            let mut core = self.lock();
            if core.state == EngineState::Armed && core.epoch == epoch {
                core.state = EngineState::Idle;
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, EngineCore> {
        self.core.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for HotkeyEngine {
    fn drop(&mut self) {
        let listener = self
            .listener
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(mut listener) = listener {
            listener.detach();
        }
    }
}

/// 交给监听器的弱引用，监听器不会让引擎常驻
struct EngineSink {
    engine: Weak<HotkeyEngine>,
}

impl KeyEventSink for EngineSink {
    fn deliver_press(&self, key: RawKey) {
        if let Some(engine) = self.engine.upgrade() {
            engine.on_press(key);
        }
    }

    fn deliver_release(&self, key: RawKey) {
        if let Some(engine) = self.engine.upgrade() {
            engine.on_release(key);
        }
    }

    fn suppress_current(&self, event: KeyEvent) -> bool {
        self.engine
            .upgrade()
            .is_some_and(|engine| engine.should_suppress(event))
    }
}
