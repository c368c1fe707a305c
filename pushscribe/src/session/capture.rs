//! 录音会话
//!
//! 一把互斥锁保护状态、缓冲区和代号（generation）；
//! 设备的打开与关闭放在另一把锁里，音频回调线程永远不会阻塞关闭流程。

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use super::artifact::CaptureArtifact;
use super::error::{SessionError, SessionResult};
use super::watchdog::{TimerHandle, WatchdogTimer};
use crate::audio::{AudioFormat, AudioFrame, AudioSource, FrameSink};

/// 默认最短录音时长
pub const MIN_DURATION: Duration = Duration::from_millis(500);

/// 默认最长录音时长
pub const MAX_DURATION: Duration = Duration::from_secs(120);

/// 会话状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// 未录音
    Inactive,
    /// 录音中
    Recording,
}

/// 录音结束的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// 组合键松开（或引擎停止）
    Released,
    /// 达到最长时长，由看门狗结束
    MaxDuration,
}

/// 时长策略与采集格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordingPolicy {
    pub format: AudioFormat,
    /// 短于此时长的录音被丢弃（严格小于）
    pub min_duration: Duration,
    /// 看门狗超时
    pub max_duration: Duration,
}

impl Default for RecordingPolicy {
    fn default() -> Self {
        Self {
            format: AudioFormat::default(),
            min_duration: MIN_DURATION,
            max_duration: MAX_DURATION,
        }
    }
}

/// 一次 `stop` 的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndOutcome {
    /// 未在录音，空操作
    NotRecording,
    /// 时长不足，已丢弃
    TooShort(Duration),
    /// 产生了录音
    Captured(CaptureArtifact),
}

impl EndOutcome {
    /// 只保留录音本身
    pub fn into_artifact(self) -> Option<CaptureArtifact> {
        match self {
            EndOutcome::Captured(artifact) => Some(artifact),
            EndOutcome::NotRecording | EndOutcome::TooShort(_) => None,
        }
    }
}

/// 看门狗结束录音后的结果接收方
///
/// 与手动停止共用同一个下游。`None` 表示录音过短被丢弃。
pub trait ArtifactSink: Send + Sync {
    fn deliver(&self, artifact: Option<CaptureArtifact>, reason: StopReason);
}

impl<F> ArtifactSink for F
where
    F: Fn(Option<CaptureArtifact>, StopReason) + Send + Sync,
{
    fn deliver(&self, artifact: Option<CaptureArtifact>, reason: StopReason) {
        self(artifact, reason)
    }
}

/// 受状态锁保护的数据
struct SessionCore {
    state: SessionState,
    frames: Vec<AudioFrame>,
    sample_count: u64,
    /// 每次 begin 加一
    generation: u64,
    watchdog: Option<TimerHandle>,
    /// 下一次 begin 使用的策略
    policy: RecordingPolicy,
    /// 本次录音在 begin 时取得的策略
    active: RecordingPolicy,
}

/// 受设备锁保护的数据
struct DeviceSlot {
    source: Box<dyn AudioSource>,
    /// 当前打开设备的那次录音
    open_generation: Option<u64>,
}

/// 从状态锁中取出的一次录音
struct Finished {
    generation: u64,
    frames: Vec<AudioFrame>,
    sample_count: u64,
    policy: RecordingPolicy,
    watchdog: Option<TimerHandle>,
}

/// 录音会话
pub struct CaptureSession {
    core: Mutex<SessionCore>,
    device: Mutex<DeviceSlot>,
    timer: Arc<dyn WatchdogTimer>,
    artifact_sink: Mutex<Option<Weak<dyn ArtifactSink>>>,
    me: Weak<CaptureSession>,
}

impl CaptureSession {
    /// 创建会话
    pub fn new(
        source: Box<dyn AudioSource>,
        timer: Arc<dyn WatchdogTimer>,
        policy: RecordingPolicy,
    ) -> Arc<Self> {
        info!(
            sample_rate = policy.format.sample_rate,
            min_ms = policy.min_duration.as_millis() as u64,
            max_ms = policy.max_duration.as_millis() as u64,
            "CaptureSession initialized"
        );

        Arc::new_cyclic(|me| Self {
            core: Mutex::new(SessionCore {
                state: SessionState::Inactive,
                frames: Vec::new(),
                sample_count: 0,
                generation: 0,
                watchdog: None,
                policy,
                active: policy,
            }),
            device: Mutex::new(DeviceSlot {
                source,
                open_generation: None,
            }),
            timer,
            artifact_sink: Mutex::new(None),
            me: me.clone(),
        })
    }

    /// 注册看门狗结果的接收方
    ///
    /// 只保存弱引用，接收方可以反过来持有会话。
    pub fn set_artifact_sink(&self, sink: Weak<dyn ArtifactSink>) {
        *self
            .artifact_sink
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(sink);
    }

    /// 替换策略，从下一次 begin 起生效
    pub fn set_policy(&self, policy: RecordingPolicy) {
        self.lock().policy = policy;
        debug!(?policy, "Recording policy updated");
    }

    /// 当前策略
    pub fn policy(&self) -> RecordingPolicy {
        self.lock().policy
    }

    /// 当前状态
    pub fn state(&self) -> SessionState {
        self.lock().state
    }

    pub fn is_recording(&self) -> bool {
        self.state() == SessionState::Recording
    }

    /// 当前（或最近一次）录音的代号
    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    /// 已缓冲的帧数
    pub fn buffered_frames(&self) -> usize {
        self.lock().frames.len()
    }

    /// 已缓冲的时长
    pub fn buffered_duration(&self) -> Duration {
        let core = self.lock();
        core.active.format.duration_of(core.sample_count)
    }

    /// 开始录音
    ///
    /// # Errors
    ///
    /// - `SessionError::AlreadyRecording` - 已在录音，状态不变
    /// - `SessionError::DeviceUnavailable` - 设备无法打开，保持 `Inactive`
    pub fn begin(&self) -> SessionResult<()> {
        let (generation, policy) = {
            let mut core = self.lock();
            if core.state == SessionState::Recording {
                warn!(generation = core.generation, "begin ignored: already recording");
                return Err(SessionError::AlreadyRecording);
            }
            core.state = SessionState::Recording;
            core.generation += 1;
            core.frames.clear();
            core.sample_count = 0;
            core.active = core.policy;
            (core.generation, core.active)
        };

        {
            let mut device = self.lock_device();
            if device.open_generation.take().is_some() {
                device.source.close();
            }

            if let Err(e) = device.source.open(policy.format, self.frame_sink(generation)) {
                drop(device);
                let mut core = self.lock();
                if core.state == SessionState::Recording && core.generation == generation {
                    core.state = SessionState::Inactive;
                    core.frames.clear();
                    core.sample_count = 0;
                }
                warn!(generation, error = %e, "Audio input unavailable");
                return Err(SessionError::DeviceUnavailable(e));
            }

            if !self.is_current(generation) {
                // 打开期间已被 end/abort 结束
                device.source.close();
                debug!(generation, "Recording ended while the device was opening");
                return Ok(());
            }
            device.open_generation = Some(generation);
        }

        let me = self.me.clone();
        let handle = self.timer.schedule(
            policy.max_duration,
            Box::new(move || {
                if let Some(session) = me.upgrade() {
                    session.on_watchdog(generation);
                }
            }),
        );

        let mut core = self.lock();
        if core.state == SessionState::Recording && core.generation == generation {
            core.watchdog = Some(handle);
            drop(core);
            info!(generation, "Recording started");
        } else {
            drop(core);
            handle.cancel();
        }

        Ok(())
    }

    /// 追加一帧
    ///
    /// 只有处于 `Recording` 且属于当前代号的帧会被追加，返回是否追加。
    pub fn on_frame(&self, generation: u64, frame: AudioFrame) -> bool {
        let mut core = self.lock();
        if core.state != SessionState::Recording || core.generation != generation {
            trace!(generation, current = core.generation, "Stale frame dropped");
            return false;
        }
        core.sample_count += frame.sample_count() as u64;
        core.frames.push(frame);
        true
    }

    /// 结束录音
    ///
    /// 时长严格小于最短时长时丢弃并返回 `None`；`Inactive` 时为空操作。
    pub fn end(&self) -> Option<CaptureArtifact> {
        self.stop().into_artifact()
    }

    /// 结束录音并区分"未在录音"与"时长不足"
    pub fn stop(&self) -> EndOutcome {
        let Some(mut finished) = self.finish(None) else {
            return EndOutcome::NotRecording;
        };
        if let Some(handle) = finished.watchdog.take() {
            handle.cancel();
        }
        let generation = finished.generation;
        let outcome = Self::assemble(finished);
        debug!(
            generation,
            captured = matches!(outcome, EndOutcome::Captured(_)),
            "Recording ended"
        );
        outcome
    }

    /// 放弃录音，总是丢弃缓冲区
    ///
    /// `Inactive` 时为空操作；返回是否确实放弃了一次录音。
    pub fn abort(&self) -> bool {
        let Some(mut finished) = self.finish(None) else {
            return false;
        };
        if let Some(handle) = finished.watchdog.take() {
            handle.cancel();
        }
        info!(
            generation = finished.generation,
            frames = finished.frames.len(),
            "Recording aborted"
        );
        true
    }

    fn on_watchdog(&self, generation: u64) {
        let Some(finished) = self.finish(Some(generation)) else {
            trace!(generation, "Watchdog fired after the recording ended");
            return;
        };

        warn!(
            generation,
            max_ms = finished.policy.max_duration.as_millis() as u64,
            "Maximum recording duration reached"
        );
        let artifact = Self::assemble(finished).into_artifact();

        let sink = self
            .artifact_sink
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .and_then(Weak::upgrade);
        match sink {
            Some(sink) => sink.deliver(artifact, StopReason::MaxDuration),
            None => warn!(generation, "No artifact sink registered, watchdog result dropped"),
        }
    }

    /// 状态切到 Inactive 并关闭设备；`expected` 不匹配或已是 Inactive 时返回 None
    fn finish(&self, expected: Option<u64>) -> Option<Finished> {
        let finished = {
            let mut core = self.lock();
            if core.state != SessionState::Recording {
                return None;
            }
            if expected.is_some_and(|g| g != core.generation) {
                return None;
            }
            core.state = SessionState::Inactive;
            let sample_count = std::mem::take(&mut core.sample_count);
            Finished {
                generation: core.generation,
                frames: std::mem::take(&mut core.frames),
                sample_count,
                policy: core.active,
                watchdog: core.watchdog.take(),
            }
        };

        let mut device = self.lock_device();
        if device.open_generation == Some(finished.generation) {
            device.open_generation = None;
            device.source.close();
        }

        Some(finished)
    }

    fn assemble(finished: Finished) -> EndOutcome {
        let Finished {
            frames,
            sample_count,
            policy,
            ..
        } = finished;

        let duration = policy.format.duration_of(sample_count);
        if duration < policy.min_duration {
            info!(
                duration_ms = duration.as_millis() as u64,
                min_ms = policy.min_duration.as_millis() as u64,
                "Recording too short, discarded"
            );
            return EndOutcome::TooShort(duration);
        }

        let mut pcm = Vec::with_capacity(frames.iter().map(|f| f.as_bytes().len()).sum());
        for frame in &frames {
            pcm.extend_from_slice(frame.as_bytes());
        }
        EndOutcome::Captured(CaptureArtifact::new(policy.format, frames.len(), sample_count, pcm))
    }

    fn frame_sink(&self, generation: u64) -> FrameSink {
        let me = self.me.clone();
        Arc::new(move |frame| {
            if let Some(session) = me.upgrade() {
                session.on_frame(generation, frame);
            }
        })
    }

    fn is_current(&self, generation: u64) -> bool {
        let core = self.lock();
        core.state == SessionState::Recording && core.generation == generation
    }

    fn lock(&self) -> MutexGuard<'_, SessionCore> {
        self.core.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_device(&self) -> MutexGuard<'_, DeviceSlot> {
        self.device.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        let slot = self.device.get_mut().unwrap_or_else(PoisonError::into_inner);
        if slot.open_generation.take().is_some() {
            slot.source.close();
        }
    }
}
