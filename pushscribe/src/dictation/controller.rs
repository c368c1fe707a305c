//! 听写控制器
//!
//! 把热键信号接到录音会话上，并把录音交给转写与文本输出。
//! 手动停止与看门狗停止走同一个投递函数 `ControllerInner::hand_off`。

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::event::DictationEvent;
use super::history::RecentTranscriptions;
use super::output::TextOutput;
use crate::audio::AudioSource;
use crate::config::{AppConfig, ConfigManager};
use crate::hotkey::{HotkeyEngine, HotkeyHandler, HotkeySignal, KeyListener};
use crate::session::{
    ArtifactSink, CaptureArtifact, CaptureSession, EndOutcome, SessionError, StopReason,
    WatchdogTimer,
};
use crate::transcription::{Transcriber, TranscriptionError, TranscriptionRequest};
use crate::utils::error::AppResult;

/// 事件通道容量
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

/// 控制器依赖的外部组件
pub struct Collaborators {
    /// 音频输入
    pub source: Box<dyn AudioSource>,
    /// 看门狗定时器
    pub timer: Arc<dyn WatchdogTimer>,
    /// 语音转写服务
    pub transcriber: Arc<dyn Transcriber>,
    /// 文本输出
    pub output: Arc<dyn TextOutput>,
}

/// 信号处理与录音投递
///
/// 不持有引擎，引擎通过 `Arc<dyn HotkeyHandler>` 持有它。
struct ControllerInner {
    session: Arc<CaptureSession>,
    transcriber: Arc<dyn Transcriber>,
    output: Arc<dyn TextOutput>,
    config: ConfigManager,
    history: Mutex<RecentTranscriptions>,
    events: mpsc::Sender<DictationEvent>,
    runtime: Handle,
    /// 正在进行的转写任务数
    in_flight: AtomicUsize,
    me: Weak<ControllerInner>,
}

/// 转写任务计数
///
/// 任务结束或转写器 panic 展开时都会减一。
struct InFlight(Arc<ControllerInner>);

impl InFlight {
    fn enter(inner: Arc<ControllerInner>) -> Self {
        inner.in_flight.fetch_add(1, Ordering::SeqCst);
        Self(inner)
    }

    fn inner(&self) -> &ControllerInner {
        &self.0
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ControllerInner {
    fn publish(&self, event: DictationEvent) {
        match self.events.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(event)) => {
                warn!(?event, "Event channel full, event dropped");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!("Event receiver dropped");
            }
        }
    }

    fn history(&self) -> MutexGuard<'_, RecentTranscriptions> {
        self.history.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn begin(&self) -> anyhow::Result<()> {
        match self.session.begin() {
            Ok(()) => {
                self.publish(DictationEvent::RecordingStarted);
                Ok(())
            }
            Err(SessionError::AlreadyRecording) => {
                warn!("Activate while already recording, ignored");
                Ok(())
            }
            Err(e) => {
                self.publish(DictationEvent::DeviceUnavailable {
                    message: e.to_string(),
                });
                Err(e.into())
            }
        }
    }

    /// 手动停止与看门狗停止共用的投递入口
    fn hand_off(&self, artifact: Option<CaptureArtifact>, reason: StopReason) {
        self.publish(DictationEvent::RecordingStopped { reason });

        let Some(artifact) = artifact else {
            self.publish(DictationEvent::TooShort);
            return;
        };

        let Some(me) = self.me.upgrade() else {
            return;
        };

        info!(
            ?reason,
            duration_ms = artifact.duration().as_millis() as u64,
            frames = artifact.frame_count(),
            "Submitting recording for transcription"
        );

        let language = self.config.language();
        let guard = InFlight::enter(me);
        self.runtime.spawn(async move {
            guard.inner().transcribe(artifact, language).await;
        });
    }

    async fn transcribe(&self, artifact: CaptureArtifact, language: Option<String>) {
        let request = TranscriptionRequest::new(artifact, language);

        let text = match self.transcriber.transcribe(request).await {
            Ok(text) if text.trim().is_empty() => Err(TranscriptionError::EmptyResult),
            other => other,
        };

        let text = match text {
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                error!(error = %e, retryable = e.is_retryable(), "Transcription failed");
                self.publish(DictationEvent::TranscriptionFailed {
                    message: e.to_string(),
                });
                return;
            }
        };

        let output = Arc::clone(&self.output);
        let for_output = text.clone();
        let written = tokio::task::spawn_blocking(move || output.output(&for_output))
            .await
            .map_err(anyhow::Error::from)
            .and_then(|result| result);

        if let Err(e) = written {
            error!(error = %e, "Text output failed");
            self.publish(DictationEvent::OutputFailed {
                message: e.to_string(),
            });
        }

        self.history().push(text.clone());
        info!(chars = text.chars().count(), "Transcription complete");
        self.publish(DictationEvent::Transcribed { text });
    }
}

impl HotkeyHandler for ControllerInner {
    fn on_signal(&self, signal: HotkeySignal) -> anyhow::Result<()> {
        debug!(?signal, "Hotkey signal");
        match signal {
            HotkeySignal::Activate => self.begin(),
            HotkeySignal::Deactivate => {
                match self.session.stop() {
                    EndOutcome::NotRecording => {
                        debug!("Release after the recording already ended");
                    }
                    outcome => self.hand_off(outcome.into_artifact(), StopReason::Released),
                }
                Ok(())
            }
            HotkeySignal::Cancel => {
                if self.session.abort() {
                    self.publish(DictationEvent::RecordingCancelled);
                }
                Ok(())
            }
        }
    }
}

impl ArtifactSink for ControllerInner {
    fn deliver(&self, artifact: Option<CaptureArtifact>, reason: StopReason) {
        self.hand_off(artifact, reason);
    }
}

/// 听写控制器
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use async_trait::async_trait;
/// use pushscribe::audio::{AudioFormat, AudioResult, AudioSource, FrameSink};
/// use pushscribe::config::AppConfig;
/// use pushscribe::dictation::{Collaborators, DictationController, MemoryOutput};
/// use pushscribe::hotkey::ManualListener;
/// use pushscribe::session::ManualTimer;
/// use pushscribe::transcription::{Transcriber, TranscriptionError, TranscriptionRequest};
///
/// struct Silent;
/// impl AudioSource for Silent {
///     fn open(&mut self, _: AudioFormat, _: FrameSink) -> AudioResult<()> { Ok(()) }
///     fn close(&mut self) {}
///     fn is_open(&self) -> bool { false }
/// }
///
/// struct Echo;
/// #[async_trait]
/// impl Transcriber for Echo {
///     async fn transcribe(&self, _: TranscriptionRequest) -> Result<String, TranscriptionError> {
///         Ok("hello".to_string())
///     }
/// }
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let (controller, _events) = DictationController::new(
///     AppConfig::default(),
///     Collaborators {
///         source: Box::new(Silent),
///         timer: Arc::new(ManualTimer::new()),
///         transcriber: Arc::new(Echo),
///         output: Arc::new(MemoryOutput::new()),
///     },
///     tokio::runtime::Handle::current(),
/// )
/// .unwrap();
///
/// let listener = ManualListener::new();
/// controller.start(Box::new(listener.clone())).unwrap();
/// controller.stop();
/// # }
/// ```
pub struct DictationController {
    engine: Arc<HotkeyEngine>,
    inner: Arc<ControllerInner>,
}

impl DictationController {
    /// 创建控制器，返回控制器与事件接收端
    ///
    /// 转写任务在 `runtime` 上运行。
    pub fn new(
        config: AppConfig,
        parts: Collaborators,
        runtime: Handle,
    ) -> AppResult<(Self, mpsc::Receiver<DictationEvent>)> {
        config.validate()?;
        let hotkeys = config.resolve_hotkeys()?;

        let session = CaptureSession::new(parts.source, parts.timer, config.recording.policy());
        let (events, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let history_size = config.transcription.history_size;

        let inner = Arc::new_cyclic(|me| ControllerInner {
            session: Arc::clone(&session),
            transcriber: parts.transcriber,
            output: parts.output,
            config: ConfigManager::new(config),
            history: Mutex::new(RecentTranscriptions::new(history_size)),
            events,
            runtime,
            in_flight: AtomicUsize::new(0),
            me: me.clone(),
        });

        let sink: Arc<dyn ArtifactSink> = inner.clone();
        session.set_artifact_sink(Arc::downgrade(&sink));

        let handler: Arc<dyn HotkeyHandler> = inner.clone();
        let engine = HotkeyEngine::new(hotkeys, handler)?;

        info!("DictationController initialized");
        Ok((Self { engine, inner }, rx))
    }

    /// 挂载全局监听器，开始响应热键
    pub fn start(&self, listener: Box<dyn KeyListener>) -> AppResult<()> {
        self.engine.start(listener)?;
        Ok(())
    }

    /// 卸载监听器；录音中会按松开处理
    pub fn stop(&self) {
        self.engine.stop();
    }

    /// 应用新配置
    ///
    /// 热键立即生效；录音策略从下一次录音起生效。输入设备在重新创建控制器后生效。
    pub fn reconfigure(&self, config: AppConfig) -> AppResult<()> {
        config.validate()?;
        let hotkeys = config.resolve_hotkeys()?;

        let previous = self.inner.config.get();
        if previous.recording.input_device != config.recording.input_device {
            warn!("Input device change takes effect after restart");
        }

        self.engine.apply(hotkeys);
        self.inner.session.set_policy(config.recording.policy());
        self.inner
            .history()
            .set_capacity(config.transcription.history_size);
        self.inner.config.update(config)?;

        info!("Dictation configuration applied");
        Ok(())
    }

    /// 当前配置
    pub fn config(&self) -> Arc<AppConfig> {
        self.inner.config.get()
    }

    /// 最近的转写结果，最新的在前
    pub fn recent_transcriptions(&self) -> Vec<String> {
        self.inner.history().to_vec()
    }

    /// 清空最近的转写结果
    pub fn clear_history(&self) {
        self.inner.history().clear();
    }

    /// 正在进行的转写任务数
    pub fn pending_transcriptions(&self) -> usize {
        self.inner.in_flight.load(Ordering::SeqCst)
    }

    pub fn engine(&self) -> &Arc<HotkeyEngine> {
        &self.engine
    }

    pub fn session(&self) -> &Arc<CaptureSession> {
        &self.inner.session
    }
}
