//! 录音会话集成测试

use std::sync::{Arc, Mutex};
use std::time::Duration;

use pushscribe::audio::{AudioError, AudioFormat, AudioFrame, AudioResult, AudioSource, FrameSink};
use pushscribe::hotkey::{HotkeyConfig, HotkeyEngine, HotkeySignal, ManualListener, RawKey};
use pushscribe::session::{
    ArtifactSink, CaptureArtifact, CaptureSession, EndOutcome, ManualTimer, RecordingPolicy,
    SessionError, SessionState, StopReason, TokioTimer,
};

// ==================== 测试替身 ====================

#[derive(Default)]
struct FakeState {
    sink: Option<FrameSink>,
    opens: usize,
    closes: usize,
    failing: bool,
}

/// 内存音频源：测试主动推送帧
#[derive(Clone, Default)]
struct FakeSource {
    state: Arc<Mutex<FakeState>>,
}

impl FakeSource {
    fn push(&self, samples: usize) {
        let sink = self.sink();
        if let Some(sink) = sink {
            sink(AudioFrame::silence(samples));
        }
    }

    fn sink(&self) -> Option<FrameSink> {
        self.state.lock().unwrap().sink.clone()
    }

    fn set_failing(&self, failing: bool) {
        self.state.lock().unwrap().failing = failing;
    }

    fn opens(&self) -> usize {
        self.state.lock().unwrap().opens
    }

    fn closes(&self) -> usize {
        self.state.lock().unwrap().closes
    }
}

impl AudioSource for FakeSource {
    fn open(&mut self, _format: AudioFormat, sink: FrameSink) -> AudioResult<()> {
        let mut state = self.state.lock().unwrap();
        if state.failing {
            return Err(AudioError::DeviceBusy("in use".to_string()));
        }
        state.opens += 1;
        state.sink = Some(sink);
        Ok(())
    }

    fn close(&mut self) {
        let mut state = self.state.lock().unwrap();
        if state.sink.take().is_some() {
            state.closes += 1;
        }
    }

    fn is_open(&self) -> bool {
        self.state.lock().unwrap().sink.is_some()
    }
}

type Deliveries = Arc<Mutex<Vec<(Option<CaptureArtifact>, StopReason)>>>;

fn recording_sink() -> (Arc<dyn ArtifactSink>, Deliveries) {
    let deliveries: Deliveries = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&deliveries);
    let sink: Arc<dyn ArtifactSink> =
        Arc::new(move |artifact: Option<CaptureArtifact>, reason: StopReason| {
            log.lock().unwrap().push((artifact, reason));
        });
    (sink, deliveries)
}

fn session_with(policy: RecordingPolicy) -> (Arc<CaptureSession>, FakeSource, ManualTimer) {
    let source = FakeSource::default();
    let timer = ManualTimer::new();
    let session = CaptureSession::new(Box::new(source.clone()), Arc::new(timer.clone()), policy);
    (session, source, timer)
}

/// 0.8 秒，分三帧
fn push_800ms(source: &FakeSource) {
    source.push(4267);
    source.push(4267);
    source.push(4266);
}

// ==================== 基本生命周期 ====================

#[test]
fn test_begin_end_produces_artifact() {
    let (session, source, _timer) = session_with(RecordingPolicy::default());

    session.begin().unwrap();
    assert_eq!(session.state(), SessionState::Recording);
    assert!(source.sink().is_some());

    push_800ms(&source);
    let artifact = session.end().unwrap();

    assert_eq!(artifact.duration(), Duration::from_millis(800));
    assert_eq!(artifact.frame_count(), 3);
    assert_eq!(artifact.sample_count(), 12_800);
    assert_eq!(artifact.pcm().len(), 25_600);
    assert_eq!(session.state(), SessionState::Inactive);
    assert_eq!(session.buffered_frames(), 0);
    assert_eq!(source.closes(), 1);
}

#[test]
fn test_end_and_abort_are_idempotent() {
    let (session, source, _timer) = session_with(RecordingPolicy::default());

    assert!(session.end().is_none());
    assert!(!session.abort());
    assert_eq!(session.stop(), EndOutcome::NotRecording);

    session.begin().unwrap();
    push_800ms(&source);
    assert!(session.end().is_some());
    assert!(session.end().is_none());
    assert!(!session.abort());

    session.begin().unwrap();
    assert!(session.abort());
    assert!(!session.abort());
    assert!(session.end().is_none());
    assert_eq!(source.closes(), 2);
}

#[test]
fn test_begin_while_recording_is_rejected() {
    let (session, source, _timer) = session_with(RecordingPolicy::default());

    session.begin().unwrap();
    source.push(1000);
    let generation = session.generation();

    assert!(matches!(session.begin(), Err(SessionError::AlreadyRecording)));
    assert_eq!(session.generation(), generation);
    assert_eq!(session.buffered_frames(), 1);
    assert_eq!(source.opens(), 1);
}

#[test]
fn test_device_unavailable_keeps_inactive() {
    let (session, source, timer) = session_with(RecordingPolicy::default());
    source.set_failing(true);

    match session.begin() {
        Err(SessionError::DeviceUnavailable(AudioError::DeviceBusy(_))) => {}
        other => panic!("expected DeviceUnavailable, got {:?}", other),
    }
    assert_eq!(session.state(), SessionState::Inactive);
    assert_eq!(timer.pending(), 0);

    source.set_failing(false);
    session.begin().unwrap();
    assert!(session.is_recording());
}

#[test]
fn test_abort_discards_buffer() {
    let (session, source, timer) = session_with(RecordingPolicy::default());

    session.begin().unwrap();
    push_800ms(&source);
    assert!(session.abort());

    assert_eq!(session.buffered_frames(), 0);
    assert!(!source.is_open());
    assert_eq!(timer.pending(), 0);
    assert!(session.end().is_none());
}

// ==================== 时长边界 ====================

#[test]
fn test_exact_minimum_is_kept() {
    let (session, source, _timer) = session_with(RecordingPolicy::default());

    session.begin().unwrap();
    source.push(8000);
    let artifact = session.end().unwrap();
    assert_eq!(artifact.duration(), Duration::from_millis(500));
}

#[test]
fn test_below_minimum_is_discarded() {
    let (session, source, _timer) = session_with(RecordingPolicy::default());

    session.begin().unwrap();
    source.push(7999);
    assert!(matches!(session.stop(), EndOutcome::TooShort(d) if d < Duration::from_millis(500)));
    assert_eq!(session.buffered_frames(), 0);
}

#[test]
fn test_empty_recording_is_discarded() {
    let (session, _source, _timer) = session_with(RecordingPolicy::default());

    session.begin().unwrap();
    assert!(session.end().is_none());
}

#[test]
fn test_policy_change_applies_to_next_recording() {
    let (session, source, _timer) = session_with(RecordingPolicy::default());

    session.begin().unwrap();
    session.set_policy(RecordingPolicy {
        min_duration: Duration::from_millis(50),
        ..RecordingPolicy::default()
    });
    source.push(1600);
    assert!(session.end().is_none(), "current recording keeps the old minimum");

    session.begin().unwrap();
    source.push(1600);
    assert!(session.end().is_some());
}

// ==================== 代号过滤 ====================

#[test]
fn test_frames_from_previous_recording_are_ignored() {
    let (session, source, _timer) = session_with(RecordingPolicy::default());

    session.begin().unwrap();
    let stale = source.sink().unwrap();
    session.abort();

    // Inactive 时的迟到帧
    stale(AudioFrame::silence(1000));
    assert_eq!(session.buffered_frames(), 0);

    session.begin().unwrap();
    stale(AudioFrame::silence(1000));
    assert_eq!(session.buffered_frames(), 0);

    source.push(1000);
    assert_eq!(session.buffered_frames(), 1);
}

#[test]
fn test_on_frame_checks_generation() {
    let (session, _source, _timer) = session_with(RecordingPolicy::default());

    assert!(!session.on_frame(session.generation(), AudioFrame::silence(10)));
    session.begin().unwrap();
    let generation = session.generation();
    assert!(session.on_frame(generation, AudioFrame::silence(10)));
    assert!(!session.on_frame(generation - 1, AudioFrame::silence(10)));
}

// ==================== 看门狗 ====================

#[test]
fn test_watchdog_armed_with_max_duration() {
    let policy = RecordingPolicy {
        max_duration: Duration::from_secs(30),
        ..RecordingPolicy::default()
    };
    let (session, _source, timer) = session_with(policy);

    session.begin().unwrap();
    assert_eq!(timer.pending(), 1);
    assert_eq!(timer.last_delay(), Some(Duration::from_secs(30)));

    session.end();
    assert_eq!(timer.pending(), 0, "end disarms the watchdog");
}

#[test]
fn test_watchdog_matches_manual_end() {
    let (manual, manual_source, _t) = session_with(RecordingPolicy::default());
    manual.begin().unwrap();
    push_800ms(&manual_source);
    let expected = manual.end().unwrap();

    let (session, source, timer) = session_with(RecordingPolicy::default());
    let (sink, deliveries) = recording_sink();
    session.set_artifact_sink(Arc::downgrade(&sink));

    session.begin().unwrap();
    push_800ms(&source);
    assert_eq!(timer.fire_all(), 1);

    let deliveries = deliveries.lock().unwrap();
    assert_eq!(deliveries.len(), 1);
    let (artifact, reason) = &deliveries[0];
    assert_eq!(*reason, StopReason::MaxDuration);
    assert_eq!(artifact.as_ref(), Some(&expected));

    assert_eq!(session.state(), SessionState::Inactive);
    assert!(!source.is_open());
    assert_eq!(session.stop(), EndOutcome::NotRecording);
}

#[test]
fn test_watchdog_too_short_delivers_none() {
    let policy = RecordingPolicy {
        min_duration: Duration::from_secs(1),
        max_duration: Duration::from_secs(2),
        ..RecordingPolicy::default()
    };
    let (session, source, timer) = session_with(policy);
    let (sink, deliveries) = recording_sink();
    session.set_artifact_sink(Arc::downgrade(&sink));

    session.begin().unwrap();
    source.push(100);
    timer.fire_all();

    let deliveries = deliveries.lock().unwrap();
    assert_eq!(deliveries.len(), 1);
    assert!(deliveries[0].0.is_none());
}

#[test]
fn test_stale_watchdog_does_nothing() {
    let (session, source, timer) = session_with(RecordingPolicy::default());
    let (sink, deliveries) = recording_sink();
    session.set_artifact_sink(Arc::downgrade(&sink));

    // 第一次录音的定时器被 abort 取消，手动排入一个过期任务模拟竞态
    session.begin().unwrap();
    let first = session.generation();
    session.abort();

    session.begin().unwrap();
    assert_ne!(session.generation(), first);
    source.push(9000);

    // 仅剩当前录音的定时器
    assert_eq!(timer.pending(), 1);
    session.end().unwrap();
    assert_eq!(timer.fire_all(), 0);
    assert!(deliveries.lock().unwrap().is_empty());
}

/// 看门狗任务在阻塞线程池上执行，等待它完成
async fn wait_until(mut done: impl FnMut() -> bool) -> bool {
    for _ in 0..400 {
        if done() {
            return true;
        }
        tokio::task::yield_now().await;
        std::thread::sleep(Duration::from_millis(5));
    }
    done()
}

#[tokio::test(start_paused = true)]
async fn test_tokio_watchdog_forces_stop() {
    let policy = RecordingPolicy {
        max_duration: Duration::from_secs(3),
        ..RecordingPolicy::default()
    };
    let source = FakeSource::default();
    let timer = TokioTimer::try_current().unwrap();
    let session = CaptureSession::new(Box::new(source.clone()), Arc::new(timer), policy);
    let (sink, deliveries) = recording_sink();
    session.set_artifact_sink(Arc::downgrade(&sink));

    session.begin().unwrap();
    push_800ms(&source);

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert!(session.is_recording());

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert!(wait_until(|| !session.is_recording()).await);
    assert!(wait_until(|| deliveries.lock().unwrap().len() == 1).await);
    {
        let deliveries = deliveries.lock().unwrap();
        assert_eq!(deliveries.len(), 1);
        assert_eq!(deliveries[0].1, StopReason::MaxDuration);
    }

    // 之后的松开不会产生第二个结果
    assert!(session.end().is_none());
}

// ==================== 并发 ====================

#[test]
fn test_end_while_frames_arrive_from_another_thread() {
    let (session, source, _timer) = session_with(RecordingPolicy::default());
    session.begin().unwrap();
    let sink = source.sink().unwrap();

    let producer = std::thread::spawn(move || {
        for _ in 0..200 {
            sink(AudioFrame::silence(160));
        }
    });

    std::thread::sleep(Duration::from_millis(1));
    let _ = session.end();
    producer.join().unwrap();

    assert_eq!(session.state(), SessionState::Inactive);
    assert_eq!(session.buffered_frames(), 0);
}

// ==================== 与热键引擎联动 ====================

struct Wired {
    listener: ManualListener,
    source: FakeSource,
    session: Arc<CaptureSession>,
    artifacts: Arc<Mutex<Vec<Option<CaptureArtifact>>>>,
    signals: Arc<Mutex<Vec<HotkeySignal>>>,
    _engine: Arc<HotkeyEngine>,
}

fn wired() -> Wired {
    let (session, source, _timer) = session_with(RecordingPolicy::default());
    let artifacts = Arc::new(Mutex::new(Vec::new()));
    let signals = Arc::new(Mutex::new(Vec::new()));

    let handler = {
        let session = Arc::clone(&session);
        let artifacts = Arc::clone(&artifacts);
        let signals = Arc::clone(&signals);
        move |signal: HotkeySignal| -> anyhow::Result<()> {
            signals.lock().unwrap().push(signal);
            match signal {
                HotkeySignal::Activate => session.begin()?,
                HotkeySignal::Deactivate => artifacts.lock().unwrap().push(session.end()),
                HotkeySignal::Cancel => {
                    session.abort();
                }
            }
            Ok(())
        }
    };

    let engine = HotkeyEngine::new(
        HotkeyConfig::default().resolve().unwrap(),
        Arc::new(handler),
    )
    .unwrap();
    let listener = ManualListener::new();
    engine.start(Box::new(listener.clone())).unwrap();

    Wired {
        listener,
        source,
        session,
        artifacts,
        signals,
        _engine: engine,
    }
}

#[test]
fn test_scenario_hold_and_release() {
    let w = wired();

    w.listener.press(RawKey::AltLeft);
    w.listener.press(RawKey::Space);
    push_800ms(&w.source);
    w.listener.release(RawKey::Space);
    w.listener.release(RawKey::AltLeft);

    let artifacts = w.artifacts.lock().unwrap();
    assert_eq!(artifacts.len(), 1);
    let artifact = artifacts[0].as_ref().unwrap();
    assert_eq!(artifact.duration(), Duration::from_millis(800));
    assert_eq!(artifact.frame_count(), 3);
}

#[test]
fn test_scenario_quick_tap_is_discarded() {
    let w = wired();

    w.listener.press(RawKey::AltLeft);
    w.listener.press(RawKey::Space);
    w.source.push(1600);
    w.listener.release(RawKey::Space);

    assert_eq!(*w.artifacts.lock().unwrap(), vec![None]);
}

#[test]
fn test_scenario_escape_cancels() {
    let w = wired();

    w.listener.press(RawKey::AltLeft);
    w.listener.press(RawKey::Space);
    push_800ms(&w.source);
    w.listener.press(RawKey::Escape);
    w.listener.release(RawKey::Space);

    assert_eq!(
        *w.signals.lock().unwrap(),
        vec![HotkeySignal::Activate, HotkeySignal::Cancel]
    );
    assert!(w.artifacts.lock().unwrap().is_empty());
    assert_eq!(w.session.buffered_frames(), 0);
    assert!(!w.source.is_open());
}

#[test]
fn test_scenario_device_failure_then_retry() {
    let w = wired();
    w.source.set_failing(true);

    w.listener.press(RawKey::AltLeft);
    w.listener.press(RawKey::Space);
    assert!(!w.session.is_recording());

    // 引擎已回到 Idle，松开不会产生 Deactivate
    w.listener.release(RawKey::Space);
    assert_eq!(*w.signals.lock().unwrap(), vec![HotkeySignal::Activate]);

    w.source.set_failing(false);
    w.listener.press(RawKey::Space);
    assert!(w.session.is_recording());
}
