//! 录音时长看门狗使用的定时器
//!
//! 会话只依赖 [`WatchdogTimer`]；生产环境用 [`TokioTimer`]，
//! 测试或无运行时的宿主用 [`ManualTimer`] 手动触发。

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tracing::{error, trace};

/// 定时任务
pub type TimerTask = Box<dyn FnOnce() + Send + 'static>;

/// 已安排任务的取消句柄
///
/// 直接丢弃句柄不会取消任务。
pub struct TimerHandle {
    cancel: Option<Box<dyn FnOnce() + Send + 'static>>,
}

impl TimerHandle {
    /// 用取消动作创建句柄
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// 无需取消的句柄
    pub fn noop() -> Self {
        Self { cancel: None }
    }

    /// 取消任务；任务已执行时无效果
    pub fn cancel(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl std::fmt::Debug for TimerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerHandle")
            .field("cancellable", &self.cancel.is_some())
            .finish()
    }
}

/// 一次性定时器
pub trait WatchdogTimer: Send + Sync {
    /// `after` 之后在定时器自己的上下文中执行 `task`
    fn schedule(&self, after: Duration, task: TimerTask) -> TimerHandle;
}

/// 基于 tokio 运行时的定时器
///
/// 计时在运行时上进行，到期后任务交给阻塞线程池执行。
/// 到期之后再取消不会中断已经开始的任务。
#[derive(Debug, Clone)]
pub struct TokioTimer {
    handle: Handle,
}

impl TokioTimer {
    /// 在指定运行时上安排任务
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// 使用当前运行时；不在运行时内调用时返回 None
    pub fn try_current() -> Option<Self> {
        Handle::try_current().ok().map(Self::new)
    }
}

impl WatchdogTimer for TokioTimer {
    fn schedule(&self, after: Duration, task: TimerTask) -> TimerHandle {
        trace!(after_ms = after.as_millis() as u64, "Watchdog scheduled");
        let join = self.handle.spawn(async move {
            tokio::time::sleep(after).await;
            // 任务会关闭音频设备并等待采集线程退出，不能占用运行时工作线程
            if let Err(e) = tokio::task::spawn_blocking(task).await {
                error!(error = %e, "Watchdog task failed");
            }
        });
        TimerHandle::new(move || join.abort())
    }
}

struct PendingTask {
    id: u64,
    after: Duration,
    task: TimerTask,
}

#[derive(Default)]
struct ManualTimerInner {
    next_id: u64,
    pending: Vec<PendingTask>,
}

/// 手动触发的定时器
///
/// 任务只在调用 [`ManualTimer::fire_all`] 时执行。克隆出的句柄共享同一队列。
#[derive(Clone, Default)]
pub struct ManualTimer {
    inner: Arc<Mutex<ManualTimerInner>>,
}

impl ManualTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// 尚未执行也未取消的任务数
    pub fn pending(&self) -> usize {
        self.lock().pending.len()
    }

    /// 最近一次安排的延时
    pub fn last_delay(&self) -> Option<Duration> {
        self.lock().pending.last().map(|p| p.after)
    }

    /// 执行所有待执行任务，返回执行数量
    ///
    /// 任务在锁外执行，任务内可以再次安排新任务。
    pub fn fire_all(&self) -> usize {
        let tasks = std::mem::take(&mut self.lock().pending);
        let count = tasks.len();
        for pending in tasks {
            (pending.task)();
        }
        count
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ManualTimerInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl WatchdogTimer for ManualTimer {
    fn schedule(&self, after: Duration, task: TimerTask) -> TimerHandle {
        let id = {
            let mut inner = self.lock();
            inner.next_id += 1;
            let id = inner.next_id;
            inner.pending.push(PendingTask { id, after, task });
            id
        };

        let queue = Arc::clone(&self.inner);
        TimerHandle::new(move || {
            queue
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .pending
                .retain(|p| p.id != id);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc;

    /// 等待阻塞线程池上的任务完成
    async fn wait_for(counter: &AtomicUsize, expected: usize) -> bool {
        for _ in 0..400 {
            if counter.load(Ordering::SeqCst) == expected {
                return true;
            }
            tokio::task::yield_now().await;
            std::thread::sleep(Duration::from_millis(5));
        }
        false
    }

    #[test]
    fn test_manual_timer_fire_and_cancel() {
        let timer = ManualTimer::new();
        let fired = Arc::new(AtomicUsize::new(0));

        let f1 = Arc::clone(&fired);
        let _keep = timer.schedule(Duration::from_secs(1), Box::new(move || {
            f1.fetch_add(1, Ordering::SeqCst);
        }));
        let f2 = Arc::clone(&fired);
        let cancelled = timer.schedule(Duration::from_secs(2), Box::new(move || {
            f2.fetch_add(10, Ordering::SeqCst);
        }));

        assert_eq!(timer.pending(), 2);
        cancelled.cancel();
        assert_eq!(timer.pending(), 1);

        assert_eq!(timer.fire_all(), 1);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(timer.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_timer_fires_after_delay() {
        let timer = TokioTimer::try_current().unwrap();
        let fired = Arc::new(AtomicUsize::new(0));
        let f = Arc::clone(&fired);

        let _handle = timer.schedule(Duration::from_secs(5), Box::new(move || {
            f.fetch_add(1, Ordering::SeqCst);
        }));

        tokio::time::sleep(Duration::from_secs(4)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(wait_for(&fired, 1).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_timer_runs_task_off_runtime_thread() {
        let timer = TokioTimer::try_current().unwrap();
        let runtime_thread = std::thread::current().id();
        let (tx, rx) = mpsc::channel();

        let _handle = timer.schedule(Duration::from_millis(10), Box::new(move || {
            let _ = tx.send(std::thread::current().id());
        }));

        tokio::time::sleep(Duration::from_millis(20)).await;
        let task_thread = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_ne!(task_thread, runtime_thread);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_timer_cancel() {
        let timer = TokioTimer::try_current().unwrap();
        let fired = Arc::new(AtomicUsize::new(0));
        let f = Arc::clone(&fired);

        let handle = timer.schedule(Duration::from_secs(1), Box::new(move || {
            f.fetch_add(1, Ordering::SeqCst);
        }));
        handle.cancel();

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }
}
