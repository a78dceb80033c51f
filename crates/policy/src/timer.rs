//! Cancellable deferred tasks.

use std::time::Duration;

use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;

pub type TimerTask = Box<dyn FnOnce() + Send + 'static>;

/// Runs a task once after a delay unless cancelled first.
///
/// Cancellation is best-effort: a task that already started waiting on the
/// session lock still runs, so tasks re-check their own validity.
pub trait Scheduler: Send + Sync {
    fn schedule(&self, delay: Duration, task: TimerTask) -> TimerHandle;
}

/// Handle to a scheduled task.
#[derive(Debug, Clone)]
pub struct TimerHandle {
    token: CancellationToken,
}

impl TimerHandle {
    pub fn new(token: CancellationToken) -> Self {
        Self { token }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Scheduler backed by a tokio runtime.
#[derive(Debug, Clone)]
pub struct TokioScheduler {
    handle: Handle,
}

impl TokioScheduler {
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Scheduler on the runtime of the calling context, if inside one.
    pub fn try_current() -> Option<Self> {
        Handle::try_current().ok().map(Self::new)
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&self, delay: Duration, task: TimerTask) -> TimerHandle {
        let token = CancellationToken::new();
        let cancelled = token.clone();

        self.handle.spawn(async move {
            tokio::select! {
                biased;
                _ = cancelled.cancelled() => {
                    tracing::trace!("timer cancelled");
                }
                _ = tokio::time::sleep(delay) => task(),
            }
        });

        TimerHandle::new(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counting_task(counter: &Arc<AtomicUsize>) -> TimerTask {
        let counter = Arc::clone(counter);
        Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_task_fires_after_delay() {
        let scheduler = TokioScheduler::try_current().unwrap();
        let fired = Arc::new(AtomicUsize::new(0));

        scheduler.schedule(Duration::from_millis(100), counting_task(&fired));

        tokio::time::sleep(Duration::from_millis(99)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_task_never_fires() {
        let scheduler = TokioScheduler::try_current().unwrap();
        let fired = Arc::new(AtomicUsize::new(0));

        let handle = scheduler.schedule(Duration::from_millis(100), counting_task(&fired));
        handle.cancel();
        assert!(handle.is_cancelled());

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_no_runtime_no_scheduler() {
        assert!(TokioScheduler::try_current().is_none());
    }
}
