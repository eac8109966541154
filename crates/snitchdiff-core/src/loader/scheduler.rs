//! Timers and task spawning behind a trait
//!
//! The session never talks to a runtime directly: periodic polls and the
//! auto-pan tick are registered through [`Scheduler::every`], fetches are
//! started through [`Scheduler::spawn`]. Every registration returns a
//! [`TimerHandle`] that stops the timer when cancelled or dropped.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::errors::{DiffError, Result};

pub type BoxTask = Box<dyn FnMut() + Send + 'static>;
pub type BoxFuture = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

pub trait Scheduler: Send + Sync {
    /// Run `task` every `period`, first after one full period
    fn every(&self, period: Duration, task: BoxTask) -> TimerHandle;

    /// Run a detached task to completion
    fn spawn(&self, task: BoxFuture);
}

/// Owned registration of a periodic timer
pub struct TimerHandle {
    stop: Option<Box<dyn FnOnce() + Send>>,
}

impl TimerHandle {
    pub fn new(stop: impl FnOnce() + Send + 'static) -> Self {
        Self {
            stop: Some(Box::new(stop)),
        }
    }

    /// Stop the timer; no tick runs afterwards. Idempotent.
    pub fn cancel(&mut self) {
        if let Some(stop) = self.stop.take() {
            stop();
        }
    }

    pub fn is_active(&self) -> bool {
        self.stop.is_some()
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl fmt::Debug for TimerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerHandle")
            .field("active", &self.is_active())
            .finish()
    }
}

/// [`Scheduler`] on a tokio runtime
#[derive(Debug, Clone)]
pub struct TokioScheduler {
    handle: Handle,
}

impl TokioScheduler {
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Scheduler for the runtime the caller is running on
    ///
    /// # Errors
    ///
    /// Returns `Internal` outside a tokio runtime.
    pub fn current() -> Result<Self> {
        Handle::try_current()
            .map(Self::new)
            .map_err(|e| DiffError::Internal {
                message: format!("no tokio runtime: {}", e),
            })
    }
}

impl Scheduler for TokioScheduler {
    fn every(&self, period: Duration, mut task: BoxTask) -> TimerHandle {
        // tokio rejects a zero period
        let period = period.max(Duration::from_millis(1));
        let join = self.handle.spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                task();
            }
        });
        TimerHandle::new(move || join.abort())
    }

    fn spawn(&self, task: BoxFuture) {
        self.handle.spawn(task);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counting(scheduler: &TokioScheduler, period: Duration) -> (Arc<AtomicUsize>, TimerHandle) {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        let handle = scheduler.every(
            period,
            Box::new(move || {
                seen.fetch_add(1, Ordering::SeqCst);
            }),
        );
        (count, handle)
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_tick_after_one_period() {
        let scheduler = TokioScheduler::current().unwrap();
        let (count, _handle) = counting(&scheduler, Duration::from_millis(3000));

        tokio::time::sleep(Duration::from_millis(2999)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_millis(6000)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_and_drop_stop_ticks() {
        let scheduler = TokioScheduler::current().unwrap();
        let (cancelled, mut handle) = counting(&scheduler, Duration::from_millis(50));
        let (dropped, other) = counting(&scheduler, Duration::from_millis(50));

        tokio::time::sleep(Duration::from_millis(120)).await;
        handle.cancel();
        handle.cancel();
        drop(other);
        assert!(!handle.is_active());
        tokio::time::sleep(Duration::from_millis(500)).await;

        assert_eq!(cancelled.load(Ordering::SeqCst), 2);
        assert_eq!(dropped.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_current_outside_runtime_is_error() {
        assert!(matches!(TokioScheduler::current(), Err(DiffError::Internal { .. })));
    }
}
