//! Owned one-shot timers
//!
//! A [`ScheduledTimer`] is the only handle to its task. Releasing it through
//! [`ScheduledTimer::cancel`] (or dropping it) aborts the task, so a timer can
//! never outlive its owner. The expiring task releases its own handle with
//! [`ScheduledTimer::disarm`], which detaches without aborting.

use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Handle to a pending one-shot callback
#[derive(Debug)]
pub struct ScheduledTimer {
    handle: Option<JoinHandle<()>>,
    delay: Duration,
}

impl ScheduledTimer {
    /// Run `on_expiry` after `delay` on `runtime`
    pub fn spawn_on<F>(runtime: &Handle, delay: Duration, on_expiry: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let handle = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            on_expiry();
        });
        Self {
            handle: Some(handle),
            delay,
        }
    }

    /// Delay the timer was armed with
    #[inline]
    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Abort the callback if it has not run yet
    pub fn cancel(mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    /// Release the handle without aborting
    pub fn disarm(mut self) {
        self.handle = None;
    }
}

impl Drop for ScheduledTimer {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
