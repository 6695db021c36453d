//! Debounced single-slot timer driving the stale-tier flush.

use std::time::Duration;

use parking_lot::Mutex;
use tokio::{runtime::Handle, task::JoinHandle, time};

/// At most one flush is ever pending: re-arming cancels the previous fire
/// and schedules a new one a full delay out, so the action runs `delay`
/// after the most recent trigger rather than the first.
pub struct EvictionScheduler {
    handle: Handle,
    delay: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl EvictionScheduler {
    pub fn new(handle: Handle, delay: Duration) -> Self {
        Self {
            handle,
            delay,
            pending: Mutex::new(None),
        }
    }

    /// Cancels any pending fire and schedules `action` one delay from now.
    pub fn rearm<F>(&self, action: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut slot = self.pending.lock();
        if let Some(previous) = slot.take() {
            previous.abort();
        }
        let delay = self.delay;
        *slot = Some(self.handle.spawn(async move {
            time::sleep(delay).await;
            action();
        }));
    }

    pub fn cancel(&self) {
        if let Some(previous) = self.pending.lock().take() {
            previous.abort();
        }
    }

    pub fn is_armed(&self) -> bool {
        self.pending
            .lock()
            .as_ref()
            .is_some_and(|pending| !pending.is_finished())
    }
}
