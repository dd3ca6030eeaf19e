//! Process-wide "running" flag shared by every task

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// Cheap to clone; all clones observe the same flag.
///
/// Starts out running and can only ever be switched off.
#[derive(Debug, Clone)]
pub struct RunState {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    running: AtomicBool,
    stopped: Notify,
}

impl RunState {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                running: AtomicBool::new(true),
                stopped: Notify::new(),
            }),
        }
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::Acquire)
    }

    /// Switch the flag off. Returns `true` only for the call that flipped it.
    pub fn stop(&self) -> bool {
        let was_running = self.inner.running.swap(false, Ordering::AcqRel);
        if was_running {
            self.inner.stopped.notify_waiters();
        }
        was_running
    }

    /// Resolves once the flag is off
    pub async fn stopped(&self) {
        loop {
            // Register before checking so a concurrent stop() cannot slip between
            let notified = self.inner.stopped.notified();
            if !self.is_running() {
                return;
            }
            notified.await;
        }
    }
}

impl Default for RunState {
    fn default() -> Self {
        Self::new()
    }
}
