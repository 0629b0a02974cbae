//! Shared run flag for the receive loop, sender and subsystem consumers

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

#[derive(Debug)]
struct Inner {
    running: AtomicBool,
    stopped: Notify,
}

/// Cloneable "keep running" flag
///
/// Polling loops check it between units of work; clearing it lets each
/// finish the unit in hand and exit. Async tasks parked on a channel await
/// [`stopped`](Self::stopped) instead.
#[derive(Debug, Clone)]
pub struct RunFlag(Arc<Inner>);

impl RunFlag {
    pub fn new() -> Self {
        Self(Arc::new(Inner {
            running: AtomicBool::new(true),
            stopped: Notify::new(),
        }))
    }

    pub fn is_running(&self) -> bool {
        self.0.running.load(Ordering::Acquire)
    }

    pub fn stop(&self) {
        self.0.running.store(false, Ordering::Release);
        self.0.stopped.notify_waiters();
    }

    /// Resolves once [`stop`](Self::stop) has been called on any clone
    pub async fn stopped(&self) {
        loop {
            // Registered before the check so a concurrent stop is not missed
            let notified = self.0.stopped.notified();
            if !self.is_running() {
                return;
            }
            notified.await;
        }
    }
}

impl Default for RunFlag {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_stop_is_visible_to_clones() {
        let flag = RunFlag::new();
        let observer = flag.clone();
        assert!(observer.is_running());
        flag.stop();
        assert!(!observer.is_running());
    }

    #[tokio::test]
    async fn test_stopped_wakes_waiting_task() {
        let flag = RunFlag::new();
        let waiter = {
            let flag = flag.clone();
            tokio::spawn(async move { flag.stopped().await })
        };
        tokio::task::yield_now().await;
        flag.stop();

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter not woken")
            .unwrap();
        // Already stopped: resolves immediately
        flag.stopped().await;
    }
}
