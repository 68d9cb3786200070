//! Cooperative shutdown token.
//!
//! Shutdown is advisory: drivers check the token at each top-of-loop
//! boundary, and every sleep goes through [`Shutdown::sleep`] so a
//! pending request wakes the sleeper early. In-flight fetch and store
//! calls are never interrupted; they run to completion (or their own
//! timeout) and the driver observes the flag afterwards.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

/// Cloneable cancellation token shared between the signal handler and
/// the drivers.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

impl Shutdown {
    /// Creates a token in the "not requested" state.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Requests shutdown. Idempotent.
    pub fn trigger(&self) {
        let _ = self.tx.send(true);
    }

    /// Returns true once shutdown has been requested.
    pub fn is_triggered(&self) -> bool {
        *self.tx.subscribe().borrow()
    }

    /// Sleeps for `duration`, waking early if shutdown is requested.
    ///
    /// Returns `true` if the full duration elapsed, `false` if the
    /// sleep was cut short (or shutdown was already pending).
    pub async fn sleep(&self, duration: Duration) -> bool {
        let mut rx = self.tx.subscribe();
        if *rx.borrow() {
            return false;
        }
        tokio::select! {
            () = tokio::time::sleep(duration) => true,
            _ = rx.wait_for(|requested| *requested) => false,
        }
    }

    /// Waits until shutdown is requested.
    pub async fn wait(&self) {
        let mut rx = self.tx.subscribe();
        let _ = rx.wait_for(|requested| *requested).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sleep_completes_without_trigger() {
        let shutdown = Shutdown::new();
        assert!(shutdown.sleep(Duration::from_millis(5)).await);
        assert!(!shutdown.is_triggered());
    }

    #[tokio::test]
    async fn test_trigger_wakes_sleeper() {
        let shutdown = Shutdown::new();
        let waker = shutdown.clone();
        let handle = tokio::spawn(async move { waker.sleep(Duration::from_secs(60)).await });

        tokio::time::sleep(Duration::from_millis(10)).await;
        shutdown.trigger();

        let completed = handle.await.unwrap();
        assert!(!completed);
        assert!(shutdown.is_triggered());
    }

    #[tokio::test]
    async fn test_sleep_after_trigger_returns_immediately() {
        let shutdown = Shutdown::new();
        shutdown.trigger();
        assert!(!shutdown.sleep(Duration::from_secs(60)).await);
    }
}
