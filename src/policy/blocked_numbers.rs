// ABOUTME: Tells the blocked-number provider that an emergency number was contacted
// ABOUTME: Calls run on the blocking pool, failures are logged, and in-flight work can be awaited

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Notify;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Blocked number provider unavailable: {0}")]
    Unavailable(String),

    #[error("Blocked number provider rejected the call: {0}")]
    Rejected(String),
}

/// Store that suspends number blocking after emergency contact
///
/// Calls may block (they stand for a content-provider round trip).
pub trait BlockedNumberProvider: Send + Sync {
    fn notify_emergency_contact(&self) -> Result<(), ProviderError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopBlockedNumberProvider;

impl BlockedNumberProvider for NoopBlockedNumberProvider {
    fn notify_emergency_contact(&self) -> Result<(), ProviderError> {
        Ok(())
    }
}

#[derive(Default)]
struct InFlight {
    count: AtomicUsize,
    idle: Notify,
}

/// Counts one running notification until dropped
struct InFlightGuard(Arc<InFlight>);

impl InFlightGuard {
    fn enter(in_flight: &Arc<InFlight>) -> Self {
        in_flight.count.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(in_flight))
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if self.0.count.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.0.idle.notify_waiters();
        }
    }
}

/// Fire-and-forget notifier
#[derive(Clone)]
pub struct BlockedNumberNotifier {
    provider: Arc<dyn BlockedNumberProvider>,
    in_flight: Arc<InFlight>,
}

impl BlockedNumberNotifier {
    pub fn new(provider: Arc<dyn BlockedNumberProvider>) -> Self {
        Self {
            provider,
            in_flight: Arc::new(InFlight::default()),
        }
    }

    /// Queue one notification on the blocking pool
    pub fn notify_emergency_contact(&self) {
        let provider = Arc::clone(&self.provider);
        let guard = InFlightGuard::enter(&self.in_flight);

        tokio::task::spawn_blocking(move || {
            // Dropped on unwind as well
            let _guard = guard;
            match provider.notify_emergency_contact() {
                Ok(()) => debug!("Blocked number provider notified of emergency contact"),
                Err(e) => warn!(error = %e, "Failed to notify blocked number provider"),
            }
        });
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.count.load(Ordering::SeqCst)
    }

    /// Resolve once no notification is running
    pub async fn wait_idle(&self) {
        loop {
            let idle = self.in_flight.idle.notified();
            if self.in_flight() == 0 {
                return;
            }
            idle.await;
        }
    }
}

impl std::fmt::Debug for BlockedNumberNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockedNumberNotifier")
            .field("in_flight", &self.in_flight())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Counting {
        calls: AtomicUsize,
        fail: bool,
        gate: Mutex<()>,
    }

    impl BlockedNumberProvider for Counting {
        fn notify_emergency_contact(&self) -> Result<(), ProviderError> {
            let _held = self.gate.lock().unwrap_or_else(|e| e.into_inner());
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(ProviderError::Unavailable("test".into()))
            } else {
                Ok(())
            }
        }
    }

    #[tokio::test]
    async fn notifications_complete_before_idle() {
        let provider = Arc::new(Counting::default());
        let notifier = BlockedNumberNotifier::new(provider.clone());

        notifier.notify_emergency_contact();
        notifier.notify_emergency_contact();
        notifier.wait_idle().await;

        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
        assert_eq!(notifier.in_flight(), 0);
    }

    #[tokio::test]
    async fn failures_are_swallowed() {
        let provider = Arc::new(Counting {
            fail: true,
            ..Counting::default()
        });
        let notifier = BlockedNumberNotifier::new(provider.clone());

        notifier.notify_emergency_contact();
        notifier.wait_idle().await;
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    struct Panicking;

    impl BlockedNumberProvider for Panicking {
        fn notify_emergency_contact(&self) -> Result<(), ProviderError> {
            panic!("provider blew up");
        }
    }

    #[tokio::test]
    async fn panicking_provider_still_goes_idle() {
        let notifier = BlockedNumberNotifier::new(Arc::new(Panicking));

        notifier.notify_emergency_contact();
        tokio::time::timeout(std::time::Duration::from_secs(5), notifier.wait_idle())
            .await
            .expect("notifier stuck after provider panic");
        assert_eq!(notifier.in_flight(), 0);
    }

    #[tokio::test]
    async fn idle_without_work() {
        let notifier = BlockedNumberNotifier::new(Arc::new(NoopBlockedNumberProvider));
        notifier.wait_idle().await;
    }
}
