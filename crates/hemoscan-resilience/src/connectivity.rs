//! Connectivity gate
//!
//! Answers "is the transport usable right now?" and lets a caller suspend
//! until it is. The state itself belongs to whatever platform adapter feeds
//! [`ConnectivityGate::set_reachable`]; the resilience layer only reads and
//! awaits it.
//!
//! Every wait subscribes its own `watch` receiver and drops it when the wait
//! ends, so listeners never outlive the call that installed them. A wait that
//! times out is final: a later "became reachable" event does not revive it.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::timeout;
use tracing::{debug, info};

use crate::error::{ResilienceError, ResilienceResult};

/// Shared, cloneable view of the process-wide "transport reachable" flag
#[derive(Debug, Clone)]
pub struct ConnectivityGate {
    state: Arc<watch::Sender<bool>>,
}

impl Default for ConnectivityGate {
    fn default() -> Self {
        Self::new(true)
    }
}

impl ConnectivityGate {
    /// Create a gate with the given initial reachability
    pub fn new(initially_reachable: bool) -> Self {
        let (state, _) = watch::channel(initially_reachable);
        Self {
            state: Arc::new(state),
        }
    }

    /// Immediate, non-blocking read of the current transport state
    pub fn is_reachable(&self) -> bool {
        *self.state.borrow()
    }

    /// Publish a platform connectivity event
    ///
    /// Returns `true` when the state actually changed.
    pub fn set_reachable(&self, reachable: bool) -> bool {
        let changed = self.state.send_if_modified(|current| {
            if *current == reachable {
                false
            } else {
                *current = reachable;
                true
            }
        });

        if changed {
            info!(reachable, "Transport connectivity changed");
        }
        changed
    }

    /// Subscribe to connectivity changes
    ///
    /// The subscription ends when the returned receiver is dropped.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.state.subscribe()
    }

    /// Number of live subscriptions, including in-flight waits
    pub fn listener_count(&self) -> usize {
        self.state.receiver_count()
    }

    /// Wait until the transport is reachable, for at most `bound`
    ///
    /// Returns immediately if already reachable.
    ///
    /// # Errors
    ///
    /// Returns [`ResilienceError::Connectivity`] if the transport stays
    /// unreachable for the full bound.
    pub async fn await_reachable(&self, bound: Duration) -> ResilienceResult<()> {
        let mut listener = self.state.subscribe();
        if *listener.borrow_and_update() {
            return Ok(());
        }

        debug!(bound_ms = bound.as_millis() as u64, "Waiting for connectivity");
        match timeout(bound, listener.wait_for(|reachable| *reachable)).await {
            Ok(Ok(_)) => {
                debug!("Connectivity restored while waiting");
                Ok(())
            }
            // The sender lives as long as any gate clone; a closed channel
            // means nobody can ever report connectivity again.
            Ok(Err(_)) | Err(_) => Err(ResilienceError::Connectivity {
                waited: bound,
                attempts: 0,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn resolves_immediately_when_reachable() {
        let gate = ConnectivityGate::new(true);
        let started = Instant::now();
        gate.await_reachable(Duration::from_secs(5)).await.unwrap();
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn resolves_when_connectivity_returns() {
        let gate = ConnectivityGate::new(false);
        let notifier = gate.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(2000)).await;
            notifier.set_reachable(true);
        });

        let started = Instant::now();
        gate.await_reachable(Duration::from_millis(5000))
            .await
            .unwrap();
        assert_eq!(started.elapsed(), Duration::from_millis(2000));
    }

    #[tokio::test(start_paused = true)]
    async fn times_out_and_stays_failed() {
        let gate = ConnectivityGate::new(false);
        let started = Instant::now();
        let err = gate
            .await_reachable(Duration::from_secs(3))
            .await
            .unwrap_err();
        assert_eq!(started.elapsed(), Duration::from_secs(3));
        assert_eq!(
            err,
            ResilienceError::Connectivity {
                waited: Duration::from_secs(3),
                attempts: 0,
            }
        );

        // A late event does not resurrect the expired wait
        gate.set_reachable(true);
        assert!(gate.is_reachable());
    }

    #[tokio::test(start_paused = true)]
    async fn waits_do_not_leak_listeners() {
        let gate = ConnectivityGate::new(false);
        let baseline = gate.listener_count();

        let _ = gate.await_reachable(Duration::from_millis(10)).await;
        assert_eq!(gate.listener_count(), baseline);

        gate.set_reachable(true);
        gate.await_reachable(Duration::from_millis(10)).await.unwrap();
        assert_eq!(gate.listener_count(), baseline);
    }

    #[test]
    fn set_reachable_reports_changes_only() {
        let gate = ConnectivityGate::default();
        assert!(!gate.set_reachable(true));
        assert!(gate.set_reachable(false));
        assert!(!gate.is_reachable());
    }
}
