//! Current health status and its observers
//!
//! The board holds exactly one [`HealthStatus`]. Publishing replaces it whole,
//! then notifies every registered listener synchronously with the new value.
//! Async consumers can follow the same stream through [`StatusBoard::watch`].

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::sync::watch;

use crate::sink::{ResilienceEvent, SharedSink};
use crate::status::HealthStatus;

type Listener = Arc<dyn Fn(&HealthStatus) + Send + Sync>;

struct Registry {
    next_id: AtomicU64,
    listeners: Mutex<BTreeMap<u64, Listener>>,
}

/// Holder of the latest published status
#[derive(Clone)]
pub struct StatusBoard {
    current: Arc<watch::Sender<HealthStatus>>,
    registry: Arc<Registry>,
    sink: SharedSink,
}

impl fmt::Debug for StatusBoard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatusBoard")
            .field("current", &*self.current.borrow())
            .field("listeners", &self.registry.listeners.lock().len())
            .finish()
    }
}

impl StatusBoard {
    /// Create a board starting in the `Checking` state
    pub fn new(sink: SharedSink) -> Self {
        let (current, _) = watch::channel(HealthStatus::checking());
        Self {
            current: Arc::new(current),
            registry: Arc::new(Registry {
                next_id: AtomicU64::new(0),
                listeners: Mutex::new(BTreeMap::new()),
            }),
            sink,
        }
    }

    /// The latest status
    pub fn current(&self) -> HealthStatus {
        self.current.borrow().clone()
    }

    /// Replace the status and notify listeners
    pub fn publish(&self, status: HealthStatus) {
        self.current.send_replace(status.clone());
        self.sink.record(&ResilienceEvent::StatusChanged {
            status: status.clone(),
        });

        // Snapshot so a listener may unsubscribe itself from inside the callback
        let listeners: Vec<Listener> = self.registry.listeners.lock().values().cloned().collect();
        for listener in listeners {
            listener(&status);
        }
    }

    /// Register a listener called with every newly published status
    ///
    /// The listener stays registered until the returned subscription is
    /// dropped or [`StatusSubscription::unsubscribe`] is called.
    pub fn on_change<F>(&self, listener: F) -> StatusSubscription
    where
        F: Fn(&HealthStatus) + Send + Sync + 'static,
    {
        let id = self.registry.next_id.fetch_add(1, Ordering::Relaxed);
        self.registry
            .listeners
            .lock()
            .insert(id, Arc::new(listener));
        StatusSubscription {
            id,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Follow status changes asynchronously
    pub fn watch(&self) -> watch::Receiver<HealthStatus> {
        self.current.subscribe()
    }

    /// Number of registered listeners
    pub fn listener_count(&self) -> usize {
        self.registry.listeners.lock().len()
    }
}

/// Handle that keeps a status listener registered
#[must_use = "dropping the subscription unregisters the listener"]
pub struct StatusSubscription {
    id: u64,
    registry: std::sync::Weak<Registry>,
}

impl fmt::Debug for StatusSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatusSubscription").field("id", &self.id).finish()
    }
}

impl StatusSubscription {
    /// Stop receiving status changes
    pub fn unsubscribe(self) {}
}

impl Drop for StatusSubscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.listeners.lock().remove(&self.id);
        }
    }
}
