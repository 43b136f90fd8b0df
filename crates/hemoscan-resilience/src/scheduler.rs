//! Reconnect scheduler
//!
//! Keeps the published [`HealthStatus`] fresh while the backend is
//! unfavorable. Each run is one background task that loops:
//!
//! ```text
//! Idle --start()--> Checking --probe--> Online        (stop, reset failures)
//!                      ^                Offline/Slow  (failures += 1)
//!                      |                   |
//!                      +--- Waiting <------+ failures < max_failures
//!                                          |
//!                                          + failures == max_failures: suspended
//! ```
//!
//! The wait between checks grows linearly with the failure count. At most one
//! run exists at a time, so `start()` while a check or a timer is pending does
//! nothing. Regaining transport connectivity cuts a pending wait short.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::board::StatusBoard;
use crate::config::SchedulerConfig;
use crate::probe::HealthProbe;
use crate::sink::{ResilienceEvent, SharedSink};
use crate::status::{HealthState, HealthStatus, StatusClassifier};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Phase {
    #[default]
    Idle,
    Checking,
    Waiting,
}

#[derive(Debug, Default)]
struct ScheduleState {
    consecutive_failures: u32,
    phase: Phase,
    suspended: bool,
    // Bumped by stop() so a task that outlives its abort can tell
    generation: u64,
    task: Option<JoinHandle<()>>,
}

#[derive(Debug)]
struct Inner {
    probe: HealthProbe,
    classifier: StatusClassifier,
    board: StatusBoard,
    config: SchedulerConfig,
    sink: SharedSink,
    state: Mutex<ScheduleState>,
}

enum Next {
    Done,
    Wait(Duration),
    Suspend(u32),
}

/// Self-rescheduling health check loop
///
/// Owned by whatever context manages the monitoring lifetime. Dropping the
/// scheduler stops it.
#[derive(Debug)]
pub struct ReconnectScheduler {
    inner: Arc<Inner>,
}

impl ReconnectScheduler {
    /// Create an idle scheduler publishing to `board`
    pub fn new(
        probe: HealthProbe,
        classifier: StatusClassifier,
        board: StatusBoard,
        config: SchedulerConfig,
        sink: SharedSink,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                probe,
                classifier,
                board,
                config,
                sink,
                state: Mutex::new(ScheduleState::default()),
            }),
        }
    }

    /// Begin checking, unless a check or a reschedule is already pending
    ///
    /// Publishes `Checking` and spawns the check loop. Returns `true` when a
    /// new run started. Calling this after suspension is the manual retry; the
    /// failure count carries over until the next success.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn start(&self) -> bool {
        let generation = {
            let mut state = self.inner.state.lock();
            if state.phase != Phase::Idle {
                debug!(phase = ?state.phase, "Reconnect scheduler already active");
                return false;
            }
            state.phase = Phase::Checking;
            state.suspended = false;
            state.generation
        };

        info!("Reconnect scheduler started");
        // Published before the task exists so its result always lands last
        self.inner.board.publish(HealthStatus::checking());

        let mut state = self.inner.state.lock();
        if state.generation == generation && state.phase == Phase::Checking {
            state.task = Some(tokio::spawn(run(self.inner.clone(), generation)));
        }
        true
    }

    /// Cancel any pending check or timer
    ///
    /// Safe to call any number of times. Resets the failure count.
    pub fn stop(&self) {
        let mut state = self.inner.state.lock();
        state.generation = state.generation.wrapping_add(1);
        state.phase = Phase::Idle;
        state.consecutive_failures = 0;
        state.suspended = false;
        if let Some(task) = state.task.take() {
            task.abort();
            debug!("Reconnect scheduler stopped");
        }
    }

    /// Note a success observed outside the check loop
    ///
    /// Zeroes the failure count and lifts suspension. A pending check or
    /// timer is left alone.
    pub fn record_success(&self) {
        let mut state = self.inner.state.lock();
        if state.consecutive_failures > 0 || state.suspended {
            debug!(
                failures = state.consecutive_failures,
                "Reconnect scheduler reset by external success"
            );
        }
        state.consecutive_failures = 0;
        state.suspended = false;
    }

    /// Consecutive unfavorable checks since the last success
    pub fn consecutive_failures(&self) -> u32 {
        self.inner.state.lock().consecutive_failures
    }

    /// Whether auto-probing stopped at the failure cap
    pub fn is_suspended(&self) -> bool {
        self.inner.state.lock().suspended
    }

    /// Whether a reschedule timer is pending
    pub fn has_pending_timer(&self) -> bool {
        self.inner.state.lock().phase == Phase::Waiting
    }

    /// Whether a check is in flight
    pub fn is_checking(&self) -> bool {
        self.inner.state.lock().phase == Phase::Checking
    }

    /// Whether no check or timer is pending
    pub fn is_idle(&self) -> bool {
        self.inner.state.lock().phase == Phase::Idle
    }
}

impl Drop for ReconnectScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run(inner: Arc<Inner>, generation: u64) {
    let mut connectivity = inner.probe.orchestrator().gate().subscribe();

    loop {
        let outcome = inner.probe.probe().await;

        let (status, next) = {
            let mut state = inner.state.lock();
            if state.generation != generation {
                return;
            }

            let status = inner
                .classifier
                .classify_with_history(&outcome, state.consecutive_failures);
            let next = match status.state {
                HealthState::Offline | HealthState::Slow => {
                    state.consecutive_failures = state.consecutive_failures.saturating_add(1);
                    let failures = state.consecutive_failures;
                    if failures < inner.config.max_failures {
                        state.phase = Phase::Waiting;
                        Next::Wait(inner.config.delay_after(failures))
                    } else {
                        state.phase = Phase::Idle;
                        state.suspended = true;
                        state.task = None;
                        Next::Suspend(failures)
                    }
                }
                HealthState::Online | HealthState::Checking => {
                    if status.state == HealthState::Online {
                        state.consecutive_failures = 0;
                    }
                    state.phase = Phase::Idle;
                    state.task = None;
                    Next::Done
                }
            };
            (status, next)
        };

        match next {
            Next::Done => {
                publish_current(&inner, generation, status);
                return;
            }
            Next::Suspend(failures) => {
                warn!(failures, "Backend still unavailable, automatic checks stopped");
                let terminal = HealthStatus::suspended(&status, failures);
                if !publish_current(&inner, generation, status) {
                    return;
                }
                inner.sink.record(&ResilienceEvent::SchedulerSuspended { failures });
                publish_current(&inner, generation, terminal);
                return;
            }
            Next::Wait(delay) => {
                if !publish_current(&inner, generation, status) {
                    return;
                }
                debug!(delay_ms = delay.as_millis() as u64, "Next health check scheduled");
                if wait_or_reconnect(&mut connectivity, delay).await {
                    debug!("Connectivity restored, checking early");
                }
            }
        }

        {
            let mut state = inner.state.lock();
            if state.generation != generation {
                return;
            }
            state.phase = Phase::Checking;
        }
        if !publish_current(&inner, generation, HealthStatus::checking()) {
            return;
        }
    }
}

/// Publish `status` unless the run was stopped since it was computed
///
/// Listeners run synchronously inside the publish and may call `stop()`
/// themselves, so the lock is not held across it.
fn publish_current(inner: &Inner, generation: u64, status: HealthStatus) -> bool {
    if inner.state.lock().generation != generation {
        debug!("Dropping status from a stopped run");
        return false;
    }
    inner.board.publish(status);
    true
}

/// Sleep for `delay`, returning early with `true` if the transport becomes
/// reachable again in the meantime
async fn wait_or_reconnect(connectivity: &mut watch::Receiver<bool>, delay: Duration) -> bool {
    // Only transitions that happen during this wait count
    connectivity.borrow_and_update();

    let reconnected = async {
        loop {
            if connectivity.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
            if *connectivity.borrow_and_update() {
                return;
            }
        }
    };

    tokio::select! {
        () = sleep(delay) => false,
        () = reconnected => true,
    }
}
