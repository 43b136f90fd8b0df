//! TCP reachability monitor
//!
//! A connectivity source for hosts with no platform network events: it
//! periodically opens a TCP connection to the service's host and port and
//! publishes the result into a [`ConnectivityGate`].

use std::time::Duration;

use hemoscan_resilience::ConnectivityGate;
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};
use url::Url;

use crate::config::ReachabilityConfig;
use crate::error::{HttpError, HttpResult};

/// Background task feeding a [`ConnectivityGate`]
///
/// Stops on [`shutdown`](Self::shutdown) or drop.
#[derive(Debug)]
pub struct ReachabilityMonitor {
    target: String,
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl ReachabilityMonitor {
    /// Start monitoring `host:port`
    ///
    /// The first check runs immediately.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn spawn(
        host: impl Into<String>,
        port: u16,
        gate: ConnectivityGate,
        config: ReachabilityConfig,
    ) -> Self {
        let target = format!("{}:{port}", host.into());
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(monitor(target.clone(), gate, config, cancel.clone()));
        debug!(target = %target, "Reachability monitor started");

        Self {
            target,
            cancel,
            handle: Some(handle),
        }
    }

    /// Start monitoring the host and port of `url`
    ///
    /// # Errors
    ///
    /// Returns [`HttpError::MissingHost`] if the URL has no host or no known
    /// port.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn for_url(url: &Url, gate: ConnectivityGate, config: ReachabilityConfig) -> HttpResult<Self> {
        let host = url
            .host_str()
            .ok_or_else(|| HttpError::MissingHost(url.to_string()))?;
        let port = url
            .port_or_known_default()
            .ok_or_else(|| HttpError::MissingHost(url.to_string()))?;
        // IPv6 literals come back bracketed, which is what the connect string needs
        Ok(Self::spawn(host, port, gate, config))
    }

    /// The `host:port` being checked
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Stop the monitor and wait for its task to finish
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
        debug!(target = %self.target, "Reachability monitor stopped");
    }
}

impl Drop for ReachabilityMonitor {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn monitor(
    target: String,
    gate: ConnectivityGate,
    config: ReachabilityConfig,
    cancel: CancellationToken,
) {
    loop {
        let reachable = tokio::select! {
            biased;
            () = cancel.cancelled() => return,
            reachable = check(&target, config.connect_timeout) => reachable,
        };
        trace!(target = %target, reachable, "Reachability check");
        gate.set_reachable(reachable);

        tokio::select! {
            biased;
            () = cancel.cancelled() => return,
            () = sleep(config.interval) => {}
        }
    }
}

async fn check(target: &str, connect_timeout: Duration) -> bool {
    matches!(
        timeout(connect_timeout, TcpStream::connect(target)).await,
        Ok(Ok(_))
    )
}
