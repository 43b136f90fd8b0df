//! Command execution on top of the resilience layer

use std::sync::Arc;
use std::time::Duration;

use hemoscan_http::{HttpBackend, ReachabilityMonitor};
use hemoscan_resilience::{
    AnalysisService, CancellationToken, ConnectivityGate, Document, HealthState, HealthStatus,
    PatientAttributes, ResilienceError, TracingSink,
};
use tokio::time::timeout;
use tracing::{debug, info};

use crate::cli::{Commands, SubmitArgs, WatchArgs};
use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use crate::formatter::Formatter;

/// How long a failed submission waits for the follow-up health verdict
const RECHECK_LIMIT: Duration = Duration::from_secs(30);

/// Execute CLI commands
#[derive(Debug)]
pub struct CommandExecutor {
    formatter: Formatter,
    config: CliConfig,
}

impl CommandExecutor {
    /// Create an executor
    #[must_use]
    pub fn new(formatter: Formatter, config: CliConfig) -> Self {
        Self { formatter, config }
    }

    /// Execute a command
    ///
    /// # Errors
    ///
    /// Returns a [`CliError`] describing the first failure.
    pub async fn execute(&self, command: Commands) -> CliResult<()> {
        match command {
            Commands::Status => self.status().await,
            Commands::Watch(args) => self.watch(args).await,
            Commands::Submit(args) => self.submit(args).await,
        }
    }

    fn service(&self, gate: ConnectivityGate) -> CliResult<AnalysisService> {
        let backend = HttpBackend::new(self.config.http())?;
        debug!(url = %backend.interpret_url(), "Using analysis service");
        Ok(AnalysisService::new(
            Arc::new(backend),
            gate,
            self.config.resilience(),
            Arc::new(TracingSink),
        )?)
    }

    async fn status(&self) -> CliResult<()> {
        let service = self.service(ConnectivityGate::default())?;
        let status = service.probe_now().await;
        self.formatter.display_status(&status)
    }

    async fn watch(&self, args: WatchArgs) -> CliResult<()> {
        let gate = ConnectivityGate::default();
        let service = self.service(gate.clone())?;
        let monitor = if args.no_reachability {
            None
        } else {
            Some(ReachabilityMonitor::for_url(
                &self.config.http().base()?,
                gate,
                self.config.reachability(),
            )?)
        };

        let mut updates = service.watch_status();
        service.start_monitoring();

        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        let mut last: Option<HealthStatus> = None;
        let outcome = loop {
            let status = updates.borrow_and_update().clone();
            if last.as_ref() != Some(&status) {
                self.formatter.display_status(&status)?;
            }

            if status.manual_retry_required {
                break Err(CliError::from(ResilienceError::SchedulerSuspended {
                    failures: service.scheduler().consecutive_failures(),
                }));
            }
            if status.state == HealthState::Online {
                break Ok(());
            }
            last = Some(status);

            tokio::select! {
                _ = &mut ctrl_c => {
                    info!("Watch interrupted");
                    break Ok(());
                }
                changed = updates.changed() => {
                    if changed.is_err() {
                        break Ok(());
                    }
                }
            }
        };

        service.shutdown();
        if let Some(monitor) = monitor {
            monitor.shutdown().await;
        }
        outcome
    }

    async fn submit(&self, args: SubmitArgs) -> CliResult<()> {
        let content = tokio::fs::read(&args.file)
            .await
            .map_err(|source| CliError::ReadDocument {
                path: args.file.clone(),
                source,
            })?;
        if content.is_empty() {
            return Err(CliError::InvalidArguments(format!(
                "{} is empty",
                args.file.display()
            )));
        }
        let file_name = args
            .file
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| {
                CliError::InvalidArguments(format!("{} is not a file", args.file.display()))
            })?;

        let document = Document::new(file_name, content);
        let attributes = PatientAttributes {
            gender: args.gender.into(),
            age: args.age,
        };

        let service = self.service(ConnectivityGate::default())?;
        let cancel = CancellationToken::new();
        let interrupt = tokio::spawn({
            let cancel = cancel.clone();
            async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    cancel.cancel();
                }
            }
        });

        let result = service
            .run_submission_with_cancellation(&document, &attributes, &cancel)
            .await;
        interrupt.abort();

        match result {
            Ok(report) => self.formatter.display_report(&report),
            Err(err) => {
                if err.is_connectivity_related()
                    && let Some(status) = await_verdict(&service, RECHECK_LIMIT).await
                {
                    self.formatter.display_status(&status)?;
                }
                service.shutdown();
                Err(err.into())
            }
        }
    }
}

/// Wait for the re-armed scheduler to publish something other than Checking
async fn await_verdict(service: &AnalysisService, limit: Duration) -> Option<HealthStatus> {
    let mut updates = service.watch_status();
    let verdict = updates.wait_for(|status| status.state != HealthState::Checking);
    match timeout(limit, verdict).await {
        Ok(Ok(status)) => Some(status.clone()),
        _ => None,
    }
}
