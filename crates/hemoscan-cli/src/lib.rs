//! # hemoscan CLI
//!
//! Command-line client for the lab-report analysis service.
//!
//! ## Usage
//!
//! ```bash
//! # One health check
//! hemoscan status --url http://localhost:8000
//!
//! # Keep checking until the service is up
//! hemoscan watch
//!
//! # Analyze a report
//! hemoscan submit hemograma.pdf --gender feminino --age 41 --format json
//! ```
//!
//! ## Architecture
//!
//! 1. **Command Layer** (`cli`): clap argument parsing
//! 2. **Config Layer** (`config`): defaults, TOML file, `HEMOSCAN_*` environment, flags
//! 3. **Execution Layer** (`executor`): commands on top of
//!    [`AnalysisService`](hemoscan_resilience::AnalysisService)
//! 4. **Output Layer** (`formatter`): colored text, tables, or JSON

#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub,
    clippy::all
)]

pub mod cli;
pub mod config;
pub mod error;
pub mod executor;
pub mod formatter;

use hemoscan_telemetry::{LogFormat, TelemetryConfig};

pub use cli::{Cli, Commands, GenderArg, OutputFormat, SubmitArgs, WatchArgs};
pub use config::CliConfig;
pub use error::{CliError, CliResult, ErrorCategory};
pub use executor::CommandExecutor;
pub use formatter::Formatter;

/// Run the CLI application
///
/// # Errors
///
/// Returns the first configuration, setup, or command failure.
pub async fn run(cli: Cli) -> CliResult<()> {
    let mut config = CliConfig::load(cli.config.as_deref())?;
    config.apply_overrides(cli.url.as_deref(), cli.verbose);

    let _telemetry = TelemetryConfig::builder()
        .service_name("hemoscan-cli")
        .log_level(config.log_level.clone())
        .format(LogFormat::Compact)
        .ansi(!cli.no_color)
        .build()
        .init()?;

    let executor = CommandExecutor::new(Formatter::new(cli.format, !cli.no_color), config);
    executor.execute(cli.command).await
}
