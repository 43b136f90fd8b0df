//! CLI argument parsing

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use hemoscan_resilience::Gender;

/// Main CLI application structure
#[derive(Parser, Debug)]
#[command(
    name = "hemoscan",
    version,
    about = "Client for the hemoscan lab-report analysis service",
    long_about = "hemoscan submits blood-test PDFs to a remote analysis service and reports its health.\n\
                  Submissions retry transient failures with exponential backoff; when the service looks\n\
                  unreachable, health checks are rescheduled automatically until it comes back."
)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,

    /// Analysis service base URL (overrides config file and HEMOSCAN_BASE_URL)
    #[arg(long, short = 'u', global = true)]
    pub url: Option<String>,

    /// Path to a TOML config file
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'f', global = true, value_enum, default_value = "human")]
    pub format: OutputFormat,

    /// Enable verbose logging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check the service once and print its status
    Status,

    /// Re-check the service until it is online, gives up, or Ctrl-C
    Watch(WatchArgs),

    /// Submit a lab report PDF for analysis
    Submit(SubmitArgs),
}

/// Arguments for `watch`
#[derive(Args, Debug, Clone, Default)]
pub struct WatchArgs {
    /// Do not poll TCP reachability of the service host
    #[arg(long)]
    pub no_reachability: bool,
}

/// Arguments for `submit`
#[derive(Args, Debug, Clone)]
pub struct SubmitArgs {
    /// PDF file to analyze
    pub file: PathBuf,

    /// Patient gender
    #[arg(long, short = 'g', value_enum)]
    pub gender: GenderArg,

    /// Patient age in years
    #[arg(long, short = 'a', value_parser = clap::value_parser!(u16).range(0..=130))]
    pub age: u16,
}

/// Gender as accepted on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GenderArg {
    /// Male
    #[value(name = "masculino", alias = "male", alias = "m")]
    Masculino,
    /// Female
    #[value(name = "feminino", alias = "female", alias = "f")]
    Feminino,
}

impl From<GenderArg> for Gender {
    fn from(arg: GenderArg) -> Self {
        match arg {
            GenderArg::Masculino => Gender::Male,
            GenderArg::Feminino => Gender::Female,
        }
    }
}

/// Output formats
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable with colors
    #[default]
    Human,
    /// Pretty-printed JSON
    Json,
}
