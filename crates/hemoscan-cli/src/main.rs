//! `hemoscan` binary

use std::process::ExitCode;

use clap::Parser;
use hemoscan_cli::{Cli, Formatter};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let formatter = Formatter::new(cli.format, !cli.no_color);

    match hemoscan_cli::run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            formatter.display_error(&e);
            ExitCode::FAILURE
        }
    }
}
