// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scanwerk: live document-scanner pipeline
//
// Entry point. Initialises logging, parses the command line and runs the
// requested subcommand.

mod cli;
mod services;

use std::process::ExitCode;

use clap::Parser;

use cli::{Cli, Command};
use services::config_store;
use services::scan_job::{self, ScanReport};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    tracing::debug!(?cli, "Scanwerk starting");

    match cli.command {
        Command::Scan(args) => match scan_job::run(&args).await {
            Ok(ScanReport {
                output: Some(path),
                size: Some(size),
                ..
            }) => {
                println!("{} ({})", path.display(), size);
                ExitCode::SUCCESS
            }
            Ok(report) => {
                tracing::warn!(stats = ?report.stats, "No document found; nothing written");
                ExitCode::from(2)
            }
            Err(e) => {
                tracing::error!(error = %e, "Scan failed");
                ExitCode::FAILURE
            }
        },
        Command::Config { write } => match config_store::print_default(write) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                tracing::error!(error = %e, "Could not produce configuration");
                ExitCode::FAILURE
            }
        },
    }
}
