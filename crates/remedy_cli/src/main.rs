//! remedy CLI - Main entry point.
//!
//! Exit codes:
//! - 0: Success (suite healed or already green)
//! - 1: General error
//! - 2: Invalid arguments or missing prerequisites
//! - 3: Healing failed (suite still red after the run)

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;

use commands::{Cli, Commands};

/// CI-friendly exit codes
pub struct ExitCodes;

impl ExitCodes {
    pub const SUCCESS: u8 = 0;
    pub const GENERAL_ERROR: u8 = 1;
    pub const INVALID_ARGS: u8 = 2;
    pub const HEALING_FAILED: u8 = 3;
}

#[tokio::main]
async fn main() -> ExitCode {
    let log_result = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(
            EnvFilter::from_default_env()
                .add_directive("remedy=info".parse().unwrap())
                .add_directive("warn".parse().unwrap()),
        )
        .try_init();

    if log_result.is_err() {
        // Logging already initialized, continue
    }

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Heal(args) => commands::heal::execute(args).await,
        Commands::Runs(args) => commands::runs::execute(args).await,
        Commands::Show(args) => commands::show::execute(args).await,
    };

    match result {
        Ok(()) => ExitCode::from(ExitCodes::SUCCESS),
        Err(e) => {
            let exit_code = categorize_error(&e);
            eprintln!("❌ Error: {:#}", e);
            ExitCode::from(exit_code)
        }
    }
}

/// Categorize error to determine exit code
fn categorize_error(e: &anyhow::Error) -> u8 {
    let msg = e.to_string().to_lowercase();

    if msg.contains("suite still failing") {
        ExitCodes::HEALING_FAILED
    } else if msg.contains("argument")
        || msg.contains("not configured")
        || msg.contains("not available")
        || msg.contains("not found")
    {
        ExitCodes::INVALID_ARGS
    } else {
        ExitCodes::GENERAL_ERROR
    }
}
