// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! latch - distributed locks over a shared store

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

mod client;
mod commands;
mod interrupt;
mod remote;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use commands::{daemon, lock};
use latch_core::LockError;

#[derive(Parser)]
#[command(
    name = "latch",
    version,
    about = "Latch - fair, session-scoped distributed locks"
)]
struct Cli {
    /// Socket of the store daemon [default: $LATCH_SOCKET_DIR/latchd.sock]
    #[arg(long, global = true, env = "LATCH_ENDPOINT")]
    endpoint: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Acquire a lock, then hold it until interrupted or run a command under it
    Lock(lock::LockArgs),
    /// Daemon management
    Daemon(daemon::DaemonArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_logging();

    let endpoint = cli
        .endpoint
        .unwrap_or_else(latch_daemon::default_endpoint);

    let result = match cli.command {
        Commands::Lock(args) => lock::handle(args, &endpoint).await,
        Commands::Daemon(args) => daemon::handle(args, &endpoint).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(exit_code(&e))
        }
    }
}

/// A command run under the lock passes its exit status through
fn exit_code(err: &anyhow::Error) -> u8 {
    err.downcast_ref::<LockError>()
        .and_then(LockError::exit_code)
        .and_then(|code| u8::try_from(code).ok())
        .filter(|code| *code != 0)
        .unwrap_or(1)
}

/// Log to stderr, filtered by LATCH_LOG (default: warn)
fn setup_logging() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_env("LATCH_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
