// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `latch daemon`: manage the store daemon behind an endpoint

use std::path::Path;

use anyhow::Result;
use clap::Subcommand;
use latch_daemon::Config;

use crate::client::{self, ClientError, DaemonClient};

#[derive(clap::Args)]
pub struct DaemonArgs {
    #[command(subcommand)]
    pub command: DaemonCommand,
}

#[derive(Subcommand)]
pub enum DaemonCommand {
    /// Start the daemon in the background
    Start,
    /// Stop the daemon (graceful, then forceful)
    Stop,
    /// Show daemon status and store counters
    Status,
    /// Show the daemon log
    Logs {
        /// Number of trailing lines to show
        #[arg(long, short = 'n', default_value_t = 50)]
        lines: usize,
    },
}

pub async fn handle(args: DaemonArgs, endpoint: &Path) -> Result<()> {
    match args.command {
        DaemonCommand::Start => start(endpoint).await,
        DaemonCommand::Stop => stop(endpoint).await,
        DaemonCommand::Status => status(endpoint).await,
        DaemonCommand::Logs { lines } => logs(endpoint, lines),
    }
}

async fn start(endpoint: &Path) -> Result<()> {
    if let Ok(client) = DaemonClient::connect(endpoint) {
        if client.ping().await.is_ok() {
            println!("Daemon already running");
            return Ok(());
        }
    }

    let client = DaemonClient::connect_or_start(endpoint).await?;
    println!("Daemon started");
    println!("  Endpoint: {}", client.socket_path().display());
    Ok(())
}

async fn stop(endpoint: &Path) -> Result<()> {
    if client::daemon_stop(endpoint).await? {
        println!("Daemon stopped");
    } else {
        println!("Daemon not running");
    }
    Ok(())
}

async fn status(endpoint: &Path) -> Result<()> {
    let client = match DaemonClient::connect(endpoint) {
        Ok(client) => client,
        Err(ClientError::DaemonNotRunning) => {
            println!("Daemon not running");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    let status = match client.status().await {
        Ok(status) => status,
        // Socket left behind by a daemon that is gone
        Err(ClientError::Io(_)) => {
            println!("Daemon not running");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };
    let version = client.hello().await?;

    println!("Status: running");
    println!("Endpoint: {}", client.socket_path().display());
    println!("Uptime: {}", format_uptime(status.uptime_secs));
    println!("Revision: {}", status.revision);
    println!("Leases: {}", status.leases);
    println!("Keys: {}", status.keys);
    println!("Watches: {}", status.watches);
    println!("Version: {}", version);
    Ok(())
}

fn logs(endpoint: &Path, lines: usize) -> Result<()> {
    let config = Config::for_endpoint(endpoint)?;
    let content = match std::fs::read_to_string(&config.log_path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            println!("No daemon log at {}", config.log_path.display());
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    for line in tail(&content, lines) {
        println!("{}", line);
    }
    Ok(())
}

fn tail(content: &str, lines: usize) -> Vec<&str> {
    let all: Vec<&str> = content.lines().collect();
    all[all.len().saturating_sub(lines)..].to_vec()
}

fn format_uptime(secs: u64) -> String {
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if h > 0 {
        format!("{}h {}m {}s", h, m, s)
    } else if m > 0 {
        format!("{}m {}s", m, s)
    } else {
        format!("{}s", s)
    }
}
