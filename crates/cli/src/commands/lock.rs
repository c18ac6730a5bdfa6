// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `latch lock`: hold a named lock, or run a command under it

use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use latch_core::{
    ExecCommand, LockClient, LockError, LockHandle, Session, SessionConfig, TracedClient,
};
use tracing::{info, warn};

use crate::client::DaemonClient;
use crate::interrupt::Interrupt;
use crate::remote::RemoteStore;

type Locks = LockClient<TracedClient<RemoteStore>>;

#[derive(clap::Args)]
pub struct LockArgs {
    /// Name of the lock
    pub name: String,

    /// Session TTL in seconds; the lock is released this long after the client dies
    #[arg(long, default_value_t = 60)]
    pub ttl: u64,

    /// Give up waiting after this long (e.g. "30s", "5m")
    #[arg(long, value_parser = humantime::parse_duration)]
    pub timeout: Option<Duration>,

    /// Command to run while holding the lock (the leading `--` is optional)
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}

pub async fn handle(args: LockArgs, endpoint: &Path) -> Result<()> {
    let interrupt = Interrupt::install()?;
    let daemon = DaemonClient::connect_or_start(endpoint).await?;

    let store = TracedClient::new(RemoteStore::new(daemon.socket_path()));
    let session = Session::open(store, SessionConfig::new(Duration::from_secs(args.ttl))).await?;
    let locks = LockClient::new(session);

    let result = match ExecCommand::from_argv(args.command.as_slice()) {
        Some(command) => exec(&locks, &args, &command, &interrupt).await,
        None => hold(&locks, &args, &interrupt).await,
    };

    if let Err(e) = locks.close().await {
        warn!(error = %e, "failed to close session");
    }
    result.map_err(anyhow::Error::from)
}

/// Acquire, print the key, then hold until interrupted
async fn hold(locks: &Locks, args: &LockArgs, interrupt: &Interrupt) -> Result<(), LockError> {
    let handle = match acquire(locks, args, interrupt).await? {
        Some(handle) => handle,
        None => return Ok(()),
    };

    println!("{}", handle.key);

    tokio::select! {
        _ = interrupt.recv() => {}
        _ = locks.session().expired() => {
            return Err(LockError::SessionExpired { lease: locks.session().lease() });
        }
    }

    locks.unlock(handle).await
}

/// Acquire, run `command` while holding, release
async fn exec(
    locks: &Locks,
    args: &LockArgs,
    command: &ExecCommand,
    interrupt: &Interrupt,
) -> Result<(), LockError> {
    let cancel = cancellation(interrupt, args.timeout);
    match locks.lock_and_exec_with(&args.name, command, cancel).await {
        Err(LockError::Cancelled) => interrupted_or_timed_out(interrupt),
        other => other,
    }
}

/// `None` when interrupted before the lock was acquired
async fn acquire(
    locks: &Locks,
    args: &LockArgs,
    interrupt: &Interrupt,
) -> Result<Option<LockHandle>, LockError> {
    let cancel = cancellation(interrupt, args.timeout);
    match locks.lock_with(&args.name, cancel).await {
        Ok(handle) => Ok(Some(handle)),
        Err(LockError::Cancelled) => interrupted_or_timed_out(interrupt).map(|()| None),
        Err(e) => Err(e),
    }
}

/// Resolves on interrupt, or once `timeout` has passed
async fn cancellation(interrupt: &Interrupt, timeout: Option<Duration>) {
    match timeout {
        Some(timeout) => {
            tokio::select! {
                _ = interrupt.recv() => {}
                _ = tokio::time::sleep(timeout) => {}
            }
        }
        None => interrupt.recv().await,
    }
}

// Interrupting a waiter is a clean exit; running out of time is not
fn interrupted_or_timed_out(interrupt: &Interrupt) -> Result<(), LockError> {
    if interrupt.fired() {
        info!("interrupted while waiting for lock");
        Ok(())
    } else {
        Err(LockError::Timeout)
    }
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
