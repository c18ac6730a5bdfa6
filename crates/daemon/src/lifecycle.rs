// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: startup and shutdown.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use fs2::FileExt;
use latch_core::store::StoreState;
use latch_core::{MemoryStore, SystemClock};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::net::UnixListener;
use tokio::sync::Notify;
use tracing::{info, warn};

/// Socket file name inside the socket directory
pub const SOCKET_NAME: &str = "latchd.sock";

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to Unix socket the daemon serves
    pub socket_path: PathBuf,
    /// Per-endpoint state directory
    pub state_dir: PathBuf,
    /// Path to lock/PID file
    pub lock_path: PathBuf,
    /// Path to version file
    pub version_path: PathBuf,
    /// Path to daemon log file
    pub log_path: PathBuf,
}

impl Config {
    /// Create config for an endpoint, with state under the user's state directory
    pub fn for_endpoint(endpoint: &Path) -> Result<Self, LifecycleError> {
        Ok(Self::with_state_root(endpoint, &state_root()?))
    }

    /// Create config for an endpoint with an explicit state root
    pub fn with_state_root(endpoint: &Path, state_root: &Path) -> Self {
        let socket_path = absolute(endpoint);
        let state_dir = state_root
            .join("stores")
            .join(endpoint_hash(&socket_path));

        Self {
            socket_path,
            lock_path: state_dir.join("daemon.pid"),
            version_path: state_dir.join("daemon.version"),
            log_path: state_dir.join("daemon.log"),
            state_dir,
        }
    }
}

/// Daemon state during operation
pub struct DaemonState {
    /// Configuration
    pub config: Config,
    // NOTE(lifetime): Held to maintain exclusive file lock; released on drop
    #[allow(dead_code)]
    lock_file: File,
    /// Unix socket listener
    pub listener: UnixListener,
    /// The store every connection operates on
    pub store: MemoryStore<SystemClock>,
    /// When daemon started
    pub start_time: Instant,
    /// Notified when a client requests shutdown
    pub shutdown: Arc<Notify>,
}

impl DaemonState {
    /// Shutdown the daemon gracefully
    pub async fn shutdown(&mut self) -> Result<(), LifecycleError> {
        info!("Shutting down daemon...");

        // Open watches learn the store is going away instead of hanging
        self.store.close_watches();

        if self.config.socket_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.config.socket_path) {
                warn!("Failed to remove socket file: {}", e);
            }
        }

        if self.config.lock_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.config.lock_path) {
                warn!("Failed to remove PID file: {}", e);
            }
        }

        if self.config.version_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.config.version_path) {
                warn!("Failed to remove version file: {}", e);
            }
        }

        // Lock file is released when self.lock_file is dropped

        let status = self.store.status();
        info!(
            revision = status.revision,
            leases = status.leases,
            keys = status.keys,
            "Daemon shutdown complete"
        );
        Ok(())
    }
}

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Could not determine state directory")]
    NoStateDir,

    #[error("Failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("Failed to bind socket at {0}: {1}")]
    BindFailed(PathBuf, std::io::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Start the daemon
pub async fn startup(config: &Config) -> Result<DaemonState, LifecycleError> {
    match startup_inner(config).await {
        Ok(state) => Ok(state),
        // Another daemon owns these files; leave them alone
        Err(e @ LifecycleError::LockFailed(_)) => Err(e),
        Err(e) => {
            cleanup_on_failure(config);
            Err(e)
        }
    }
}

async fn startup_inner(config: &Config) -> Result<DaemonState, LifecycleError> {
    // 1. Create state directory
    std::fs::create_dir_all(&config.state_dir)?;

    // 2. Acquire lock file FIRST - prevents races
    let lock_file = std::fs::OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(&config.lock_path)?;
    lock_file
        .try_lock_exclusive()
        .map_err(LifecycleError::LockFailed)?;

    // Write PID to lock file
    use std::io::Write;
    let mut lock_file = lock_file;
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;
    let lock_file = lock_file;

    // 3. Write version file
    std::fs::write(&config.version_path, env!("CARGO_PKG_VERSION"))?;

    // 4. Fresh store; lease ids are seeded from the clock so a restarted
    // daemon does not hand out ids a previous one already used
    let store = MemoryStore::from_state(StoreState::with_lease_seed(lease_seed()), SystemClock);

    // 5. Remove stale socket and bind (LAST - only after all validation passes)
    if let Some(parent) = config.socket_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    if config.socket_path.exists() {
        std::fs::remove_file(&config.socket_path)?;
    }
    let listener = UnixListener::bind(&config.socket_path)
        .map_err(|e| LifecycleError::BindFailed(config.socket_path.clone(), e))?;

    info!("Daemon started for endpoint: {}", config.socket_path.display());

    Ok(DaemonState {
        config: config.clone(),
        lock_file,
        listener,
        store,
        start_time: Instant::now(),
        shutdown: Arc::new(Notify::new()),
    })
}

/// Clean up resources on startup failure
fn cleanup_on_failure(config: &Config) {
    if config.socket_path.exists() {
        let _ = std::fs::remove_file(&config.socket_path);
    }
    if config.version_path.exists() {
        let _ = std::fs::remove_file(&config.version_path);
    }
    if config.lock_path.exists() {
        let _ = std::fs::remove_file(&config.lock_path);
    }
}

fn lease_seed() -> i64 {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0);
    // Leave room for ~65k grants per millisecond of uptime before overlap
    millis.saturating_mul(1 << 16).max(1)
}

/// Get the state root for latch
pub fn state_root() -> Result<PathBuf, LifecycleError> {
    // Use XDG_STATE_HOME or default to ~/.local/state
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("latch"));
    }

    let home = std::env::var("HOME").map_err(|_| LifecycleError::NoStateDir)?;
    Ok(PathBuf::from(home).join(".local/state/latch"))
}

/// Get the socket directory for latch
///
/// Uses /tmp/latch by default to keep paths short (macOS SUN_LEN = 104).
/// Can be overridden with LATCH_SOCKET_DIR for testing.
pub fn socket_dir() -> PathBuf {
    match std::env::var("LATCH_SOCKET_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(_) => PathBuf::from("/tmp/latch"),
    }
}

/// Endpoint used when none is given
pub fn default_endpoint() -> PathBuf {
    socket_dir().join(SOCKET_NAME)
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Hash of an endpoint path naming its state directory
pub fn endpoint_hash(path: &Path) -> String {
    let mut hasher = Sha256::new();
    hasher.update(path.to_string_lossy().as_bytes());
    let result = hasher.finalize();
    // Take first 16 chars of hex digest
    hex_encode(&result[..8])
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
