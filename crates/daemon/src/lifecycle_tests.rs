// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::TempDir;

fn test_config(dir: &TempDir) -> Config {
    Config::with_state_root(&dir.path().join("latchd.sock"), &dir.path().join("state"))
}

#[test]
fn state_dir_is_keyed_by_endpoint() {
    let root = Path::new("/var/state/latch");
    let a = Config::with_state_root(Path::new("/tmp/latch/a.sock"), root);
    let b = Config::with_state_root(Path::new("/tmp/latch/b.sock"), root);

    assert_ne!(a.state_dir, b.state_dir);
    assert!(a.state_dir.starts_with("/var/state/latch/stores"));
    assert_eq!(a.lock_path, a.state_dir.join("daemon.pid"));
    assert_eq!(a.version_path, a.state_dir.join("daemon.version"));
    assert_eq!(a.log_path, a.state_dir.join("daemon.log"));
}

#[test]
fn endpoint_hash_is_stable_hex() {
    let hash = endpoint_hash(Path::new("/tmp/latch/latchd.sock"));
    assert_eq!(hash.len(), 16);
    assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    assert_eq!(hash, endpoint_hash(Path::new("/tmp/latch/latchd.sock")));
}

#[test]
fn relative_endpoints_are_made_absolute() {
    let config = Config::with_state_root(Path::new("latchd.sock"), Path::new("/state"));
    assert!(config.socket_path.is_absolute());
}

#[tokio::test]
async fn startup_writes_pid_version_and_socket() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);

    let daemon = startup(&config).await.unwrap();

    let pid = std::fs::read_to_string(&config.lock_path).unwrap();
    assert_eq!(pid.trim(), std::process::id().to_string());
    assert_eq!(
        std::fs::read_to_string(&config.version_path).unwrap(),
        env!("CARGO_PKG_VERSION")
    );
    assert!(config.socket_path.exists());
    assert_eq!(daemon.store.status().revision, 1);
}

#[tokio::test]
async fn second_daemon_cannot_take_the_lock() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);

    let _first = startup(&config).await.unwrap();
    let err = startup(&config).await.err().unwrap();

    assert!(matches!(err, LifecycleError::LockFailed(_)));
    // The running daemon's files are untouched
    assert!(config.lock_path.exists());
    assert!(config.socket_path.exists());
}

#[tokio::test]
async fn shutdown_removes_runtime_files() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);

    let mut daemon = startup(&config).await.unwrap();
    daemon.shutdown().await.unwrap();

    assert!(!config.socket_path.exists());
    assert!(!config.lock_path.exists());
    assert!(!config.version_path.exists());
}

#[tokio::test]
async fn stale_socket_is_replaced() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    std::fs::write(&config.socket_path, "stale").unwrap();

    let _daemon = startup(&config).await.unwrap();

    assert!(tokio::net::UnixStream::connect(&config.socket_path)
        .await
        .is_ok());
}

#[test]
fn lease_seed_is_positive() {
    assert!(lease_seed() > 0);
}
