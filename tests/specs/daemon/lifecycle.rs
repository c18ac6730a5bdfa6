//! Daemon lifecycle specs
//!
//! Verify daemon start/stop/status lifecycle.

use crate::prelude::*;

#[test]
fn daemon_status_when_not_running() {
    let temp = Project::empty();

    temp.latch()
        .args(&["daemon", "status"])
        .passes()
        .stdout_has("Daemon not running");
}

#[test]
fn daemon_start_reports_success() {
    let temp = Project::empty();

    temp.latch()
        .args(&["daemon", "start"])
        .passes()
        .stdout_has("Daemon started");
}

#[test]
fn daemon_start_twice_is_harmless() {
    let temp = Project::empty();
    temp.latch().args(&["daemon", "start"]).passes();

    temp.latch()
        .args(&["daemon", "start"])
        .passes()
        .stdout_has("Daemon already running");
}

#[test]
fn daemon_status_shows_running_after_start() {
    let temp = Project::empty();
    temp.latch().args(&["daemon", "start"]).passes();

    temp.latch()
        .args(&["daemon", "status"])
        .passes()
        .stdout_has("Status: running")
        .stdout_has("Uptime:")
        .stdout_has("Version:");
}

#[test]
fn daemon_status_shows_empty_store() {
    let temp = Project::empty();
    temp.latch().args(&["daemon", "start"]).passes();

    temp.latch()
        .args(&["daemon", "status"])
        .passes()
        .stdout_has("Revision: 1")
        .stdout_has("Leases: 0")
        .stdout_has("Keys: 0");
}

#[test]
fn daemon_stop_reports_success() {
    let temp = Project::empty();
    temp.latch().args(&["daemon", "start"]).passes();

    temp.latch()
        .args(&["daemon", "stop"])
        .passes()
        .stdout_has("Daemon stopped");
}

#[test]
fn daemon_status_after_stop() {
    let temp = Project::empty();
    temp.latch().args(&["daemon", "start"]).passes();
    temp.latch().args(&["daemon", "stop"]).passes();

    temp.latch()
        .args(&["daemon", "status"])
        .passes()
        .stdout_has("Daemon not running");
}

#[test]
fn daemon_stop_when_not_running() {
    let temp = Project::empty();

    temp.latch()
        .args(&["daemon", "stop"])
        .passes()
        .stdout_has("Daemon not running");
}

#[test]
fn daemon_creates_version_and_pid_files() {
    let temp = Project::empty();
    temp.latch().args(&["daemon", "start"]).passes();

    let has_files = wait_for(SPEC_WAIT_MAX_MS, || {
        temp.store_dirs().iter().any(|dir| {
            dir.join("daemon.version").exists() && dir.join("daemon.pid").exists()
        })
    });

    assert!(has_files, "daemon.version and daemon.pid should exist");
}

#[test]
fn daemon_creates_socket_file() {
    let temp = Project::empty();
    temp.latch().args(&["daemon", "start"]).passes();

    let socket = temp.socket_dir().join("latchd.sock");
    assert!(
        wait_for(SPEC_WAIT_MAX_MS, || socket.exists()),
        "daemon socket file should exist"
    );
}

#[test]
fn daemon_stop_removes_runtime_files() {
    let temp = Project::empty();
    temp.latch().args(&["daemon", "start"]).passes();
    temp.latch().args(&["daemon", "stop"]).passes();

    assert!(!temp.socket_dir().join("latchd.sock").exists());
    assert!(temp
        .store_dirs()
        .iter()
        .all(|dir| !dir.join("daemon.pid").exists()));
}

#[test]
fn explicit_endpoint_gets_its_own_daemon() {
    let temp = Project::empty();
    let endpoint = temp.path().join("other.sock");
    let endpoint = endpoint.to_str().unwrap();

    temp.latch()
        .args(&["--endpoint", endpoint, "daemon", "start"])
        .passes();

    temp.latch()
        .args(&["daemon", "status"])
        .passes()
        .stdout_has("Daemon not running");
    temp.latch()
        .args(&["--endpoint", endpoint, "daemon", "status"])
        .passes()
        .stdout_has("Status: running");

    temp.latch()
        .args(&["--endpoint", endpoint, "daemon", "stop"])
        .passes()
        .stdout_has("Daemon stopped");
}

#[test]
fn daemon_start_error_log_shows_in_cli() {
    let temp = Project::empty();

    // Socket path longer than SUN_LEN cannot be bound
    let long_suffix =
        "this_is_a_very_long_path_segment_to_ensure_socket_path_exceeds_sun_len_limit_everywhere";
    let long_socket_dir = temp.socket_dir().join(long_suffix).join(long_suffix);
    std::fs::create_dir_all(&long_socket_dir).unwrap();

    // Start should fail with the daemon's own error, not a connection timeout
    temp.latch()
        .env("LATCH_SOCKET_DIR", &long_socket_dir)
        .args(&["daemon", "start"])
        .fails()
        .stderr_has("SUN_LEN")
        .stderr_lacks("Connection timeout");
}
