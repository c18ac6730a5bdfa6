//! Daemon logs specs
//!
//! Verify daemon logs command behavior.

use crate::prelude::*;

#[test]
fn daemon_logs_shows_startup_marker() {
    let temp = Project::empty();
    temp.latch().args(&["daemon", "start"]).passes();

    temp.latch()
        .args(&["daemon", "logs", "--lines", "10"])
        .passes()
        .stdout_has("latchd: starting");
}

#[test]
fn daemon_logs_shows_startup_info() {
    let temp = Project::empty();
    temp.latch().args(&["daemon", "start"]).passes();

    let ready = wait_for(SPEC_WAIT_MAX_MS, || {
        temp.latch()
            .args(&["daemon", "logs"])
            .passes()
            .stdout()
            .contains("Daemon ready")
    });
    assert!(ready, "daemon log should report readiness");
}

#[test]
fn daemon_logs_without_daemon() {
    let temp = Project::empty();

    temp.latch()
        .args(&["daemon", "logs"])
        .passes()
        .stdout_has("No daemon log");
}
