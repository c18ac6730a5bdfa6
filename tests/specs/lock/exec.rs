//! Lock-and-exec specs
//!
//! `latch lock <name> <command...>` runs the command while holding the lock.

use crate::prelude::*;

#[test]
fn command_output_passes_through() {
    let temp = Project::empty();

    temp.latch()
        .args(&["lock", "build", "echo", "compiled"])
        .passes()
        .stdout_has("compiled");
}

#[test]
fn separator_is_accepted() {
    let temp = Project::empty();

    temp.latch()
        .args(&["lock", "build", "--", "echo", "--not-a-flag"])
        .passes()
        .stdout_has("--not-a-flag");
}

#[test]
fn exit_status_is_reported_and_propagated() {
    let temp = Project::empty();

    temp.latch()
        .args(&["lock", "build", "sh", "-c", "exit 3"])
        .fails()
        .code(3)
        .stderr_has("Error: exit status 3");
}

#[test]
fn lock_is_released_after_the_command() {
    let temp = Project::empty();
    temp.latch()
        .args(&["lock", "build", "sh", "-c", "exit 7"])
        .fails()
        .code(7);

    temp.latch()
        .args(&["daemon", "status"])
        .passes()
        .stdout_has("Keys: 0")
        .stdout_has("Leases: 0");
}

#[test]
fn sequential_runs_each_acquire() {
    let temp = Project::empty();
    let marker = temp.path().join("runs");
    let script = format!("echo run >> {}", marker.display());

    for _ in 0..3 {
        temp.latch()
            .args(&["lock", "build", "sh", "-c", &script])
            .passes();
    }

    let runs = std::fs::read_to_string(&marker).unwrap();
    assert_eq!(runs.lines().count(), 3);
}
