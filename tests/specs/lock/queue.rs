//! Lock queue specs
//!
//! Holders print their key and keep the lock until interrupted; waiters are
//! served in arrival order.

use crate::prelude::*;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use std::io::{BufRead, BufReader};
use std::process::{Child, Stdio};
use std::sync::mpsc::{self, Receiver};
use std::time::Duration;

/// A `latch lock` left running in the background
struct Holder {
    child: Child,
    lines: Receiver<String>,
}

impl Holder {
    fn spawn(project: &Project, name: &str) -> Self {
        let mut child = project
            .latch()
            .args(&["lock", name])
            .command()
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .unwrap();
        let stdout = child.stdout.take().unwrap();
        let (tx, lines) = mpsc::channel();
        std::thread::spawn(move || {
            for line in BufReader::new(stdout).lines().map_while(Result::ok) {
                let _ = tx.send(line);
            }
        });
        Self { child, lines }
    }

    fn key(&self, timeout_ms: u64) -> Option<String> {
        self.lines
            .recv_timeout(Duration::from_millis(timeout_ms))
            .ok()
    }

    fn interrupt(mut self) -> bool {
        kill(Pid::from_raw(self.child.id() as i32), Signal::SIGINT).unwrap();
        self.child.wait().unwrap().success()
    }
}

impl Drop for Holder {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

fn live_keys(project: &Project) -> String {
    project.latch().args(&["daemon", "status"]).passes().stdout()
}

#[test]
fn holder_key_is_prefixed_by_the_lock_name() {
    let temp = Project::empty();
    let a = Holder::spawn(&temp, "deploy");

    let key = a.key(SPEC_WAIT_MAX_MS).unwrap();
    assert!(key.starts_with("deploy/"), "unexpected key {key}");
    assert_eq!(key.len(), "deploy/".len() + 16);

    assert!(a.interrupt());
}

#[test]
fn waiters_are_served_in_order() {
    let temp = Project::empty();

    let a = Holder::spawn(&temp, "a");
    let key_a = a.key(SPEC_WAIT_MAX_MS).unwrap();

    let b = Holder::spawn(&temp, "a");
    assert!(wait_for(SPEC_WAIT_MAX_MS, || live_keys(&temp).contains("Keys: 2")));
    let c = Holder::spawn(&temp, "a");
    assert!(wait_for(SPEC_WAIT_MAX_MS, || live_keys(&temp).contains("Keys: 3")));

    assert_eq!(b.key(100), None);
    assert_eq!(c.key(100), None);

    assert!(a.interrupt());

    let key_b = b.key(SPEC_WAIT_MAX_MS).unwrap();
    assert_ne!(key_b, key_a);
    assert!(key_b.starts_with("a/"));
    assert_eq!(c.key(100), None, "C is still behind B");

    assert!(b.interrupt());
    let key_c = c.key(SPEC_WAIT_MAX_MS).unwrap();
    assert!(key_c > key_b, "later waiters get later revisions");
    assert!(c.interrupt());
}
