// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test utilities for CLI integration tests.

#![allow(dead_code)]

use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::process::{Child, Command as StdCommand, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use assert_cmd::Command;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use tempfile::TempDir;

/// How long a blocked client is given to (wrongly) acquire
pub const BLOCKED_MS: u64 = 300;

/// Upper bound for anything that should happen "promptly"
pub const WAIT_MAX_MS: u64 = 5_000;

/// An isolated endpoint: its own socket dir, state dir and daemon
///
/// The daemon is stopped when the environment is dropped.
pub struct TestEnv {
    temp: TempDir,
}

impl TestEnv {
    pub fn new() -> Self {
        let temp = TempDir::new().expect("Failed to create temp directory");
        std::fs::create_dir_all(temp.path().join("sock")).expect("Failed to create socket dir");
        std::fs::create_dir_all(temp.path().join("state")).expect("Failed to create state dir");
        Self { temp }
    }

    fn envs(&self) -> Vec<(&'static str, PathBuf)> {
        vec![
            ("LATCH_SOCKET_DIR", self.temp.path().join("sock")),
            ("XDG_STATE_HOME", self.temp.path().join("state")),
            ("LATCH_DAEMON_BINARY", latchd_binary()),
        ]
    }

    /// `latch` run to completion
    pub fn latch(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_latch"));
        cmd.envs(self.envs()).env_remove("LATCH_ENDPOINT");
        cmd
    }

    /// `latch lock <args>` left running in the background
    pub fn spawn_lock(&self, args: &[&str]) -> LockProcess {
        let mut child = StdCommand::new(env!("CARGO_BIN_EXE_latch"))
            .envs(self.envs())
            .env_remove("LATCH_ENDPOINT")
            .arg("lock")
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .expect("Failed to spawn latch lock");

        let stdout = child.stdout.take().expect("stdout is piped");
        let (tx, lines) = mpsc::channel();
        std::thread::spawn(move || {
            for line in BufReader::new(stdout).lines().map_while(Result::ok) {
                if tx.send(line).is_err() {
                    break;
                }
            }
        });

        LockProcess { child, lines }
    }

    /// Live keys in the store, from `latch daemon status`
    pub fn live_keys(&self) -> usize {
        let output = self
            .latch()
            .args(["daemon", "status"])
            .output()
            .expect("Failed to run daemon status");
        String::from_utf8_lossy(&output.stdout)
            .lines()
            .find_map(|line| line.strip_prefix("Keys: "))
            .and_then(|n| n.trim().parse().ok())
            .unwrap_or(0)
    }

    /// Wait until the store holds exactly `count` keys
    pub fn wait_for_keys(&self, count: usize) -> bool {
        wait_for(WAIT_MAX_MS, || self.live_keys() == count)
    }
}

impl Drop for TestEnv {
    fn drop(&mut self) {
        let _ = self.latch().args(["daemon", "stop"]).output();
    }
}

/// A background `latch lock` process
pub struct LockProcess {
    child: Child,
    lines: Receiver<String>,
}

impl LockProcess {
    /// Next stdout line, if one arrives within `timeout_ms`
    pub fn next_line(&self, timeout_ms: u64) -> Option<String> {
        self.lines
            .recv_timeout(Duration::from_millis(timeout_ms))
            .ok()
    }

    pub fn signal(&self, signal: Signal) {
        kill(Pid::from_raw(self.child.id() as i32), signal).expect("Failed to signal latch");
    }

    pub fn interrupt(&self) {
        self.signal(Signal::SIGINT);
    }

    pub fn wait(mut self) -> ExitStatus {
        self.child.wait().expect("Failed to wait for latch")
    }
}

impl Drop for LockProcess {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// The daemon binary built next to `latch`
///
/// `latchd` belongs to another package, so testing `latch` alone does not
/// build it. The first call builds it into the same target directory.
pub fn latchd_binary() -> PathBuf {
    static LATCHD: OnceLock<PathBuf> = OnceLock::new();
    LATCHD
        .get_or_init(|| {
            let latch = PathBuf::from(env!("CARGO_BIN_EXE_latch"));
            let latchd = latch.with_file_name("latchd");
            build_latchd(&latch);
            assert!(latchd.exists(), "latchd not found at {}", latchd.display());
            latchd
        })
        .clone()
}

fn build_latchd(latch: &std::path::Path) {
    let profile_dir = latch.parent().expect("latch binary has a parent directory");
    let target_dir = profile_dir.parent().expect("profile dir has a parent directory");
    let cargo = std::env::var("CARGO").unwrap_or_else(|_| "cargo".to_string());

    let mut build = StdCommand::new(cargo);
    build
        .args(["build", "--quiet", "-p", "latch-daemon", "--bin", "latchd"])
        .arg("--target-dir")
        .arg(target_dir)
        .current_dir(env!("CARGO_MANIFEST_DIR"));
    if profile_dir.file_name().is_some_and(|name| name == "release") {
        build.arg("--release");
    }
    let status = build.status().expect("Failed to run cargo build");
    assert!(status.success(), "building latchd failed: {status}");
}

/// Poll `check` every 50ms until it holds or `timeout_ms` passes
pub fn wait_for(timeout_ms: u64, mut check: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_millis(timeout_ms);
    while Instant::now() < deadline {
        if check() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(50));
    }
    check()
}
