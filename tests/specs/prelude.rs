//! Shared helpers for behavioral specs.
//!
//! Every `Project` gets its own socket and state directories, so specs can
//! run in parallel without sharing a daemon.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use tempfile::TempDir;

/// Maximum time to wait for an asynchronous condition
pub const SPEC_WAIT_MAX_MS: u64 = 5_000;

/// Path of a workspace binary
///
/// `latch` and `latchd` live in member packages that testing this package
/// alone does not build, so the first call builds them.
fn binary(name: &str) -> PathBuf {
    static BUILT: OnceLock<()> = OnceLock::new();
    let path = assert_cmd::cargo::cargo_bin(name);
    BUILT.get_or_init(|| build_binaries(&path));
    path
}

fn build_binaries(sample: &Path) {
    let profile_dir = sample.parent().unwrap();
    let target_dir = profile_dir.parent().unwrap();
    let cargo = std::env::var("CARGO").unwrap_or_else(|_| "cargo".to_string());

    let mut build = Command::new(cargo);
    build
        .args(["build", "--quiet", "-p", "latch", "-p", "latch-daemon", "--bins"])
        .arg("--target-dir")
        .arg(target_dir)
        .current_dir(env!("CARGO_MANIFEST_DIR"));
    if profile_dir.file_name().is_some_and(|name| name == "release") {
        build.arg("--release");
    }
    let status = build.status().unwrap();
    assert!(status.success(), "building workspace binaries failed: {status}");
}

/// Poll `check` until it returns true or `timeout_ms` passes
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

/// `latch` with no project environment (help, argument errors)
pub fn cli() -> CliBuilder {
    CliBuilder::new()
}

/// An isolated endpoint with its own daemon
pub struct Project {
    temp: TempDir,
}

impl Project {
    pub fn empty() -> Self {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("sock")).unwrap();
        std::fs::create_dir_all(temp.path().join("state")).unwrap();
        Self { temp }
    }

    pub fn path(&self) -> &Path {
        self.temp.path()
    }

    /// XDG_STATE_HOME for this project's daemon
    pub fn state_path(&self) -> PathBuf {
        self.temp.path().join("state")
    }

    /// LATCH_SOCKET_DIR for this project's daemon
    pub fn socket_dir(&self) -> PathBuf {
        self.temp.path().join("sock")
    }

    /// Per-endpoint daemon directories under the state path
    pub fn store_dirs(&self) -> Vec<PathBuf> {
        std::fs::read_dir(self.state_path().join("latch/stores"))
            .map(|entries| entries.filter_map(|e| e.ok()).map(|e| e.path()).collect())
            .unwrap_or_default()
    }

    pub fn latch(&self) -> CliBuilder {
        CliBuilder::new()
            .env("LATCH_SOCKET_DIR", self.socket_dir())
            .env("XDG_STATE_HOME", self.state_path())
            .env("LATCH_DAEMON_BINARY", binary("latchd"))
    }
}

impl Drop for Project {
    fn drop(&mut self) {
        let _ = self.latch().args(&["daemon", "stop"]).run();
    }
}

pub struct CliBuilder {
    cmd: Command,
}

impl CliBuilder {
    fn new() -> Self {
        let mut cmd = Command::new(binary("latch"));
        cmd.env_remove("LATCH_ENDPOINT")
            .env_remove("LATCH_LOG")
            .stdin(Stdio::null());
        Self { cmd }
    }

    pub fn args(mut self, args: &[&str]) -> Self {
        self.cmd.args(args);
        self
    }

    pub fn env(mut self, key: &str, value: impl AsRef<std::ffi::OsStr>) -> Self {
        self.cmd.env(key, value);
        self
    }

    /// The underlying command, for specs that manage the process themselves
    pub fn command(self) -> Command {
        self.cmd
    }

    fn run(mut self) -> Output {
        self.cmd.output().unwrap()
    }

    /// Run and expect exit code 0
    pub fn passes(self) -> RunAssert {
        let output = self.run();
        let run = RunAssert { output };
        assert!(
            run.output.status.success(),
            "expected success, got {:?}\n{}",
            run.output.status,
            run.describe()
        );
        run
    }

    /// Run and expect a non-zero exit code
    pub fn fails(self) -> RunAssert {
        let output = self.run();
        let run = RunAssert { output };
        assert!(
            !run.output.status.success(),
            "expected failure, got success\n{}",
            run.describe()
        );
        run
    }
}

pub struct RunAssert {
    output: Output,
}

impl RunAssert {
    pub fn stdout(&self) -> String {
        String::from_utf8_lossy(&self.output.stdout).into_owned()
    }

    pub fn stderr(&self) -> String {
        String::from_utf8_lossy(&self.output.stderr).into_owned()
    }

    fn describe(&self) -> String {
        format!("stdout:\n{}\nstderr:\n{}", self.stdout(), self.stderr())
    }

    pub fn code(self, expected: i32) -> Self {
        assert_eq!(self.output.status.code(), Some(expected), "{}", self.describe());
        self
    }

    pub fn stdout_has(self, needle: &str) -> Self {
        assert!(
            self.stdout().contains(needle),
            "stdout missing {:?}\n{}",
            needle,
            self.describe()
        );
        self
    }

    pub fn stdout_lacks(self, needle: &str) -> Self {
        assert!(
            !self.stdout().contains(needle),
            "stdout unexpectedly has {:?}\n{}",
            needle,
            self.describe()
        );
        self
    }

    pub fn stderr_has(self, needle: &str) -> Self {
        assert!(
            self.stderr().contains(needle),
            "stderr missing {:?}\n{}",
            needle,
            self.describe()
        );
        self
    }

    pub fn stderr_lacks(self, needle: &str) -> Self {
        assert!(
            !self.stderr().contains(needle),
            "stderr unexpectedly has {:?}\n{}",
            needle,
            self.describe()
        );
        self
    }
}
