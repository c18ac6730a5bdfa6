// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Running a command while a lock is held

use super::candidate::CandidateKey;
use super::error::LockError;
use std::process::ExitStatus;

/// Environment variable carrying the held candidate key
pub const LOCK_KEY_ENV: &str = "LATCH_LOCK_KEY";

/// Environment variable carrying the held key's creation revision
pub const LOCK_REV_ENV: &str = "LATCH_LOCK_REV";

/// A program to run under a lock
///
/// The child inherits stdio and the environment, plus [`LOCK_KEY_ENV`] and
/// [`LOCK_REV_ENV`] describing the lock it runs under.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecCommand {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
}

impl ExecCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
        }
    }

    /// Program and arguments from a word list; `None` if empty
    pub fn from_argv<S: AsRef<str>>(argv: &[S]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self {
            program: program.as_ref().to_string(),
            args: args.iter().map(|a| a.as_ref().to_string()).collect(),
            env: Vec::new(),
        })
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Run to completion; any exit other than success is an error
    pub async fn run(&self, held: &CandidateKey) -> Result<(), LockError> {
        tracing::info!(program = %self.program, key = %held.key, "running command under lock");

        let status = tokio::process::Command::new(&self.program)
            .args(&self.args)
            .envs(self.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .env(LOCK_KEY_ENV, &held.key)
            .env(LOCK_REV_ENV, held.revision.to_string())
            .kill_on_drop(true)
            .status()
            .await
            .map_err(|source| LockError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        tracing::debug!(program = %self.program, %status, "command finished");
        exit_result(status)
    }
}

fn exit_result(status: ExitStatus) -> Result<(), LockError> {
    if status.success() {
        return Ok(());
    }
    if let Some(code) = status.code() {
        return Err(LockError::CommandFailed { code });
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return Err(LockError::CommandKilled { signal });
        }
    }
    Err(LockError::CommandFailed { code: 1 })
}

#[cfg(test)]
#[path = "exec_tests.rs"]
mod tests;
