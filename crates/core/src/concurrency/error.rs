// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lock errors

use crate::store::{LeaseId, StoreError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LockError {
    /// The caller gave up while waiting; the candidate key was removed
    #[error("lock acquisition cancelled")]
    Cancelled,

    /// The caller's deadline passed while waiting; the candidate key was removed
    #[error("timed out waiting for lock")]
    Timeout,

    /// The session's lease is gone, so nothing it held is held any more
    #[error("session expired (lease {lease})")]
    SessionExpired { lease: LeaseId },

    /// `try_lock` found another candidate at the head of the queue
    #[error("lock is held by {holder}")]
    Locked { holder: String },

    #[error("exit status {code}")]
    CommandFailed { code: i32 },

    #[error("signal: {signal}")]
    CommandKilled { signal: i32 },

    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl LockError {
    /// Cancellation or timeout, as opposed to a failure
    pub fn is_cancellation(&self) -> bool {
        matches!(self, LockError::Cancelled | LockError::Timeout)
    }

    /// Exit code of a failed command run under the lock
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            LockError::CommandFailed { code } => Some(*code),
            LockError::CommandKilled { signal } => Some(128 + signal),
            _ => None,
        }
    }
}
