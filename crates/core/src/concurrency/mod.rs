// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session-scoped distributed locking
//!
//! This module provides:
//! - **Session** - A lease kept alive by a background task; its keys vanish with it
//! - **Candidate** - A sequential key marking one caller's place in a lock's queue
//! - **Acquisition** - Waits on the immediate predecessor until the candidate is head
//! - **Release** - Retrying delete of a candidate key
//! - **LockClient** - `lock`, `try_lock`, `unlock` and `lock_and_exec`
//!
//! The store is the only shared state: clients coordinate exclusively through
//! sequential keys, leases and deletion watches.

mod acquire;
mod candidate;
mod client;
mod error;
mod exec;
#[cfg(test)]
mod fake;
mod release;
mod retry;
mod session;

pub use acquire::{evaluate, wait_for_turn, AcquireState, Step};
pub use candidate::{parse_revision_token, queue_prefix, Candidate, CandidateKey, WaiterQueue};
pub use client::{LockClient, LockHandle};
pub use error::LockError;
pub use exec::{ExecCommand, LOCK_KEY_ENV, LOCK_REV_ENV};
pub use release::{delete_with_retry, ReleaseConfig};
pub use retry::Backoff;
pub use session::{Session, SessionConfig, SessionState};
