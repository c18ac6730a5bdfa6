// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Revision-ordered key-value store
//!
//! This module provides:
//! - **StoreState** - Keys, leases and the revision counter, mutated one transaction at a time
//! - **LeaseTable** - Time-bounded grants that own keys and delete them on expiry
//! - **WatchHub** - Deletion watches delivered without polling
//! - **MemoryStore** - Shared in-process store implementing [`KvClient`]
//! - **TracedClient** - Logging wrapper around any [`KvClient`]

mod lease;
mod memory;
mod state;
mod traced;
mod watch;

pub use lease::{Lease, LeaseTable, MIN_TTL};
pub use memory::MemoryStore;
pub use state::StoreState;
pub use traced::TracedClient;
pub use watch::{WatchHub, WatchSender, Watcher};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Store-assigned, strictly increasing write counter
pub type Revision = i64;

/// Identifier of a lease granted by the store
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LeaseId(pub i64);

impl std::fmt::Display for LeaseId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:x}", self.0)
    }
}

/// A live key
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValue {
    pub key: String,
    pub value: String,
    /// Revision of the write that created the key
    pub create_revision: Revision,
    /// Revision of the last write to the key
    pub mod_revision: Revision,
    /// Lease the key is attached to, if any
    pub lease: Option<LeaseId>,
}

/// A granted or refreshed lease
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaseGrant {
    pub id: LeaseId,
    #[serde(with = "humantime_serde")]
    pub ttl: Duration,
}

/// Keys under a prefix, ordered by creation revision
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeResponse {
    /// Store revision the listing was taken at
    pub revision: Revision,
    pub kvs: Vec<KeyValue>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteResponse {
    /// Store revision after the delete
    pub revision: Revision,
    /// Whether a key was actually removed
    pub deleted: bool,
}

/// Notification that a watched key is gone
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteEvent {
    pub key: String,
    pub revision: Revision,
}

/// Store counters reported by `status`
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStatus {
    pub revision: Revision,
    pub leases: usize,
    pub keys: usize,
}

/// Store errors
#[derive(Clone, Debug, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum StoreError {
    #[error("lease {0} not found")]
    LeaseNotFound(LeaseId),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("watch stream closed")]
    WatchClosed,

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl StoreError {
    /// Whether retrying the same request may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Unavailable(_) | StoreError::WatchClosed)
    }
}

/// Operations the lock protocol needs from a linearizable store
///
/// Every write bumps the store revision; keys attached to a lease are
/// deleted when the lease is revoked or expires.
#[async_trait]
pub trait KvClient: Clone + Send + Sync + 'static {
    /// Grant a lease that expires unless kept alive
    async fn grant(&self, ttl: Duration) -> Result<LeaseGrant, StoreError>;

    /// Push a lease's deadline out by its full TTL
    async fn keep_alive(&self, lease: LeaseId) -> Result<LeaseGrant, StoreError>;

    /// Revoke a lease, deleting every key attached to it
    async fn revoke(&self, lease: LeaseId) -> Result<Revision, StoreError>;

    /// Atomically create `prefix` followed by the new revision as 16 hex digits
    async fn create_sequential(
        &self,
        prefix: &str,
        value: &str,
        lease: LeaseId,
    ) -> Result<KeyValue, StoreError>;

    /// List live keys under `prefix`, oldest first
    async fn range(&self, prefix: &str) -> Result<RangeResponse, StoreError>;

    /// Delete a key; deleting a missing key succeeds with `deleted: false`
    async fn delete(&self, key: &str) -> Result<DeleteResponse, StoreError>;

    /// Watch for the deletion of `key`
    ///
    /// If the key is already gone when the watch is registered and
    /// `start_revision` is not in the future, the deletion is delivered
    /// immediately.
    async fn watch_delete(&self, key: &str, start_revision: Revision)
        -> Result<Watcher, StoreError>;
}

/// Key name for a sequential key created at `revision`
pub fn sequential_key(prefix: &str, revision: Revision) -> String {
    format!("{prefix}{revision:016x}")
}
