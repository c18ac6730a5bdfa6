//! latch-core: Core library for the latch distributed lock tool
//!
//! This crate provides:
//! - A revision-ordered key-value store model with leases and deletion watches
//! - The `KvClient` seam that the in-process store and remote clients implement
//! - Sessions that keep a lease alive for as long as the client lives
//! - A fair, session-scoped mutual-exclusion lock built on top of them

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod clock;

pub mod store;

pub mod concurrency;

// Re-exports
pub use clock::{Clock, FakeClock, SystemClock};
pub use store::{
    DeleteEvent, DeleteResponse, KeyValue, KvClient, LeaseGrant, LeaseId, MemoryStore,
    RangeResponse, Revision, StoreError, StoreStatus, TracedClient, Watcher,
};

pub use concurrency::{
    AcquireState, CandidateKey, ExecCommand, LockClient, LockError, LockHandle, ReleaseConfig,
    Session, SessionConfig, SessionState,
};
