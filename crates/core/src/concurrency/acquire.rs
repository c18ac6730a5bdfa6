// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Waiting for a candidate to reach the head of its queue
//!
//! ```text
//! Pending ──head──▶ Held
//!    │ ▲
//!    │ └─predecessor deleted─┐
//!    └─not head──▶ Watching ─┘
//! Pending/Watching ──cancel/timeout──▶ Released
//! ```
//!
//! Only the immediate predecessor is watched, so one release wakes one
//! waiter. Every wake-up re-lists the queue instead of trusting the event,
//! which also skips over several predecessors deleted at once.

use super::candidate::{queue_prefix, CandidateKey, WaiterQueue};
use super::error::LockError;
use super::retry::Backoff;
use crate::store::{KeyValue, KvClient, Revision, StoreError};
use std::fmt;
use std::time::Duration;

const RETRY_INITIAL: Duration = Duration::from_millis(50);
const RETRY_MAX: Duration = Duration::from_secs(2);

/// Where a candidate is in the acquisition state machine
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AcquireState {
    Pending,
    Watching { predecessor: String },
    Held,
    Released,
}

impl fmt::Display for AcquireState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AcquireState::Pending => write!(f, "pending"),
            AcquireState::Watching { .. } => write!(f, "watching"),
            AcquireState::Held => write!(f, "held"),
            AcquireState::Released => write!(f, "released"),
        }
    }
}

/// Outcome of evaluating one queue listing
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Step {
    /// The candidate is at the head
    Held,
    /// Wait for `predecessor` to go, watching from the listing's revision
    Wait {
        predecessor: KeyValue,
        revision: Revision,
    },
    /// The candidate is no longer in the queue; its lease is gone
    Lost,
}

/// Decide what the candidate created at `own` does next
pub fn evaluate(queue: &WaiterQueue, own: Revision) -> Step {
    if queue.position(own).is_none() {
        return Step::Lost;
    }
    match queue.predecessor(own) {
        None => Step::Held,
        Some(predecessor) => Step::Wait {
            predecessor: predecessor.clone(),
            revision: queue.revision(),
        },
    }
}

pub(crate) fn log_transition(candidate: &CandidateKey, from: &AcquireState, to: &AcquireState) {
    let predecessor = match to {
        AcquireState::Watching { predecessor } => predecessor.as_str(),
        _ => "",
    };
    tracing::debug!(
        lock = %candidate.name,
        key = %candidate.key,
        revision = candidate.revision,
        predecessor,
        "{from} -> {to}"
    );
}

/// Block until `candidate` is the head of its queue
///
/// Never returns while the candidate waits. Transient store errors are
/// retried indefinitely; callers bound the wait with cancellation and the
/// session's liveness.
pub async fn wait_for_turn<K: KvClient>(
    client: &K,
    candidate: &CandidateKey,
) -> Result<(), LockError> {
    let prefix = queue_prefix(&candidate.name);
    let mut backoff = Backoff::new(RETRY_INITIAL, RETRY_MAX);
    let mut state = AcquireState::Pending;

    loop {
        let listing = match client.range(&prefix).await {
            Ok(listing) => listing,
            Err(e) => {
                retry_or_fail(e, &mut backoff).await?;
                continue;
            }
        };

        let queue = WaiterQueue::for_lock(&candidate.name, listing);
        let (predecessor, revision) = match evaluate(&queue, candidate.revision) {
            Step::Held => {
                log_transition(candidate, &state, &AcquireState::Held);
                return Ok(());
            }
            Step::Lost => {
                tracing::debug!(key = %candidate.key, "candidate vanished from queue");
                return Err(LockError::SessionExpired {
                    lease: candidate.lease,
                });
            }
            Step::Wait {
                predecessor,
                revision,
            } => (predecessor, revision),
        };

        let next = AcquireState::Watching {
            predecessor: predecessor.key.clone(),
        };
        if next != state {
            log_transition(candidate, &state, &next);
            state = next;
        }

        let mut watcher = match client.watch_delete(&predecessor.key, revision).await {
            Ok(watcher) => watcher,
            Err(e) => {
                retry_or_fail(e, &mut backoff).await?;
                continue;
            }
        };

        match watcher.next().await {
            Some(Ok(event)) => {
                tracing::debug!(
                    key = %candidate.key,
                    predecessor = %event.key,
                    revision = event.revision,
                    "predecessor deleted"
                );
                backoff = Backoff::new(RETRY_INITIAL, RETRY_MAX);
            }
            Some(Err(e)) => retry_or_fail(e, &mut backoff).await?,
            // Stream ended without an event; re-list to find out why
            None => tokio::time::sleep(backoff.next_delay()).await,
        }

        log_transition(candidate, &state, &AcquireState::Pending);
        state = AcquireState::Pending;
    }
}

async fn retry_or_fail(error: StoreError, backoff: &mut Backoff) -> Result<(), LockError> {
    if !error.is_transient() {
        return Err(error.into());
    }
    let delay = backoff.next_delay();
    tracing::debug!(error = %error, delay_ms = delay.as_millis() as u64, "store error, retrying");
    tokio::time::sleep(delay).await;
    Ok(())
}

#[cfg(test)]
#[path = "acquire_tests.rs"]
mod tests;
