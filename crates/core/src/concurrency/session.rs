// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session: a lease kept alive for as long as the client is
//!
//! Every candidate key a client creates is attached to its session's lease.
//! Closing the session revokes the lease; a client that dies without closing
//! stops renewing and the store expires the lease on its own. Either way the
//! store deletes the keys, which releases held locks and queue places.
//!
//! ## Keep-alive
//!
//! A background task renews the lease every `ttl / 3`. Transient failures
//! are retried with exponential backoff for as long as the lease can still be
//! alive on the store; after that, or on `LeaseNotFound`, the session is
//! `Expired` for good.

use super::error::LockError;
use super::retry::Backoff;
use crate::store::{KvClient, LeaseGrant, LeaseId, StoreError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Session configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Lease time-to-live requested from the store
    #[serde(with = "humantime_serde")]
    pub ttl: Duration,
    /// First delay between keep-alive retries after a transient failure
    #[serde(with = "humantime_serde")]
    pub retry_backoff: Duration,
}

impl SessionConfig {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            ..Self::default()
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(60),
            retry_backoff: Duration::from_millis(50),
        }
    }
}

/// Liveness of a session
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// Lease is being renewed
    Alive,
    /// Lease was lost; terminal
    Expired,
    /// Closed by its owner; terminal
    Closed,
}

/// How often to renew a lease with the given TTL
pub(crate) fn renew_interval(ttl: Duration) -> Duration {
    (ttl / 3).max(Duration::from_millis(10))
}

/// A lease plus the task that keeps it alive
pub struct Session<K: KvClient> {
    client: K,
    lease: LeaseId,
    ttl: Duration,
    state: Arc<watch::Sender<SessionState>>,
    keep_alive: JoinHandle<()>,
}

impl<K: KvClient> Session<K> {
    /// Grant a lease and start renewing it
    pub async fn open(client: K, config: SessionConfig) -> Result<Self, LockError> {
        let grant = client.grant(config.ttl).await?;
        let (tx, _) = watch::channel(SessionState::Alive);
        let state = Arc::new(tx);

        let keep_alive = tokio::spawn(keep_alive_loop(
            client.clone(),
            grant,
            config.retry_backoff,
            Arc::clone(&state),
        ));

        tracing::info!(
            lease = %grant.id,
            ttl_ms = grant.ttl.as_millis() as u64,
            "session opened"
        );

        Ok(Self {
            client,
            lease: grant.id,
            ttl: grant.ttl,
            state,
            keep_alive,
        })
    }

    pub fn client(&self) -> &K {
        &self.client
    }

    pub fn lease(&self) -> LeaseId {
        self.lease
    }

    /// TTL granted by the store (may be longer than requested)
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    pub fn is_alive(&self) -> bool {
        self.state() == SessionState::Alive
    }

    /// Fail fast unless the session is alive
    pub(crate) fn ensure_alive(&self) -> Result<(), LockError> {
        if self.is_alive() {
            Ok(())
        } else {
            Err(LockError::SessionExpired { lease: self.lease })
        }
    }

    /// Resolves once the session stops being alive
    pub async fn expired(&self) -> SessionState {
        let mut rx = self.state.subscribe();
        let state = match rx.wait_for(|s| *s != SessionState::Alive).await {
            Ok(state) => *state,
            Err(_) => SessionState::Closed,
        };
        state
    }

    /// Stop renewing and revoke the lease, deleting every key attached to it
    pub async fn close(self) -> Result<(), LockError> {
        self.keep_alive.abort();
        let previous = self.state.send_replace(SessionState::Closed);

        match self.client.revoke(self.lease).await {
            Ok(_) => {
                tracing::info!(lease = %self.lease, "session closed");
                Ok(())
            }
            // Expired sessions have nothing left to revoke
            Err(StoreError::LeaseNotFound(_)) => {
                tracing::debug!(lease = %self.lease, ?previous, "lease already gone");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

impl<K: KvClient> Drop for Session<K> {
    fn drop(&mut self) {
        // Without close() the lease runs out on the store by TTL
        self.keep_alive.abort();
    }
}

async fn keep_alive_loop<K: KvClient>(
    client: K,
    grant: LeaseGrant,
    retry_backoff: Duration,
    state: Arc<watch::Sender<SessionState>>,
) {
    let lease = grant.id;
    let interval = renew_interval(grant.ttl);
    let mut deadline = Instant::now() + grant.ttl;

    loop {
        tokio::time::sleep(interval).await;

        let mut backoff = Backoff::new(retry_backoff, interval);
        loop {
            let sent = Instant::now();
            match client.keep_alive(lease).await {
                Ok(renewed) => {
                    deadline = sent + renewed.ttl;
                    break;
                }
                Err(e) if e.is_transient() => {
                    let delay = backoff.next_delay();
                    if Instant::now() + delay >= deadline {
                        tracing::warn!(lease = %lease, error = %e, "keep-alive retries exhausted");
                        state.send_replace(SessionState::Expired);
                        return;
                    }
                    tracing::debug!(
                        lease = %lease,
                        error = %e,
                        delay_ms = delay.as_millis() as u64,
                        "keep-alive failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    tracing::warn!(lease = %lease, error = %e, "session expired");
                    state.send_replace(SessionState::Expired);
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
