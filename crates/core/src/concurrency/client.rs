// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lock client facade

use super::acquire::{evaluate, log_transition, wait_for_turn, AcquireState, Step};
use super::candidate::{queue_prefix, Candidate, CandidateKey, WaiterQueue};
use super::error::LockError;
use super::exec::ExecCommand;
use super::release::{delete_with_retry, ReleaseConfig};
use super::session::Session;
use crate::store::{KvClient, LeaseId, Revision, StoreError};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

/// A held lock
///
/// `key` is the lock's identity: the lock name followed by the revision token
/// of the candidate that won.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockHandle {
    pub key: String,
    pub name: String,
    pub revision: Revision,
    pub lease: LeaseId,
}

impl LockHandle {
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl From<CandidateKey> for LockHandle {
    fn from(candidate: CandidateKey) -> Self {
        Self {
            key: candidate.key,
            name: candidate.name,
            revision: candidate.revision,
            lease: candidate.lease,
        }
    }
}

/// Acquires and releases locks on behalf of one session
///
/// Every candidate key is attached to the session's lease, so closing the
/// session (or losing it) releases everything the client held or queued for.
pub struct LockClient<K: KvClient> {
    session: Session<K>,
    release: ReleaseConfig,
}

impl<K: KvClient> LockClient<K> {
    pub fn new(session: Session<K>) -> Self {
        Self {
            session,
            release: ReleaseConfig::default(),
        }
    }

    pub fn with_release_config(mut self, release: ReleaseConfig) -> Self {
        self.release = release;
        self
    }

    pub fn session(&self) -> &Session<K> {
        &self.session
    }

    /// Wait for `name` until acquired or the session is lost
    pub async fn lock(&self, name: &str) -> Result<LockHandle, LockError> {
        self.lock_with(name, std::future::pending::<()>()).await
    }

    /// Wait for `name` until acquired, `cancel` resolves, or the session is lost
    ///
    /// On any failure the candidate key is deleted before returning.
    pub async fn lock_with<F>(&self, name: &str, cancel: F) -> Result<LockHandle, LockError>
    where
        F: Future<Output = ()>,
    {
        let candidate = self.acquire(name, cancel).await?;
        let handle = LockHandle::from(candidate.disarm());
        tracing::info!(lock = name, key = %handle.key, revision = handle.revision, "lock acquired");
        Ok(handle)
    }

    /// Like [`lock`](Self::lock) but gives up after `timeout`
    pub async fn lock_timeout(
        &self,
        name: &str,
        timeout: Duration,
    ) -> Result<LockHandle, LockError> {
        self.lock_with(name, tokio::time::sleep(timeout))
            .await
            .map_err(|e| match e {
                LockError::Cancelled => LockError::Timeout,
                other => other,
            })
    }

    /// Acquire `name` only if nobody holds it, without queueing
    pub async fn try_lock(&self, name: &str) -> Result<LockHandle, LockError> {
        let candidate = self.create_candidate(name).await?;
        let queue = match self.session.client().range(&queue_prefix(name)).await {
            Ok(listing) => WaiterQueue::for_lock(name, listing),
            Err(e) => {
                self.discard(candidate).await;
                return Err(e.into());
            }
        };

        match evaluate(&queue, candidate.key().revision) {
            Step::Held => {
                let handle = LockHandle::from(candidate.disarm());
                tracing::info!(lock = name, key = %handle.key, "lock acquired");
                Ok(handle)
            }
            Step::Wait { .. } => {
                let holder = queue
                    .head()
                    .map(|kv| kv.key.clone())
                    .unwrap_or_default();
                self.discard(candidate).await;
                Err(LockError::Locked { holder })
            }
            Step::Lost => {
                self.discard(candidate).await;
                Err(LockError::SessionExpired {
                    lease: self.session.lease(),
                })
            }
        }
    }

    /// Delete the handle's key, handing the lock to the next waiter
    pub async fn unlock(&self, handle: LockHandle) -> Result<(), LockError> {
        delete_with_retry(self.session.client(), &handle.key, &self.release).await?;
        tracing::info!(lock = %handle.name, key = %handle.key, "lock released");
        Ok(())
    }

    /// Acquire `name`, run `command` while holding it, then release
    ///
    /// The lock is released whether or not the command succeeds; a failing
    /// command is reported as [`LockError::CommandFailed`].
    pub async fn lock_and_exec(&self, name: &str, command: &ExecCommand) -> Result<(), LockError> {
        self.lock_and_exec_with(name, command, std::future::pending::<()>())
            .await
    }

    /// [`lock_and_exec`](Self::lock_and_exec) whose wait can be cancelled
    pub async fn lock_and_exec_with<F>(
        &self,
        name: &str,
        command: &ExecCommand,
        cancel: F,
    ) -> Result<(), LockError>
    where
        F: Future<Output = ()>,
    {
        let candidate = self.acquire(name, cancel).await?;
        tracing::info!(lock = name, key = %candidate.key().key, "lock acquired");

        let result = command.run(candidate.key()).await;
        let key = candidate.key().key.clone();
        let released = candidate.release().await;
        if released.is_ok() {
            tracing::info!(lock = name, key = %key, "lock released");
        }

        result?;
        released.map_err(LockError::from)
    }

    /// Close the session, releasing every lock it holds
    pub async fn close(self) -> Result<(), LockError> {
        self.session.close().await
    }

    async fn create_candidate(&self, name: &str) -> Result<Candidate<K>, LockError> {
        self.session.ensure_alive()?;
        Candidate::create(
            self.session.client(),
            name,
            self.session.lease(),
            self.release.clone(),
        )
        .await
        .map_err(|e| match e {
            StoreError::LeaseNotFound(lease) => LockError::SessionExpired { lease },
            other => other.into(),
        })
    }

    async fn acquire<F>(&self, name: &str, cancel: F) -> Result<Candidate<K>, LockError>
    where
        F: Future<Output = ()>,
    {
        let candidate = self.create_candidate(name).await?;

        let outcome = tokio::select! {
            biased;
            state = self.session.expired() => {
                tracing::warn!(lock = name, ?state, "session lost while waiting");
                Err(LockError::SessionExpired { lease: self.session.lease() })
            }
            _ = cancel => Err(LockError::Cancelled),
            result = wait_for_turn(self.session.client(), candidate.key()) => result,
        };

        match outcome {
            Ok(()) => Ok(candidate),
            Err(e) => {
                log_transition(candidate.key(), &AcquireState::Pending, &AcquireState::Released);
                self.discard(candidate).await;
                Err(e)
            }
        }
    }

    async fn discard(&self, candidate: Candidate<K>) {
        let key = candidate.key().key.clone();
        if let Err(e) = candidate.release().await {
            tracing::warn!(key = %key, error = %e, "failed to delete candidate");
        }
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
