// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Candidate keys and the waiter queue they form
//!
//! A candidate for lock `name` is the key `name/<revision>`, where the
//! revision is the store revision that created it, written as 16 lower-case
//! hex digits. Fixed width makes lexicographic order equal revision order. The
//! `/` separator keeps lock `a` from seeing the candidates of lock `ab`, and
//! the token check keeps it from seeing those of lock `a/b`.

use super::release::{delete_with_retry, ReleaseConfig};
use crate::store::{KeyValue, KvClient, LeaseId, RangeResponse, Revision, StoreError};
use serde::{Deserialize, Serialize};

const TOKEN_DIGITS: usize = 16;

/// Range prefix shared by every candidate of `name`
pub fn queue_prefix(name: &str) -> String {
    format!("{name}/")
}

/// Revision embedded in a candidate key of lock `name`
pub fn parse_revision_token(key: &str, name: &str) -> Option<Revision> {
    let digits = key.strip_prefix(name)?.strip_prefix('/')?;
    let well_formed = digits.len() == TOKEN_DIGITS
        && digits
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
    if !well_formed {
        return None;
    }
    Revision::from_str_radix(digits, 16).ok()
}

/// One caller's place in a lock's queue
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateKey {
    /// Lock name the candidate queues for
    pub name: String,
    /// Full key, `name` followed by the revision token
    pub key: String,
    /// Creation revision; the queue is ordered by it
    pub revision: Revision,
    /// Session lease the key is attached to
    pub lease: LeaseId,
}

/// Scoped candidate key, deleted on drop unless disarmed
///
/// Covers acquisition futures that are dropped mid-wait: the key would
/// otherwise sit in the queue, blocking everyone behind it until the session
/// lease runs out.
pub struct Candidate<K: KvClient> {
    client: K,
    key: CandidateKey,
    release: ReleaseConfig,
    armed: bool,
}

impl<K: KvClient> Candidate<K> {
    /// Append a candidate for `name` to the store, attached to `lease`
    pub async fn create(
        client: &K,
        name: &str,
        lease: LeaseId,
        release: ReleaseConfig,
    ) -> Result<Self, StoreError> {
        let kv = client
            .create_sequential(&queue_prefix(name), &lease.to_string(), lease)
            .await?;

        tracing::debug!(lock = name, key = %kv.key, revision = kv.create_revision, "candidate created");

        Ok(Self {
            client: client.clone(),
            key: CandidateKey {
                name: name.to_string(),
                key: kv.key,
                revision: kv.create_revision,
                lease,
            },
            release,
            armed: true,
        })
    }

    pub fn key(&self) -> &CandidateKey {
        &self.key
    }

    /// Keep the key in the store past this guard
    pub fn disarm(mut self) -> CandidateKey {
        self.armed = false;
        self.key.clone()
    }

    /// Delete the key now
    pub async fn release(mut self) -> Result<(), StoreError> {
        self.armed = false;
        delete_with_retry(&self.client, &self.key.key, &self.release).await?;
        Ok(())
    }
}

impl<K: KvClient> Drop for Candidate<K> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let client = self.client.clone();
        let key = self.key.key.clone();
        let release = self.release.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                tracing::debug!(key = %key, "releasing abandoned candidate");
                handle.spawn(async move {
                    let _ = delete_with_retry(&client, &key, &release).await;
                });
            }
            Err(_) => {
                tracing::warn!(key = %key, "no runtime to release candidate, leaving it to lease expiry");
            }
        }
    }
}

/// Live candidates of one lock, oldest first
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WaiterQueue {
    revision: Revision,
    candidates: Vec<KeyValue>,
}

impl WaiterQueue {
    /// Store revision the listing was taken at
    pub fn revision(&self) -> Revision {
        self.revision
    }

    pub fn candidates(&self) -> &[KeyValue] {
        &self.candidates
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Current holder
    pub fn head(&self) -> Option<&KeyValue> {
        self.candidates.first()
    }

    /// Number of live candidates ahead of the one created at `revision`
    pub fn position(&self, revision: Revision) -> Option<usize> {
        self.candidates
            .iter()
            .position(|kv| kv.create_revision == revision)
    }

    /// Candidate immediately ahead of the one created at `revision`
    pub fn predecessor(&self, revision: Revision) -> Option<&KeyValue> {
        self.candidates
            .iter()
            .take_while(|kv| kv.create_revision < revision)
            .last()
    }
}

impl WaiterQueue {
    /// Queue of lock `name` from a listing of its range prefix
    ///
    /// Keys under the prefix that are not `name` plus one revision token
    /// belong to other locks (`a/b/...` under `a/`) and are skipped.
    pub fn for_lock(name: &str, listing: RangeResponse) -> Self {
        let mut candidates: Vec<KeyValue> = listing
            .kvs
            .into_iter()
            .filter(|kv| parse_revision_token(&kv.key, name).is_some())
            .collect();
        candidates.sort_by_key(|kv| kv.create_revision);
        Self {
            revision: listing.revision,
            candidates,
        }
    }
}

#[cfg(test)]
#[path = "candidate_tests.rs"]
mod tests;
