// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Store state: keys, leases and the revision counter
//!
//! Every method is one transaction. A transaction that changes keys bumps the
//! revision exactly once; the deletions it causes are returned so the caller
//! can hand them to the watch hub.

use super::lease::LeaseTable;
use super::{
    sequential_key, DeleteEvent, DeleteResponse, KeyValue, LeaseGrant, LeaseId, RangeResponse,
    Revision, StoreError, StoreStatus,
};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

#[derive(Clone, Debug)]
pub struct StoreState {
    revision: Revision,
    kvs: BTreeMap<String, KeyValue>,
    leases: LeaseTable,
}

impl StoreState {
    pub fn new() -> Self {
        Self::with_leases(LeaseTable::default())
    }

    /// State whose lease ids start at `first_lease`, so ids from an earlier
    /// store incarnation are not reused
    pub fn with_lease_seed(first_lease: i64) -> Self {
        Self::with_leases(LeaseTable::starting_at(first_lease))
    }

    fn with_leases(leases: LeaseTable) -> Self {
        Self {
            revision: 1,
            kvs: BTreeMap::new(),
            leases,
        }
    }

    pub fn revision(&self) -> Revision {
        self.revision
    }

    pub fn status(&self) -> StoreStatus {
        StoreStatus {
            revision: self.revision,
            leases: self.leases.len(),
            keys: self.kvs.len(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&KeyValue> {
        self.kvs.get(key)
    }

    pub fn grant(&mut self, ttl: Duration, now: Instant) -> LeaseGrant {
        self.leases.grant(ttl, now)
    }

    pub fn keep_alive(&mut self, lease: LeaseId, now: Instant) -> Result<LeaseGrant, StoreError> {
        self.leases.refresh(lease, now)
    }

    pub fn revoke(&mut self, lease: LeaseId) -> Result<(Revision, Vec<DeleteEvent>), StoreError> {
        let removed = self
            .leases
            .remove(lease)
            .ok_or(StoreError::LeaseNotFound(lease))?;
        let events = self.delete_all(removed.keys);
        Ok((self.revision, events))
    }

    /// Revoke every lease whose deadline has passed
    pub fn expire(&mut self, now: Instant) -> Vec<(LeaseId, Vec<DeleteEvent>)> {
        let mut expired = Vec::new();
        for id in self.leases.expired(now) {
            if let Some(lease) = self.leases.remove(id) {
                let events = self.delete_all(lease.keys);
                expired.push((id, events));
            }
        }
        expired
    }

    pub fn create_sequential(
        &mut self,
        prefix: &str,
        value: &str,
        lease: LeaseId,
        now: Instant,
    ) -> Result<KeyValue, StoreError> {
        if !self.leases.is_live(lease, now) {
            return Err(StoreError::LeaseNotFound(lease));
        }

        let revision = self.revision + 1;
        let key = sequential_key(prefix, revision);
        if self.kvs.contains_key(&key) {
            return Err(StoreError::InvalidRequest(format!("key {key} already exists")));
        }
        self.leases.attach(lease, &key)?;

        let kv = KeyValue {
            key: key.clone(),
            value: value.to_string(),
            create_revision: revision,
            mod_revision: revision,
            lease: Some(lease),
        };
        self.kvs.insert(key, kv.clone());
        self.revision = revision;
        Ok(kv)
    }

    pub fn range(&self, prefix: &str) -> RangeResponse {
        let mut kvs: Vec<KeyValue> = self
            .kvs
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(_, kv)| kv.clone())
            .collect();
        kvs.sort_by_key(|kv| kv.create_revision);
        RangeResponse {
            revision: self.revision,
            kvs,
        }
    }

    pub fn delete(&mut self, key: &str) -> (DeleteResponse, Option<DeleteEvent>) {
        if !self.kvs.contains_key(key) {
            let response = DeleteResponse {
                revision: self.revision,
                deleted: false,
            };
            return (response, None);
        }

        let mut events = self.delete_all([key.to_string()]);
        let response = DeleteResponse {
            revision: self.revision,
            deleted: true,
        };
        (response, events.pop())
    }

    /// Delete keys in a single revision
    fn delete_all(&mut self, keys: impl IntoIterator<Item = String>) -> Vec<DeleteEvent> {
        let revision = self.revision + 1;
        let mut events = Vec::new();
        for key in keys {
            if let Some(kv) = self.kvs.remove(&key) {
                if let Some(lease) = kv.lease {
                    self.leases.detach(lease, &key);
                }
                events.push(DeleteEvent { key, revision });
            }
        }
        if !events.is_empty() {
            self.revision = revision;
        }
        events
    }
}

impl Default for StoreState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
