// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lease bookkeeping
//!
//! A lease is alive until its deadline passes. Keys attached to it are
//! tracked here so that revoking or expiring the lease can delete them.

use super::{LeaseGrant, LeaseId, StoreError};
use std::collections::{BTreeSet, HashMap};
use std::time::{Duration, Instant};

/// Shortest TTL the store will grant; smaller requests are rounded up
pub const MIN_TTL: Duration = Duration::from_secs(1);

#[derive(Clone, Debug)]
pub struct Lease {
    pub id: LeaseId,
    pub ttl: Duration,
    pub deadline: Instant,
    pub keys: BTreeSet<String>,
}

impl Lease {
    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.deadline
    }

    fn grant(&self) -> LeaseGrant {
        LeaseGrant {
            id: self.id,
            ttl: self.ttl,
        }
    }
}

#[derive(Clone, Debug)]
pub struct LeaseTable {
    leases: HashMap<LeaseId, Lease>,
    next_id: i64,
}

impl LeaseTable {
    /// Table whose first lease id is `first_id`
    pub fn starting_at(first_id: i64) -> Self {
        Self {
            leases: HashMap::new(),
            next_id: first_id.max(1),
        }
    }

    pub fn grant(&mut self, ttl: Duration, now: Instant) -> LeaseGrant {
        let id = LeaseId(self.next_id);
        self.next_id += 1;
        let ttl = ttl.max(MIN_TTL);
        let lease = Lease {
            id,
            ttl,
            deadline: now + ttl,
            keys: BTreeSet::new(),
        };
        let grant = lease.grant();
        self.leases.insert(id, lease);
        grant
    }

    /// Reset a live lease's deadline to `now + ttl`
    pub fn refresh(&mut self, id: LeaseId, now: Instant) -> Result<LeaseGrant, StoreError> {
        match self.leases.get_mut(&id) {
            Some(lease) if !lease.is_expired(now) => {
                lease.deadline = now + lease.ttl;
                Ok(lease.grant())
            }
            _ => Err(StoreError::LeaseNotFound(id)),
        }
    }

    pub fn is_live(&self, id: LeaseId, now: Instant) -> bool {
        self.leases.get(&id).is_some_and(|l| !l.is_expired(now))
    }

    pub fn attach(&mut self, id: LeaseId, key: &str) -> Result<(), StoreError> {
        let lease = self
            .leases
            .get_mut(&id)
            .ok_or(StoreError::LeaseNotFound(id))?;
        lease.keys.insert(key.to_string());
        Ok(())
    }

    pub fn detach(&mut self, id: LeaseId, key: &str) {
        if let Some(lease) = self.leases.get_mut(&id) {
            lease.keys.remove(key);
        }
    }

    pub fn remove(&mut self, id: LeaseId) -> Option<Lease> {
        self.leases.remove(&id)
    }

    /// Ids of leases whose deadline has passed, lowest first
    pub fn expired(&self, now: Instant) -> Vec<LeaseId> {
        let mut ids: Vec<LeaseId> = self
            .leases
            .values()
            .filter(|l| l.is_expired(now))
            .map(|l| l.id)
            .collect();
        ids.sort();
        ids
    }

    pub fn get(&self, id: LeaseId) -> Option<&Lease> {
        self.leases.get(&id)
    }

    pub fn len(&self) -> usize {
        self.leases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leases.is_empty()
    }
}

impl Default for LeaseTable {
    fn default() -> Self {
        Self::starting_at(1)
    }
}

#[cfg(test)]
#[path = "lease_tests.rs"]
mod tests;
