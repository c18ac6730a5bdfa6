// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared in-process store
//!
//! All operations run under one mutex, which makes them linearizable. Overdue
//! leases are reaped at the start of every operation, and by the reaper task
//! so that watchers wake up even when nobody else touches the store.

use super::state::StoreState;
use super::watch::{WatchHub, Watcher};
use super::{
    DeleteEvent, DeleteResponse, KeyValue, KvClient, LeaseGrant, LeaseId, RangeResponse,
    Revision, StoreError, StoreStatus,
};
use crate::clock::{Clock, SystemClock};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

struct Inner {
    state: StoreState,
    watches: WatchHub,
}

impl Inner {
    fn reap<C: Clock>(&mut self, clock: &C) -> Vec<LeaseId> {
        let expired = self.state.expire(clock.now());
        let mut ids = Vec::with_capacity(expired.len());
        for (id, events) in expired {
            tracing::info!(lease = %id, keys = events.len(), "lease expired");
            self.watches.notify(&events);
            ids.push(id);
        }
        ids
    }
}

/// In-memory store shared between clones
#[derive(Clone)]
pub struct MemoryStore<C: Clock = SystemClock> {
    inner: Arc<Mutex<Inner>>,
    clock: C,
}

impl MemoryStore<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for MemoryStore<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> MemoryStore<C> {
    pub fn with_clock(clock: C) -> Self {
        Self::from_state(StoreState::new(), clock)
    }

    pub fn from_state(state: StoreState, clock: C) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                state,
                watches: WatchHub::new(),
            })),
            clock,
        }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Run one transaction after reaping overdue leases
    fn with_state<T>(&self, f: impl FnOnce(&mut Inner, &C) -> T) -> T {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.reap(&self.clock);
        f(&mut *inner, &self.clock)
    }

    /// Revoke every lease past its deadline, returning their ids
    pub fn expire_due(&self) -> Vec<LeaseId> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.reap(&self.clock)
    }

    /// Periodically reap expired leases until the handle is aborted
    pub fn spawn_reaper(&self, every: Duration) -> JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(every);
            loop {
                tick.tick().await;
                store.expire_due();
            }
        })
    }

    pub fn status(&self) -> StoreStatus {
        self.with_state(|inner, _| inner.state.status())
    }

    /// Number of registered deletion watches
    pub fn watch_count(&self) -> usize {
        self.with_state(|inner, _| {
            inner.watches.prune();
            inner.watches.len()
        })
    }

    pub fn get(&self, key: &str) -> Option<KeyValue> {
        self.with_state(|inner, _| inner.state.get(key).cloned())
    }

    /// Fail every open watch, used when the store is going away
    pub fn close_watches(&self) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner
            .watches
            .close_all(StoreError::Unavailable("store shutting down".to_string()));
    }

    fn publish(inner: &mut Inner, events: &[DeleteEvent]) {
        if !events.is_empty() {
            inner.watches.notify(events);
        }
    }
}

#[async_trait]
impl<C: Clock> KvClient for MemoryStore<C> {
    async fn grant(&self, ttl: Duration) -> Result<LeaseGrant, StoreError> {
        Ok(self.with_state(|inner, clock| inner.state.grant(ttl, clock.now())))
    }

    async fn keep_alive(&self, lease: LeaseId) -> Result<LeaseGrant, StoreError> {
        self.with_state(|inner, clock| inner.state.keep_alive(lease, clock.now()))
    }

    async fn revoke(&self, lease: LeaseId) -> Result<Revision, StoreError> {
        self.with_state(|inner, _| {
            let (revision, events) = inner.state.revoke(lease)?;
            Self::publish(inner, &events);
            Ok(revision)
        })
    }

    async fn create_sequential(
        &self,
        prefix: &str,
        value: &str,
        lease: LeaseId,
    ) -> Result<KeyValue, StoreError> {
        self.with_state(|inner, clock| {
            inner
                .state
                .create_sequential(prefix, value, lease, clock.now())
        })
    }

    async fn range(&self, prefix: &str) -> Result<RangeResponse, StoreError> {
        Ok(self.with_state(|inner, _| inner.state.range(prefix)))
    }

    async fn delete(&self, key: &str) -> Result<DeleteResponse, StoreError> {
        Ok(self.with_state(|inner, _| {
            let (response, event) = inner.state.delete(key);
            if let Some(event) = event {
                Self::publish(inner, &[event]);
            }
            response
        }))
    }

    async fn watch_delete(
        &self,
        key: &str,
        start_revision: Revision,
    ) -> Result<Watcher, StoreError> {
        self.with_state(|inner, _| {
            let Inner { state, watches } = inner;
            watches.register(key, start_revision, state)
        })
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
