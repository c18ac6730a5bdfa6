// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Store wrapper with injectable failures for tests

use crate::store::{
    DeleteResponse, KeyValue, KvClient, LeaseGrant, LeaseId, MemoryStore, RangeResponse,
    Revision, StoreError, Watcher,
};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn unavailable() -> StoreError {
    StoreError::Unavailable("injected failure".to_string())
}

/// Delegates to a [`MemoryStore`] unless told to fail
#[derive(Clone, Default)]
pub struct FlakyStore {
    pub store: MemoryStore,
    keep_alive_down: Arc<AtomicBool>,
    delete_failures: Arc<AtomicU32>,
    deletes: Arc<AtomicU32>,
}

impl FlakyStore {
    pub fn new(store: MemoryStore) -> Self {
        Self {
            store,
            ..Self::default()
        }
    }

    /// Make every keep-alive fail transiently until called with `false`
    pub fn set_keep_alive_down(&self, down: bool) {
        self.keep_alive_down.store(down, Ordering::SeqCst);
    }

    /// Fail the next `n` deletes transiently
    pub fn fail_next_deletes(&self, n: u32) {
        self.delete_failures.store(n, Ordering::SeqCst);
    }

    /// Delete attempts seen so far, failed ones included
    pub fn delete_attempts(&self) -> u32 {
        self.deletes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KvClient for FlakyStore {
    async fn grant(&self, ttl: Duration) -> Result<LeaseGrant, StoreError> {
        self.store.grant(ttl).await
    }

    async fn keep_alive(&self, lease: LeaseId) -> Result<LeaseGrant, StoreError> {
        if self.keep_alive_down.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        self.store.keep_alive(lease).await
    }

    async fn revoke(&self, lease: LeaseId) -> Result<Revision, StoreError> {
        self.store.revoke(lease).await
    }

    async fn create_sequential(
        &self,
        prefix: &str,
        value: &str,
        lease: LeaseId,
    ) -> Result<KeyValue, StoreError> {
        self.store.create_sequential(prefix, value, lease).await
    }

    async fn range(&self, prefix: &str) -> Result<RangeResponse, StoreError> {
        self.store.range(prefix).await
    }

    async fn delete(&self, key: &str) -> Result<DeleteResponse, StoreError> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .delete_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(unavailable());
        }
        self.store.delete(key).await
    }

    async fn watch_delete(
        &self,
        key: &str,
        start_revision: Revision,
    ) -> Result<Watcher, StoreError> {
        self.store.watch_delete(key, start_revision).await
    }
}
