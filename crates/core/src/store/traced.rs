// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced client wrapper for consistent observability

use super::{
    DeleteResponse, KeyValue, KvClient, LeaseGrant, LeaseId, RangeResponse, Revision,
    StoreError, Watcher,
};
use async_trait::async_trait;
use std::time::{Duration, Instant};
use tracing::Instrument;

/// Wrapper that adds tracing to any KvClient
#[derive(Clone)]
pub struct TracedClient<K> {
    inner: K,
}

impl<K> TracedClient<K> {
    pub fn new(inner: K) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &K {
        &self.inner
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

#[async_trait]
impl<K: KvClient> KvClient for TracedClient<K> {
    async fn grant(&self, ttl: Duration) -> Result<LeaseGrant, StoreError> {
        let span = tracing::info_span!("kv.grant", ttl_ms = ttl.as_millis() as u64);
        async {
            let start = Instant::now();
            let result = self.inner.grant(ttl).await;
            match &result {
                Ok(grant) => tracing::info!(
                    lease = %grant.id,
                    elapsed_ms = elapsed_ms(start),
                    "lease granted"
                ),
                Err(e) => tracing::error!(error = %e, "grant failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn keep_alive(&self, lease: LeaseId) -> Result<LeaseGrant, StoreError> {
        let result = self.inner.keep_alive(lease).await;
        match &result {
            Ok(_) => tracing::trace!(lease = %lease, "kept alive"),
            // the session decides whether this is fatal
            Err(e) => tracing::warn!(lease = %lease, error = %e, "keep-alive failed"),
        }
        result
    }

    async fn revoke(&self, lease: LeaseId) -> Result<Revision, StoreError> {
        let span = tracing::info_span!("kv.revoke", lease = %lease);
        async {
            let result = self.inner.revoke(lease).await;
            match &result {
                Ok(revision) => tracing::info!(revision, "revoked"),
                Err(e) => tracing::warn!(error = %e, "revoke failed (may be expected)"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn create_sequential(
        &self,
        prefix: &str,
        value: &str,
        lease: LeaseId,
    ) -> Result<KeyValue, StoreError> {
        let span = tracing::debug_span!("kv.create", prefix, lease = %lease);
        async {
            let result = self.inner.create_sequential(prefix, value, lease).await;
            match &result {
                Ok(kv) => tracing::debug!(key = %kv.key, revision = kv.create_revision, "created"),
                Err(e) => tracing::error!(error = %e, "create failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn range(&self, prefix: &str) -> Result<RangeResponse, StoreError> {
        let result = self.inner.range(prefix).await;
        tracing::trace!(
            prefix,
            count = result.as_ref().map(|r| r.kvs.len()).ok(),
            "listed"
        );
        result
    }

    async fn delete(&self, key: &str) -> Result<DeleteResponse, StoreError> {
        let span = tracing::debug_span!("kv.delete", key);
        async {
            let result = self.inner.delete(key).await;
            match &result {
                Ok(r) => tracing::debug!(deleted = r.deleted, revision = r.revision, "deleted"),
                Err(e) => tracing::warn!(error = %e, "delete failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn watch_delete(
        &self,
        key: &str,
        start_revision: Revision,
    ) -> Result<Watcher, StoreError> {
        let result = self.inner.watch_delete(key, start_revision).await;
        match &result {
            Ok(_) => tracing::debug!(key, start_revision, "watching"),
            Err(e) => tracing::warn!(key, error = %e, "watch failed"),
        }
        result
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
