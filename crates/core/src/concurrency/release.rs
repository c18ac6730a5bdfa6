// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Releasing a candidate key

use super::retry::Backoff;
use crate::store::{DeleteResponse, KvClient, StoreError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Retry policy for deleting a candidate key
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseConfig {
    /// Total delete attempts, the first included
    pub attempts: u32,
    #[serde(with = "humantime_serde")]
    pub initial_backoff: Duration,
    #[serde(with = "humantime_serde")]
    pub max_backoff: Duration,
}

impl Default for ReleaseConfig {
    fn default() -> Self {
        Self {
            attempts: 5,
            initial_backoff: Duration::from_millis(50),
            max_backoff: Duration::from_secs(1),
        }
    }
}

/// Delete `key`, retrying transient failures
///
/// A key that is already gone counts as released. When every attempt fails
/// the last error is returned; the session lease still removes the key
/// eventually.
pub async fn delete_with_retry<K: KvClient>(
    client: &K,
    key: &str,
    config: &ReleaseConfig,
) -> Result<DeleteResponse, StoreError> {
    let mut backoff = Backoff::new(config.initial_backoff, config.max_backoff);
    let mut attempt = 1;
    loop {
        match client.delete(key).await {
            Ok(response) => {
                tracing::debug!(key, deleted = response.deleted, attempt, "candidate released");
                return Ok(response);
            }
            Err(e) if e.is_transient() && attempt < config.attempts => {
                let delay = backoff.next_delay();
                tracing::debug!(
                    key,
                    attempt,
                    error = %e,
                    delay_ms = delay.as_millis() as u64,
                    "release failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                tracing::warn!(key, attempt, error = %e, "release failed");
                return Err(e);
            }
        }
    }
}

#[cfg(test)]
#[path = "release_tests.rs"]
mod tests;
