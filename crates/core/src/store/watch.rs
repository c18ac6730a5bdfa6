// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deletion watches
//!
//! Keys are never re-created under the same name, so a watch fires at most
//! once: the sender is dropped after delivery and the stream ends.

use super::state::StoreState;
use super::{DeleteEvent, Revision, StoreError};
use std::collections::HashMap;
use tokio::sync::mpsc;

/// Sending half of a watch stream
pub type WatchSender = mpsc::UnboundedSender<Result<DeleteEvent, StoreError>>;

/// Receiving half of a watch stream; dropping it cancels the watch
#[derive(Debug)]
pub struct Watcher {
    rx: mpsc::UnboundedReceiver<Result<DeleteEvent, StoreError>>,
}

impl Watcher {
    pub fn channel() -> (WatchSender, Watcher) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Watcher { rx })
    }

    /// Next event, or `None` once the stream has ended
    pub async fn next(&mut self) -> Option<Result<DeleteEvent, StoreError>> {
        self.rx.recv().await
    }
}

/// Routes deletions to the watchers of each key
#[derive(Debug, Default)]
pub struct WatchHub {
    watchers: HashMap<String, Vec<WatchSender>>,
}

impl WatchHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a deletion watch on `key`
    ///
    /// A key that is already gone gets its deletion delivered right away,
    /// stamped with the current store revision.
    pub fn register(
        &mut self,
        key: &str,
        start_revision: Revision,
        state: &StoreState,
    ) -> Result<Watcher, StoreError> {
        if start_revision > state.revision() {
            return Err(StoreError::InvalidRequest(format!(
                "watch revision {} is ahead of store revision {}",
                start_revision,
                state.revision()
            )));
        }

        let (tx, watcher) = Watcher::channel();
        if state.get(key).is_none() {
            let _ = tx.send(Ok(DeleteEvent {
                key: key.to_string(),
                revision: state.revision(),
            }));
            return Ok(watcher);
        }

        self.prune();
        self.watchers.entry(key.to_string()).or_default().push(tx);
        Ok(watcher)
    }

    /// Deliver deletions; returns how many watchers were notified
    pub fn notify(&mut self, events: &[DeleteEvent]) -> usize {
        let mut delivered = 0;
        for event in events {
            let Some(senders) = self.watchers.remove(&event.key) else {
                continue;
            };
            for tx in senders {
                if tx.send(Ok(event.clone())).is_ok() {
                    delivered += 1;
                }
            }
        }
        delivered
    }

    /// End every stream with `err`, e.g. when the store shuts down
    pub fn close_all(&mut self, err: StoreError) {
        for (_, senders) in self.watchers.drain() {
            for tx in senders {
                let _ = tx.send(Err(err.clone()));
            }
        }
    }

    /// Drop watches whose receiver has gone away
    pub fn prune(&mut self) {
        self.watchers.retain(|_, senders| {
            senders.retain(|tx| !tx.is_closed());
            !senders.is_empty()
        });
    }

    /// Number of registered watches
    pub fn len(&self) -> usize {
        self.watchers.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
#[path = "watch_tests.rs"]
mod tests;
