// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Store access over the daemon socket
//!
//! Every request opens its own connection. A watch holds its connection open
//! until the daemon reports the deletion or the [`Watcher`] is dropped.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use latch_core::store::WatchSender;
use latch_core::{
    DeleteResponse, KeyValue, KvClient, LeaseGrant, LeaseId, RangeResponse, Revision, StoreError,
    Watcher,
};
use latch_daemon::protocol::{self, ProtocolError};
use latch_daemon::{Request, Response};
use tokio::net::UnixStream;

use crate::client::timeout_ipc;

/// [`KvClient`] backed by a running `latchd`
#[derive(Clone, Debug)]
pub struct RemoteStore {
    socket_path: PathBuf,
}

impl RemoteStore {
    pub fn new(socket_path: &Path) -> Self {
        Self {
            socket_path: socket_path.to_path_buf(),
        }
    }

    /// Open a connection and send `request` on it
    async fn open(&self, request: &Request) -> Result<UnixStream, StoreError> {
        let mut stream = UnixStream::connect(&self.socket_path)
            .await
            .map_err(|e| unavailable(ProtocolError::Io(e)))?;

        let data = protocol::encode(request).map_err(unavailable)?;
        tokio::time::timeout(timeout_ipc(), protocol::write_message(&mut stream, &data))
            .await
            .map_err(|_| unavailable(ProtocolError::Timeout))?
            .map_err(unavailable)?;

        Ok(stream)
    }

    async fn call(&self, request: Request) -> Result<Response, StoreError> {
        let mut stream = self.open(&request).await?;
        read_response(&mut stream).await
    }
}

async fn read_response(stream: &mut UnixStream) -> Result<Response, StoreError> {
    let bytes = tokio::time::timeout(timeout_ipc(), protocol::read_message(stream))
        .await
        .map_err(|_| unavailable(ProtocolError::Timeout))?
        .map_err(unavailable)?;
    let response: Response = protocol::decode(&bytes).map_err(unavailable)?;
    match response {
        Response::Failed { error } => Err(error),
        Response::Error { message } => Err(StoreError::InvalidRequest(message)),
        other => Ok(other),
    }
}

fn unavailable(err: ProtocolError) -> StoreError {
    StoreError::Unavailable(err.to_string())
}

fn unexpected(response: Response) -> StoreError {
    StoreError::InvalidRequest(format!("unexpected response: {:?}", response))
}

fn lease_grant(id: LeaseId, ttl_ms: u64) -> LeaseGrant {
    LeaseGrant {
        id,
        ttl: Duration::from_millis(ttl_ms),
    }
}

#[async_trait]
impl KvClient for RemoteStore {
    async fn grant(&self, ttl: Duration) -> Result<LeaseGrant, StoreError> {
        let ttl_ms = ttl.as_millis() as u64;
        match self.call(Request::Grant { ttl_ms }).await? {
            Response::Lease { id, ttl_ms } => Ok(lease_grant(id, ttl_ms)),
            other => Err(unexpected(other)),
        }
    }

    async fn keep_alive(&self, lease: LeaseId) -> Result<LeaseGrant, StoreError> {
        match self.call(Request::KeepAlive { lease }).await? {
            Response::Lease { id, ttl_ms } => Ok(lease_grant(id, ttl_ms)),
            other => Err(unexpected(other)),
        }
    }

    async fn revoke(&self, lease: LeaseId) -> Result<Revision, StoreError> {
        match self.call(Request::Revoke { lease }).await? {
            Response::Revoked { revision } => Ok(revision),
            other => Err(unexpected(other)),
        }
    }

    async fn create_sequential(
        &self,
        prefix: &str,
        value: &str,
        lease: LeaseId,
    ) -> Result<KeyValue, StoreError> {
        let request = Request::CreateSequential {
            prefix: prefix.to_string(),
            value: value.to_string(),
            lease,
        };
        match self.call(request).await? {
            Response::Created { kv } => Ok(kv),
            other => Err(unexpected(other)),
        }
    }

    async fn range(&self, prefix: &str) -> Result<RangeResponse, StoreError> {
        let request = Request::Range {
            prefix: prefix.to_string(),
        };
        match self.call(request).await? {
            Response::Range { revision, kvs } => Ok(RangeResponse { revision, kvs }),
            other => Err(unexpected(other)),
        }
    }

    async fn delete(&self, key: &str) -> Result<DeleteResponse, StoreError> {
        let request = Request::Delete {
            key: key.to_string(),
        };
        match self.call(request).await? {
            Response::Deleted { revision, deleted } => Ok(DeleteResponse { revision, deleted }),
            other => Err(unexpected(other)),
        }
    }

    async fn watch_delete(
        &self,
        key: &str,
        start_revision: Revision,
    ) -> Result<Watcher, StoreError> {
        let request = Request::Watch {
            key: key.to_string(),
            start_revision,
        };
        let mut stream = self.open(&request).await?;
        match read_response(&mut stream).await? {
            Response::Watching => {}
            other => return Err(unexpected(other)),
        }

        let (tx, watcher) = Watcher::channel();
        tokio::spawn(forward_watch(stream, tx, key.to_string()));
        Ok(watcher)
    }
}

/// Relay the daemon's single watch event, or drop the connection once the
/// watcher goes away
async fn forward_watch(mut stream: UnixStream, tx: WatchSender, key: String) {
    let event = tokio::select! {
        _ = tx.closed() => {
            tracing::debug!(key, "watch dropped");
            return;
        }
        read = protocol::read_message(&mut stream) => read,
    };

    let delivered = match event.and_then(|bytes| protocol::decode::<Response>(&bytes)) {
        Ok(Response::WatchEvent { event }) => Ok(event),
        Ok(Response::Failed { error }) => Err(error),
        Ok(other) => Err(unexpected(other)),
        Err(e) => {
            tracing::debug!(key, error = %e, "watch connection lost");
            Err(StoreError::WatchClosed)
        }
    };
    let _ = tx.send(delivered);
}

#[cfg(test)]
#[path = "remote_tests.rs"]
mod tests;
