// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Socket server and connection handling.

use std::sync::Arc;
use std::time::{Duration, Instant};

use latch_core::{KvClient, MemoryStore, StoreError, SystemClock, TracedClient};
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::UnixStream;
use tokio::sync::Notify;
use tracing::{debug, error};

use crate::lifecycle::DaemonState;
use crate::protocol::{self, Request, Response, DEFAULT_TIMEOUT, PROTOCOL_VERSION};

/// What every connection task needs from the daemon
#[derive(Clone)]
pub struct ServerContext {
    pub store: TracedClient<MemoryStore<SystemClock>>,
    pub start_time: Instant,
    pub shutdown: Arc<Notify>,
}

impl ServerContext {
    pub fn new(daemon: &DaemonState) -> Self {
        Self {
            store: TracedClient::new(daemon.store.clone()),
            start_time: daemon.start_time,
            shutdown: Arc::clone(&daemon.shutdown),
        }
    }

    /// Context serving `store` outside a full daemon
    pub fn for_store(store: MemoryStore<SystemClock>) -> Self {
        Self {
            store: TracedClient::new(store),
            start_time: Instant::now(),
            shutdown: Arc::new(Notify::new()),
        }
    }
}

/// Serve one client connection to completion
pub async fn handle_connection(ctx: ServerContext, stream: UnixStream) -> Result<(), ServerError> {
    let (mut reader, mut writer) = stream.into_split();

    let request = match protocol::read_request(&mut reader, DEFAULT_TIMEOUT).await {
        Ok(req) => req,
        Err(protocol::ProtocolError::Timeout) => {
            error!("Request read timeout");
            return Err(ServerError::Timeout);
        }
        Err(protocol::ProtocolError::ConnectionClosed) => {
            debug!("Client disconnected before sending request");
            return Ok(());
        }
        Err(e) => {
            error!("Failed to read request: {}", e);
            return Err(ServerError::Protocol(e));
        }
    };

    debug!("Received request: {:?}", request);

    if let Request::Watch {
        key,
        start_revision,
    } = request
    {
        return serve_watch(&ctx, &key, start_revision, reader, writer).await;
    }

    let response = handle_request(&ctx, request).await;

    debug!("Sending response: {:?}", response);

    protocol::write_response(&mut writer, &response, DEFAULT_TIMEOUT)
        .await
        .map_err(ServerError::Protocol)?;

    Ok(())
}

/// Handle a single unary request and return a response
async fn handle_request(ctx: &ServerContext, request: Request) -> Response {
    match request {
        Request::Ping => Response::Pong,

        Request::Hello { version: _ } => Response::Hello {
            version: PROTOCOL_VERSION.to_string(),
        },

        Request::Status => {
            let store = ctx.store.inner();
            let status = store.status();
            Response::Status {
                uptime_secs: ctx.start_time.elapsed().as_secs(),
                revision: status.revision,
                leases: status.leases,
                keys: status.keys,
                watches: store.watch_count(),
            }
        }

        Request::Shutdown => {
            ctx.shutdown.notify_one();
            Response::ShuttingDown
        }

        Request::Grant { ttl_ms } => match ctx.store.grant(Duration::from_millis(ttl_ms)).await {
            Ok(grant) => Response::Lease {
                id: grant.id,
                ttl_ms: grant.ttl.as_millis() as u64,
            },
            Err(error) => Response::Failed { error },
        },

        Request::KeepAlive { lease } => match ctx.store.keep_alive(lease).await {
            Ok(grant) => Response::Lease {
                id: grant.id,
                ttl_ms: grant.ttl.as_millis() as u64,
            },
            Err(error) => Response::Failed { error },
        },

        Request::Revoke { lease } => match ctx.store.revoke(lease).await {
            Ok(revision) => Response::Revoked { revision },
            Err(error) => Response::Failed { error },
        },

        Request::CreateSequential {
            prefix,
            value,
            lease,
        } => match ctx.store.create_sequential(&prefix, &value, lease).await {
            Ok(kv) => Response::Created { kv },
            Err(error) => Response::Failed { error },
        },

        Request::Range { prefix } => match ctx.store.range(&prefix).await {
            Ok(range) => Response::Range {
                revision: range.revision,
                kvs: range.kvs,
            },
            Err(error) => Response::Failed { error },
        },

        Request::Delete { key } => match ctx.store.delete(&key).await {
            Ok(r) => Response::Deleted {
                revision: r.revision,
                deleted: r.deleted,
            },
            Err(error) => Response::Failed { error },
        },

        Request::Watch { .. } => Response::Error {
            message: "watch requires a streaming connection".to_string(),
        },
    }
}

/// Hold the connection open until the watched key is deleted
///
/// The client closing its end cancels the watch.
async fn serve_watch(
    ctx: &ServerContext,
    key: &str,
    start_revision: latch_core::Revision,
    mut reader: OwnedReadHalf,
    mut writer: OwnedWriteHalf,
) -> Result<(), ServerError> {
    let mut watcher = match ctx.store.watch_delete(key, start_revision).await {
        Ok(watcher) => watcher,
        Err(error) => {
            protocol::write_response(&mut writer, &Response::Failed { error }, DEFAULT_TIMEOUT)
                .await?;
            return Ok(());
        }
    };
    protocol::write_response(&mut writer, &Response::Watching, DEFAULT_TIMEOUT).await?;

    let response = tokio::select! {
        event = watcher.next() => match event {
            Some(Ok(event)) => Response::WatchEvent { event },
            Some(Err(error)) => Response::Failed { error },
            None => Response::Failed { error: StoreError::WatchClosed },
        },
        closed = protocol::read_message(&mut reader) => {
            // Clients never send after Watch; anything here ends the watch
            debug!(key, ?closed, "watch cancelled by client");
            return Ok(());
        }
    };

    debug!(key, "Sending watch response: {:?}", response);
    protocol::write_response(&mut writer, &response, DEFAULT_TIMEOUT).await?;
    Ok(())
}

/// Server errors
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Protocol error: {0}")]
    Protocol(#[from] protocol::ProtocolError),

    #[error("Request timeout")]
    Timeout,
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;
