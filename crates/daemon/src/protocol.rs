// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire protocol between `latch` clients and `latchd`
//!
//! Every frame is a 4-byte big-endian length followed by a JSON document.
//! Unary requests get exactly one response on the same connection. A
//! `Watch` request keeps the connection open: the daemon answers `Watching`,
//! then sends a single `WatchEvent` (or `Failed`) once the key is gone.

use std::time::Duration;

use latch_core::{DeleteEvent, KeyValue, LeaseId, Revision, StoreError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Protocol version reported in `Hello`
pub const PROTOCOL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default timeout for reading or writing one frame
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Largest frame either side accepts
pub const MAX_FRAME: usize = 16 * 1024 * 1024;

/// Client requests
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Request {
    /// Version handshake
    Hello { version: String },
    Ping,
    /// Daemon and store counters
    Status,
    /// Stop the daemon
    Shutdown,
    Grant {
        ttl_ms: u64,
    },
    KeepAlive {
        lease: LeaseId,
    },
    Revoke {
        lease: LeaseId,
    },
    CreateSequential {
        prefix: String,
        value: String,
        lease: LeaseId,
    },
    Range {
        prefix: String,
    },
    Delete {
        key: String,
    },
    /// Stream the deletion of `key`; the connection stays open
    Watch {
        key: String,
        start_revision: Revision,
    },
}

/// Daemon responses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Response {
    Hello {
        version: String,
    },
    Pong,
    Status {
        uptime_secs: u64,
        revision: Revision,
        leases: usize,
        keys: usize,
        watches: usize,
    },
    ShuttingDown,
    Lease {
        id: LeaseId,
        ttl_ms: u64,
    },
    Revoked {
        revision: Revision,
    },
    Created {
        kv: KeyValue,
    },
    Range {
        revision: Revision,
        kvs: Vec<KeyValue>,
    },
    Deleted {
        revision: Revision,
        deleted: bool,
    },
    /// Watch registered; a `WatchEvent` follows
    Watching,
    WatchEvent {
        event: DeleteEvent,
    },
    /// The store rejected the request
    Failed {
        error: StoreError,
    },
    /// The request could not be handled at all
    Error {
        message: String,
    },
}

/// Protocol errors
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Timeout")]
    Timeout,

    #[error("Message too large: {size} bytes (max {max})")]
    MessageTooLarge { size: usize, max: usize },
}

/// Serialize a message to JSON (no length prefix)
pub fn encode<T: Serialize>(message: &T) -> Result<Vec<u8>, ProtocolError> {
    Ok(serde_json::to_vec(message)?)
}

/// Deserialize a message from JSON (no length prefix)
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ProtocolError> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Write one length-prefixed frame
pub async fn write_message<W: AsyncWrite + Unpin>(
    writer: &mut W,
    data: &[u8],
) -> Result<(), ProtocolError> {
    if data.len() > MAX_FRAME {
        return Err(ProtocolError::MessageTooLarge {
            size: data.len(),
            max: MAX_FRAME,
        });
    }
    let len = data.len() as u32;
    writer.write_all(&len.to_be_bytes()).await?;
    writer.write_all(data).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one length-prefixed frame
///
/// A clean end of stream before the length prefix is `ConnectionClosed`.
pub async fn read_message<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Vec<u8>, ProtocolError> {
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Err(ProtocolError::ConnectionClosed)
        }
        Err(e) => return Err(e.into()),
    }

    let len = u32::from_be_bytes(len_buf) as usize;
    if len > MAX_FRAME {
        return Err(ProtocolError::MessageTooLarge {
            size: len,
            max: MAX_FRAME,
        });
    }

    let mut data = vec![0u8; len];
    reader.read_exact(&mut data).await?;
    Ok(data)
}

/// Read and decode a request, giving up after `timeout`
pub async fn read_request<R: AsyncRead + Unpin>(
    reader: &mut R,
    timeout: Duration,
) -> Result<Request, ProtocolError> {
    let bytes = tokio::time::timeout(timeout, read_message(reader))
        .await
        .map_err(|_| ProtocolError::Timeout)??;
    decode(&bytes)
}

/// Encode and write a response, giving up after `timeout`
pub async fn write_response<W: AsyncWrite + Unpin>(
    writer: &mut W,
    response: &Response,
    timeout: Duration,
) -> Result<(), ProtocolError> {
    let data = encode(response)?;
    tokio::time::timeout(timeout, write_message(writer, &data))
        .await
        .map_err(|_| ProtocolError::Timeout)?
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
