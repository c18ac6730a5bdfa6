//! latch-daemon: the store server behind `latch`
//!
//! Exposes the wire protocol so clients can speak it, plus the lifecycle and
//! connection handling the `latchd` binary is built from.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod lifecycle;
pub mod protocol;
pub mod server;

pub use lifecycle::{default_endpoint, Config, LifecycleError};
pub use protocol::{ProtocolError, Request, Response};
