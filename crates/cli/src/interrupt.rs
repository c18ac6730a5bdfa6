// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! SIGINT/SIGTERM as an awaitable flag

use tokio::sync::watch;

/// Set once the process is asked to stop
///
/// Only one may be installed per process.
#[derive(Clone)]
pub struct Interrupt {
    fired: watch::Receiver<bool>,
}

impl Interrupt {
    pub fn install() -> Result<Self, ctrlc::Error> {
        let (tx, interrupt) = Self::channel();
        ctrlc::set_handler(move || {
            tracing::debug!("interrupt received");
            tx.send_replace(true);
        })?;
        Ok(interrupt)
    }

    /// An interrupt fired by sending `true`
    pub fn channel() -> (watch::Sender<bool>, Self) {
        let (tx, rx) = watch::channel(false);
        (tx, Self { fired: rx })
    }

    /// Whether a signal has arrived
    pub fn fired(&self) -> bool {
        *self.fired.borrow()
    }

    /// Resolves once a signal arrives
    pub async fn recv(&self) {
        let mut rx = self.fired.clone();
        let _ = rx.wait_for(|fired| *fired).await;
    }
}
