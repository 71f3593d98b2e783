// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Cooperative shutdown plumbing.
//!
//! A single root `watch` channel carries the shutdown flag from the signal
//! handler down through the daemon, its workers, and their receiver tasks.
//! Each level owns a clone of the receiver and releases its own resources
//! when the flag flips.

use tokio::sync::watch;

/// Resolves once `rx` observes a `true` shutdown flag, or once every sender
/// has gone away (which counts as shutdown).
pub async fn cancelled(rx: &mut watch::Receiver<bool>) {
    let _ = rx.wait_for(|stop| *stop).await;
}
