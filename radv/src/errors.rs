// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Error types for the daemon core.
//!
//! Validation failures carry the offending field and the constraint class
//! that was violated so callers (and tests) can match on them; socket
//! failures classify themselves as recoverable or not, which drives the
//! worker state machine.

use std::fmt::{Display, Formatter};
use std::io;
use thiserror::Error;

/// A single configuration constraint violation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("field '{field}' failed '{tag}' validation: {message}")]
pub struct ValidationError {
    /// The configuration field that failed, by its canonical name
    /// (e.g. `RAIntervalMilliseconds`).
    pub field: &'static str,
    /// The constraint class that was violated: one of `required`, `gte`,
    /// `lte`, `ltefield`, `unique`, `cidrv6`, `ipv6`, `fqdn`, `oneof`,
    /// `eq_if`, `non_overlapping_prefix`.
    pub tag: &'static str,
    /// Human-readable description naming the offending value.
    pub message: String,
}

impl ValidationError {
    pub(crate) fn new(field: &'static str, tag: &'static str, message: String) -> ValidationError {
        ValidationError {
            field,
            tag,
            message,
        }
    }
}

/// Every constraint violation found in one validation pass over a
/// configuration. The daemon rejects the configuration as a whole; no
/// worker is disturbed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(pub Vec<ValidationError>);

impl std::error::Error for ValidationErrors {}

impl ValidationErrors {
    /// True iff no violations were recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True iff some violation matches the given field and constraint tag.
    #[must_use]
    pub fn contains(&self, field: &str, tag: &str) -> bool {
        self.0.iter().any(|e| e.field == field && e.tag == tag)
    }
}

impl Display for ValidationErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for error in &self.0 {
            if !first {
                write!(f, "; ")?;
            }
            write!(f, "{error}")?;
            first = false;
        }
        Ok(())
    }
}

/// Error returned by [`crate::Daemon::reload`].
#[derive(Debug, Error)]
pub enum ReloadError {
    /// The new configuration is invalid; the daemon keeps running with the
    /// previous one.
    #[error(transparent)]
    Validation(#[from] ValidationErrors),
    /// The caller's cancellation fired (or the daemon went away) before the
    /// reload was accepted.
    #[error("reload cancelled")]
    Cancelled,
}

/// Error returned while reading a configuration file or request body.
/// Parsing performs no validation; that happens on the defaulted copy inside
/// [`crate::Daemon::new`] and [`crate::Daemon::reload`].
#[derive(Debug, Error)]
pub enum ParseError {
    /// The file could not be read.
    #[error("cannot read config: {0}")]
    Io(#[from] io::Error),
    /// The YAML document does not match the configuration schema.
    #[error("invalid YAML config: {0}")]
    Yaml(#[from] serde_yml::Error),
    /// The JSON document does not match the configuration schema.
    #[error("invalid JSON config: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors produced by the raw ICMPv6 socket.
#[derive(Debug, Error)]
pub(crate) enum SocketError {
    /// Socket creation or setup failed.
    #[error("cannot create socket on '{interface}': {source}")]
    Open {
        /// The interface the socket was being opened on.
        interface: String,
        /// The underlying OS error.
        source: io::Error,
    },
    /// A transmit failed (including the internal 2 s write timeout).
    #[error("send failed: {0}")]
    Send(#[source] io::Error),
    /// A receive failed.
    #[error("receive failed: {0}")]
    Recv(#[source] io::Error),
    /// The operation was cancelled by shutdown.
    #[error("cancelled")]
    Cancelled,
}

impl SocketError {
    /// `EPERM` and `EINVAL` on open cannot be fixed by retrying; they stop
    /// the worker. Everything else is retried with a constant backoff.
    pub(crate) fn is_unrecoverable(&self) -> bool {
        match self {
            SocketError::Open { source, .. } => {
                matches!(source.raw_os_error(), Some(libc::EPERM | libc::EINVAL))
            }
            _ => false,
        }
    }
}

/// Errors produced while subscribing to device state.
#[derive(Debug, Error)]
pub(crate) enum DeviceError {
    /// The netlink subscription could not be established.
    #[error("netlink subscription failed: {0}")]
    Subscribe(#[source] io::Error),
}
