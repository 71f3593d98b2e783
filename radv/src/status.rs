// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Operational status reported per interface.
//!
//! Each worker owns one [`InterfaceStatus`] behind a lock that is never held
//! across I/O, so [`crate::Daemon::status`] can observe a consistent snapshot
//! even while the worker's main loop is blocked in a syscall.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// The lifecycle state of one per-interface worker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum InterfaceState {
    /// The worker has not reached its device yet.
    #[default]
    Unknown,
    /// Advertisements are being sent.
    Running,
    /// A new configuration is being taken up.
    Reloading,
    /// A recoverable error is being retried; see the message.
    Failing,
    /// The worker has terminated; see the message for why.
    Stopped,
}

impl Display for InterfaceState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            InterfaceState::Unknown => "Unknown",
            InterfaceState::Running => "Running",
            InterfaceState::Reloading => "Reloading",
            InterfaceState::Failing => "Failing",
            InterfaceState::Stopped => "Stopped",
        };
        write!(f, "{s}")
    }
}

/// The interface-specific status of the daemon.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterfaceStatus {
    /// Interface name.
    pub name: String,
    /// Worker state.
    pub state: InterfaceState,
    /// Error message; set when the state is `Failing` or `Stopped`.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
    /// Last configuration update, in seconds since the Unix epoch.
    pub last_update: i64,
    /// Number of unicast advertisements sent in reply to solicitations.
    #[serde(rename = "txSolicitedRA")]
    pub tx_solicited_ra: u64,
    /// Number of periodic multicast advertisements sent.
    #[serde(rename = "txUnsolicitedRA")]
    pub tx_unsolicited_ra: u64,
}

/// The status of the daemon: one entry per worker, sorted by interface name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    /// Interface-specific status, ascending by name.
    pub interfaces: Vec<InterfaceStatus>,
}
