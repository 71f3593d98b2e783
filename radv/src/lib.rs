// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! An IPv6 Router Advertisement daemon core.
//!
//! [`Daemon`] reconciles a validated [`Config`] against a set of
//! per-interface workers. Each worker watches its device over netlink,
//! owns one raw ICMPv6 socket, periodically multicasts unsolicited Router
//! Advertisements, and answers Router Solicitations with unicast replies.
//! The daemon is reconfigurable at runtime through [`Daemon::reload`] and
//! reports per-interface state through [`Daemon::status`].

#![deny(
    missing_docs,
    clippy::all,
    clippy::pedantic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic
)]

mod config;
mod daemon;
mod device;
mod errors;
mod socket;
mod status;
mod worker;

pub mod shutdown;

#[cfg(test)]
mod fake;

pub use config::{
    Config, DnsslConfig, InterfaceConfig, Nat64Config, Preference, PrefixConfig, RdnssConfig,
    RouteConfig,
};
pub use daemon::Daemon;
pub use errors::{ParseError, ReloadError, ValidationError, ValidationErrors};
pub use status::{InterfaceState, InterfaceStatus, Status};
