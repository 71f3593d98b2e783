// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Wire codec for the IPv6 Neighbor Discovery messages a router emits and
//! consumes: Router Advertisement serialization, Router Solicitation parsing,
//! and the NDP option set (RFC 4861, RFC 4191, RFC 6106, RFC 8781).
//!
//! This crate is pure data: no sockets, no I/O. The ICMPv6 checksum field is
//! always written as zero because the kernel fills it in on raw ICMPv6
//! sockets.

#![deny(
    unsafe_code,
    missing_docs,
    clippy::all,
    clippy::pedantic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic
)]

pub mod mac;
pub mod option;
pub mod preference;
pub mod prefix;
pub mod ra;
pub mod solicit;

mod wire;

pub use wire::WireError;

/// ICMPv6 message type of a Router Solicitation (RFC 4861 §4.1).
pub const ICMPV6_ROUTER_SOLICITATION: u8 = 133;

/// ICMPv6 message type of a Router Advertisement (RFC 4861 §4.2).
pub const ICMPV6_ROUTER_ADVERTISEMENT: u8 = 134;
