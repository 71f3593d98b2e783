// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

use thiserror::Error;

/// Errors which can occur while encoding or parsing an NDP message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WireError {
    /// The buffer ended before the fixed message header was complete.
    #[error("message truncated: need at least {expected} bytes, got {actual}")]
    Truncated {
        /// Minimum number of bytes the message requires.
        expected: usize,
        /// Number of bytes actually present.
        actual: usize,
    },
    /// The ICMPv6 type octet did not match the expected message type.
    #[error("unexpected ICMPv6 type {actual}, expected {expected}")]
    BadMessageType {
        /// The ICMPv6 type the caller asked to parse.
        expected: u8,
        /// The ICMPv6 type found on the wire.
        actual: u8,
    },
    /// The ICMPv6 code octet was not zero.
    #[error("unexpected ICMPv6 code {0}, expected 0")]
    BadMessageCode(u8),
    /// An option carried a length field of zero or ran past the buffer.
    #[error("malformed option (type {kind}) of length {length} units in {remaining} bytes")]
    BadOptionLength {
        /// Option type octet.
        kind: u8,
        /// Length field, in 8-byte units.
        length: u8,
        /// Bytes left in the buffer when the option was read.
        remaining: usize,
    },
    /// A prefix length above 128 appeared on the wire.
    #[error("prefix length /{0} is out of range [0, 128]")]
    BadPrefixLength(u8),
    /// A PREF64 option was asked to carry a prefix length with no defined
    /// prefix length code (RFC 8781 §4 admits only /96 /64 /56 /48 /40 /32).
    #[error("prefix length /{0} cannot be encoded in a PREF64 option")]
    UnsupportedPref64Length(u8),
    /// A PREF64 option carried one of the reserved prefix length codes 6
    /// and 7.
    #[error("PREF64 prefix length code {0} is reserved")]
    UnsupportedPref64Code(u8),
    /// A PREF64 lifetime above the 13-bit scaled maximum of 65528 seconds.
    #[error("PREF64 lifetime {0}s exceeds the encodable maximum of 65528s")]
    Pref64LifetimeTooLarge(u32),
    /// A DNS search list label exceeded the RFC 1035 limit of 63 octets.
    #[error("domain label '{0}' is longer than 63 octets")]
    LabelTooLong(String),
    /// A DNS search list name exceeded the RFC 1035 limit of 255 octets.
    #[error("domain name '{0}' is longer than 255 octets")]
    NameTooLong(String),
    /// An empty domain label (leading, trailing, or doubled dot).
    #[error("domain name '{0}' contains an empty label")]
    EmptyLabel(String),
}
