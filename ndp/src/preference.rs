// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Router preference values (RFC 4191 §2.1).

use std::fmt::{Display, Formatter};

/// A router preference as carried in the Prf bits of a Router Advertisement
/// header and of a route information option.
///
/// The wire encoding is a 2-bit two's-complement integer: high `01`,
/// medium `00`, low `11`. `10` is reserved and decodes as medium per
/// RFC 4191 §2.2.
#[cfg_attr(any(test, feature = "bolero"), derive(bolero::TypeGenerator))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RouterPreference {
    /// Prefer other routers over this one.
    Low,
    /// No particular preference.
    #[default]
    Medium,
    /// Prefer this router over others.
    High,
}

impl RouterPreference {
    /// The 2-bit wire value of this preference.
    #[must_use]
    pub const fn bits(self) -> u8 {
        match self {
            RouterPreference::High => 0b01,
            RouterPreference::Medium => 0b00,
            RouterPreference::Low => 0b11,
        }
    }

    /// Decode a 2-bit wire value. Only the two low bits of `bits` are
    /// examined; the reserved code `10` maps to medium.
    #[must_use]
    pub const fn from_bits(bits: u8) -> RouterPreference {
        match bits & 0b11 {
            0b01 => RouterPreference::High,
            0b11 => RouterPreference::Low,
            _ => RouterPreference::Medium,
        }
    }
}

impl Display for RouterPreference {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            RouterPreference::Low => write!(f, "low"),
            RouterPreference::Medium => write!(f, "medium"),
            RouterPreference::High => write!(f, "high"),
        }
    }
}
