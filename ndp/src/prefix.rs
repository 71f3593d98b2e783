// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! IPv6 prefix type used by the prefix information, route information, and
//! PREF64 options.

use std::fmt::{Display, Formatter};
use std::net::Ipv6Addr;
use std::str::FromStr;

/// An IPv6 prefix: an address plus a prefix length in `0..=128`.
///
/// The address is stored as written; use [`Ipv6Prefix::network`] for the
/// canonical form with the host bits cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ipv6Prefix {
    addr: Ipv6Addr,
    len: u8,
}

/// Errors which can occur while constructing an [`Ipv6Prefix`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PrefixError {
    /// Prefix length above 128.
    #[error("prefix length /{0} is out of range [0, 128]")]
    BadLength(u8),
    /// The string was not of the form `address/length`.
    #[error("'{0}' is not a valid IPv6 prefix")]
    BadFormat(String),
}

impl Ipv6Prefix {
    /// Build a prefix from an address and a length.
    ///
    /// # Errors
    ///
    /// Fails if `len` exceeds 128.
    pub fn new(addr: Ipv6Addr, len: u8) -> Result<Ipv6Prefix, PrefixError> {
        if len > 128 {
            return Err(PrefixError::BadLength(len));
        }
        Ok(Ipv6Prefix { addr, len })
    }

    /// The prefix address as written.
    #[must_use]
    pub fn addr(&self) -> Ipv6Addr {
        self.addr
    }

    /// The prefix length in bits.
    #[must_use]
    pub fn len(&self) -> u8 {
        self.len
    }

    /// True iff the prefix length is zero (`::/0` and friends).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The prefix address with all bits past the prefix length cleared.
    #[must_use]
    pub fn network(&self) -> Ipv6Addr {
        Ipv6Addr::from(u128::from(self.addr) & self.mask())
    }

    /// Returns true iff the two prefixes share any address.
    ///
    /// Two prefixes overlap exactly when the shorter one contains the longer
    /// one, i.e. when they agree on the first `min(len, other.len)` bits.
    #[must_use]
    pub fn overlaps(&self, other: &Ipv6Prefix) -> bool {
        let common = self.len.min(other.len);
        let mask = Ipv6Prefix {
            addr: Ipv6Addr::UNSPECIFIED,
            len: common,
        }
        .mask();
        (u128::from(self.addr) & mask) == (u128::from(other.addr) & mask)
    }

    fn mask(&self) -> u128 {
        if self.len == 0 {
            0
        } else {
            u128::MAX << (128 - u32::from(self.len))
        }
    }
}

impl FromStr for Ipv6Prefix {
    type Err = PrefixError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some((addr_str, len_str)) = s.split_once('/') else {
            return Err(PrefixError::BadFormat(s.to_string()));
        };
        let addr = addr_str
            .parse::<Ipv6Addr>()
            .map_err(|_| PrefixError::BadFormat(s.to_string()))?;
        let len = len_str
            .parse::<u8>()
            .map_err(|_| PrefixError::BadFormat(s.to_string()))?;
        Ipv6Prefix::new(addr, len)
    }
}

impl Display for Ipv6Prefix {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.addr, self.len)
    }
}

#[cfg(any(test, feature = "bolero"))]
mod contract {
    use crate::prefix::Ipv6Prefix;
    use bolero::{Driver, TypeGenerator};
    use std::net::Ipv6Addr;

    impl TypeGenerator for Ipv6Prefix {
        fn generate<D: Driver>(driver: &mut D) -> Option<Self> {
            let bits = driver.gen_u128(std::ops::Bound::Unbounded, std::ops::Bound::Unbounded)?;
            let len = driver.gen_u8(std::ops::Bound::Included(&0), std::ops::Bound::Included(&128))?;
            match Ipv6Prefix::new(Ipv6Addr::from(bits), len) {
                Ok(prefix) => Some(prefix),
                Err(_) => None,
            }
        }
    }
}
