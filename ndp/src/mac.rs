// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Link-layer (MAC) address type used by the source link-layer address
//! option.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// A 48-bit link-layer address.
#[cfg_attr(any(test, feature = "bolero"), derive(bolero::TypeGenerator))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Mac([u8; 6]);

/// Error produced when a string does not name a MAC address.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{0}' is not a valid MAC address")]
pub struct MacParseError(pub String);

impl Mac {
    /// Build an address from its six octets.
    #[must_use]
    pub const fn new(octets: [u8; 6]) -> Mac {
        Mac(octets)
    }

    /// The six octets, in transmission order.
    #[must_use]
    pub const fn octets(self) -> [u8; 6] {
        self.0
    }

    /// Read an address from the first six bytes of `bytes`; `None` unless
    /// the slice holds exactly six.
    #[must_use]
    pub fn from_slice(bytes: &[u8]) -> Option<Mac> {
        bytes.try_into().ok().map(Mac)
    }

    /// True iff the group bit (least significant bit of the first octet)
    /// is set. A multicast address is not a legal interface address.
    #[must_use]
    pub fn is_multicast(self) -> bool {
        self.0[0] & 1 != 0
    }
}

impl FromStr for Mac {
    type Err = MacParseError;

    /// Accepts the canonical colon-separated form, `aa:bb:cc:dd:ee:ff`.
    fn from_str(s: &str) -> Result<Mac, MacParseError> {
        let bad = || MacParseError(s.to_string());
        let mut parts = s.split(':');
        let mut octets = [0u8; 6];
        for octet in &mut octets {
            let part = parts.next().ok_or_else(bad)?;
            if part.len() != 2 || !part.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(bad());
            }
            *octet = u8::from_str_radix(part, 16).map_err(|_| bad())?;
        }
        if parts.next().is_some() {
            return Err(bad());
        }
        Ok(Mac(octets))
    }
}

impl Display for Mac {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_the_canonical_form() {
        assert_eq!(
            "aa:bb:cc:dd:ee:0f".parse::<Mac>().unwrap(),
            Mac::new([0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0x0f])
        );
    }

    #[test]
    fn rejects_anything_else() {
        for bad in [
            "",
            "aa:bb:cc:dd:ee",
            "aa:bb:cc:dd:ee:ff:00",
            "aa:bb:cc:dd:ee:g0",
            "aa:bb:cc:dd:ee:+f",
            "aabb:cc:dd:ee:ff",
            "aa-bb-cc-dd-ee-ff",
        ] {
            assert!(bad.parse::<Mac>().is_err(), "{bad}");
        }
    }

    #[test]
    fn from_slice_wants_exactly_six_bytes() {
        assert_eq!(
            Mac::from_slice(&[1, 2, 3, 4, 5, 6]),
            Some(Mac::new([1, 2, 3, 4, 5, 6]))
        );
        assert_eq!(Mac::from_slice(&[1, 2, 3]), None);
        assert_eq!(Mac::from_slice(&[1, 2, 3, 4, 5, 6, 7]), None);
    }

    #[test]
    fn display_round_trips() {
        bolero::check!().with_type().for_each(|mac: &Mac| {
            assert_eq!(mac.to_string().parse::<Mac>().unwrap(), *mac);
        });
    }

    #[test]
    fn group_bit_means_multicast() {
        assert!(Mac::new([0x01, 0, 0x5e, 0, 0, 1]).is_multicast());
        assert!(!Mac::new([0x02, 0, 0, 0, 0, 1]).is_multicast());
    }
}
