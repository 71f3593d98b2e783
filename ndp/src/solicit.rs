// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Router Solicitation message type and logic (RFC 4861 §4.1).

use crate::ICMPV6_ROUTER_SOLICITATION;
use crate::mac::Mac;
use crate::option::NdpOption;
use crate::wire::WireError;

/// Fixed portion of an RS body: type, code, checksum, reserved.
const RS_HEADER_LEN: usize = 8;

/// A Router Solicitation received from a host looking for routers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouterSolicitation {
    /// The link-layer address of the soliciting host, when it included one.
    pub source_link_layer: Option<Mac>,
}

impl RouterSolicitation {
    /// Parse an ICMPv6 message body as a Router Solicitation.
    ///
    /// Options other than the source link-layer address are ignored, as are
    /// the checksum octets.
    ///
    /// # Errors
    ///
    /// Fails on a truncated header, a type other than 133, a nonzero code,
    /// or a malformed option.
    pub fn parse(buf: &[u8]) -> Result<RouterSolicitation, WireError> {
        if buf.len() < RS_HEADER_LEN {
            return Err(WireError::Truncated {
                expected: RS_HEADER_LEN,
                actual: buf.len(),
            });
        }
        if buf[0] != ICMPV6_ROUTER_SOLICITATION {
            return Err(WireError::BadMessageType {
                expected: ICMPV6_ROUTER_SOLICITATION,
                actual: buf[0],
            });
        }
        if buf[1] != 0 {
            return Err(WireError::BadMessageCode(buf[1]));
        }
        let source_link_layer = NdpOption::parse_all(&buf[RS_HEADER_LEN..])?
            .into_iter()
            .find_map(|option| match option {
                NdpOption::SourceLinkLayerAddress(mac) => Some(mac),
                _ => None,
            });
        Ok(RouterSolicitation { source_link_layer })
    }

    /// Encode into an ICMPv6 message body, checksum octets zero.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(RS_HEADER_LEN + 8);
        buf.push(ICMPV6_ROUTER_SOLICITATION);
        buf.push(0); // code
        buf.extend_from_slice(&[0, 0]); // checksum, kernel-computed
        buf.extend_from_slice(&[0; 4]); // reserved
        if let Some(mac) = self.source_link_layer {
            // Encoding a source link-layer address option is infallible.
            let _ = NdpOption::SourceLinkLayerAddress(mac).encode(&mut buf);
        }
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_with_and_without_source_address() {
        let bare = RouterSolicitation::default();
        assert_eq!(RouterSolicitation::parse(&bare.encode()).unwrap(), bare);

        let with_mac = RouterSolicitation {
            source_link_layer: Some(Mac::new([1, 2, 3, 4, 5, 6])),
        };
        assert_eq!(
            RouterSolicitation::parse(&with_mac.encode()).unwrap(),
            with_mac
        );
    }

    #[test]
    fn parse_rejects_foreign_messages() {
        assert_eq!(
            RouterSolicitation::parse(&[134, 0, 0, 0, 0, 0, 0, 0]),
            Err(WireError::BadMessageType {
                expected: 133,
                actual: 134,
            })
        );
        assert_eq!(
            RouterSolicitation::parse(&[133, 1, 0, 0, 0, 0, 0, 0]),
            Err(WireError::BadMessageCode(1))
        );
        assert!(matches!(
            RouterSolicitation::parse(&[133, 0]),
            Err(WireError::Truncated { .. })
        ));
    }

    #[test]
    fn ignores_unknown_options() {
        let mut buf = RouterSolicitation::default().encode();
        buf.extend_from_slice(&[200, 1, 0, 0, 0, 0, 0, 0]);
        assert_eq!(
            RouterSolicitation::parse(&buf).unwrap(),
            RouterSolicitation::default()
        );
    }
}
