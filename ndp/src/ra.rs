// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Router Advertisement message type and logic (RFC 4861 §4.2).

use crate::ICMPV6_ROUTER_ADVERTISEMENT;
use crate::option::NdpOption;
use crate::preference::RouterPreference;
use crate::wire::WireError;

/// Fixed portion of an RA body: type, code, checksum, hop limit, flags,
/// router lifetime, reachable time, retransmit timer.
const RA_HEADER_LEN: usize = 16;

/// A Router Advertisement, ready to be encoded into the body of an ICMPv6
/// packet of type 134, code 0.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouterAdvertisement {
    /// Default Hop Count field for outgoing packets. Zero means unspecified
    /// by this router.
    pub cur_hop_limit: u8,
    /// M flag: addresses are available via DHCPv6.
    pub managed: bool,
    /// O flag: other configuration is available via DHCPv6.
    pub other: bool,
    /// Default router preference (RFC 4191).
    pub preference: RouterPreference,
    /// Seconds this router may serve as a default router. Zero means it is
    /// not a default router.
    pub router_lifetime: u16,
    /// Milliseconds a neighbor is assumed reachable after confirmation.
    /// Zero means unspecified.
    pub reachable_time: u32,
    /// Milliseconds between retransmitted Neighbor Solicitations.
    /// Zero means unspecified.
    pub retransmit_timer: u32,
    /// Options, emitted in order.
    pub options: Vec<NdpOption>,
}

impl RouterAdvertisement {
    /// Encode into an ICMPv6 message body. The checksum octets are left
    /// zero; the kernel computes the checksum on raw ICMPv6 sockets.
    ///
    /// Encoding is deterministic: the same message always yields the same
    /// bytes.
    ///
    /// # Errors
    ///
    /// Fails only if an option has no wire representation; see
    /// [`NdpOption::encode`].
    pub fn encode(&self) -> Result<Vec<u8>, WireError> {
        let mut buf = Vec::with_capacity(RA_HEADER_LEN + 8 * self.options.len());
        buf.push(ICMPV6_ROUTER_ADVERTISEMENT);
        buf.push(0); // code
        buf.extend_from_slice(&[0, 0]); // checksum, kernel-computed
        buf.push(self.cur_hop_limit);
        let mut flags = self.preference.bits() << 3;
        if self.managed {
            flags |= 0x80;
        }
        if self.other {
            flags |= 0x40;
        }
        buf.push(flags);
        buf.extend_from_slice(&self.router_lifetime.to_be_bytes());
        buf.extend_from_slice(&self.reachable_time.to_be_bytes());
        buf.extend_from_slice(&self.retransmit_timer.to_be_bytes());
        for option in &self.options {
            option.encode(&mut buf)?;
        }
        Ok(buf)
    }

    /// Parse an ICMPv6 message body as a Router Advertisement. The checksum
    /// octets are ignored.
    ///
    /// # Errors
    ///
    /// Fails on a truncated header, a type other than 134, a nonzero code,
    /// or a malformed option.
    pub fn parse(buf: &[u8]) -> Result<RouterAdvertisement, WireError> {
        if buf.len() < RA_HEADER_LEN {
            return Err(WireError::Truncated {
                expected: RA_HEADER_LEN,
                actual: buf.len(),
            });
        }
        if buf[0] != ICMPV6_ROUTER_ADVERTISEMENT {
            return Err(WireError::BadMessageType {
                expected: ICMPV6_ROUTER_ADVERTISEMENT,
                actual: buf[0],
            });
        }
        if buf[1] != 0 {
            return Err(WireError::BadMessageCode(buf[1]));
        }
        let flags = buf[5];
        Ok(RouterAdvertisement {
            cur_hop_limit: buf[4],
            managed: flags & 0x80 != 0,
            other: flags & 0x40 != 0,
            preference: RouterPreference::from_bits(flags >> 3),
            router_lifetime: u16::from_be_bytes([buf[6], buf[7]]),
            reachable_time: u32::from_be_bytes([buf[8], buf[9], buf[10], buf[11]]),
            retransmit_timer: u32::from_be_bytes([buf[12], buf[13], buf[14], buf[15]]),
            options: NdpOption::parse_all(&buf[RA_HEADER_LEN..])?,
        })
    }
}
