// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The NDP option set carried by Router Advertisements.
//!
//! Every option shares the `{type: 8, length: 8, body}` framing of
//! RFC 4861 §4.6, with the length counted in 8-byte units and covering the
//! two header octets. The option set here is closed: each variant knows how
//! to encode itself, and parsing tolerates (and preserves) unknown types.

use crate::mac::Mac;
use crate::preference::RouterPreference;
use crate::prefix::Ipv6Prefix;
use crate::wire::WireError;
use std::net::Ipv6Addr;

/// Option type of the source link-layer address option (RFC 4861 §4.6.1).
pub const OPT_SOURCE_LINK_LAYER_ADDRESS: u8 = 1;
/// Option type of the prefix information option (RFC 4861 §4.6.2).
pub const OPT_PREFIX_INFORMATION: u8 = 3;
/// Option type of the MTU option (RFC 4861 §4.6.4).
pub const OPT_MTU: u8 = 5;
/// Option type of the route information option (RFC 4191 §2.3).
pub const OPT_ROUTE_INFORMATION: u8 = 24;
/// Option type of the recursive DNS server option (RFC 6106 §5.1).
pub const OPT_RECURSIVE_DNS_SERVER: u8 = 25;
/// Option type of the DNS search list option (RFC 6106 §5.2).
pub const OPT_DNS_SEARCH_LIST: u8 = 31;
/// Option type of the PREF64 option (RFC 8781 §4).
pub const OPT_PREF64: u8 = 38;

/// A prefix advertised for on-link determination and/or stateless address
/// autoconfiguration (RFC 4861 §4.6.2).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixInformation {
    /// The advertised prefix. Bits past the prefix length are transmitted
    /// as zero regardless of how the prefix was written.
    pub prefix: Ipv6Prefix,
    /// L flag: the prefix can be used for on-link determination.
    pub on_link: bool,
    /// A flag: the prefix can be used for stateless address
    /// autoconfiguration.
    pub autonomous: bool,
    /// Seconds the prefix is valid for on-link determination.
    /// `u32::MAX` means infinity.
    pub valid_lifetime: u32,
    /// Seconds addresses generated from the prefix remain preferred.
    /// `u32::MAX` means infinity.
    pub preferred_lifetime: u32,
}

/// A route advertised as reachable through this router (RFC 4191 §2.3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteInformation {
    /// The advertised route prefix.
    pub prefix: Ipv6Prefix,
    /// Preference of this router for the advertised route.
    pub preference: RouterPreference,
    /// Seconds the route may be kept. `u32::MAX` means infinity.
    pub lifetime: u32,
}

/// Recursive DNS servers reachable on this link (RFC 6106 §5.1).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecursiveDnsServer {
    /// Seconds the servers may be used. `u32::MAX` means infinity.
    pub lifetime: u32,
    /// The server addresses.
    pub servers: Vec<Ipv6Addr>,
}

/// DNS search domains for this link (RFC 6106 §5.2).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsSearchList {
    /// Seconds the search list may be used. `u32::MAX` means infinity.
    pub lifetime: u32,
    /// The search domains, in presentation form (`example.com`).
    pub domains: Vec<String>,
}

/// A NAT64 prefix (RFC 8781 §4).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pref64 {
    /// Seconds the NAT64 prefix may be used. Encoded in units of 8 seconds;
    /// the remainder is truncated. At most 65528.
    pub lifetime: u32,
    /// The NAT64 prefix. Its length must be one of /96 /64 /56 /48 /40 /32.
    pub prefix: Ipv6Prefix,
}

/// One NDP option of a Router Advertisement, in the closed set this router
/// emits, plus a catch-all for foreign options seen while parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NdpOption {
    /// The link-layer address of the advertising interface.
    SourceLinkLayerAddress(Mac),
    /// The link MTU hosts should use.
    Mtu(u32),
    /// See [`PrefixInformation`].
    PrefixInformation(PrefixInformation),
    /// See [`RouteInformation`].
    RouteInformation(RouteInformation),
    /// See [`RecursiveDnsServer`].
    RecursiveDnsServer(RecursiveDnsServer),
    /// See [`DnsSearchList`].
    DnsSearchList(DnsSearchList),
    /// See [`Pref64`].
    Pref64(Pref64),
    /// An option type this crate does not interpret. `body` excludes the two
    /// header octets but includes any padding.
    Unknown {
        /// The option type octet.
        kind: u8,
        /// The option body, `8 * length - 2` octets.
        body: Vec<u8>,
    },
}

impl NdpOption {
    /// Append the wire form of this option to `buf`.
    ///
    /// # Errors
    ///
    /// Fails on values with no wire representation: oversized DNS labels or
    /// names, or a PREF64 prefix length / lifetime outside what RFC 8781 can
    /// encode. A validated configuration never produces these.
    pub fn encode(&self, buf: &mut Vec<u8>) -> Result<(), WireError> {
        match self {
            NdpOption::SourceLinkLayerAddress(mac) => {
                buf.push(OPT_SOURCE_LINK_LAYER_ADDRESS);
                buf.push(1);
                buf.extend_from_slice(&mac.octets());
            }
            NdpOption::Mtu(mtu) => {
                buf.push(OPT_MTU);
                buf.push(1);
                buf.extend_from_slice(&[0, 0]);
                buf.extend_from_slice(&mtu.to_be_bytes());
            }
            NdpOption::PrefixInformation(info) => {
                buf.push(OPT_PREFIX_INFORMATION);
                buf.push(4);
                buf.push(info.prefix.len());
                let mut flags = 0u8;
                if info.on_link {
                    flags |= 0x80;
                }
                if info.autonomous {
                    flags |= 0x40;
                }
                buf.push(flags);
                buf.extend_from_slice(&info.valid_lifetime.to_be_bytes());
                buf.extend_from_slice(&info.preferred_lifetime.to_be_bytes());
                buf.extend_from_slice(&[0; 4]);
                buf.extend_from_slice(&info.prefix.network().octets());
            }
            NdpOption::RouteInformation(route) => {
                // The prefix field is 0, 8, or 16 octets, the shortest that
                // still holds the prefix length.
                let prefix_octets = usize::from(route.prefix.len().div_ceil(64)) * 8;
                buf.push(OPT_ROUTE_INFORMATION);
                #[allow(clippy::cast_possible_truncation)] // at most 3
                buf.push(1 + (prefix_octets / 8) as u8);
                buf.push(route.prefix.len());
                buf.push(route.preference.bits() << 3);
                buf.extend_from_slice(&route.lifetime.to_be_bytes());
                buf.extend_from_slice(&route.prefix.network().octets()[..prefix_octets]);
            }
            NdpOption::RecursiveDnsServer(rdnss) => {
                buf.push(OPT_RECURSIVE_DNS_SERVER);
                #[allow(clippy::cast_possible_truncation)] // server count is validated small
                buf.push(1 + 2 * rdnss.servers.len() as u8);
                buf.extend_from_slice(&[0, 0]);
                buf.extend_from_slice(&rdnss.lifetime.to_be_bytes());
                for server in &rdnss.servers {
                    buf.extend_from_slice(&server.octets());
                }
            }
            NdpOption::DnsSearchList(dnssl) => {
                let mut names = Vec::new();
                for domain in &dnssl.domains {
                    encode_domain(domain, &mut names)?;
                }
                let padded = names.len().next_multiple_of(8);
                names.resize(padded, 0);
                buf.push(OPT_DNS_SEARCH_LIST);
                #[allow(clippy::cast_possible_truncation)] // name lengths are validated small
                buf.push(1 + (padded / 8) as u8);
                buf.extend_from_slice(&[0, 0]);
                buf.extend_from_slice(&dnssl.lifetime.to_be_bytes());
                buf.extend_from_slice(&names);
            }
            NdpOption::Pref64(pref64) => {
                if pref64.lifetime > 65528 {
                    return Err(WireError::Pref64LifetimeTooLarge(pref64.lifetime));
                }
                let plc = match pref64.prefix.len() {
                    96 => 0u16,
                    64 => 1,
                    56 => 2,
                    48 => 3,
                    40 => 4,
                    32 => 5,
                    other => return Err(WireError::UnsupportedPref64Length(other)),
                };
                #[allow(clippy::cast_possible_truncation)] // bounded by the check above
                let scaled = ((pref64.lifetime as u16 / 8) << 3) | plc;
                buf.push(OPT_PREF64);
                buf.push(2);
                buf.extend_from_slice(&scaled.to_be_bytes());
                buf.extend_from_slice(&pref64.prefix.network().octets()[..12]);
            }
            NdpOption::Unknown { kind, body } => {
                buf.push(*kind);
                #[allow(clippy::cast_possible_truncation)] // parser bounds the body
                buf.push(((body.len() + 2) / 8) as u8);
                buf.extend_from_slice(body);
            }
        }
        Ok(())
    }

    /// Parse every option in `buf` (the tail of an NDP message).
    ///
    /// # Errors
    ///
    /// Fails on a zero-length option, an option running past the buffer, or
    /// a known option with a malformed body.
    pub fn parse_all(mut buf: &[u8]) -> Result<Vec<NdpOption>, WireError> {
        let mut options = Vec::new();
        while !buf.is_empty() {
            if buf.len() < 2 {
                return Err(WireError::Truncated {
                    expected: 2,
                    actual: buf.len(),
                });
            }
            let kind = buf[0];
            let length = buf[1];
            let total = usize::from(length) * 8;
            if length == 0 || total > buf.len() {
                return Err(WireError::BadOptionLength {
                    kind,
                    length,
                    remaining: buf.len(),
                });
            }
            options.push(NdpOption::parse_one(kind, length, &buf[2..total])?);
            buf = &buf[total..];
        }
        Ok(options)
    }

    fn parse_one(kind: u8, length: u8, body: &[u8]) -> Result<NdpOption, WireError> {
        let malformed = || WireError::BadOptionLength {
            kind,
            length,
            remaining: body.len() + 2,
        };
        match kind {
            OPT_SOURCE_LINK_LAYER_ADDRESS => {
                let mac = Mac::from_slice(body.get(..6).ok_or_else(malformed)?)
                    .ok_or_else(malformed)?;
                Ok(NdpOption::SourceLinkLayerAddress(mac))
            }
            OPT_MTU if length == 1 => Ok(NdpOption::Mtu(u32::from_be_bytes(
                body[2..6].try_into().map_err(|_| malformed())?,
            ))),
            OPT_PREFIX_INFORMATION if length == 4 => {
                let prefix_len = body[0];
                let flags = body[1];
                let addr = Ipv6Addr::from(
                    <[u8; 16]>::try_from(&body[14..30]).map_err(|_| malformed())?,
                );
                Ok(NdpOption::PrefixInformation(PrefixInformation {
                    prefix: Ipv6Prefix::new(addr, prefix_len)
                        .map_err(|_| WireError::BadPrefixLength(prefix_len))?,
                    on_link: flags & 0x80 != 0,
                    autonomous: flags & 0x40 != 0,
                    valid_lifetime: u32::from_be_bytes(
                        body[2..6].try_into().map_err(|_| malformed())?,
                    ),
                    preferred_lifetime: u32::from_be_bytes(
                        body[6..10].try_into().map_err(|_| malformed())?,
                    ),
                }))
            }
            OPT_ROUTE_INFORMATION if (1..=3).contains(&length) => {
                let prefix_len = body[0];
                let preference = RouterPreference::from_bits(body[1] >> 3);
                let lifetime =
                    u32::from_be_bytes(body[2..6].try_into().map_err(|_| malformed())?);
                let mut octets = [0u8; 16];
                let prefix_octets = &body[6..];
                if prefix_octets.len() < usize::from(prefix_len.div_ceil(64)) * 8 {
                    return Err(malformed());
                }
                octets[..prefix_octets.len()].copy_from_slice(prefix_octets);
                Ok(NdpOption::RouteInformation(RouteInformation {
                    prefix: Ipv6Prefix::new(Ipv6Addr::from(octets), prefix_len)
                        .map_err(|_| WireError::BadPrefixLength(prefix_len))?,
                    preference,
                    lifetime,
                }))
            }
            OPT_RECURSIVE_DNS_SERVER if length >= 3 && length % 2 == 1 => {
                let lifetime =
                    u32::from_be_bytes(body[2..6].try_into().map_err(|_| malformed())?);
                let servers = body[6..]
                    .chunks_exact(16)
                    .map(|chunk| {
                        <[u8; 16]>::try_from(chunk)
                            .map(Ipv6Addr::from)
                            .map_err(|_| malformed())
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(NdpOption::RecursiveDnsServer(RecursiveDnsServer {
                    lifetime,
                    servers,
                }))
            }
            OPT_DNS_SEARCH_LIST if length >= 2 => {
                let lifetime =
                    u32::from_be_bytes(body[2..6].try_into().map_err(|_| malformed())?);
                Ok(NdpOption::DnsSearchList(DnsSearchList {
                    lifetime,
                    domains: parse_domains(&body[6..]).ok_or_else(malformed)?,
                }))
            }
            OPT_PREF64 if length == 2 => {
                let scaled = u16::from_be_bytes(body[0..2].try_into().map_err(|_| malformed())?);
                let prefix_len = match scaled & 0b111 {
                    0 => 96,
                    1 => 64,
                    2 => 56,
                    3 => 48,
                    4 => 40,
                    5 => 32,
                    other => {
                        #[allow(clippy::cast_possible_truncation)] // three bits
                        return Err(WireError::UnsupportedPref64Code(other as u8));
                    }
                };
                let mut octets = [0u8; 16];
                octets[..12].copy_from_slice(&body[2..14]);
                Ok(NdpOption::Pref64(Pref64 {
                    lifetime: u32::from(scaled >> 3) * 8,
                    prefix: Ipv6Prefix::new(Ipv6Addr::from(octets), prefix_len)
                        .map_err(|_| WireError::BadPrefixLength(prefix_len))?,
                }))
            }
            _ => Ok(NdpOption::Unknown {
                kind,
                body: body.to_vec(),
            }),
        }
    }
}

/// Append the RFC 1035 label form of `domain` (length-prefixed labels,
/// null-terminated) to `buf`.
fn encode_domain(domain: &str, buf: &mut Vec<u8>) -> Result<(), WireError> {
    let start = buf.len();
    for label in domain.split('.') {
        if label.is_empty() {
            return Err(WireError::EmptyLabel(domain.to_string()));
        }
        if label.len() > 63 {
            return Err(WireError::LabelTooLong(label.to_string()));
        }
        #[allow(clippy::cast_possible_truncation)] // bounded by the check above
        buf.push(label.len() as u8);
        buf.extend_from_slice(label.as_bytes());
    }
    buf.push(0);
    if buf.len() - start > 255 {
        return Err(WireError::NameTooLong(domain.to_string()));
    }
    Ok(())
}

/// Decode a run of RFC 1035 names followed by zero padding. Returns `None`
/// on a label running past the buffer.
fn parse_domains(mut buf: &[u8]) -> Option<Vec<String>> {
    let mut domains = Vec::new();
    let mut labels: Vec<String> = Vec::new();
    while let Some((&len, rest)) = buf.split_first() {
        if len == 0 {
            if !labels.is_empty() {
                domains.push(labels.join("."));
                labels.clear();
            }
            buf = rest;
            continue;
        }
        let label = rest.get(..usize::from(len))?;
        labels.push(String::from_utf8_lossy(label).into_owned());
        buf = &rest[usize::from(len)..];
    }
    if labels.is_empty() { Some(domains) } else { None }
}
