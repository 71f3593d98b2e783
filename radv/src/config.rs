// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The external configuration surface of the daemon.
//!
//! The serialized form (YAML or JSON, camelCase, unknown fields rejected)
//! maps one-to-one onto these types. Parsing applies no defaults and no
//! validation; both happen in [`Config::default_and_validate`], which works
//! on a copy so the caller's struct is never mutated. Fields where zero is
//! meaningful but distinct from "unset" (the prefix lifetimes, the NAT64
//! lifetime) are options so defaulting can tell the two apart.

use crate::errors::{ValidationError, ValidationErrors};
use crate::ParseError;
use ndp::prefix::Ipv6Prefix;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{Display, Formatter};
use std::io::Read;
use std::net::Ipv6Addr;
use std::path::Path;

/// Default interval between unsolicited RAs, in milliseconds (10 minutes).
pub const DEFAULT_RA_INTERVAL_MS: u64 = 600_000;
/// Lowest accepted RA interval. Intentionally below the RFC 4861 floor of
/// 3000 ms so tests and fast-converging deployments can go quicker.
const MIN_RA_INTERVAL_MS: u64 = 70;
/// Highest accepted RA interval, per RFC 4861.
const MAX_RA_INTERVAL_MS: u64 = 1_800_000;
/// Default prefix valid lifetime, in seconds (30 days).
pub const DEFAULT_VALID_LIFETIME_SECS: u32 = 2_592_000;
/// Default prefix preferred lifetime, in seconds (7 days).
pub const DEFAULT_PREFERRED_LIFETIME_SECS: u32 = 604_800;
/// Default NAT64 prefix lifetime, in seconds (3 x the default maximum RA
/// interval, per RFC 8781 §4.1).
pub const DEFAULT_NAT64_LIFETIME_SECS: u32 = 1800;
/// Highest NAT64 lifetime the scaled wire encoding can carry.
const MAX_NAT64_LIFETIME_SECS: u32 = 65_528;
/// The NAT64 prefix lengths RFC 8781 can encode.
const NAT64_PREFIX_LENGTHS: [u8; 6] = [96, 64, 56, 48, 40, 32];

/// The configuration of the daemon: one entry per advertising interface.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Interface-specific configuration. Names must be unique within the
    /// list.
    #[serde(default)]
    pub interfaces: Vec<InterfaceConfig>,
}

/// Interface-specific configuration parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct InterfaceConfig {
    /// Network interface name. Must be unique within the configuration.
    #[serde(default)]
    pub name: String,

    /// Interval between unsolicited RAs, in milliseconds. Must be within
    /// [70, 1800000].
    #[serde(default = "default_ra_interval")]
    pub ra_interval_milliseconds: u64,

    /// Value for the Cur Hop Limit field. Zero means unspecified by this
    /// router.
    #[serde(default)]
    pub current_hop_limit: u8,

    /// M (Managed address configuration) flag: addresses are available via
    /// DHCPv6.
    #[serde(default)]
    pub managed: bool,

    /// O (Other configuration) flag: other configuration is available via
    /// DHCPv6.
    #[serde(default)]
    pub other: bool,

    /// Default router preference. Must be medium when
    /// `router_lifetime_seconds` is zero (RFC 4191 §2.2).
    #[serde(default)]
    pub preference: Preference,

    /// Seconds this router may serve as a default router. Zero means it is
    /// not a default router.
    #[serde(default)]
    pub router_lifetime_seconds: u16,

    /// Value for the Reachable Time field, in milliseconds. Zero means
    /// unspecified.
    #[serde(default)]
    pub reachable_time_milliseconds: u32,

    /// Value for the Retrans Timer field, in milliseconds. Zero means
    /// unspecified.
    #[serde(default)]
    pub retransmit_time_milliseconds: u32,

    /// Link MTU to advertise. Zero suppresses the MTU option.
    #[serde(default)]
    pub mtu: u32,

    /// Prefix information options. Prefixes must be pairwise
    /// non-overlapping.
    #[serde(default)]
    pub prefixes: Vec<PrefixConfig>,

    /// Route information options. Prefix values must be unique.
    #[serde(default)]
    pub routes: Vec<RouteConfig>,

    /// Recursive DNS server options.
    #[serde(default)]
    pub rdnsses: Vec<RdnssConfig>,

    /// DNS search list options.
    #[serde(default)]
    pub dnssls: Vec<DnsslConfig>,

    /// PREF64 (NAT64 prefix) options.
    #[serde(default)]
    pub nat64_prefixes: Vec<Nat64Config>,
}

impl Default for InterfaceConfig {
    fn default() -> InterfaceConfig {
        InterfaceConfig {
            name: String::new(),
            ra_interval_milliseconds: DEFAULT_RA_INTERVAL_MS,
            current_hop_limit: 0,
            managed: false,
            other: false,
            preference: Preference::Medium,
            router_lifetime_seconds: 0,
            reachable_time_milliseconds: 0,
            retransmit_time_milliseconds: 0,
            mtu: 0,
            prefixes: Vec::new(),
            routes: Vec::new(),
            rdnsses: Vec::new(),
            dnssls: Vec::new(),
            nat64_prefixes: Vec::new(),
        }
    }
}

fn default_ra_interval() -> u64 {
    DEFAULT_RA_INTERVAL_MS
}

/// Prefix-specific configuration parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PrefixConfig {
    /// The prefix, as an IPv6 CIDR string.
    #[serde(default)]
    pub prefix: String,

    /// L (On-Link) flag: the prefix can be used for on-link determination.
    #[serde(default)]
    pub on_link: bool,

    /// A (Autonomous) flag: the prefix can be used for stateless address
    /// autoconfiguration.
    #[serde(default)]
    pub autonomous: bool,

    /// Valid lifetime in seconds. `4294967295` means infinity. Unset means
    /// 2592000 (30 days). Must be >= the preferred lifetime.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_lifetime_seconds: Option<u32>,

    /// Preferred lifetime in seconds. `4294967295` means infinity. Unset
    /// means 604800 (7 days). Must be <= the valid lifetime.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_lifetime_seconds: Option<u32>,
}

/// Route-specific configuration parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RouteConfig {
    /// The route prefix, as an IPv6 CIDR string. Must be unique within the
    /// interface.
    #[serde(default)]
    pub prefix: String,

    /// Route lifetime in seconds. `4294967295` means infinity.
    #[serde(default)]
    pub lifetime_seconds: u32,

    /// Route preference (RFC 4191).
    #[serde(default)]
    pub preference: Preference,
}

/// Recursive DNS server configuration parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RdnssConfig {
    /// Seconds the servers may be used.
    #[serde(default)]
    pub lifetime_seconds: u32,

    /// The server addresses. Must not be empty.
    #[serde(default)]
    pub addresses: Vec<String>,
}

/// DNS search list configuration parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DnsslConfig {
    /// Seconds the search domains may be used.
    #[serde(default)]
    pub lifetime_seconds: u32,

    /// The search domains. Must not be empty.
    #[serde(default)]
    pub domain_names: Vec<String>,
}

/// NAT64 prefix configuration parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Nat64Config {
    /// Seconds the NAT64 prefix may be used. At most 65528. Unset means
    /// 1800.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lifetime_seconds: Option<u32>,

    /// The NAT64 prefix, as an IPv6 CIDR string. Its length must be one of
    /// /96 /64 /56 /48 /40 /32.
    #[serde(default)]
    pub prefix: String,
}

/// A router preference as it appears in the configuration.
///
/// Unrecognized strings deserialize to [`Preference::Unknown`], which
/// validation rejects; the wire layer maps it to medium with a warning as a
/// backstop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Preference {
    /// Prefer other routers over this one.
    Low,
    /// No particular preference.
    #[default]
    Medium,
    /// Prefer this router over others.
    High,
    /// Any string other than `low`, `medium`, or `high`.
    Unknown,
}

impl Display for Preference {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Preference::Low => "low",
            Preference::Medium => "medium",
            Preference::High => "high",
            Preference::Unknown => "unknown",
        };
        write!(f, "{s}")
    }
}

impl Serialize for Preference {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Preference {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Preference, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(match s.as_str() {
            "low" => Preference::Low,
            "medium" => Preference::Medium,
            "high" => Preference::High,
            _ => Preference::Unknown,
        })
    }
}

impl Config {
    /// Parse a YAML-encoded configuration. No validation is performed.
    ///
    /// # Errors
    ///
    /// Fails if the document does not match the schema.
    pub fn from_yaml_reader(reader: impl Read) -> Result<Config, ParseError> {
        Ok(serde_yml::from_reader(reader)?)
    }

    /// Parse a JSON-encoded configuration. No validation is performed.
    ///
    /// # Errors
    ///
    /// Fails if the document does not match the schema.
    pub fn from_json_str(body: &str) -> Result<Config, ParseError> {
        Ok(serde_json::from_str(body)?)
    }

    /// Parse a YAML-encoded configuration file. No validation is performed.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or does not match the schema.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Config, ParseError> {
        let file = std::fs::File::open(path)?;
        Config::from_yaml_reader(std::io::BufReader::new(file))
    }

    /// Produce a defaulted, validated copy of this configuration. The
    /// receiver is left untouched.
    ///
    /// # Errors
    ///
    /// Returns every constraint violation found, not just the first.
    pub fn default_and_validate(&self) -> Result<Config, ValidationErrors> {
        let mut config = self.clone();
        config.apply_defaults();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }

    fn apply_defaults(&mut self) {
        for interface in &mut self.interfaces {
            for prefix in &mut interface.prefixes {
                prefix
                    .valid_lifetime_seconds
                    .get_or_insert(DEFAULT_VALID_LIFETIME_SECS);
                prefix
                    .preferred_lifetime_seconds
                    .get_or_insert(DEFAULT_PREFERRED_LIFETIME_SECS);
            }
            for nat64 in &mut interface.nat64_prefixes {
                nat64
                    .lifetime_seconds
                    .get_or_insert(DEFAULT_NAT64_LIFETIME_SECS);
            }
        }
    }

    fn validate(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::default();
        let mut seen_names: Vec<&str> = Vec::new();
        for interface in &self.interfaces {
            if seen_names.contains(&interface.name.as_str()) {
                errors.0.push(ValidationError::new(
                    "Name",
                    "unique",
                    format!("interface name '{}' appears more than once", interface.name),
                ));
            }
            seen_names.push(&interface.name);
            interface.validate(&mut errors);
        }
        errors
    }
}

impl InterfaceConfig {
    fn validate(&self, errors: &mut ValidationErrors) {
        let push = |errors: &mut ValidationErrors, field, tag, message| {
            errors.0.push(ValidationError::new(field, tag, message));
        };

        if self.name.is_empty() {
            push(
                errors,
                "Name",
                "required",
                "interface name must not be empty".to_string(),
            );
        }
        if self.ra_interval_milliseconds < MIN_RA_INTERVAL_MS {
            push(
                errors,
                "RAIntervalMilliseconds",
                "gte",
                format!(
                    "interface '{}': interval {}ms is below the minimum {}ms",
                    self.name, self.ra_interval_milliseconds, MIN_RA_INTERVAL_MS
                ),
            );
        }
        if self.ra_interval_milliseconds > MAX_RA_INTERVAL_MS {
            push(
                errors,
                "RAIntervalMilliseconds",
                "lte",
                format!(
                    "interface '{}': interval {}ms is above the maximum {}ms",
                    self.name, self.ra_interval_milliseconds, MAX_RA_INTERVAL_MS
                ),
            );
        }
        if self.preference == Preference::Unknown {
            push(
                errors,
                "Preference",
                "oneof",
                format!(
                    "interface '{}': preference must be one of low, medium, high",
                    self.name
                ),
            );
        }
        if self.router_lifetime_seconds == 0 && self.preference != Preference::Medium {
            push(
                errors,
                "Preference",
                "eq_if",
                format!(
                    "interface '{}': preference must be medium when routerLifetimeSeconds is 0",
                    self.name
                ),
            );
        }

        let mut parsed_prefixes: Vec<Ipv6Prefix> = Vec::new();
        for prefix in &self.prefixes {
            match prefix.prefix.parse::<Ipv6Prefix>() {
                Ok(parsed) => parsed_prefixes.push(parsed),
                Err(_) => push(
                    errors,
                    "Prefix",
                    "cidrv6",
                    format!(
                        "interface '{}': '{}' is not a valid IPv6 prefix",
                        self.name, prefix.prefix
                    ),
                ),
            }
            let valid = prefix
                .valid_lifetime_seconds
                .unwrap_or(DEFAULT_VALID_LIFETIME_SECS);
            let preferred = prefix
                .preferred_lifetime_seconds
                .unwrap_or(DEFAULT_PREFERRED_LIFETIME_SECS);
            if preferred > valid {
                push(
                    errors,
                    "PreferredLifetimeSeconds",
                    "ltefield",
                    format!(
                        "interface '{}', prefix '{}': preferred lifetime {preferred}s exceeds valid lifetime {valid}s",
                        self.name, prefix.prefix
                    ),
                );
            }
        }
        for (i, p0) in parsed_prefixes.iter().enumerate() {
            if parsed_prefixes[..i].iter().any(|p1| p0.overlaps(p1)) {
                push(
                    errors,
                    "Prefixes",
                    "non_overlapping_prefix",
                    format!(
                        "interface '{}': prefix '{p0}' overlaps another configured prefix",
                        self.name
                    ),
                );
            }
        }

        let mut seen_routes: Vec<&str> = Vec::new();
        for route in &self.routes {
            if route.prefix.parse::<Ipv6Prefix>().is_err() {
                push(
                    errors,
                    "Prefix",
                    "cidrv6",
                    format!(
                        "interface '{}': route prefix '{}' is not a valid IPv6 prefix",
                        self.name, route.prefix
                    ),
                );
            }
            if seen_routes.contains(&route.prefix.as_str()) {
                push(
                    errors,
                    "Routes",
                    "unique",
                    format!(
                        "interface '{}': route prefix '{}' appears more than once",
                        self.name, route.prefix
                    ),
                );
            }
            seen_routes.push(&route.prefix);
            if route.preference == Preference::Unknown {
                push(
                    errors,
                    "Preference",
                    "oneof",
                    format!(
                        "interface '{}', route '{}': preference must be one of low, medium, high",
                        self.name, route.prefix
                    ),
                );
            }
        }

        for rdnss in &self.rdnsses {
            if rdnss.addresses.is_empty() {
                push(
                    errors,
                    "Addresses",
                    "required",
                    format!("interface '{}': rdnss needs at least one address", self.name),
                );
            }
            for address in &rdnss.addresses {
                if address.parse::<Ipv6Addr>().is_err() {
                    push(
                        errors,
                        "Addresses",
                        "ipv6",
                        format!(
                            "interface '{}': '{address}' is not a valid IPv6 address",
                            self.name
                        ),
                    );
                }
            }
        }

        for dnssl in &self.dnssls {
            if dnssl.domain_names.is_empty() {
                push(
                    errors,
                    "DomainNames",
                    "required",
                    format!("interface '{}': dnssl needs at least one domain", self.name),
                );
            }
            for domain in &dnssl.domain_names {
                if !valid_search_domain(domain) {
                    push(
                        errors,
                        "DomainNames",
                        "fqdn",
                        format!(
                            "interface '{}': '{domain}' is not a valid search domain",
                            self.name
                        ),
                    );
                }
            }
        }

        for nat64 in &self.nat64_prefixes {
            match nat64.prefix.parse::<Ipv6Prefix>() {
                Ok(parsed) if !NAT64_PREFIX_LENGTHS.contains(&parsed.len()) => push(
                    errors,
                    "Prefix",
                    "oneof",
                    format!(
                        "interface '{}': NAT64 prefix length /{} must be one of /96 /64 /56 /48 /40 /32",
                        self.name,
                        parsed.len()
                    ),
                ),
                Ok(_) => {}
                Err(_) => push(
                    errors,
                    "Prefix",
                    "cidrv6",
                    format!(
                        "interface '{}': NAT64 prefix '{}' is not a valid IPv6 prefix",
                        self.name, nat64.prefix
                    ),
                ),
            }
            if nat64.lifetime_seconds.unwrap_or(DEFAULT_NAT64_LIFETIME_SECS)
                > MAX_NAT64_LIFETIME_SECS
            {
                push(
                    errors,
                    "LifetimeSeconds",
                    "lte",
                    format!(
                        "interface '{}': NAT64 lifetime exceeds the maximum {MAX_NAT64_LIFETIME_SECS}s",
                        self.name
                    ),
                );
            }
        }
    }
}

/// A permissive RFC 1035-shaped check: non-empty labels of at most 63
/// octets, 253 octets overall.
fn valid_search_domain(domain: &str) -> bool {
    !domain.is_empty()
        && domain.len() <= 253
        && domain.split('.').all(|label| {
            !label.is_empty()
                && label.len() <= 63
                && label
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one_interface(interface: InterfaceConfig) -> Config {
        Config {
            interfaces: vec![interface],
        }
    }

    #[test]
    fn defaults_are_applied_on_a_copy() {
        let config = one_interface(InterfaceConfig {
            name: "net0".to_string(),
            prefixes: vec![PrefixConfig {
                prefix: "2001:db8::/64".to_string(),
                ..PrefixConfig::default()
            }],
            ..InterfaceConfig::default()
        });
        let validated = config.default_and_validate().unwrap();

        let prefix = &validated.interfaces[0].prefixes[0];
        assert_eq!(prefix.valid_lifetime_seconds, Some(DEFAULT_VALID_LIFETIME_SECS));
        assert_eq!(
            prefix.preferred_lifetime_seconds,
            Some(DEFAULT_PREFERRED_LIFETIME_SECS)
        );
        assert_eq!(
            validated.interfaces[0].ra_interval_milliseconds,
            DEFAULT_RA_INTERVAL_MS
        );

        // The caller's struct is untouched.
        assert_eq!(config.interfaces[0].prefixes[0].valid_lifetime_seconds, None);
    }

    #[test]
    fn interval_bounds() {
        let too_small = one_interface(InterfaceConfig {
            name: "x".to_string(),
            ra_interval_milliseconds: 69,
            ..InterfaceConfig::default()
        });
        let errors = too_small.default_and_validate().unwrap_err();
        assert!(errors.contains("RAIntervalMilliseconds", "gte"));

        let too_large = one_interface(InterfaceConfig {
            name: "x".to_string(),
            ra_interval_milliseconds: 1_800_001,
            ..InterfaceConfig::default()
        });
        let errors = too_large.default_and_validate().unwrap_err();
        assert!(errors.contains("RAIntervalMilliseconds", "lte"));

        let just_right = one_interface(InterfaceConfig {
            name: "x".to_string(),
            ra_interval_milliseconds: 70,
            ..InterfaceConfig::default()
        });
        assert!(just_right.default_and_validate().is_ok());
    }

    #[test]
    fn interface_names_must_be_unique_and_present() {
        let duplicated = Config {
            interfaces: vec![
                InterfaceConfig {
                    name: "net0".to_string(),
                    ..InterfaceConfig::default()
                },
                InterfaceConfig {
                    name: "net0".to_string(),
                    ..InterfaceConfig::default()
                },
            ],
        };
        let errors = duplicated.default_and_validate().unwrap_err();
        assert!(errors.contains("Name", "unique"));

        let unnamed = one_interface(InterfaceConfig::default());
        let errors = unnamed.default_and_validate().unwrap_err();
        assert!(errors.contains("Name", "required"));
    }

    #[test]
    fn prefixes_must_parse_and_not_overlap() {
        let bad_cidr = one_interface(InterfaceConfig {
            name: "x".to_string(),
            prefixes: vec![PrefixConfig {
                prefix: "not-a-prefix".to_string(),
                ..PrefixConfig::default()
            }],
            ..InterfaceConfig::default()
        });
        let errors = bad_cidr.default_and_validate().unwrap_err();
        assert!(errors.contains("Prefix", "cidrv6"));

        let overlapping = one_interface(InterfaceConfig {
            name: "x".to_string(),
            prefixes: vec![
                PrefixConfig {
                    prefix: "2001:db8::/32".to_string(),
                    ..PrefixConfig::default()
                },
                PrefixConfig {
                    prefix: "2001:db8:1::/48".to_string(),
                    ..PrefixConfig::default()
                },
            ],
            ..InterfaceConfig::default()
        });
        let errors = overlapping.default_and_validate().unwrap_err();
        assert!(errors.contains("Prefixes", "non_overlapping_prefix"));
    }

    #[test]
    fn preferred_lifetime_cannot_exceed_valid_lifetime() {
        let config = one_interface(InterfaceConfig {
            name: "x".to_string(),
            prefixes: vec![PrefixConfig {
                prefix: "2001:db8::/64".to_string(),
                valid_lifetime_seconds: Some(100),
                preferred_lifetime_seconds: Some(200),
                ..PrefixConfig::default()
            }],
            ..InterfaceConfig::default()
        });
        let errors = config.default_and_validate().unwrap_err();
        assert!(errors.contains("PreferredLifetimeSeconds", "ltefield"));
    }

    #[test]
    fn non_medium_preference_requires_router_lifetime() {
        let config = one_interface(InterfaceConfig {
            name: "x".to_string(),
            preference: Preference::High,
            router_lifetime_seconds: 0,
            ..InterfaceConfig::default()
        });
        let errors = config.default_and_validate().unwrap_err();
        assert!(errors.contains("Preference", "eq_if"));

        let with_lifetime = one_interface(InterfaceConfig {
            name: "x".to_string(),
            preference: Preference::High,
            router_lifetime_seconds: 100,
            ..InterfaceConfig::default()
        });
        assert!(with_lifetime.default_and_validate().is_ok());
    }

    #[test]
    fn route_constraints() {
        let config = one_interface(InterfaceConfig {
            name: "x".to_string(),
            router_lifetime_seconds: 100,
            routes: vec![
                RouteConfig {
                    prefix: "2001:db8::/64".to_string(),
                    lifetime_seconds: 100,
                    preference: Preference::Medium,
                },
                RouteConfig {
                    prefix: "2001:db8::/64".to_string(),
                    lifetime_seconds: 200,
                    preference: Preference::Unknown,
                },
            ],
            ..InterfaceConfig::default()
        });
        let errors = config.default_and_validate().unwrap_err();
        assert!(errors.contains("Routes", "unique"));
        assert!(errors.contains("Preference", "oneof"));
    }

    #[test]
    fn rdnss_and_dnssl_constraints() {
        let config = one_interface(InterfaceConfig {
            name: "x".to_string(),
            rdnsses: vec![
                RdnssConfig {
                    lifetime_seconds: 300,
                    addresses: vec![],
                },
                RdnssConfig {
                    lifetime_seconds: 300,
                    addresses: vec!["not-an-address".to_string()],
                },
            ],
            dnssls: vec![DnsslConfig {
                lifetime_seconds: 300,
                domain_names: vec!["double..dot".to_string()],
            }],
            ..InterfaceConfig::default()
        });
        let errors = config.default_and_validate().unwrap_err();
        assert!(errors.contains("Addresses", "required"));
        assert!(errors.contains("Addresses", "ipv6"));
        assert!(errors.contains("DomainNames", "fqdn"));
    }

    #[test]
    fn nat64_constraints() {
        let config = one_interface(InterfaceConfig {
            name: "x".to_string(),
            nat64_prefixes: vec![
                Nat64Config {
                    lifetime_seconds: None,
                    prefix: "64:ff9b::/72".to_string(),
                },
                Nat64Config {
                    lifetime_seconds: Some(70_000),
                    prefix: "64:ff9b::/96".to_string(),
                },
            ],
            ..InterfaceConfig::default()
        });
        let errors = config.default_and_validate().unwrap_err();
        assert!(errors.contains("Prefix", "oneof"));
        assert!(errors.contains("LifetimeSeconds", "lte"));

        let good = one_interface(InterfaceConfig {
            name: "x".to_string(),
            nat64_prefixes: vec![Nat64Config {
                lifetime_seconds: None,
                prefix: "64:ff9b::/96".to_string(),
            }],
            ..InterfaceConfig::default()
        });
        let validated = good.default_and_validate().unwrap();
        assert_eq!(
            validated.interfaces[0].nat64_prefixes[0].lifetime_seconds,
            Some(DEFAULT_NAT64_LIFETIME_SECS)
        );
    }

    #[test]
    fn yaml_surface_is_camel_case() {
        let yaml = r"
interfaces:
  - name: net0
    raIntervalMilliseconds: 100
    currentHopLimit: 64
    managed: true
    preference: high
    routerLifetimeSeconds: 1800
    mtu: 1500
    prefixes:
      - prefix: 2001:db8::/64
        onLink: true
        autonomous: true
    routes:
      - prefix: 2001:db8:1::/64
        lifetimeSeconds: 300
        preference: low
    rdnsses:
      - lifetimeSeconds: 300
        addresses: [2001:db8::53]
    dnssls:
      - lifetimeSeconds: 300
        domainNames: [example.com]
    nat64Prefixes:
      - prefix: 64:ff9b::/96
";
        let config = Config::from_yaml_reader(yaml.as_bytes()).unwrap();
        let interface = &config.interfaces[0];
        assert_eq!(interface.name, "net0");
        assert_eq!(interface.ra_interval_milliseconds, 100);
        assert_eq!(interface.current_hop_limit, 64);
        assert!(interface.managed);
        assert_eq!(interface.preference, Preference::High);
        assert_eq!(interface.router_lifetime_seconds, 1800);
        assert_eq!(interface.mtu, 1500);
        assert!(interface.prefixes[0].on_link);
        assert_eq!(interface.routes[0].preference, Preference::Low);
        assert_eq!(interface.rdnsses[0].addresses, vec!["2001:db8::53"]);
        assert_eq!(interface.dnssls[0].domain_names, vec!["example.com"]);
        assert!(config.default_and_validate().is_ok());
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let yaml = "interfaces:\n  - name: net0\n    bogusKnob: 1\n";
        assert!(Config::from_yaml_reader(yaml.as_bytes()).is_err());

        let json = r#"{"interfaces":[{"name":"net0","bogusKnob":1}]}"#;
        assert!(Config::from_json_str(json).is_err());
    }

    #[test]
    fn unknown_preference_string_fails_validation() {
        let json = r#"{"interfaces":[{"name":"net0","routerLifetimeSeconds":100,"preference":"highest"}]}"#;
        let config = Config::from_json_str(json).unwrap();
        assert_eq!(config.interfaces[0].preference, Preference::Unknown);
        let errors = config.default_and_validate().unwrap_err();
        assert!(errors.contains("Preference", "oneof"));
    }
}
