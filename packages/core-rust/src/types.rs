//! Peer endpoints and the identity records resolved for them.

use std::fmt;
use std::net::{AddrParseError, IpAddr, SocketAddr};

use serde::Serialize;

use crate::whois::WhoIsResponse;

/// The originating side of an inbound connection: address plus port.
///
/// Parsed once per request from the raw remote address string handed over
/// by the transport. Addresses are stored canonicalized, so an IPv4-mapped
/// IPv6 address (`::ffff:100.64.0.5`) becomes plain IPv4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PeerEndpoint {
    /// Peer IP address, canonicalized.
    pub address: IpAddr,
    /// Peer source port.
    pub port: u16,
}

impl PeerEndpoint {
    /// Builds an endpoint, canonicalizing IPv4-mapped IPv6 addresses to IPv4.
    #[must_use]
    pub fn new(address: IpAddr, port: u16) -> Self {
        Self {
            address: address.to_canonical(),
            port,
        }
    }

    /// Parses `ip:port` (or `[ipv6]:port`) as carried by the transport layer.
    ///
    /// IPv6 zones are accepted and dropped, named ones (`[fe80::1%eth0]:80`)
    /// included; a zone never affects overlay membership.
    ///
    /// # Errors
    ///
    /// Returns the underlying parse error if `raw` is not a socket address.
    pub fn parse(raw: &str) -> Result<Self, AddrParseError> {
        let raw = raw.trim();
        match raw.parse::<SocketAddr>() {
            Ok(addr) => Ok(Self::from(addr)),
            Err(e) => match strip_named_zone(raw) {
                Some(unzoned) => unzoned.parse::<SocketAddr>().map(Self::from),
                None => Err(e),
            },
        }
    }
}

/// `[addr%zone]:port` -> `[addr]:port`; `None` if there is no zone to strip.
fn strip_named_zone(raw: &str) -> Option<String> {
    let (host, port) = raw.strip_prefix('[')?.split_once("]:")?;
    let (addr, zone) = host.split_once('%')?;
    if zone.is_empty() {
        return None;
    }
    Some(format!("[{addr}]:{port}"))
}

impl From<SocketAddr> for PeerEndpoint {
    fn from(addr: SocketAddr) -> Self {
        Self::new(addr.ip(), addr.port())
    }
}

impl fmt::Display for PeerEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        SocketAddr::new(self.address, self.port).fmt(f)
    }
}

/// Coarse trust level of an overlay membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum MembershipClass {
    /// Node owned by a member of the tailnet.
    Regular,
    /// Node shared into the tailnet from another one.
    Guest,
}

impl MembershipClass {
    /// Value published under the membership attribute.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Regular => "Regular",
            Self::Guest => "Guest",
        }
    }

    /// Group name used when the membership is published as a group list.
    #[must_use]
    pub fn group_name(self) -> &'static str {
        match self {
            Self::Regular => "regular",
            Self::Guest => "guest",
        }
    }
}

impl fmt::Display for MembershipClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity that owns an overlay endpoint at the moment of lookup.
///
/// The only way to obtain one is from a decoded [`WhoIsResponse`], so every
/// record in the system originates from a successful lookup. Fields are
/// read-only once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdentityRecord {
    display_name: String,
    login_name: String,
    membership: MembershipClass,
}

impl IdentityRecord {
    /// Human-readable name of the owning user.
    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Login identifier of the owning user, usually an email.
    #[must_use]
    pub fn login_name(&self) -> &str {
        &self.login_name
    }

    /// Membership class derived from the node's sharing state.
    #[must_use]
    pub fn membership(&self) -> MembershipClass {
        self.membership
    }

    /// Group memberships derived from the membership class.
    ///
    /// Only one class exists today, so this always yields a single group.
    #[must_use]
    pub fn groups(&self) -> Vec<&'static str> {
        vec![self.membership.group_name()]
    }
}

impl From<WhoIsResponse> for IdentityRecord {
    fn from(resp: WhoIsResponse) -> Self {
        let membership = if resp.node.is_sharee() {
            MembershipClass::Guest
        } else {
            MembershipClass::Regular
        };
        Self {
            display_name: resp.user_profile.display_name,
            login_name: resp.user_profile.login_name,
            membership,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, Ipv6Addr};

    #[test]
    fn parse_ipv4_endpoint() {
        let ep = PeerEndpoint::parse("100.64.0.5:51820").unwrap();
        assert_eq!(ep.address, IpAddr::V4(Ipv4Addr::new(100, 64, 0, 5)));
        assert_eq!(ep.port, 51820);
        assert_eq!(ep.to_string(), "100.64.0.5:51820");
    }

    #[test]
    fn parse_bracketed_ipv6_endpoint() {
        let ep = PeerEndpoint::parse("[fd7a:115c:a1e0::1]:443").unwrap();
        assert_eq!(
            ep.address,
            IpAddr::V6(Ipv6Addr::new(0xfd7a, 0x115c, 0xa1e0, 0, 0, 0, 0, 1))
        );
        assert_eq!(ep.to_string(), "[fd7a:115c:a1e0::1]:443");
    }

    #[test]
    fn parse_canonicalizes_mapped_ipv4() {
        let ep = PeerEndpoint::parse("[::ffff:100.64.0.5]:80").unwrap();
        assert_eq!(ep.address, IpAddr::V4(Ipv4Addr::new(100, 64, 0, 5)));
    }

    #[test]
    fn parse_drops_named_and_numeric_zones() {
        let named = PeerEndpoint::parse("[fe80::1%eth0]:80").unwrap();
        let numeric = PeerEndpoint::parse("[fe80::1%2]:80").unwrap();
        let expected: IpAddr = "fe80::1".parse().unwrap();
        assert_eq!(named.address, expected);
        assert_eq!(named.port, 80);
        assert_eq!(named, numeric);
    }

    #[test]
    fn parse_rejects_empty_zone_and_unbracketed_zone() {
        assert!(PeerEndpoint::parse("[fe80::1%]:80").is_err());
        assert!(PeerEndpoint::parse("fe80::1%eth0:80").is_err());
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(PeerEndpoint::parse("not-an-address").is_err());
        assert!(PeerEndpoint::parse("100.64.0.5").is_err());
        assert!(PeerEndpoint::parse("").is_err());
    }

    #[test]
    fn sharee_node_maps_to_guest() {
        let json = r#"{
            "Node": {"Hostinfo": {"ShareeNode": true}},
            "UserProfile": {"LoginName": "alice@example.com", "DisplayName": "Alice"}
        }"#;
        let resp: WhoIsResponse = serde_json::from_str(json).unwrap();
        let record = IdentityRecord::from(resp);
        assert_eq!(record.display_name(), "Alice");
        assert_eq!(record.login_name(), "alice@example.com");
        assert_eq!(record.membership(), MembershipClass::Guest);
        assert_eq!(record.groups(), vec!["guest"]);
    }

    #[test]
    fn missing_hostinfo_maps_to_regular() {
        let json = r#"{
            "Node": {},
            "UserProfile": {"LoginName": "bob@example.com", "DisplayName": "Bob"}
        }"#;
        let resp: WhoIsResponse = serde_json::from_str(json).unwrap();
        assert_eq!(
            IdentityRecord::from(resp).membership(),
            MembershipClass::Regular
        );
    }
}
