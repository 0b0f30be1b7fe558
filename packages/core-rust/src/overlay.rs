//! Overlay address-space classification.
//!
//! Decides whether an address was allocated by the Tailscale coordination
//! server. Pure and synchronous: callers classify before doing any I/O so
//! non-overlay traffic never reaches the lookup service.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// `100.64.0.0/10`, the CGNAT block Tailscale assigns node addresses from.
pub const TAILSCALE_IPV4: IpPrefix = IpPrefix::v4(Ipv4Addr::new(100, 64, 0, 0), 10);

/// `100.115.92.0/23`, reserved by ChromeOS VMs and never handed out.
pub const CHROMEOS_VM_IPV4: IpPrefix = IpPrefix::v4(Ipv4Addr::new(100, 115, 92, 0), 23);

/// `fd7a:115c:a1e0::/48`, the Tailscale ULA range.
pub const TAILSCALE_ULA: IpPrefix =
    IpPrefix::v6(Ipv6Addr::new(0xfd7a, 0x115c, 0xa1e0, 0, 0, 0, 0, 0), 48);

/// A CIDR prefix of either address family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpPrefix {
    V4 { network: Ipv4Addr, len: u8 },
    V6 { network: Ipv6Addr, len: u8 },
}

impl IpPrefix {
    /// # Panics
    ///
    /// Panics (at compile time in const contexts) if `len > 32`.
    #[must_use]
    pub const fn v4(network: Ipv4Addr, len: u8) -> Self {
        assert!(len <= 32, "IPv4 prefix length out of range");
        Self::V4 { network, len }
    }

    /// # Panics
    ///
    /// Panics (at compile time in const contexts) if `len > 128`.
    #[must_use]
    pub const fn v6(network: Ipv6Addr, len: u8) -> Self {
        assert!(len <= 128, "IPv6 prefix length out of range");
        Self::V6 { network, len }
    }

    /// Returns `true` if `addr` falls inside this prefix.
    ///
    /// The address must already be canonical; a mapped IPv4 address never
    /// matches a V4 prefix here.
    #[must_use]
    pub fn contains(&self, addr: IpAddr) -> bool {
        match (*self, addr) {
            (Self::V4 { network, len }, IpAddr::V4(ip)) => {
                let mask = u32::MAX.checked_shl(32 - u32::from(len)).unwrap_or(0);
                u32::from(ip) & mask == u32::from(network) & mask
            }
            (Self::V6 { network, len }, IpAddr::V6(ip)) => {
                let mask = u128::MAX.checked_shl(128 - u32::from(len)).unwrap_or(0);
                u128::from(ip) & mask == u128::from(network) & mask
            }
            _ => false,
        }
    }
}

impl fmt::Display for IpPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::V4 { network, len } => write!(f, "{network}/{len}"),
            Self::V6 { network, len } => write!(f, "{network}/{len}"),
        }
    }
}

/// Classifies addresses against the overlay network's allocated ranges.
///
/// An address is a member if it lies in any `include` prefix and in no
/// `exclude` prefix. Classification is representation-independent: mapped
/// IPv4-in-IPv6 addresses are canonicalized before matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressClassifier {
    include: Vec<IpPrefix>,
    exclude: Vec<IpPrefix>,
}

impl AddressClassifier {
    /// Classifier over an arbitrary set of ranges.
    #[must_use]
    pub fn with_ranges(include: Vec<IpPrefix>, exclude: Vec<IpPrefix>) -> Self {
        Self { include, exclude }
    }

    /// Returns `true` if `addr`, in either representation, belongs to the overlay.
    #[must_use]
    pub fn is_overlay_member(&self, addr: IpAddr) -> bool {
        let addr = addr.to_canonical();
        self.include.iter().any(|p| p.contains(addr)) && !self.exclude.iter().any(|p| p.contains(addr))
    }

    /// Prefixes addresses must fall in to be classified as members.
    #[must_use]
    pub fn included(&self) -> &[IpPrefix] {
        &self.include
    }
}

impl Default for AddressClassifier {
    /// The Tailscale ranges: CGNAT minus the ChromeOS VM block, plus the ULA.
    fn default() -> Self {
        Self::with_ranges(vec![TAILSCALE_IPV4, TAILSCALE_ULA], vec![CHROMEOS_VM_IPV4])
    }
}
