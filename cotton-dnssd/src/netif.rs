//! Enumerating network interfaces and their IP addresses
//!
//! Browsing enumerates interfaces once, when the connection is opened;
//! interfaces appearing later are not picked up.

use crate::error::{Error, Syscall};
use nix::ifaddrs;
use nix::net::if_::InterfaceFlags;
use std::net::{IpAddr, Ipv4Addr};

/** Kernel network interface index (1-based)
 */
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InterfaceIndex(pub core::num::NonZeroU32);

/// Flags describing a network interface's features and state
///
/// Corresponds to Linux's SIOCGIFFLAGS
#[derive(Default, Clone, Copy, PartialEq, Eq, Debug)]
pub struct Flags(u32);

impl Flags {
    #[doc = "Interface is enabled"]
    pub const UP: Self = Self(0x1);

    #[doc = "Interface is loopback-only"]
    pub const LOOPBACK: Self = Self(0x4);

    #[doc = "Interface is operational"]
    pub const RUNNING: Self = Self(0x40);

    #[doc = "Interface is multicast-capable"]
    pub const MULTICAST: Self = Self(0x1000);

    #[doc = "Check whether a subset of flags are set"]
    #[must_use]
    pub fn contains(&self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }
}

impl core::ops::BitOr for Flags {
    type Output = Self;
    fn bitor(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

impl core::ops::BitOrAssign for Flags {
    fn bitor_assign(&mut self, other: Self) {
        self.0 |= other.0;
    }
}

/// One network interface, and all its addresses
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interface {
    /// Kernel interface index
    pub index: InterfaceIndex,
    /// Interface name, e.g. "eth0"
    pub name: String,
    /// IPv4 and IPv6 addresses, in the order the kernel lists them
    pub addrs: Vec<IpAddr>,
    /// State and capabilities
    pub flags: Flags,
}

impl Interface {
    /// Whether mDNS queries can be multicast on this interface
    ///
    /// It must be up, running, multicast-capable, and have at least one
    /// IPv4 address.
    #[must_use]
    pub fn is_multicast(&self) -> bool {
        self.flags
            .contains(Flags::UP | Flags::RUNNING | Flags::MULTICAST)
            && self.addrs.iter().any(IpAddr::is_ipv4)
    }
}

fn map_interface_flags(flags: InterfaceFlags) -> Flags {
    let mut newflags = Flags::default();
    for (iff, newf) in [
        (InterfaceFlags::IFF_UP, Flags::UP),
        (InterfaceFlags::IFF_RUNNING, Flags::RUNNING),
        (InterfaceFlags::IFF_LOOPBACK, Flags::LOOPBACK),
        (InterfaceFlags::IFF_MULTICAST, Flags::MULTICAST),
    ] {
        if flags.contains(iff) {
            newflags |= newf;
        }
    }
    newflags
}

fn kernel_index(name: &str) -> Option<InterfaceIndex> {
    nix::net::if_::if_nametoindex(name)
        .ok()
        .and_then(core::num::NonZeroU32::new)
        .map(InterfaceIndex)
}

/// Fold getifaddrs' one-entry-per-address list into one entry per interface
fn collect<ITER>(
    iter: ITER,
    index_of: fn(&str) -> Option<InterfaceIndex>,
) -> Vec<Interface>
where
    ITER: Iterator<Item = ifaddrs::InterfaceAddress>,
{
    let mut result: Vec<Interface> = Vec::new();
    for ifaddr in iter {
        /* Undo Linux aliasing: "eth0:1" is "eth0" really. */
        let name = match ifaddr.interface_name.split_once(':') {
            None => ifaddr.interface_name,
            Some((prefix, _alias)) => prefix.to_string(),
        };

        let position = if let Some(n) =
            result.iter().position(|i| i.name == name)
        {
            n
        } else {
            let Some(index) = index_of(&name) else {
                log::debug!("no interface index for {name}, skipping");
                continue;
            };
            result.push(Interface {
                index,
                name,
                addrs: Vec::new(),
                flags: map_interface_flags(ifaddr.flags),
            });
            result.len() - 1
        };

        let ip = ifaddr.address.and_then(|addr| {
            if let Some(ipv4) = addr.as_sockaddr_in() {
                Some(IpAddr::V4(Ipv4Addr::from(ipv4.ip())))
            } else {
                addr.as_sockaddr_in6().map(|ipv6| IpAddr::V6(ipv6.ip()))
            }
        });
        if let Some(ip) = ip {
            let addrs = &mut result[position].addrs;
            if !addrs.contains(&ip) {
                addrs.push(ip);
            }
        }
    }
    result
}

/// Obtain the current list of network interfaces
///
/// # Errors
///
/// Returns `Error::Syscall` if the underlying getifaddrs call fails.
///
pub fn interfaces() -> Result<Vec<Interface>, Error> {
    let iter = ifaddrs::getifaddrs()
        .map_err(|e| Error::Syscall(Syscall::Getifaddrs, e.into()))?;
    Ok(collect(iter, kernel_index))
}

/// The interfaces on which mDNS queries can be multicast
///
/// Filters a list from [`interfaces`] down to those which pass
/// [`Interface::is_multicast`].
#[must_use]
pub fn multicast_interfaces(all: &[Interface]) -> Vec<Interface> {
    all.iter().filter(|i| i.is_multicast()).cloned().collect()
}

#[cfg(test)]
pub(crate) fn make_index(i: u32) -> InterfaceIndex {
    InterfaceIndex(core::num::NonZeroU32::new(i).unwrap())
}
