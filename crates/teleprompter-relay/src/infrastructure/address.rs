//! Local address resolution.
//!
//! Picks the IPv4 address a phone on the same LAN should dial.  The rule is
//! deliberately simple: walk the interfaces in the order the OS reports them
//! and take the first IPv4 address that is not loopback.
//!
//! "No address" is an expected outcome (the laptop is offline, Wi-Fi is still
//! associating) and is modelled as `None`, not as an error.  The coordinator
//! retries until an address appears.

use std::net::IpAddr;

use teleprompter_core::NetworkAddress;
use tracing::{debug, warn};

/// Source of the address to advertise.
#[cfg_attr(test, mockall::automock)]
pub trait AddressResolver: Send + Sync {
    /// Returns the address to advertise, or `None` if the machine has none yet.
    fn resolve(&self) -> Option<NetworkAddress>;
}

/// One address bound to one interface, as reported by the OS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceAddress {
    pub name: String,
    pub ip: IpAddr,
    pub is_loopback: bool,
}

/// Selects the first non-loopback IPv4 address, in enumeration order.
pub fn select_address<I>(interfaces: I) -> Option<NetworkAddress>
where
    I: IntoIterator<Item = InterfaceAddress>,
{
    interfaces
        .into_iter()
        .filter(|iface| !iface.is_loopback)
        .find_map(|iface| match iface.ip {
            IpAddr::V4(v4) => NetworkAddress::new(v4),
            IpAddr::V6(_) => None,
        })
}

/// Resolves against the machine's live interface table via `get_if_addrs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemAddressResolver;

impl SystemAddressResolver {
    pub fn new() -> Self {
        Self
    }

    fn interfaces() -> Vec<InterfaceAddress> {
        match get_if_addrs::get_if_addrs() {
            Ok(list) => list
                .into_iter()
                .map(|iface| InterfaceAddress {
                    is_loopback: iface.is_loopback(),
                    ip: iface.ip(),
                    name: iface.name,
                })
                .collect(),
            Err(e) => {
                // Treated like "no address yet": the caller retries.
                warn!("failed to enumerate network interfaces: {e}");
                Vec::new()
            }
        }
    }
}

impl AddressResolver for SystemAddressResolver {
    fn resolve(&self) -> Option<NetworkAddress> {
        let interfaces = Self::interfaces();
        let selected = select_address(interfaces.iter().cloned());
        match &selected {
            Some(addr) => debug!("resolved local address {addr} from {} interface(s)", interfaces.len()),
            None => debug!("no routable IPv4 address among {} interface(s)", interfaces.len()),
        }
        selected
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
