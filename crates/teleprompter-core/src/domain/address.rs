//! The host address advertised to remote clients.

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A routable IPv4 address of this machine, in the form a phone can dial.
///
/// Only non-loopback addresses are representable: [`NetworkAddress::new`]
/// rejects `127.0.0.0/8` and the unspecified address.  Whether the interface is
/// *active* is the resolver's concern (it only sees addresses the OS reports
/// as bound).
///
/// Serialized as its dotted-quad string, e.g. `"192.168.1.20"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NetworkAddress(Ipv4Addr);

impl NetworkAddress {
    /// Wraps `ip`, returning `None` for loopback or unspecified addresses.
    pub fn new(ip: Ipv4Addr) -> Option<Self> {
        if ip.is_loopback() || ip.is_unspecified() {
            None
        } else {
            Some(Self(ip))
        }
    }

    /// The underlying IPv4 address.
    pub fn ip(&self) -> Ipv4Addr {
        self.0
    }
}

impl fmt::Display for NetworkAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Error returned when a string is not a usable [`NetworkAddress`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("not a routable IPv4 address: {0:?}")]
pub struct InvalidAddress(pub String);

impl FromStr for NetworkAddress {
    type Err = InvalidAddress;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<Ipv4Addr>()
            .ok()
            .and_then(NetworkAddress::new)
            .ok_or_else(|| InvalidAddress(s.to_string()))
    }
}

impl TryFrom<String> for NetworkAddress {
    type Error = InvalidAddress;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<NetworkAddress> for String {
    fn from(addr: NetworkAddress) -> Self {
        addr.to_string()
    }
}
