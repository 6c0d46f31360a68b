//! Service advertisement records and discovery results.

use serde::{Deserialize, Serialize};

/// Instance name the relay advertises on the local network.
pub const DEFAULT_SERVICE_NAME: &str = "Teleprompter";

/// Transport tag of the advertised service.  Peers are discovered by the same tag.
pub const DEFAULT_SERVICE_PROTOCOL: &str = "http";

/// Port the remote-control listener uses unless configured otherwise.
pub const DEFAULT_RELAY_PORT: u16 = 3000;

/// The record published on the LAN so remote clients can find the relay.
///
/// One record exists per relay run; it is built once when advertising starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRecord {
    /// Human-readable instance name (`Teleprompter`).
    pub name: String,
    /// Transport tag, e.g. `http`.  Mapped to a DNS-SD type by [`ServiceRecord::service_type`].
    pub protocol: String,
    /// Port the remote-control listener accepts connections on.
    pub port: u16,
}

impl ServiceRecord {
    pub fn new(name: impl Into<String>, protocol: impl Into<String>, port: u16) -> Self {
        Self {
            name: name.into(),
            protocol: protocol.into(),
            port,
        }
    }

    /// The fully-qualified DNS-SD service type for this record's protocol.
    pub fn service_type(&self) -> String {
        service_type_for(&self.protocol)
    }
}

impl Default for ServiceRecord {
    fn default() -> Self {
        Self::new(DEFAULT_SERVICE_NAME, DEFAULT_SERVICE_PROTOCOL, DEFAULT_RELAY_PORT)
    }
}

/// Maps a bare protocol tag (`http`) to its DNS-SD service type
/// (`_http._tcp.local.`).  Tags that already look like a service type are
/// returned unchanged.
pub fn service_type_for(protocol: &str) -> String {
    if protocol.starts_with('_') && protocol.ends_with(".local.") {
        protocol.to_string()
    } else {
        format!("_{}._tcp.local.", protocol.trim_start_matches('_'))
    }
}

/// A peer service observed by discovery.
///
/// Not deduplicated: every observation is its own value, and each one becomes
/// one notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredPeer {
    /// IP address (preferred) or host name under which the peer was found.
    pub host_address: String,
}

impl DiscoveredPeer {
    pub fn new(host_address: impl Into<String>) -> Self {
        Self {
            host_address: host_address.into(),
        }
    }
}
