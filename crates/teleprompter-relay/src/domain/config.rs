//! Relay configuration types.
//!
//! [`RelayConfig`] is the single source of truth for all runtime settings of
//! the relay.  It is built from the TOML file plus CLI overrides in `main.rs`,
//! or from defaults in tests.
//!
//! Keeping configuration as a plain struct (no globals, no environment reads)
//! lets tests construct relays bound to port 0 with a short retry interval.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use teleprompter_core::domain::service::{
    DEFAULT_RELAY_PORT, DEFAULT_SERVICE_NAME, DEFAULT_SERVICE_PROTOCOL,
};
use teleprompter_core::ServiceRecord;

/// Delay between address-resolution attempts while the machine is offline.
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(1);

/// All runtime configuration for the remote-control relay.
///
/// # Example
///
/// ```rust
/// use teleprompter_relay::domain::RelayConfig;
///
/// let cfg = RelayConfig::default();
/// assert_eq!(cfg.bind_addr.port(), 3000);
/// ```
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Address the WebSocket listener binds to.
    ///
    /// `0.0.0.0` accepts phones on any interface.  The port is also the one
    /// published in the service record.
    pub bind_addr: SocketAddr,

    /// Instance name published on the LAN.
    pub service_name: String,

    /// Transport tag published on the LAN and used to discover peers.
    pub service_protocol: String,

    /// Fixed backoff between address-resolution attempts.
    pub retry_interval: Duration,

    /// Whether to publish the service record and watch for peers.
    pub advertise: bool,
}

impl RelayConfig {
    /// The record to publish for a listener reachable on `port`.
    ///
    /// `port` is the port actually bound, which differs from
    /// `bind_addr.port()` only when the config asked for port 0.
    pub fn service_record(&self, port: u16) -> ServiceRecord {
        ServiceRecord::new(self.service_name.clone(), self.service_protocol.clone(), port)
    }
}

impl Default for RelayConfig {
    /// | Field            | Default          |
    /// |------------------|------------------|
    /// | bind_addr        | `0.0.0.0:3000`   |
    /// | service_name     | `Teleprompter`   |
    /// | service_protocol | `http`           |
    /// | retry_interval   | 1 second         |
    /// | advertise        | `true`           |
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), DEFAULT_RELAY_PORT),
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            service_protocol: DEFAULT_SERVICE_PROTOCOL.to_string(),
            retry_interval: DEFAULT_RETRY_INTERVAL,
            advertise: true,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_port_is_3000() {
        // Arrange / Act
        let cfg = RelayConfig::default();
        // Assert
        assert_eq!(cfg.bind_addr.port(), 3000);
    }

    #[test]
    fn test_default_binds_all_interfaces() {
        let cfg = RelayConfig::default();
        assert!(cfg.bind_addr.ip().is_unspecified());
    }

    #[test]
    fn test_default_retry_interval_is_one_second() {
        let cfg = RelayConfig::default();
        assert_eq!(cfg.retry_interval, Duration::from_secs(1));
    }

    #[test]
    fn test_default_advertises_teleprompter_over_http() {
        let cfg = RelayConfig::default();
        assert!(cfg.advertise);
        assert_eq!(cfg.service_name, "Teleprompter");
        assert_eq!(cfg.service_protocol, "http");
    }

    #[test]
    fn test_service_record_uses_bound_port() {
        // Arrange: a config asking for an ephemeral port
        let cfg = RelayConfig {
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            ..Default::default()
        };

        // Act
        let record = cfg.service_record(41234);

        // Assert
        assert_eq!(record.port, 41234);
        assert_eq!(record.name, "Teleprompter");
        assert_eq!(record.service_type(), "_http._tcp.local.");
    }
}
