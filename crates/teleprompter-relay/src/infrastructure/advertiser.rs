//! LAN service advertisement and discovery over mDNS / DNS-SD.
//!
//! The relay publishes one record (`Teleprompter`, `_http._tcp.local.`, port
//! 3000) so remote-control clients can find it without typing an address, and
//! browses the same service type so the window can also show other machines
//! offering it.
//!
//! # Best effort
//!
//! Multicast is unreliable on many networks (guest Wi-Fi, VPNs, firewalls).
//! Nothing here may stop the relay: every failure is returned to the
//! coordinator, which logs it, reports it to the diagnostic hook and carries
//! on.  The WebSocket listener works with or without advertisement.
//!
//! # Threading
//!
//! `mdns-sd` runs its own daemon thread and hands results back over a channel.
//! [`MdnsAdvertiser::watch`] bridges that channel into a Tokio task that stops
//! when the relay's cancellation token fires.

use std::sync::Mutex;

use mdns_sd::{ServiceDaemon, ServiceEvent, ServiceInfo};
use teleprompter_core::domain::service::service_type_for;
use teleprompter_core::{DiscoveredPeer, NetworkAddress, ServiceRecord};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

const PROP_VERSION: &str = "version";
const FALLBACK_HOSTNAME: &str = "teleprompter";

/// Error type for advertisement and discovery operations.
#[derive(Debug, Error)]
pub enum AdvertiseError {
    /// The mDNS daemon could not be started (no multicast-capable interface,
    /// socket permissions, ...).
    #[error("failed to start mDNS daemon: {source}")]
    Daemon {
        #[source]
        source: mdns_sd::Error,
    },

    /// The service record could not be turned into a DNS-SD record.
    #[error("invalid service record {name:?}: {source}")]
    InvalidRecord {
        name: String,
        #[source]
        source: mdns_sd::Error,
    },

    /// The daemon refused to register the record.
    #[error("failed to register {fullname}: {source}")]
    Register {
        fullname: String,
        #[source]
        source: mdns_sd::Error,
    },

    /// Browsing for peers could not be started.
    #[error("failed to browse {service_type}: {source}")]
    Browse {
        service_type: String,
        #[source]
        source: mdns_sd::Error,
    },
}

/// Publishes this relay on the LAN and watches for peers of the same type.
///
/// Both operations return immediately; the advertisement and the watch then
/// live in the background until [`ServiceAdvertiser::withdraw`] or the
/// cancellation token passed to `watch`.
pub trait ServiceAdvertiser: Send + Sync {
    /// Publishes `record`, reachable at `address`.
    ///
    /// Called at most once per relay run.
    fn publish(&self, record: &ServiceRecord, address: NetworkAddress)
        -> Result<(), AdvertiseError>;

    /// Starts watching for services with the given protocol tag.
    ///
    /// Every observation is sent on the returned channel, duplicates included.
    /// The channel closes when `shutdown` is cancelled or the underlying
    /// discovery stops.
    fn watch(
        &self,
        protocol: &str,
        shutdown: CancellationToken,
    ) -> Result<mpsc::UnboundedReceiver<DiscoveredPeer>, AdvertiseError>;

    /// Withdraws everything published and stops browsing.  Best effort.
    fn withdraw(&self);
}

// ── mDNS implementation ──────────────────────────────────────────────────────

/// [`ServiceAdvertiser`] backed by an `mdns-sd` daemon.
pub struct MdnsAdvertiser {
    daemon: ServiceDaemon,
    published: Mutex<Vec<String>>,
    browsing: Mutex<Vec<String>>,
}

impl MdnsAdvertiser {
    /// Starts the mDNS daemon.
    ///
    /// # Errors
    ///
    /// Returns [`AdvertiseError::Daemon`] if the daemon cannot be started.
    pub fn new() -> Result<Self, AdvertiseError> {
        let daemon = ServiceDaemon::new().map_err(|source| AdvertiseError::Daemon { source })?;
        Ok(Self {
            daemon,
            published: Mutex::new(Vec::new()),
            browsing: Mutex::new(Vec::new()),
        })
    }
}

impl ServiceAdvertiser for MdnsAdvertiser {
    fn publish(
        &self,
        record: &ServiceRecord,
        address: NetworkAddress,
    ) -> Result<(), AdvertiseError> {
        let service_type = record.service_type();
        let host_name = format!("{}.local.", local_hostname());
        let ip = address.to_string();
        let properties = [(
            PROP_VERSION.to_string(),
            env!("CARGO_PKG_VERSION").to_string(),
        )];

        let service = ServiceInfo::new(
            &service_type,
            &record.name,
            &host_name,
            ip.as_str(),
            record.port,
            &properties[..],
        )
        .map_err(|source| AdvertiseError::InvalidRecord {
            name: record.name.clone(),
            source,
        })?;

        let fullname = service.get_fullname().to_string();
        self.daemon
            .register(service)
            .map_err(|source| AdvertiseError::Register {
                fullname: fullname.clone(),
                source,
            })?;

        info!("mDNS: published {fullname} at {ip}:{}", record.port);
        if let Ok(mut published) = self.published.lock() {
            published.push(fullname);
        }
        Ok(())
    }

    fn watch(
        &self,
        protocol: &str,
        shutdown: CancellationToken,
    ) -> Result<mpsc::UnboundedReceiver<DiscoveredPeer>, AdvertiseError> {
        let service_type = service_type_for(protocol);
        let receiver = self
            .daemon
            .browse(&service_type)
            .map_err(|source| AdvertiseError::Browse {
                service_type: service_type.clone(),
                source,
            })?;
        if let Ok(mut browsing) = self.browsing.lock() {
            browsing.push(service_type.clone());
        }

        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            loop {
                let event = tokio::select! {
                    _ = shutdown.cancelled() => break,
                    event = receiver.recv_async() => event,
                };
                match event {
                    Ok(ServiceEvent::ServiceResolved(service)) => {
                        let addresses = service.get_addresses().iter().map(|ip| ip.to_string());
                        let peer = peer_from_parts(addresses, service.get_hostname());
                        debug!(
                            "mDNS: found {} at {}",
                            service.get_fullname(),
                            peer.host_address
                        );
                        if tx.send(peer).is_err() {
                            break;
                        }
                    }
                    Ok(ServiceEvent::SearchStarted(ty)) => trace!("mDNS: browsing {ty}"),
                    Ok(other) => trace!("mDNS: {other:?}"),
                    Err(_) => {
                        debug!("mDNS: browse channel for {service_type} closed");
                        break;
                    }
                }
            }
        });

        Ok(rx)
    }

    fn withdraw(&self) {
        if let Ok(mut published) = self.published.lock() {
            for fullname in published.drain(..) {
                if let Err(e) = self.daemon.unregister(&fullname) {
                    warn!("mDNS: failed to unregister {fullname}: {e}");
                }
            }
        }
        if let Ok(mut browsing) = self.browsing.lock() {
            for service_type in browsing.drain(..) {
                if let Err(e) = self.daemon.stop_browse(&service_type) {
                    debug!("mDNS: failed to stop browsing {service_type}: {e}");
                }
            }
        }
        if let Err(e) = self.daemon.shutdown() {
            debug!("mDNS: daemon shutdown: {e}");
        }
    }
}

/// Chooses the host address reported for a resolved peer: an IPv4 address if
/// there is one, otherwise any address, otherwise the host name.
fn peer_from_parts<I>(addresses: I, host_name: &str) -> DiscoveredPeer
where
    I: IntoIterator<Item = String>,
{
    let mut addresses: Vec<String> = addresses.into_iter().collect();
    // HashSet order is arbitrary; sort IPv4 first so the choice is stable.
    addresses.sort_by_key(|a| (a.contains(':'), a.clone()));
    match addresses.into_iter().next() {
        Some(addr) => DiscoveredPeer::new(addr),
        None => DiscoveredPeer::new(host_name.trim_end_matches('.')),
    }
}

fn local_hostname() -> String {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .map(|h| h.trim_end_matches(".local").to_string())
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| FALLBACK_HOSTNAME.to_string())
}

// ── No-op implementation ─────────────────────────────────────────────────────

/// [`ServiceAdvertiser`] used when advertisement is disabled in the config.
///
/// Publishes nothing; its watch channel is closed from the start.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopAdvertiser;

impl ServiceAdvertiser for NoopAdvertiser {
    fn publish(&self, record: &ServiceRecord, _address: NetworkAddress) -> Result<(), AdvertiseError> {
        debug!("advertisement disabled; not publishing {}", record.name);
        Ok(())
    }

    fn watch(
        &self,
        _protocol: &str,
        _shutdown: CancellationToken,
    ) -> Result<mpsc::UnboundedReceiver<DiscoveredPeer>, AdvertiseError> {
        let (_tx, rx) = mpsc::unbounded_channel();
        Ok(rx)
    }

    fn withdraw(&self) {}
}

// ── Tests ─────────────────────────────────────────────────────────────────────
