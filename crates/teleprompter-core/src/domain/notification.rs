//! The envelope delivered to the presentation surface.
//!
//! # JSON representation
//!
//! ```json
//! {"option":"qr","data":"192.168.1.20"}
//! {"option":"command","data":{"key":"ArrowDown"}}
//! {"option":"prepareLinks"}
//! ```
//!
//! Serde's adjacent tagging (`tag = "option", content = "data"`) produces this
//! shape directly; the unit variant simply has no `data` member.

use serde::{Deserialize, Serialize};

use crate::domain::address::NetworkAddress;
use crate::domain::command::CommandEvent;
use crate::domain::service::DiscoveredPeer;

/// One message from the relay to the presentation surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "option", content = "data", rename_all = "camelCase")]
pub enum RelayNotification {
    /// An address at which the remote control can be reached.
    ///
    /// Emitted both for this machine's own address (once the listener is up)
    /// and for every peer discovery observation.  The surface must treat these
    /// as successive hints, not mutually exclusive answers.
    Qr(String),

    /// A command forwarded from a remote client.
    Command(CommandEvent),

    /// The host asked the surface to (re)build its remote-control links.
    PrepareLinks,
}

/// The `option` tag of a [`RelayNotification`], without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    Qr,
    Command,
    PrepareLinks,
}

impl NotificationKind {
    /// The wire value of the `option` member.
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationKind::Qr => "qr",
            NotificationKind::Command => "command",
            NotificationKind::PrepareLinks => "prepareLinks",
        }
    }
}

impl RelayNotification {
    /// The local listener is reachable at `address`.
    pub fn local_address(address: &NetworkAddress) -> Self {
        RelayNotification::Qr(address.to_string())
    }

    /// Discovery observed `peer`.
    pub fn peer(peer: &DiscoveredPeer) -> Self {
        RelayNotification::Qr(peer.host_address.clone())
    }

    pub fn command(event: CommandEvent) -> Self {
        RelayNotification::Command(event)
    }

    pub fn kind(&self) -> NotificationKind {
        match self {
            RelayNotification::Qr(_) => NotificationKind::Qr,
            RelayNotification::Command(_) => NotificationKind::Command,
            RelayNotification::PrepareLinks => NotificationKind::PrepareLinks,
        }
    }
}
