//! # teleprompter-core
//!
//! Shared library for the Teleprompter remote-control relay containing the
//! domain types and the client wire protocol.
//!
//! It has zero dependencies on OS APIs, async runtimes, or network sockets.
//!
//! # Architecture overview
//!
//! The Teleprompter desktop application can be driven from a phone: the phone
//! opens a WebSocket to the desktop machine and sends `command` events (key
//! presses, speed changes, ...).  A background *relay* inside the desktop
//! process receives those events and forwards them to the single presentation
//! window, wrapped in a small tagged envelope.
//!
//! This crate defines the vocabulary both sides share:
//!
//! - **`domain`** – The values that flow through the relay: the advertised
//!   [`NetworkAddress`], the [`ServiceRecord`] published on the LAN, peers
//!   found by discovery ([`DiscoveredPeer`]), inbound [`CommandEvent`]s and the
//!   outbound [`RelayNotification`] envelope.
//!
//! - **`protocol`** – How a remote client's WebSocket text frames are turned
//!   into named events (see [`protocol::frame`]).

pub mod domain;
pub mod protocol;

pub use domain::address::NetworkAddress;
pub use domain::command::{CommandEvent, MalformedCommand};
pub use domain::notification::{NotificationKind, RelayNotification};
pub use domain::service::{DiscoveredPeer, ServiceRecord};
pub use protocol::frame::{parse_client_frame, ClientFrame, FrameError, COMMAND_EVENT};
