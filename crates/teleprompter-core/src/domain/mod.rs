//! Domain types for the remote-control relay.
//!
//! Everything here is plain data: no sockets, no timers, no tasks.  The relay
//! crate moves these values between its infrastructure adapters and the
//! presentation sink.
//!
//! # Lifecycles at a glance
//!
//! | Type                 | Created                          | Lives                         |
//! |----------------------|----------------------------------|-------------------------------|
//! | `NetworkAddress`     | each address-resolution attempt  | until the next attempt        |
//! | `ServiceRecord`      | once, when advertising starts    | for the relay run             |
//! | `DiscoveredPeer`     | each discovery observation       | one notification              |
//! | `CommandEvent`       | each inbound `command` event     | one notification              |
//! | `RelayNotification`  | each delivery to the sink        | consumed by the sink          |

pub mod address;
pub mod command;
pub mod notification;
pub mod service;
