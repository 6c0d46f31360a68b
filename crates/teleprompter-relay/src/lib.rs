//! teleprompter-relay library crate.
//!
//! The remote-control relay lets a phone drive the Teleprompter window: it
//! finds this machine's LAN address, advertises itself over mDNS, accepts
//! WebSocket clients and forwards their `command` events to the single
//! presentation surface.
//!
//! # Architecture
//!
//! ```text
//! Phone (JSON over WebSocket)
//!         ↓
//! [teleprompter-relay]
//!   ├── domain/           RelayConfig
//!   ├── application/
//!   │     ├── coordinator  startup, retry, fan-in queue, shutdown
//!   │     └── sink         PresentationSink trait
//!   └── infrastructure/
//!         ├── address      interface enumeration (get_if_addrs)
//!         ├── advertiser   mDNS publish/browse (mdns-sd)
//!         ├── hub          WebSocket accept loop (tokio-tungstenite)
//!         └── storage      relay.toml
//!         ↓
//! PresentationSink (the window)
//! ```
//!
//! # Layer rules
//!
//! - `domain` has no I/O.
//! - `application` depends on `domain`, `teleprompter-core` and on the
//!   infrastructure *traits* (`AddressResolver`, `ServiceAdvertiser`), never on
//!   a concrete adapter, so it is tested with in-memory doubles.
//! - `infrastructure` owns sockets, the mDNS daemon and the file system.

pub mod application;
pub mod domain;
pub mod infrastructure;
