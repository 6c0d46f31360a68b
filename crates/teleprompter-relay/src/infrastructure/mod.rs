//! Infrastructure layer: OS interfaces, mDNS, sockets and files.
//!
//! Every adapter the coordinator talks to sits behind a trait defined here
//! ([`AddressResolver`], [`ServiceAdvertiser`], [`HubListener`]) so the
//! application layer can be driven by in-memory doubles in tests.

pub mod address;
pub mod advertiser;
pub mod hub;
pub mod storage;

pub use address::{AddressResolver, SystemAddressResolver};
pub use advertiser::{AdvertiseError, MdnsAdvertiser, NoopAdvertiser, ServiceAdvertiser};
pub use hub::{ConnectionHub, ConnectionId, HubError, HubEvent, HubListener};
