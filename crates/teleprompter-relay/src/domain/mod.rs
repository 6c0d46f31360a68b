//! Domain layer for teleprompter-relay.
//!
//! Holds the relay's runtime configuration.  The values that flow through the
//! relay (addresses, commands, notifications) live in `teleprompter-core`
//! because the host application needs them too.

pub mod config;

pub use config::{RelayConfig, DEFAULT_RETRY_INTERVAL};
