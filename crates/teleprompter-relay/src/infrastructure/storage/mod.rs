//! Storage infrastructure: the `relay.toml` configuration file.

pub mod config;

pub use config::{load_config, save_config, ConfigError, RelayFileConfig};
