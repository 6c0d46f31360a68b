//! TOML-based configuration file for the relay.
//!
//! Reads and writes [`RelayFileConfig`] at the platform-appropriate path:
//! - Windows:  `%APPDATA%\Teleprompter\relay.toml`
//! - Linux:    `~/.config/teleprompter/relay.toml`
//! - macOS:    `~/Library/Application Support/Teleprompter/relay.toml`
//!
//! ```toml
//! [relay]
//! port = 3000
//! bind_address = "0.0.0.0"
//! retry_interval_ms = 1000
//! log_level = "info"
//!
//! [advertisement]
//! enabled = true
//! name = "Teleprompter"
//! protocol = "http"
//! ```
//!
//! Every field has a serde default, so an empty file, a file from an older
//! version, or no file at all all produce a working configuration.

use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use teleprompter_core::domain::service::{
    DEFAULT_RELAY_PORT, DEFAULT_SERVICE_NAME, DEFAULT_SERVICE_PROTOCOL,
};
use thiserror::Error;

use crate::domain::RelayConfig;

const CONFIG_FILE_NAME: &str = "relay.toml";

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// A field parsed as TOML but holds an unusable value.
    #[error("invalid value {value:?} for `{field}`")]
    InvalidValue { field: &'static str, value: String },
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level relay configuration stored on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RelayFileConfig {
    #[serde(default)]
    pub relay: RelaySection,
    #[serde(default)]
    pub advertisement: AdvertisementSection,
}

/// Listener and runtime settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RelaySection {
    /// TCP port for the WebSocket listener.
    #[serde(default = "default_port")]
    pub port: u16,
    /// IP address to bind to.  `"0.0.0.0"` binds all interfaces.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// Delay between address-resolution attempts, in milliseconds.
    #[serde(default = "default_retry_interval_ms")]
    pub retry_interval_ms: u64,
    /// `tracing` log level: `"error"`, `"warn"`, `"info"`, `"debug"`, `"trace"`.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// LAN advertisement settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AdvertisementSection {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Instance name shown to browsing clients.
    #[serde(default = "default_service_name")]
    pub name: String,
    /// Transport tag, e.g. `"http"` for `_http._tcp.local.`.
    #[serde(default = "default_service_protocol")]
    pub protocol: String,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_port() -> u16 {
    DEFAULT_RELAY_PORT
}
fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}
fn default_retry_interval_ms() -> u64 {
    1000
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_true() -> bool {
    true
}
fn default_service_name() -> String {
    DEFAULT_SERVICE_NAME.to_string()
}
fn default_service_protocol() -> String {
    DEFAULT_SERVICE_PROTOCOL.to_string()
}

impl Default for RelaySection {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind_address: default_bind_address(),
            retry_interval_ms: default_retry_interval_ms(),
            log_level: default_log_level(),
        }
    }
}

impl Default for AdvertisementSection {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            name: default_service_name(),
            protocol: default_service_protocol(),
        }
    }
}

impl RelayFileConfig {
    /// Converts the file representation into runtime settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if `bind_address` is not an IP
    /// address, or if the service name or protocol is empty.
    pub fn to_relay_config(&self) -> Result<RelayConfig, ConfigError> {
        let ip: IpAddr = self
            .relay
            .bind_address
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue {
                field: "relay.bind_address",
                value: self.relay.bind_address.clone(),
            })?;

        let name = self.advertisement.name.trim();
        if name.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "advertisement.name",
                value: self.advertisement.name.clone(),
            });
        }
        let protocol = self.advertisement.protocol.trim();
        if protocol.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "advertisement.protocol",
                value: self.advertisement.protocol.clone(),
            });
        }

        Ok(RelayConfig {
            bind_addr: SocketAddr::new(ip, self.relay.port),
            service_name: name.to_string(),
            service_protocol: protocol.to_string(),
            retry_interval: Duration::from_millis(self.relay.retry_interval_ms),
            advertise: self.advertisement.enabled,
        })
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Determines the platform-appropriate directory for the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] when the platform config base
/// directory cannot be determined from the environment.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    platform_config_dir().ok_or(ConfigError::NoPlatformConfigDir)
}

/// Resolves the full path to the default config file.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Loads the config from `path`, or from the platform default location when
/// `path` is `None`.  A missing file yields [`RelayFileConfig::default`].
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config(path: Option<&Path>) -> Result<RelayFileConfig, ConfigError> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => config_file_path()?,
    };

    match std::fs::read_to_string(&path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(RelayFileConfig::default()),
        Err(e) => Err(ConfigError::Io { path, source: e }),
    }
}

/// Persists `config` to `path`, creating parent directories as needed.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config(config: &RelayFileConfig, path: &Path) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("Teleprompter"))
    }

    #[cfg(target_os = "linux")]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("teleprompter"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("Teleprompter")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_config_path(tag: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("teleprompter-relay-test-{tag}-{}", uuid::Uuid::new_v4()))
            .join(CONFIG_FILE_NAME)
    }

    #[test]
    fn test_default_file_config_matches_runtime_defaults() {
        // Arrange
        let file = RelayFileConfig::default();

        // Act
        let cfg = file.to_relay_config().unwrap();

        // Assert
        let runtime = RelayConfig::default();
        assert_eq!(cfg.bind_addr, runtime.bind_addr);
        assert_eq!(cfg.retry_interval, runtime.retry_interval);
        assert_eq!(cfg.service_name, runtime.service_name);
        assert_eq!(cfg.service_protocol, runtime.service_protocol);
        assert_eq!(cfg.advertise, runtime.advertise);
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let cfg: RelayFileConfig = toml::from_str("").expect("deserialize empty");
        assert_eq!(cfg, RelayFileConfig::default());
    }

    #[test]
    fn test_partial_section_overrides_only_given_fields() {
        // Arrange
        let toml_str = r#"
[relay]
port = 4000

[advertisement]
enabled = false
"#;

        // Act
        let cfg: RelayFileConfig = toml::from_str(toml_str).expect("deserialize partial");

        // Assert
        assert_eq!(cfg.relay.port, 4000);
        assert_eq!(cfg.relay.bind_address, "0.0.0.0");
        assert_eq!(cfg.relay.log_level, "info");
        assert!(!cfg.advertisement.enabled);
        assert_eq!(cfg.advertisement.name, "Teleprompter");
    }

    #[test]
    fn test_to_relay_config_converts_units() {
        let mut file = RelayFileConfig::default();
        file.relay.bind_address = "127.0.0.1".to_string();
        file.relay.port = 0;
        file.relay.retry_interval_ms = 250;

        let cfg = file.to_relay_config().unwrap();

        assert_eq!(cfg.bind_addr, "127.0.0.1:0".parse().unwrap());
        assert_eq!(cfg.retry_interval, Duration::from_millis(250));
    }

    #[test]
    fn test_to_relay_config_rejects_bad_bind_address() {
        let mut file = RelayFileConfig::default();
        file.relay.bind_address = "not-an-ip".to_string();

        let result = file.to_relay_config();

        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { field: "relay.bind_address", .. })
        ));
    }

    #[test]
    fn test_to_relay_config_rejects_empty_service_name() {
        let mut file = RelayFileConfig::default();
        file.advertisement.name = "  ".to_string();
        assert!(matches!(
            file.to_relay_config(),
            Err(ConfigError::InvalidValue { field: "advertisement.name", .. })
        ));
    }

    #[test]
    fn test_malformed_toml_is_parse_error() {
        // Arrange
        let path = temp_config_path("malformed");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "[relay\nport = ").unwrap();

        // Act
        let result = load_config(Some(&path));

        // Assert
        assert!(matches!(result, Err(ConfigError::Parse(_))));
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let path = temp_config_path("missing");
        let cfg = load_config(Some(&path)).expect("missing file is not an error");
        assert_eq!(cfg, RelayFileConfig::default());
    }

    #[test]
    fn test_save_then_load_preserves_values() {
        // Arrange
        let path = temp_config_path("save");
        let mut cfg = RelayFileConfig::default();
        cfg.relay.port = 3100;
        cfg.advertisement.name = "Studio B".to_string();

        // Act
        save_config(&cfg, &path).expect("save");
        let restored = load_config(Some(&path)).expect("load");

        // Assert
        assert_eq!(restored, cfg);
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_config_file_path_ends_with_teleprompter_relay_toml() {
        if let Ok(path) = config_file_path() {
            assert!(path.ends_with("teleprompter/relay.toml"));
        }
    }
}
