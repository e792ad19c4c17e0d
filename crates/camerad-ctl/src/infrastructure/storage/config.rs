//! TOML-based configuration for the control client.
//!
//! The configuration file lists the controller hosts and a few camera
//! defaults:
//!
//! ```toml
//! [camera]
//! default_acf = "/data/acf/science.acf"
//!
//! [[hosts]]
//! name = "camera1"
//! address = "192.168.1.3"
//! port = 62018
//!
//! [[hosts]]
//! name = "camera2"
//! address = "192.168.1.4"
//! port = 62018
//! ```
//!
//! Fields annotated with `#[serde(default = "some_fn")]` use the return
//! value of `some_fn()` when absent from the file, so the client works on
//! first run (no file at all falls back to a single localhost entry) and
//! with older files missing newer fields.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::infrastructure::network::HostEntry;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
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

    /// The host list parsed but is unusable.
    #[error("config lists no hosts")]
    NoHosts,
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level client configuration read from disk.  The client never writes
/// the file back; operators edit it by hand.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ClientConfig {
    #[serde(default)]
    pub camera: CameraDefaults,
    #[serde(default = "default_hosts")]
    pub hosts: Vec<HostConfigEntry>,
}

/// Camera-wide defaults applied at session start.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct CameraDefaults {
    /// ACF firmware file loaded by a bare `load` command, if the
    /// controllers should not use their built-in default.
    #[serde(default)]
    pub default_acf: Option<PathBuf>,
    /// `tracing` log level used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for CameraDefaults {
    fn default() -> Self {
        Self {
            default_acf: None,
            log_level: default_log_level(),
        }
    }
}

/// One controller host entry.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct HostConfigEntry {
    /// Human-readable camera name, also the broadcast reply label.
    pub name: String,
    /// IP address or DNS name of the controller daemon.
    pub address: String,
    /// TCP port of the controller's blocking command socket.
    #[serde(default = "default_port")]
    pub port: u16,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_log_level() -> String {
    "info".to_string()
}

fn default_port() -> u16 {
    3031
}

fn default_hosts() -> Vec<HostConfigEntry> {
    vec![HostConfigEntry {
        name: "localhost".to_string(),
        address: "127.0.0.1".to_string(),
        port: default_port(),
    }]
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            camera: CameraDefaults::default(),
            hosts: default_hosts(),
        }
    }
}

impl ClientConfig {
    /// Converts the configured hosts into the network layer's entries,
    /// preserving file order.
    pub fn host_entries(&self) -> Vec<HostEntry> {
        self.hosts
            .iter()
            .map(|h| HostEntry {
                name: h.name.clone(),
                address: h.address.clone(),
                port: h.port,
            })
            .collect()
    }
}

/// Parses a configuration from TOML text.
pub fn parse(text: &str) -> Result<ClientConfig, ConfigError> {
    let config: ClientConfig = toml::from_str(text)?;
    if config.hosts.is_empty() {
        return Err(ConfigError::NoHosts);
    }
    Ok(config)
}

/// Loads the configuration file at `path`, or the built-in defaults when
/// `path` is `None`.  A missing explicit file is an error; only the
/// implicit default tolerates absence.
pub fn load_or_default(path: Option<&Path>) -> Result<ClientConfig, ConfigError> {
    match path {
        Some(path) => {
            let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            parse(&text)
        }
        None => Ok(ClientConfig::default()),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
