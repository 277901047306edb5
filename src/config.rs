//! Persisted gateway configuration.
//!
//! After provisioning, the coordinates of the deployed gateway (admin and
//! public endpoints, admin token, database location) are written to a YAML
//! file under the user config directory. Route and consumer commands load
//! this snapshot instead of re-querying the cloud APIs on every run.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Database name inside a managed instance (fixed by the provider).
pub const DB_DATABASE_NAME: &str = "rdb";

/// Database name used by the local docker-compose stack.
pub const DB_DATABASE_NAME_LOCAL: &str = "kong";

/// Default config file location: `<config-dir>/gwctl/gateway.yml`
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("gwctl")
        .join("gateway.yml")
}

/// Errors that can occur loading or saving the gateway config
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("no gateway config found at {0}; run `gwctl infra deploy` or `gwctl dev config` first")]
    NotProvisioned(PathBuf),

    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// Coordinates of a deployed gateway.
///
/// Ports are optional: a `None` port means the endpoint is reached on the
/// protocol's default port and is omitted from assembled URLs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfraConfiguration {
    pub protocol: String,
    pub gw_admin_host: String,
    #[serde(default)]
    pub gw_admin_port: Option<u16>,
    #[serde(default)]
    pub gw_admin_token: Option<String>,
    pub gw_host: String,
    #[serde(default)]
    pub gw_port: Option<u16>,
    pub db_host: String,
    pub db_port: u16,
    pub db_name: String,
}

impl InfraConfiguration {
    /// Configuration for the local docker-compose stack.
    pub fn from_local() -> Self {
        Self {
            protocol: "http".to_string(),
            gw_admin_host: "localhost".to_string(),
            gw_admin_port: Some(8001),
            gw_admin_token: None,
            gw_host: "localhost".to_string(),
            gw_port: Some(8080),
            db_host: "localhost".to_string(),
            db_port: 5432,
            db_name: DB_DATABASE_NAME_LOCAL.to_string(),
        }
    }

    /// Public URL of the gateway.
    pub fn gw_url(&self) -> String {
        join_url(&self.protocol, &self.gw_host, self.gw_port)
    }

    /// URL of the Kong admin API.
    pub fn gw_admin_url(&self) -> String {
        join_url(&self.protocol, &self.gw_admin_host, self.gw_admin_port)
    }

    /// Load the configuration from the default path.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&default_config_path())
    }

    /// Load the configuration from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotProvisioned(path.to_path_buf()));
        }
        let raw = fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&raw)?)
    }

    /// Save the configuration to the default path, returning that path.
    pub fn save(&self) -> Result<PathBuf, ConfigError> {
        let path = default_config_path();
        self.save_to(&path)?;
        Ok(path)
    }

    /// Save the configuration to an explicit path, creating parent
    /// directories as needed.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let raw = serde_yaml::to_string(self)?;
        fs::write(path, raw)?;
        Ok(())
    }
}

fn join_url(protocol: &str, host: &str, port: Option<u16>) -> String {
    match port {
        Some(port) => format!("{protocol}://{host}:{port}"),
        None => format!("{protocol}://{host}"),
    }
}
