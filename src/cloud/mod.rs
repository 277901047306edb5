//! Cloud provisioning APIs.
//!
//! One authenticated REST client ([`CloudClient`]) is shared by four API
//! families, each behind its own trait so the infra manager can be tested
//! without the network: containers/namespaces/domains, managed databases,
//! the secret store and the observability workspace.

pub mod client;
pub mod containers;
pub mod observability;
pub mod rdb;
pub mod secrets;

use std::env;
use std::fs;
use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;

pub use client::{CloudClient, CloudError};
pub use containers::{Container, ContainersApi, ContainersClient, Domain, Namespace};
pub use observability::{ObservabilityApi, ObservabilityClient};
pub use rdb::{DatabaseApi, DatabaseClient, Instance};
pub use secrets::{SecretsApi, SecretsClient};

pub const DEFAULT_API_URL: &str = "https://api.scaleway.com";
pub const DEFAULT_REGION: &str = "fr-par";

const ENV_SECRET_KEY: &str = "GWCTL_SECRET_KEY";
const ENV_PROJECT_ID: &str = "GWCTL_PROJECT_ID";
const ENV_REGION: &str = "GWCTL_REGION";
const ENV_API_URL: &str = "GWCTL_API_URL";
const ENV_PROFILE: &str = "GWCTL_PROFILE";

/// Location of the credential profiles file.
pub fn credentials_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("gwctl")
        .join("credentials.yml")
}

/// Errors loading cloud credentials
#[derive(Error, Debug)]
pub enum CredentialsError {
    #[error(
        "no cloud credentials found: set {ENV_SECRET_KEY} and {ENV_PROJECT_ID}, \
         or create a profile in {0}"
    )]
    Missing(PathBuf),

    #[error("unknown credentials profile {0:?}")]
    UnknownProfile(String),

    #[error("failed to read credentials file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse credentials file: {0}")]
    Parse(#[from] serde_yaml::Error),
}

#[derive(Debug, Deserialize)]
struct ProfilesFile {
    #[serde(default)]
    profiles: std::collections::HashMap<String, Profile>,
}

#[derive(Debug, Deserialize)]
struct Profile {
    secret_key: String,
    project_id: String,
    #[serde(default)]
    region: Option<String>,
    #[serde(default)]
    api_url: Option<String>,
}

/// Credentials and coordinates for the cloud account.
#[derive(Debug, Clone)]
pub struct CloudCredentials {
    pub secret_key: String,
    pub project_id: String,
    pub region: String,
    pub api_url: String,
}

impl CloudCredentials {
    /// Load credentials from the environment, falling back to the profiles
    /// file selected by `--profile` (or `GWCTL_PROFILE`, or `default`).
    pub fn load(profile: Option<&str>) -> Result<Self, CredentialsError> {
        if let (Ok(secret_key), Ok(project_id)) =
            (env::var(ENV_SECRET_KEY), env::var(ENV_PROJECT_ID))
        {
            return Ok(Self {
                secret_key,
                project_id,
                region: env::var(ENV_REGION).unwrap_or_else(|_| DEFAULT_REGION.to_string()),
                api_url: env::var(ENV_API_URL).unwrap_or_else(|_| DEFAULT_API_URL.to_string()),
            });
        }

        let path = credentials_path();
        if !path.exists() {
            return Err(CredentialsError::Missing(path));
        }

        let raw = fs::read_to_string(&path)?;
        let file: ProfilesFile = serde_yaml::from_str(&raw)?;

        let name = profile
            .map(str::to_string)
            .or_else(|| env::var(ENV_PROFILE).ok())
            .unwrap_or_else(|| "default".to_string());
        let profile = file
            .profiles
            .get(&name)
            .ok_or_else(|| CredentialsError::UnknownProfile(name))?;

        Ok(Self {
            secret_key: profile.secret_key.clone(),
            project_id: profile.project_id.clone(),
            region: profile.region.clone().unwrap_or_else(|| DEFAULT_REGION.to_string()),
            api_url: profile.api_url.clone().unwrap_or_else(|| DEFAULT_API_URL.to_string()),
        })
    }
}
