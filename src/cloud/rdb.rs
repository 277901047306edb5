//! Managed relational database API.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use super::client::{CloudClient, CloudError};

pub const DB_ENGINE: &str = "PostgreSQL-14";
pub const DB_USERNAME: &str = "kong";
pub const DB_NODE_TYPE: &str = "DB-DEV-S";
pub const DB_VOLUME_TYPE: &str = "lssd";
/// Volume size in bytes (5 GB).
pub const DB_VOLUME_SIZE: u64 = 5_000_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceStatus {
    Ready,
    Error,
    Provisioning,
    Initializing,
    Configuring,
    Backuping,
    Autohealing,
    Restarting,
    Deleting,
    #[serde(other)]
    Unknown,
}

impl InstanceStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Ready | Self::Error)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Endpoint {
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(default)]
    pub hostname: Option<String>,
    pub port: u16,
}

impl Endpoint {
    /// The address to connect to: IP when published, hostname otherwise.
    pub fn address(&self) -> Option<&str> {
        self.ip.as_deref().or(self.hostname.as_deref())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Instance {
    pub id: String,
    pub name: String,
    pub status: InstanceStatus,
    #[serde(default)]
    pub endpoints: Vec<Endpoint>,
}

#[derive(Debug, Deserialize)]
struct InstanceList {
    instances: Vec<Instance>,
}

#[async_trait]
pub trait DatabaseApi: Send + Sync {
    async fn get_instance_by_name(&self, name: &str) -> Result<Option<Instance>, CloudError>;
    async fn create_instance(&self, name: &str, password: &str) -> Result<Instance, CloudError>;
    async fn get_instance(&self, id: &str) -> Result<Instance, CloudError>;
    async fn delete_instance(&self, id: &str) -> Result<(), CloudError>;
}

pub struct DatabaseClient {
    cloud: CloudClient,
}

impl DatabaseClient {
    pub fn new(cloud: CloudClient) -> Self {
        Self { cloud }
    }

    fn base(&self) -> String {
        format!("/rdb/v1/regions/{}", self.cloud.region)
    }
}

#[async_trait]
impl DatabaseApi for DatabaseClient {
    async fn get_instance_by_name(&self, name: &str) -> Result<Option<Instance>, CloudError> {
        let list: InstanceList = self
            .cloud
            .get(&format!("{}/instances?name={name}", self.base()))
            .await?;
        Ok(list.instances.into_iter().find(|i| i.name == name))
    }

    async fn create_instance(&self, name: &str, password: &str) -> Result<Instance, CloudError> {
        let body = json!({
            "name": name,
            "engine": DB_ENGINE,
            "user_name": DB_USERNAME,
            "password": password,
            "is_ha_cluster": false,
            "disable_backup": true,
            "backup_same_region": true,
            "node_type": DB_NODE_TYPE,
            "volume_type": DB_VOLUME_TYPE,
            "volume_size": DB_VOLUME_SIZE,
            "project_id": self.cloud.project_id,
        });
        self.cloud.post(&format!("{}/instances", self.base()), &body).await
    }

    async fn get_instance(&self, id: &str) -> Result<Instance, CloudError> {
        self.cloud.get(&format!("{}/instances/{id}", self.base())).await
    }

    async fn delete_instance(&self, id: &str) -> Result<(), CloudError> {
        self.cloud.delete(&format!("{}/instances/{id}", self.base())).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_endpoint_prefers_ip() {
        let endpoint: Endpoint = serde_json::from_value(json!({
            "ip": "10.0.0.1", "hostname": "db.example.com", "port": 13306,
        }))
        .unwrap();
        assert_eq!(endpoint.address(), Some("10.0.0.1"));

        let hostname_only: Endpoint =
            serde_json::from_value(json!({ "hostname": "db.example.com", "port": 5432 })).unwrap();
        assert_eq!(hostname_only.address(), Some("db.example.com"));
    }

    #[test]
    fn test_transient_statuses_not_terminal() {
        for status in [
            InstanceStatus::Provisioning,
            InstanceStatus::Initializing,
            InstanceStatus::Configuring,
            InstanceStatus::Unknown,
        ] {
            assert!(!status.is_terminal());
        }
        assert!(InstanceStatus::Ready.is_terminal());
        assert!(InstanceStatus::Error.is_terminal());
    }
}
