//! Serverless containers API: namespaces, containers, tokens and domains.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::client::{CloudClient, CloudError};

// ============================================================================
// Wire types
// ============================================================================

/// Status of a container namespace.
///
/// Only `ready` and `error` are terminal; the rest are transient and the
/// wire set is open-ended, so unknown values map to [`Self::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamespaceStatus {
    Ready,
    Error,
    Creating,
    Pending,
    Deleting,
    Locked,
    #[serde(other)]
    Unknown,
}

impl NamespaceStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Ready | Self::Error)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerStatus {
    Ready,
    Error,
    Creating,
    Pending,
    Deleting,
    Locked,
    #[serde(other)]
    Unknown,
}

impl ContainerStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Ready | Self::Error)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainStatus {
    Ready,
    Error,
    Creating,
    Pending,
    Deleting,
    #[serde(other)]
    Unknown,
}

impl DomainStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Ready | Self::Error)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Namespace {
    pub id: String,
    pub name: String,
    pub status: NamespaceStatus,
    #[serde(default)]
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Container {
    pub id: String,
    pub name: String,
    pub status: ContainerStatus,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub domain_name: String,
    #[serde(default)]
    pub environment_variables: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContainerToken {
    pub id: String,
    pub token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Domain {
    pub id: String,
    pub hostname: String,
    pub status: DomainStatus,
    #[serde(default)]
    pub error_message: Option<String>,
}

/// A secret-valued environment variable.
#[derive(Debug, Clone, Serialize)]
pub struct SecretVar {
    pub key: String,
    pub value: String,
}

/// Privacy of a container endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerPrivacy {
    Public,
    Private,
}

/// Creation/update payload for a container.
///
/// `namespace_id` and `name` identify the container at creation time and
/// must be stripped for updates (the PATCH endpoint rejects them).
#[derive(Debug, Clone, Serialize)]
pub struct ContainerSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub memory_limit: u32,
    pub min_scale: u32,
    pub max_scale: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    pub privacy: ContainerPrivacy,
    pub protocol: String,
    pub http_option: String,
    pub registry_image: String,
    pub environment_variables: HashMap<String, String>,
    pub secret_environment_variables: Vec<SecretVar>,
}

impl ContainerSpec {
    /// Strip the creation-only identity fields for a PATCH.
    pub fn for_update(mut self) -> Self {
        self.namespace_id = None;
        self.name = None;
        self
    }
}

#[derive(Debug, Deserialize)]
struct NamespaceList {
    namespaces: Vec<Namespace>,
}

#[derive(Debug, Deserialize)]
struct ContainerList {
    containers: Vec<Container>,
}

#[derive(Debug, Deserialize)]
struct DomainList {
    domains: Vec<Domain>,
}

// ============================================================================
// API trait + implementation
// ============================================================================

#[async_trait]
pub trait ContainersApi: Send + Sync {
    async fn get_namespace_by_name(&self, name: &str) -> Result<Option<Namespace>, CloudError>;
    async fn create_namespace(&self, name: &str) -> Result<Namespace, CloudError>;
    async fn get_namespace(&self, id: &str) -> Result<Namespace, CloudError>;
    async fn delete_namespace(&self, id: &str) -> Result<(), CloudError>;

    async fn get_container_by_name(
        &self,
        namespace_id: &str,
        name: &str,
    ) -> Result<Option<Container>, CloudError>;
    async fn create_container(&self, spec: &ContainerSpec) -> Result<Container, CloudError>;
    async fn update_container(
        &self,
        id: &str,
        spec: &ContainerSpec,
    ) -> Result<Container, CloudError>;
    async fn get_container(&self, id: &str) -> Result<Container, CloudError>;
    async fn deploy_container(&self, id: &str) -> Result<(), CloudError>;
    async fn delete_container(&self, id: &str) -> Result<(), CloudError>;

    async fn create_container_token(&self, container_id: &str)
        -> Result<ContainerToken, CloudError>;

    async fn list_domains(&self, container_id: &str) -> Result<Vec<Domain>, CloudError>;
    async fn create_domain(
        &self,
        container_id: &str,
        hostname: &str,
    ) -> Result<Domain, CloudError>;
    async fn get_domain(&self, id: &str) -> Result<Domain, CloudError>;
    async fn delete_domain(&self, id: &str) -> Result<(), CloudError>;
}

pub struct ContainersClient {
    cloud: CloudClient,
}

impl ContainersClient {
    pub fn new(cloud: CloudClient) -> Self {
        Self { cloud }
    }

    fn base(&self) -> String {
        format!("/containers/v1beta1/regions/{}", self.cloud.region)
    }
}

#[async_trait]
impl ContainersApi for ContainersClient {
    async fn get_namespace_by_name(&self, name: &str) -> Result<Option<Namespace>, CloudError> {
        let list: NamespaceList = self
            .cloud
            .get(&format!("{}/namespaces?name={name}", self.base()))
            .await?;
        // The API name filter matches substrings
        Ok(list.namespaces.into_iter().find(|ns| ns.name == name))
    }

    async fn create_namespace(&self, name: &str) -> Result<Namespace, CloudError> {
        let body = json!({ "name": name, "project_id": self.cloud.project_id });
        self.cloud.post(&format!("{}/namespaces", self.base()), &body).await
    }

    async fn get_namespace(&self, id: &str) -> Result<Namespace, CloudError> {
        self.cloud.get(&format!("{}/namespaces/{id}", self.base())).await
    }

    async fn delete_namespace(&self, id: &str) -> Result<(), CloudError> {
        self.cloud.delete(&format!("{}/namespaces/{id}", self.base())).await
    }

    async fn get_container_by_name(
        &self,
        namespace_id: &str,
        name: &str,
    ) -> Result<Option<Container>, CloudError> {
        let list: ContainerList = self
            .cloud
            .get(&format!(
                "{}/containers?namespace_id={namespace_id}&name={name}",
                self.base()
            ))
            .await?;
        Ok(list.containers.into_iter().find(|c| c.name == name))
    }

    async fn create_container(&self, spec: &ContainerSpec) -> Result<Container, CloudError> {
        let body = serde_json::to_value(spec).map_err(|e| CloudError::Decode(e.to_string()))?;
        self.cloud.post(&format!("{}/containers", self.base()), &body).await
    }

    async fn update_container(
        &self,
        id: &str,
        spec: &ContainerSpec,
    ) -> Result<Container, CloudError> {
        let body = serde_json::to_value(spec).map_err(|e| CloudError::Decode(e.to_string()))?;
        self.cloud.patch(&format!("{}/containers/{id}", self.base()), &body).await
    }

    async fn get_container(&self, id: &str) -> Result<Container, CloudError> {
        self.cloud.get(&format!("{}/containers/{id}", self.base())).await
    }

    async fn deploy_container(&self, id: &str) -> Result<(), CloudError> {
        let _: serde_json::Value = self
            .cloud
            .post(&format!("{}/containers/{id}/deploy", self.base()), &json!({}))
            .await?;
        Ok(())
    }

    async fn delete_container(&self, id: &str) -> Result<(), CloudError> {
        self.cloud.delete(&format!("{}/containers/{id}", self.base())).await
    }

    async fn create_container_token(
        &self,
        container_id: &str,
    ) -> Result<ContainerToken, CloudError> {
        let body = json!({ "container_id": container_id });
        self.cloud.post(&format!("{}/tokens", self.base()), &body).await
    }

    async fn list_domains(&self, container_id: &str) -> Result<Vec<Domain>, CloudError> {
        let list: DomainList = self
            .cloud
            .get(&format!("{}/domains?container_id={container_id}", self.base()))
            .await?;
        Ok(list.domains)
    }

    async fn create_domain(
        &self,
        container_id: &str,
        hostname: &str,
    ) -> Result<Domain, CloudError> {
        let body = json!({ "container_id": container_id, "hostname": hostname });
        self.cloud.post(&format!("{}/domains", self.base()), &body).await
    }

    async fn get_domain(&self, id: &str) -> Result<Domain, CloudError> {
        self.cloud.get(&format!("{}/domains/{id}", self.base())).await
    }

    async fn delete_domain(&self, id: &str) -> Result<(), CloudError> {
        self.cloud.delete(&format!("{}/domains/{id}", self.base())).await
    }
}
