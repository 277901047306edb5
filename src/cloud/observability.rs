//! Observability workspace (cockpit) API: activation and metrics tokens.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use super::client::{CloudClient, CloudError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CockpitStatus {
    Ready,
    Error,
    Creating,
    Updating,
    Deleting,
    #[serde(other)]
    Unknown,
}

impl CockpitStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Ready | Self::Error)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CockpitEndpoints {
    pub metrics_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Cockpit {
    pub project_id: String,
    pub status: CockpitStatus,
    #[serde(default)]
    pub endpoints: Option<CockpitEndpoints>,
}

impl Cockpit {
    /// URL the gateway pushes metrics to.
    pub fn metrics_push_url(&self) -> Option<String> {
        self.endpoints
            .as_ref()
            .map(|e| format!("{}/api/v1/push", e.metrics_url))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CockpitToken {
    pub id: String,
    pub name: String,
    /// Only present in the creation response.
    #[serde(default)]
    pub secret_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenList {
    tokens: Vec<CockpitToken>,
}

#[async_trait]
pub trait ObservabilityApi: Send + Sync {
    /// Fetch the cockpit; a 404 means it has not been activated yet.
    async fn get_cockpit(&self) -> Result<Cockpit, CloudError>;
    async fn activate_cockpit(&self) -> Result<Cockpit, CloudError>;
    async fn list_tokens(&self) -> Result<Vec<CockpitToken>, CloudError>;
    async fn create_token(&self, name: &str) -> Result<CockpitToken, CloudError>;
    async fn delete_token(&self, id: &str) -> Result<(), CloudError>;
}

pub struct ObservabilityClient {
    cloud: CloudClient,
}

impl ObservabilityClient {
    pub fn new(cloud: CloudClient) -> Self {
        Self { cloud }
    }
}

const BASE: &str = "/cockpit/v1beta1";

#[async_trait]
impl ObservabilityApi for ObservabilityClient {
    async fn get_cockpit(&self) -> Result<Cockpit, CloudError> {
        self.cloud
            .get(&format!("{BASE}/cockpit?project_id={}", self.cloud.project_id))
            .await
    }

    async fn activate_cockpit(&self) -> Result<Cockpit, CloudError> {
        let body = json!({ "project_id": self.cloud.project_id });
        self.cloud.post(&format!("{BASE}/activate"), &body).await
    }

    async fn list_tokens(&self) -> Result<Vec<CockpitToken>, CloudError> {
        let list: TokenList = self
            .cloud
            .get(&format!("{BASE}/tokens?project_id={}", self.cloud.project_id))
            .await?;
        Ok(list.tokens)
    }

    async fn create_token(&self, name: &str) -> Result<CockpitToken, CloudError> {
        let body = json!({
            "project_id": self.cloud.project_id,
            "name": name,
            "scopes": {
                "query_metrics": false,
                "write_metrics": true,
                "setup_metrics_rules": false,
                "query_logs": false,
                "write_logs": false,
                "setup_logs_rules": false,
                "setup_alerts": false,
            },
        });
        self.cloud.post(&format!("{BASE}/tokens"), &body).await
    }

    async fn delete_token(&self, id: &str) -> Result<(), CloudError> {
        self.cloud.delete(&format!("{BASE}/tokens/{id}")).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_metrics_push_url() {
        let cockpit: Cockpit = serde_json::from_value(json!({
            "project_id": "proj",
            "status": "ready",
            "endpoints": { "metrics_url": "https://metrics.example.com" },
        }))
        .unwrap();
        assert_eq!(
            cockpit.metrics_push_url().unwrap(),
            "https://metrics.example.com/api/v1/push"
        );
    }

    #[test]
    fn test_cockpit_without_endpoints() {
        let cockpit: Cockpit = serde_json::from_value(json!({
            "project_id": "proj",
            "status": "creating",
        }))
        .unwrap();
        assert!(cockpit.metrics_push_url().is_none());
    }
}
