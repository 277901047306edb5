//! Shared REST client for the cloud provisioning APIs.
//!
//! No retries here: resource creation is asynchronous anyway and the poll
//! loops in `infra` absorb transience. Errors carry the status code so call
//! sites can decide policy (a 404 is fatal on a lookup, satisfied on a
//! delete).

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use super::CloudCredentials;

/// Errors from the cloud provisioning APIs
#[derive(Error, Debug)]
pub enum CloudError {
    #[error("cloud API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("cloud API request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected cloud API response: {0}")]
    Decode(String),
}

impl CloudError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether this is a "resource does not exist" answer from the API.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

/// Authenticated JSON client shared by all cloud API families.
#[derive(Clone)]
pub struct CloudClient {
    client: reqwest::Client,
    api_url: String,
    secret_key: String,
    pub region: String,
    pub project_id: String,
}

impl CloudClient {
    pub fn new(credentials: &CloudCredentials) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: credentials.api_url.clone(),
            secret_key: credentials.secret_key.clone(),
            region: credentials.region.clone(),
            project_id: credentials.project_id.clone(),
        }
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, CloudError> {
        self.request(Method::GET, path, None).await
    }

    pub async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &Value,
    ) -> Result<T, CloudError> {
        self.request(Method::POST, path, Some(body)).await
    }

    pub async fn patch<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &Value,
    ) -> Result<T, CloudError> {
        self.request(Method::PATCH, path, Some(body)).await
    }

    pub async fn delete(&self, path: &str) -> Result<(), CloudError> {
        self.request::<Value>(Method::DELETE, path, None).await?;
        Ok(())
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<T, CloudError> {
        let url = format!("{}{}", self.api_url, path);
        debug!("{method}: {url}");

        let mut req = self
            .client
            .request(method, &url)
            .header("X-Auth-Token", &self.secret_key);
        if let Some(body) = body {
            req = req.json(body);
        }

        let resp = req.send().await?;
        let status = resp.status();
        let text = resp.text().await?;
        debug!("response {}", status.as_u16());

        if !status.is_success() {
            let message = serde_json::from_str::<Value>(&text)
                .ok()
                .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
                .unwrap_or(text);
            return Err(CloudError::Api {
                status: status.as_u16(),
                message,
            });
        }

        if text.is_empty() {
            // DELETE endpoints answer 204 with no body
            serde_json::from_value(Value::Null).map_err(|e| CloudError::Decode(e.to_string()))
        } else {
            serde_json::from_str(&text).map_err(|e| CloudError::Decode(e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_detection() {
        let not_found = CloudError::Api {
            status: 404,
            message: "resource not found".to_string(),
        };
        let forbidden = CloudError::Api {
            status: 403,
            message: "denied".to_string(),
        };
        assert!(not_found.is_not_found());
        assert!(!forbidden.is_not_found());
    }
}
