//! Secret store API and database password generation.
//!
//! The generated database password is stored as a base64-encoded secret
//! version and read back at container creation time.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use rand::Rng;
use serde::Deserialize;
use serde_json::json;

use super::client::{CloudClient, CloudError};

pub const PASSWORD_LENGTH: usize = 32;
const PASSWORD_ATTEMPTS: usize = 100;

const LOWER: &str = "abcdefghijklmnopqrstuvwxyz";
const UPPER: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const DIGITS: &str = "0123456789";
const PUNCTUATION: &str = "!\"#$%&'()*+,-./:;<=>?@[\\]^_`{|}~";

/// Generate a random database password.
///
/// The managed database rejects passwords missing any of the four character
/// classes, so draws are repeated until one contains all of them.
pub fn generate_database_password() -> Result<String, CloudError> {
    let charset: Vec<char> = format!("{LOWER}{UPPER}{DIGITS}{PUNCTUATION}").chars().collect();
    let mut rng = rand::rng();

    for _ in 0..PASSWORD_ATTEMPTS {
        let password: String = (0..PASSWORD_LENGTH)
            .map(|_| charset[rng.random_range(0..charset.len())])
            .collect();

        if password.chars().any(|c| c.is_ascii_lowercase())
            && password.chars().any(|c| c.is_ascii_uppercase())
            && password.chars().any(|c| c.is_ascii_digit())
            && password.chars().any(|c| PUNCTUATION.contains(c))
        {
            return Ok(password);
        }
    }

    Err(CloudError::Decode("could not generate a valid password".to_string()))
}

pub fn encode_secret_data(data: &str) -> String {
    BASE64.encode(data.as_bytes())
}

pub fn decode_secret_data(data: &str) -> Result<String, CloudError> {
    let bytes = BASE64
        .decode(data)
        .map_err(|e| CloudError::Decode(format!("invalid secret payload: {e}")))?;
    String::from_utf8(bytes).map_err(|e| CloudError::Decode(format!("invalid secret payload: {e}")))
}

#[derive(Debug, Clone, Deserialize)]
pub struct Secret {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct SecretVersionData {
    data: String,
}

/// Secret store operations.
///
/// Lookups return the API error untouched so callers can apply their own
/// not-found policy (fatal on read, satisfied on delete).
#[async_trait]
pub trait SecretsApi: Send + Sync {
    async fn get_secret_by_name(&self, name: &str) -> Result<Secret, CloudError>;
    async fn create_secret(&self, name: &str, description: &str) -> Result<Secret, CloudError>;
    async fn create_secret_version(&self, secret_id: &str, data: &str) -> Result<(), CloudError>;
    /// Access the latest version's payload, base64-encoded.
    async fn access_latest_version(&self, name: &str) -> Result<String, CloudError>;
    async fn delete_secret(&self, id: &str) -> Result<(), CloudError>;
}

pub struct SecretsClient {
    cloud: CloudClient,
}

impl SecretsClient {
    pub fn new(cloud: CloudClient) -> Self {
        Self { cloud }
    }

    fn base(&self) -> String {
        format!("/secret-manager/v1alpha1/regions/{}", self.cloud.region)
    }
}

#[async_trait]
impl SecretsApi for SecretsClient {
    async fn get_secret_by_name(&self, name: &str) -> Result<Secret, CloudError> {
        self.cloud.get(&format!("{}/secrets-by-name/{name}", self.base())).await
    }

    async fn create_secret(&self, name: &str, description: &str) -> Result<Secret, CloudError> {
        let body = json!({
            "name": name,
            "project_id": self.cloud.project_id,
            "tags": ["gwctl"],
            "description": description,
        });
        self.cloud.post(&format!("{}/secrets", self.base()), &body).await
    }

    async fn create_secret_version(&self, secret_id: &str, data: &str) -> Result<(), CloudError> {
        let body = json!({ "data": data });
        let _: serde_json::Value = self
            .cloud
            .post(&format!("{}/secrets/{secret_id}/versions", self.base()), &body)
            .await?;
        Ok(())
    }

    async fn access_latest_version(&self, name: &str) -> Result<String, CloudError> {
        let version: SecretVersionData = self
            .cloud
            .get(&format!(
                "{}/secrets-by-name/{name}/versions/latest/access",
                self.base()
            ))
            .await?;
        Ok(version.data)
    }

    async fn delete_secret(&self, id: &str) -> Result<(), CloudError> {
        self.cloud.delete(&format!("{}/secrets/{id}", self.base())).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_password_has_all_classes() {
        let password = generate_database_password().unwrap();
        assert_eq!(password.len(), PASSWORD_LENGTH);
        assert!(password.chars().any(|c| c.is_ascii_lowercase()));
        assert!(password.chars().any(|c| c.is_ascii_uppercase()));
        assert!(password.chars().any(|c| c.is_ascii_digit()));
        assert!(password.chars().any(|c| PUNCTUATION.contains(c)));
    }

    #[test]
    fn test_secret_data_round_trip() {
        let encoded = encode_secret_data("s3cret!");
        assert_eq!(decode_secret_data(&encoded).unwrap(), "s3cret!");
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode_secret_data("not base64 at all!!").is_err());
    }
}
