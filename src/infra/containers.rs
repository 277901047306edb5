//! Well-known resource names and container spec assembly.
//!
//! Creation and update go through the same spec builders so the two paths
//! cannot drift apart.

use std::collections::HashMap;

use crate::cloud::containers::{ContainerPrivacy, ContainerSpec, SecretVar};
use crate::cloud::rdb::DB_USERNAME;
use crate::config::DB_DATABASE_NAME;

pub const NAMESPACE_NAME: &str = "kong-gw";

pub const GATEWAY_CONTAINER_NAME: &str = "kong-gw";
pub const GATEWAY_MIN_SCALE: u32 = 1;
pub const GATEWAY_MAX_SCALE: u32 = 5;

pub const ADMIN_CONTAINER_NAME: &str = "kong-gw-admin";
pub const ADMIN_MIN_SCALE: u32 = 1;
pub const ADMIN_MAX_SCALE: u32 = 1;
pub const ADMIN_PORT: u16 = 8001;

pub const CONTAINER_MEMORY_LIMIT: u32 = 1024;
pub const CONTAINER_PROTOCOL: &str = "http1";
pub const CONTAINER_HTTP_OPTION: &str = "redirected";

pub const IMAGE_TAG: &str = "rg.fr-par.scw.cloud/gwctl/kong-gateway:latest";

pub const DB_INSTANCE_NAME: &str = "kong-gw";
pub const DB_PASSWORD_SECRET_NAME: &str = "kong-gw-database-password";
pub const METRICS_TOKEN_NAME: &str = "kong-gw-write-metrics";

/// Metrics forwarding coordinates for the gateway container.
#[derive(Debug, Clone)]
pub struct MetricsTarget {
    pub token: String,
    pub push_url: String,
}

fn base_env(db_host: &str, db_port: u16) -> HashMap<String, String> {
    HashMap::from([
        ("KONG_PG_HOST".to_string(), db_host.to_string()),
        ("KONG_PG_PORT".to_string(), db_port.to_string()),
        ("KONG_PG_DATABASE".to_string(), DB_DATABASE_NAME.to_string()),
        ("KONG_PG_USER".to_string(), DB_USERNAME.to_string()),
    ])
}

fn base_secret_env(db_password: &str) -> Vec<SecretVar> {
    vec![SecretVar {
        key: "KONG_PG_PASSWORD".to_string(),
        value: db_password.to_string(),
    }]
}

/// Spec for the public gateway container.
///
/// Metrics forwarding is optional: when a target is given the push URL goes
/// into the plain environment and the token into the secret environment.
pub fn gateway_spec(
    namespace_id: &str,
    db_host: &str,
    db_port: u16,
    db_password: &str,
    metrics: Option<&MetricsTarget>,
) -> ContainerSpec {
    let mut env = base_env(db_host, db_port);
    let mut secret_env = base_secret_env(db_password);

    if let Some(metrics) = metrics {
        env.insert("FORWARD_METRICS".to_string(), "1".to_string());
        env.insert("COCKPIT_METRICS_PUSH_URL".to_string(), metrics.push_url.clone());
        secret_env.push(SecretVar {
            key: "COCKPIT_METRICS_TOKEN".to_string(),
            value: metrics.token.clone(),
        });
    }

    ContainerSpec {
        namespace_id: Some(namespace_id.to_string()),
        name: Some(GATEWAY_CONTAINER_NAME.to_string()),
        memory_limit: CONTAINER_MEMORY_LIMIT,
        min_scale: GATEWAY_MIN_SCALE,
        max_scale: GATEWAY_MAX_SCALE,
        port: None,
        privacy: ContainerPrivacy::Public,
        protocol: CONTAINER_PROTOCOL.to_string(),
        http_option: CONTAINER_HTTP_OPTION.to_string(),
        registry_image: IMAGE_TAG.to_string(),
        environment_variables: env,
        secret_environment_variables: secret_env,
    }
}

/// Spec for the private admin container.
pub fn admin_spec(
    namespace_id: &str,
    db_host: &str,
    db_port: u16,
    db_password: &str,
) -> ContainerSpec {
    let mut env = base_env(db_host, db_port);
    env.insert("IS_ADMIN_CONTAINER".to_string(), "1".to_string());

    ContainerSpec {
        namespace_id: Some(namespace_id.to_string()),
        name: Some(ADMIN_CONTAINER_NAME.to_string()),
        memory_limit: CONTAINER_MEMORY_LIMIT,
        min_scale: ADMIN_MIN_SCALE,
        max_scale: ADMIN_MAX_SCALE,
        port: Some(ADMIN_PORT),
        privacy: ContainerPrivacy::Private,
        protocol: CONTAINER_PROTOCOL.to_string(),
        http_option: CONTAINER_HTTP_OPTION.to_string(),
        registry_image: IMAGE_TAG.to_string(),
        environment_variables: env,
        secret_environment_variables: base_secret_env(db_password),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_spec_without_metrics() {
        let spec = gateway_spec("ns-1", "10.0.0.1", 13306, "pw", None);
        assert_eq!(spec.privacy, ContainerPrivacy::Public);
        assert_eq!(spec.port, None);
        assert_eq!(spec.max_scale, 5);
        assert_eq!(spec.environment_variables["KONG_PG_HOST"], "10.0.0.1");
        assert_eq!(spec.environment_variables["KONG_PG_PORT"], "13306");
        assert!(!spec.environment_variables.contains_key("FORWARD_METRICS"));
        assert_eq!(spec.secret_environment_variables.len(), 1);
        assert_eq!(spec.secret_environment_variables[0].key, "KONG_PG_PASSWORD");
    }

    #[test]
    fn test_gateway_spec_with_metrics() {
        let metrics = MetricsTarget {
            token: "tok".to_string(),
            push_url: "https://metrics.example.com/api/v1/push".to_string(),
        };
        let spec = gateway_spec("ns-1", "10.0.0.1", 13306, "pw", Some(&metrics));
        assert_eq!(spec.environment_variables["FORWARD_METRICS"], "1");
        assert_eq!(
            spec.environment_variables["COCKPIT_METRICS_PUSH_URL"],
            "https://metrics.example.com/api/v1/push"
        );
        assert!(spec
            .secret_environment_variables
            .iter()
            .any(|s| s.key == "COCKPIT_METRICS_TOKEN" && s.value == "tok"));
    }

    #[test]
    fn test_admin_spec_is_private_with_port() {
        let spec = admin_spec("ns-1", "10.0.0.1", 13306, "pw");
        assert_eq!(spec.privacy, ContainerPrivacy::Private);
        assert_eq!(spec.port, Some(ADMIN_PORT));
        assert_eq!(spec.min_scale, 1);
        assert_eq!(spec.max_scale, 1);
        assert_eq!(spec.environment_variables["IS_ADMIN_CONTAINER"], "1");
    }
}
