//! HTTP-level tests for the infra manager against a mock cloud API.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use gwctl::cloud::secrets::decode_secret_data;
use gwctl::cloud::{
    CloudClient, CloudCredentials, ContainersClient, DatabaseClient, ObservabilityClient,
    SecretsClient,
};
use gwctl::infra::{InfraError, InfraManager, PollConfig};

const RDB: &str = "/rdb/v1/regions/fr-par";
const CONTAINERS: &str = "/containers/v1beta1/regions/fr-par";
const SECRETS: &str = "/secret-manager/v1alpha1/regions/fr-par";
const COCKPIT: &str = "/cockpit/v1beta1";

fn manager(server: &MockServer) -> InfraManager {
    let credentials = CloudCredentials {
        secret_key: "sk-test".to_string(),
        project_id: "proj-1".to_string(),
        region: "fr-par".to_string(),
        api_url: server.uri(),
    };
    let cloud = CloudClient::new(&credentials);
    InfraManager::with_apis(
        Arc::new(ContainersClient::new(cloud.clone())),
        Arc::new(DatabaseClient::new(cloud.clone())),
        Arc::new(SecretsClient::new(cloud.clone())),
        Arc::new(ObservabilityClient::new(cloud)),
    )
    .with_poll_config(PollConfig {
        interval: Duration::from_millis(5),
        timeout: Duration::from_millis(150),
    })
}

fn instance_json(status: &str) -> serde_json::Value {
    json!({
        "id": "db-1",
        "name": "kong-gw",
        "status": status,
        "endpoints": [{ "ip": "10.0.0.1", "port": 13306 }],
    })
}

fn container_json(id: &str, name: &str, status: &str) -> serde_json::Value {
    json!({
        "id": id,
        "name": name,
        "status": status,
        "domain_name": format!("{name}.example.scw.cloud"),
        "environment_variables": {},
    })
}

#[tokio::test]
async fn test_create_db_skips_existing_instance() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("{RDB}/instances")))
        .and(query_param("name", "kong-gw"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "instances": [instance_json("ready")] })),
        )
        .mount(&server)
        .await;

    manager(&server).create_db(None).await.unwrap();

    // Only the lookup went over the wire; nothing was created
    let requests = server.received_requests().await.unwrap();
    assert!(requests.iter().all(|r| r.method.as_str() == "GET"));
}

#[tokio::test]
async fn test_create_db_stores_password_then_creates_instance() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("{RDB}/instances")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "instances": [] })))
        .mount(&server)
        .await;
    // No previous secret to replace
    Mock::given(method("GET"))
        .and(path(format!("{SECRETS}/secrets-by-name/kong-gw-database-password")))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "message": "not found" })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("{SECRETS}/secrets")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "sec-1",
            "name": "kong-gw-database-password",
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("{SECRETS}/secrets/sec-1/versions")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "revision": 1 })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("{RDB}/instances")))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(instance_json("provisioning")),
        )
        .expect(1)
        .mount(&server)
        .await;

    manager(&server).create_db(None).await.unwrap();

    // The password sent to the database matches the stored secret payload
    let requests = server.received_requests().await.unwrap();
    let stored: serde_json::Value = requests
        .iter()
        .find(|r| r.url.path().ends_with("/secrets/sec-1/versions"))
        .map(|r| serde_json::from_slice(&r.body).unwrap())
        .unwrap();
    let created: serde_json::Value = requests
        .iter()
        .find(|r| r.method.as_str() == "POST" && r.url.path().ends_with("/instances"))
        .map(|r| serde_json::from_slice(&r.body).unwrap())
        .unwrap();

    let stored_password = decode_secret_data(stored["data"].as_str().unwrap()).unwrap();
    assert_eq!(created["password"].as_str().unwrap(), stored_password);
    assert_eq!(created["engine"], "PostgreSQL-14");
    assert_eq!(created["user_name"], "kong");
}

#[tokio::test]
async fn test_await_db_polls_until_ready() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("{RDB}/instances")))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "instances": [instance_json("provisioning")] })),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{RDB}/instances/db-1")))
        .respond_with(ResponseTemplate::new(200).set_body_json(instance_json("initializing")))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{RDB}/instances/db-1")))
        .respond_with(ResponseTemplate::new(200).set_body_json(instance_json("ready")))
        .mount(&server)
        .await;

    let instance = manager(&server).await_db().await.unwrap();
    assert_eq!(instance.id, "db-1");
}

#[tokio::test]
async fn test_await_db_error_state_aborts_before_budget() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("{RDB}/instances")))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "instances": [instance_json("provisioning")] })),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{RDB}/instances/db-1")))
        .respond_with(ResponseTemplate::new(200).set_body_json(instance_json("initializing")))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{RDB}/instances/db-1")))
        .respond_with(ResponseTemplate::new(200).set_body_json(instance_json("error")))
        .mount(&server)
        .await;

    let err = manager(&server).await_db().await.unwrap_err();
    assert!(matches!(err, InfraError::ResourceFailed { .. }));
}

#[tokio::test]
async fn test_await_db_times_out_while_transient() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("{RDB}/instances")))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "instances": [instance_json("provisioning")] })),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{RDB}/instances/db-1")))
        .respond_with(ResponseTemplate::new(200).set_body_json(instance_json("provisioning")))
        .mount(&server)
        .await;

    let err = manager(&server).await_db().await.unwrap_err();
    assert!(matches!(err, InfraError::AwaitTimeout(_)));
}

#[tokio::test]
async fn test_teardown_with_nothing_deployed_makes_no_deletes() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("{CONTAINERS}/namespaces")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "namespaces": [] })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{RDB}/instances")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "instances": [] })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{SECRETS}/secrets-by-name/kong-gw-database-password")))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "message": "not found" })))
        .mount(&server)
        .await;

    let manager = manager(&server);
    manager.delete_containers().await.unwrap();
    manager.delete_namespace().await.unwrap();
    manager.delete_db().await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert!(requests.iter().all(|r| r.method.as_str() == "GET"));
}

#[tokio::test]
async fn test_create_admin_token_targets_admin_container() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("{CONTAINERS}/namespaces")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "namespaces": [{ "id": "ns-1", "name": "kong-gw", "status": "ready" }]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{CONTAINERS}/containers")))
        .and(query_param("name", "kong-gw-admin"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "containers": [container_json("c-admin", "kong-gw-admin", "ready")]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("{CONTAINERS}/tokens")))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "id": "t-1", "token": "fresh-token" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let token = manager(&server).create_admin_token().await.unwrap();
    assert_eq!(token, "fresh-token");

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = requests
        .iter()
        .find(|r| r.url.path().ends_with("/tokens"))
        .map(|r| serde_json::from_slice(&r.body).unwrap())
        .unwrap();
    assert_eq!(body["container_id"], "c-admin");
}

#[tokio::test]
async fn test_ensure_cockpit_activates_and_waits_for_ready() {
    let server = MockServer::start().await;

    // Not activated yet
    Mock::given(method("GET"))
        .and(path(format!("{COCKPIT}/cockpit")))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "message": "not found" })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("{COCKPIT}/activate")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "project_id": "proj-1",
            "status": "creating",
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{COCKPIT}/cockpit")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "project_id": "proj-1",
            "status": "ready",
            "endpoints": { "metrics_url": "https://metrics.example.com" },
        })))
        .mount(&server)
        .await;

    manager(&server).ensure_cockpit().await.unwrap();
}

#[tokio::test]
async fn test_missing_namespace_reports_deploy_hint() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("{CONTAINERS}/namespaces")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "namespaces": [] })))
        .mount(&server)
        .await;

    let err = manager(&server).gateway_endpoint().await.unwrap_err();
    assert!(matches!(err, InfraError::NotFound(_)));
    assert!(err.to_string().contains("gwctl infra deploy"));
}
