//! Route, consumer and credential operations against the Kong admin API.

use serde_json::json;
use thiserror::Error;
use tracing::{debug, info};

use crate::admin::client::{AdminApiError, AdminClient};
use crate::admin::model::{
    Collection, Consumer, JwtCredential, PluginObject, Route, RouteObject, ServiceObject,
};
use crate::config::InfraConfiguration;

/// Port the statsd plugin pushes metrics to (the sidecar agent in the
/// gateway container listens here).
pub const STATSD_PORT: u16 = 8125;
pub const STATSD_PREFIX: &str = "kong";

/// Errors from gateway configuration operations
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("invalid route target {0:?}: must start with http:// or https://")]
    InvalidTarget(String),

    #[error(transparent)]
    Api(#[from] AdminApiError),

    #[error("unexpected admin API response: {0}")]
    UnexpectedResponse(String),
}

/// Configures routes, consumers and credentials via the Kong admin API.
pub struct GatewayManager {
    client: AdminClient,
}

impl GatewayManager {
    /// Build a manager from a gateway configuration snapshot.
    pub fn new(config: &InfraConfiguration) -> Self {
        let client = AdminClient::new(config.gw_admin_url(), config.gw_admin_token.clone());
        Self::with_client(client)
    }

    pub fn with_client(client: AdminClient) -> Self {
        Self { client }
    }

    // ========================================================================
    // Routes
    // ========================================================================

    /// Add a route to the gateway.
    ///
    /// The service and route resources are upserted by name, so re-applying
    /// an existing route is safe; plugin creation conflicts (409) are
    /// swallowed for the same reason.
    pub async fn add_route(&self, route: &Route) -> Result<(), GatewayError> {
        if !route.has_valid_target() {
            return Err(GatewayError::InvalidTarget(route.target.clone()));
        }

        let name = route.name();
        self.client
            .put(&format!("/services/{name}"), &route.service_payload())
            .await?;
        self.client
            .put(&format!("/routes/{name}"), &route.route_payload())
            .await?;

        if route.cors {
            self.install_route_plugin(&name, &route.cors_plugin_payload()).await?;
        }
        if route.jwt {
            self.install_route_plugin(&name, &route.jwt_plugin_payload()).await?;
        }

        Ok(())
    }

    /// POST a plugin on a route, treating "already exists" as success.
    async fn install_route_plugin(
        &self,
        route_name: &str,
        payload: &serde_json::Value,
    ) -> Result<(), GatewayError> {
        let path = format!("/routes/{route_name}/plugins");
        match self.client.post(&path, payload).await {
            Ok(_) => Ok(()),
            Err(err) if err.status() == Some(409) => {
                debug!("plugin already installed on route {route_name}");
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Delete a route and its service.
    ///
    /// The route goes first: Kong refuses to delete a service while a route
    /// still references it. Missing resources are treated as already deleted.
    pub async fn delete_route(&self, relative_url: &str) -> Result<(), GatewayError> {
        let name = relative_url.replace('/', "_");
        self.delete_ignoring_missing(&format!("/routes/{name}")).await?;
        self.delete_ignoring_missing(&format!("/services/{name}")).await?;
        Ok(())
    }

    async fn delete_ignoring_missing(&self, path: &str) -> Result<(), GatewayError> {
        match self.client.delete(path).await {
            Ok(_) => Ok(()),
            Err(err) if err.status() == Some(404) => {
                debug!("{path} already absent");
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// List the routes configured on the gateway, sorted by relative URL.
    ///
    /// Routes, services and plugins are three uncorrelated admin API
    /// collections; they are joined here by the shared deterministic name.
    pub async fn list_routes(&self) -> Result<Vec<Route>, GatewayError> {
        let routes: Collection<RouteObject> =
            serde_json::from_value(self.client.get("/routes").await?)
                .map_err(|e| GatewayError::UnexpectedResponse(e.to_string()))?;
        let services: Collection<ServiceObject> =
            serde_json::from_value(self.client.get("/services").await?)
                .map_err(|e| GatewayError::UnexpectedResponse(e.to_string()))?;
        let plugins: Collection<PluginObject> =
            serde_json::from_value(self.client.get("/plugins").await?)
                .map_err(|e| GatewayError::UnexpectedResponse(e.to_string()))?;

        Ok(join_collections(routes.data, services.data, plugins.data))
    }

    // ========================================================================
    // Consumers and credentials
    // ========================================================================

    /// Create a consumer. Duplicate usernames are rejected by the admin API
    /// and the error surfaces, unlike the route upsert semantics.
    pub async fn add_consumer(&self, username: &str) -> Result<(), GatewayError> {
        let consumer = Consumer::new(username);
        self.client.post("/consumers", &consumer.payload()).await?;
        Ok(())
    }

    pub async fn delete_consumer(&self, username: &str) -> Result<(), GatewayError> {
        self.client.delete(&format!("/consumers/{username}")).await?;
        Ok(())
    }

    /// List consumers, sorted by username.
    pub async fn list_consumers(&self) -> Result<Vec<Consumer>, GatewayError> {
        let consumers: Collection<Consumer> =
            serde_json::from_value(self.client.get("/consumers").await?)
                .map_err(|e| GatewayError::UnexpectedResponse(e.to_string()))?;

        let mut consumers = consumers.data;
        consumers.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(consumers)
    }

    /// Create a JWT credential for a consumer.
    ///
    /// The admin API generates the secret and echoes the algorithm and key,
    /// so the POST carries no body.
    pub async fn add_jwt_credential(&self, username: &str) -> Result<JwtCredential, GatewayError> {
        let value = self
            .client
            .post_form_empty(&format!("/consumers/{username}/jwt"))
            .await?;
        serde_json::from_value(value).map_err(|e| GatewayError::UnexpectedResponse(e.to_string()))
    }

    pub async fn list_jwt_credentials(
        &self,
        username: &str,
    ) -> Result<Vec<JwtCredential>, GatewayError> {
        let creds: Collection<JwtCredential> = serde_json::from_value(
            self.client.get(&format!("/consumers/{username}/jwt")).await?,
        )
        .map_err(|e| GatewayError::UnexpectedResponse(e.to_string()))?;
        Ok(creds.data)
    }

    // ========================================================================
    // Global plugins
    // ========================================================================

    /// Install the global statsd plugin, replacing any existing instance so
    /// at most one exists with the configured port and prefix.
    pub async fn install_global_statsd_plugin(&self) -> Result<String, GatewayError> {
        let plugins: Collection<PluginObject> =
            serde_json::from_value(self.client.get("/plugins").await?)
                .map_err(|e| GatewayError::UnexpectedResponse(e.to_string()))?;

        for plugin in plugins.data.iter().filter(|p| p.name == "statsd") {
            info!("replacing existing statsd plugin {}", plugin.id);
            self.client.delete(&format!("/plugins/{}", plugin.id)).await?;
        }

        let payload = json!({
            "name": "statsd",
            "config": { "port": STATSD_PORT, "prefix": STATSD_PREFIX },
        });
        let created = self.client.post("/plugins", &payload).await?;
        created["id"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| GatewayError::UnexpectedResponse("plugin response without id".into()))
    }
}

/// Join the three admin API collections into the domain view.
///
/// Routes whose service is missing are skipped; cors/jwt flags come from
/// plugins attached to the route. Output is sorted by relative URL.
fn join_collections(
    routes: Vec<RouteObject>,
    services: Vec<ServiceObject>,
    plugins: Vec<PluginObject>,
) -> Vec<Route> {
    let mut result = Vec::new();

    for route in &routes {
        let Some(service) = services.iter().find(|s| s.name == route.name) else {
            continue;
        };
        let Some(path) = route.paths.first() else {
            continue;
        };

        let cors = plugins.iter().any(|p| p.name == "cors" && p.attached_to(route));
        let jwt = plugins.iter().any(|p| p.name == "jwt" && p.attached_to(route));

        result.push(Route {
            relative_url: path.clone(),
            target: service.url(),
            http_methods: route.methods.clone().unwrap_or_default(),
            cors,
            jwt,
        });
    }

    result.sort_by(|a, b| a.relative_url.cmp(&b.relative_url));
    result
}
