//! Domain value types and admin API wire objects.

use serde::Deserialize;
use serde_json::{json, Value};

// ============================================================================
// Domain types
// ============================================================================

/// A path-to-upstream mapping on the gateway.
///
/// A route is materialized as three admin API resources sharing a
/// deterministic name derived from the path: a service (the upstream), a
/// route referencing the service, and optional cors/jwt plugins attached to
/// the route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub relative_url: String,
    pub target: String,
    /// HTTP verbs the route accepts; empty means all methods.
    pub http_methods: Vec<String>,
    pub cors: bool,
    pub jwt: bool,
}

impl Route {
    pub fn new(relative_url: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            relative_url: relative_url.into(),
            target: target.into(),
            http_methods: Vec::new(),
            cors: false,
            jwt: false,
        }
    }

    /// Name shared by the service, route and plugin resources.
    pub fn name(&self) -> String {
        self.relative_url.replace('/', "_")
    }

    /// Whether the target carries an explicit http(s) scheme.
    pub fn has_valid_target(&self) -> bool {
        self.target.starts_with("http://") || self.target.starts_with("https://")
    }

    pub fn service_payload(&self) -> Value {
        json!({ "name": self.name(), "url": self.target })
    }

    pub fn route_payload(&self) -> Value {
        // Kong treats a null method list as "all methods"
        let methods = if self.http_methods.is_empty() {
            Value::Null
        } else {
            json!(self.http_methods)
        };
        json!({
            "name": self.name(),
            "paths": [self.relative_url],
            "service": { "name": self.name() },
            "methods": methods,
        })
    }

    pub fn cors_plugin_payload(&self) -> Value {
        json!({
            "name": "cors",
            "config": { "origins": ["*"], "headers": ["*"], "credentials": true },
        })
    }

    pub fn jwt_plugin_payload(&self) -> Value {
        json!({ "name": "jwt" })
    }
}

/// An identity known to the gateway's auth plugins.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Consumer {
    pub username: String,
}

impl Consumer {
    pub fn new(username: impl Into<String>) -> Self {
        Self { username: username.into() }
    }

    pub fn payload(&self) -> Value {
        json!({ "username": self.username })
    }
}

/// A JWT credential attached to a consumer.
///
/// The secret is generated server-side at creation time; `iss` is the value
/// of the "iss" claim that selects this credential (wire field `key`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct JwtCredential {
    pub algorithm: String,
    pub secret: String,
    #[serde(rename = "key")]
    pub iss: String,
}

// ============================================================================
// Wire objects
// ============================================================================

/// Kong collection responses wrap their items in a `data` array.
#[derive(Debug, Deserialize)]
pub struct Collection<T> {
    pub data: Vec<T>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceObject {
    pub name: String,
    pub protocol: String,
    pub host: String,
    pub port: u16,
}

impl ServiceObject {
    pub fn url(&self) -> String {
        format!("{}://{}:{}", self.protocol, self.host, self.port)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RouteObject {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    pub paths: Vec<String>,
    #[serde(default)]
    pub methods: Option<Vec<String>>,
}

/// Reference to a parent object, by id or by name depending on the endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ObjectRef {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PluginObject {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub route: Option<ObjectRef>,
}

impl PluginObject {
    /// Whether this plugin is attached to the given route.
    pub fn attached_to(&self, route: &RouteObject) -> bool {
        let Some(ref parent) = self.route else {
            return false;
        };
        match (&parent.id, &route.id) {
            (Some(pid), Some(rid)) if pid == rid => return true,
            _ => {}
        }
        parent.name.as_deref() == Some(route.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_replaces_slashes() {
        let route = Route::new("/foo/bar", "https://upstream.example.com");
        assert_eq!(route.name(), "_foo_bar");
    }

    #[test]
    fn test_target_validation() {
        assert!(Route::new("/foo", "https://dummy_url.com").has_valid_target());
        assert!(Route::new("/foo", "http://dummy_url.com").has_valid_target());
        assert!(!Route::new("/foo", "dummy_url.com").has_valid_target());
        assert!(!Route::new("/foo", "/dummy_url.com").has_valid_target());
    }

    #[test]
    fn test_route_payload_empty_methods_is_null() {
        let route = Route::new("/foo", "https://dummy_url.com");
        let payload = route.route_payload();
        assert!(payload["methods"].is_null());
        assert_eq!(payload["paths"], json!(["/foo"]));
        assert_eq!(payload["service"]["name"], "_foo");
    }

    #[test]
    fn test_route_payload_with_methods() {
        let mut route = Route::new("/foo", "https://dummy_url.com");
        route.http_methods = vec!["GET".to_string(), "POST".to_string()];
        assert_eq!(route.route_payload()["methods"], json!(["GET", "POST"]));
    }

    #[test]
    fn test_plugin_attachment_by_id_and_name() {
        let route: RouteObject = serde_json::from_value(json!({
            "id": "r-1", "name": "_foo", "paths": ["/foo"],
        }))
        .unwrap();

        let by_id: PluginObject =
            serde_json::from_value(json!({ "id": "p-1", "name": "jwt", "route": { "id": "r-1" } }))
                .unwrap();
        let by_name: PluginObject =
            serde_json::from_value(json!({ "id": "p-2", "name": "cors", "route": { "name": "_foo" } }))
                .unwrap();
        let global: PluginObject =
            serde_json::from_value(json!({ "id": "p-3", "name": "statsd" })).unwrap();

        assert!(by_id.attached_to(&route));
        assert!(by_name.attached_to(&route));
        assert!(!global.attached_to(&route));
    }

    #[test]
    fn test_jwt_credential_wire_key_field() {
        let cred: JwtCredential = serde_json::from_value(json!({
            "algorithm": "HS256",
            "secret": "s3cret",
            "key": "issuer-1",
        }))
        .unwrap();
        assert_eq!(cred.iss, "issuer-1");
    }
}
