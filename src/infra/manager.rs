//! Idempotent provisioning and teardown of the gateway infrastructure.
//!
//! Every create operation is guarded by a lookup on the resource's
//! well-known name, every await polls to a terminal state within the
//! configured budget, and every delete treats "not found" as already done
//! so teardown can run to completion.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use crate::cloud::containers::{
    Container, ContainerStatus, ContainersApi, ContainersClient, Domain, DomainStatus,
};
use crate::cloud::observability::{CockpitStatus, ObservabilityApi, ObservabilityClient};
use crate::cloud::rdb::{DatabaseApi, DatabaseClient, Instance, InstanceStatus};
use crate::cloud::secrets::{
    decode_secret_data, encode_secret_data, generate_database_password, SecretsApi, SecretsClient,
};
use crate::cloud::{CloudClient, CloudCredentials, CloudError};
use crate::config::{InfraConfiguration, DB_DATABASE_NAME};
use crate::infra::containers::{
    admin_spec, gateway_spec, MetricsTarget, ADMIN_CONTAINER_NAME, DB_INSTANCE_NAME,
    DB_PASSWORD_SECRET_NAME, GATEWAY_CONTAINER_NAME, METRICS_TOKEN_NAME, NAMESPACE_NAME,
};
use crate::infra::poll::{poll_until, PollConfig, PollOutcome};

/// Errors from infrastructure operations
#[derive(Error, Debug)]
pub enum InfraError {
    #[error("{0} not found; run `gwctl infra deploy` first")]
    NotFound(String),

    #[error("{name} entered error state: {message}")]
    ResourceFailed { name: String, message: String },

    #[error("timed out waiting for {0} to become ready")]
    AwaitTimeout(String),

    #[error(transparent)]
    Cloud(#[from] CloudError),
}

/// Drives the cloud resources the gateway runs on.
///
/// The four API families are injected so tests can substitute mocks; there
/// is no ambient client state.
pub struct InfraManager {
    containers: Arc<dyn ContainersApi>,
    rdb: Arc<dyn DatabaseApi>,
    secrets: Arc<dyn SecretsApi>,
    observability: Arc<dyn ObservabilityApi>,
    poll: PollConfig,
}

impl InfraManager {
    pub fn new(credentials: &CloudCredentials) -> Self {
        let cloud = CloudClient::new(credentials);
        Self::with_apis(
            Arc::new(ContainersClient::new(cloud.clone())),
            Arc::new(DatabaseClient::new(cloud.clone())),
            Arc::new(SecretsClient::new(cloud.clone())),
            Arc::new(ObservabilityClient::new(cloud)),
        )
    }

    pub fn with_apis(
        containers: Arc<dyn ContainersApi>,
        rdb: Arc<dyn DatabaseApi>,
        secrets: Arc<dyn SecretsApi>,
        observability: Arc<dyn ObservabilityApi>,
    ) -> Self {
        Self {
            containers,
            rdb,
            secrets,
            observability,
            poll: PollConfig::default(),
        }
    }

    pub fn with_poll_config(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    // ========================================================================
    // Database
    // ========================================================================

    /// Create the database instance unless it already exists.
    ///
    /// The password (given or generated) is stored in the secret store
    /// before the instance is created, so container creation can read it
    /// back later.
    pub async fn create_db(&self, password: Option<String>) -> Result<Instance, InfraError> {
        if let Some(instance) = self.rdb.get_instance_by_name(DB_INSTANCE_NAME).await? {
            info!("database instance {DB_INSTANCE_NAME} already exists");
            return Ok(instance);
        }

        let password = match password {
            Some(password) => password,
            None => {
                info!("generating database password");
                generate_database_password()?
            }
        };
        self.store_db_password(&password).await?;

        info!("creating database instance {DB_INSTANCE_NAME}");
        Ok(self.rdb.create_instance(DB_INSTANCE_NAME, &password).await?)
    }

    /// Wait for the database instance to become ready.
    pub async fn await_db(&self) -> Result<Instance, InfraError> {
        let instance = self.instance_or_missing().await?;
        let outcome = poll_until(
            &self.poll,
            || self.rdb.get_instance(&instance.id),
            |i: &Instance| i.status.is_terminal(),
        )
        .await?;

        match outcome {
            PollOutcome::Settled(instance) if instance.status == InstanceStatus::Ready => {
                info!("database ready");
                Ok(instance)
            }
            PollOutcome::Settled(instance) => Err(InfraError::ResourceFailed {
                name: instance.name,
                message: format!("status {:?}", instance.status),
            }),
            PollOutcome::TimedOut => Err(InfraError::AwaitTimeout(DB_INSTANCE_NAME.to_string())),
        }
    }

    /// Delete the database instance and its stored password.
    pub async fn delete_db(&self) -> Result<(), InfraError> {
        match self.rdb.get_instance_by_name(DB_INSTANCE_NAME).await? {
            Some(instance) => {
                info!("deleting database instance {}", instance.name);
                self.rdb.delete_instance(&instance.id).await?;
            }
            None => debug!("database instance {DB_INSTANCE_NAME} already absent"),
        }
        self.delete_db_password().await
    }

    async fn store_db_password(&self, password: &str) -> Result<(), InfraError> {
        // Delete-then-create so the stored value always matches the instance
        self.delete_db_password().await?;

        debug!("storing database password as {DB_PASSWORD_SECRET_NAME}");
        let secret = self
            .secrets
            .create_secret(DB_PASSWORD_SECRET_NAME, "Database password for the gwctl gateway")
            .await?;
        self.secrets
            .create_secret_version(&secret.id, &encode_secret_data(password))
            .await?;
        Ok(())
    }

    async fn delete_db_password(&self) -> Result<(), InfraError> {
        match self.secrets.get_secret_by_name(DB_PASSWORD_SECRET_NAME).await {
            Ok(secret) => {
                debug!("deleting secret {DB_PASSWORD_SECRET_NAME}");
                self.secrets.delete_secret(&secret.id).await?;
                Ok(())
            }
            Err(err) if err.is_not_found() => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    async fn db_password(&self) -> Result<String, InfraError> {
        match self.secrets.access_latest_version(DB_PASSWORD_SECRET_NAME).await {
            Ok(data) => Ok(decode_secret_data(&data)?),
            Err(err) if err.is_not_found() => {
                Err(InfraError::NotFound("database password".to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }

    // ========================================================================
    // Namespace
    // ========================================================================

    pub async fn create_namespace(&self) -> Result<(), InfraError> {
        if self.containers.get_namespace_by_name(NAMESPACE_NAME).await?.is_some() {
            info!("namespace {NAMESPACE_NAME} already exists");
            return Ok(());
        }

        info!("creating namespace {NAMESPACE_NAME}");
        self.containers.create_namespace(NAMESPACE_NAME).await?;
        Ok(())
    }

    pub async fn await_namespace(&self) -> Result<(), InfraError> {
        let namespace = self.namespace_or_missing().await?;
        let outcome = poll_until(
            &self.poll,
            || self.containers.get_namespace(&namespace.id),
            |ns| ns.status.is_terminal(),
        )
        .await?;

        match outcome {
            PollOutcome::Settled(ns)
                if ns.status == crate::cloud::containers::NamespaceStatus::Ready =>
            {
                info!("namespace ready");
                Ok(())
            }
            PollOutcome::Settled(ns) => Err(InfraError::ResourceFailed {
                name: ns.name,
                message: ns.error_message.unwrap_or_else(|| format!("status {:?}", ns.status)),
            }),
            PollOutcome::TimedOut => Err(InfraError::AwaitTimeout(NAMESPACE_NAME.to_string())),
        }
    }

    pub async fn delete_namespace(&self) -> Result<(), InfraError> {
        match self.containers.get_namespace_by_name(NAMESPACE_NAME).await? {
            Some(namespace) => {
                info!("deleting namespace {}", namespace.name);
                self.containers.delete_namespace(&namespace.id).await?;
            }
            None => debug!("namespace {NAMESPACE_NAME} already absent"),
        }
        Ok(())
    }

    // ========================================================================
    // Containers
    // ========================================================================

    /// Create the admin and gateway containers unless they already exist.
    ///
    /// Requires the database instance (for its endpoint and password) and
    /// the namespace. Metrics forwarding only applies to the gateway
    /// container and mints a fresh push token.
    pub async fn create_containers(
        &self,
        db_password: Option<String>,
        forward_metrics: bool,
    ) -> Result<(), InfraError> {
        let instance = self.instance_or_missing().await?;
        let (db_host, db_port) = database_endpoint(&instance)?;
        let password = match db_password {
            Some(password) => password,
            None => self.db_password().await?,
        };
        let namespace = self.namespace_or_missing().await?;

        match self
            .containers
            .get_container_by_name(&namespace.id, ADMIN_CONTAINER_NAME)
            .await?
        {
            Some(container) => info!("admin container {} already exists", container.name),
            None => {
                info!("creating admin container {ADMIN_CONTAINER_NAME}");
                let spec = admin_spec(&namespace.id, &db_host, db_port, &password);
                let created = self.containers.create_container(&spec).await?;
                self.containers.deploy_container(&created.id).await?;
            }
        }

        if let Some(container) = self
            .containers
            .get_container_by_name(&namespace.id, GATEWAY_CONTAINER_NAME)
            .await?
        {
            info!("gateway container {} already exists", container.name);
            return Ok(());
        }

        let metrics = if forward_metrics {
            Some(self.recreate_metrics_token().await?)
        } else {
            None
        };

        info!("creating gateway container {GATEWAY_CONTAINER_NAME}");
        let spec = gateway_spec(&namespace.id, &db_host, db_port, &password, metrics.as_ref());
        let created = self.containers.create_container(&spec).await?;
        self.containers.deploy_container(&created.id).await?;
        Ok(())
    }

    /// Wait for both containers; they provision independently so the two
    /// polls run concurrently and both must reach ready.
    pub async fn await_containers(&self) -> Result<(), InfraError> {
        let namespace = self.namespace_or_missing().await?;
        let admin = self.container_or_missing(&namespace.id, ADMIN_CONTAINER_NAME).await?;
        let gateway = self.container_or_missing(&namespace.id, GATEWAY_CONTAINER_NAME).await?;

        futures::future::try_join(self.await_container(&admin), self.await_container(&gateway))
            .await?;
        info!("containers ready");
        Ok(())
    }

    async fn await_container(&self, container: &Container) -> Result<Container, InfraError> {
        let outcome = poll_until(
            &self.poll,
            || self.containers.get_container(&container.id),
            |c: &Container| c.status.is_terminal(),
        )
        .await?;

        match outcome {
            PollOutcome::Settled(c) if c.status == ContainerStatus::Ready => Ok(c),
            PollOutcome::Settled(c) => Err(InfraError::ResourceFailed {
                message: c
                    .error_message
                    .clone()
                    .unwrap_or_else(|| format!("status {:?}", c.status)),
                name: c.name,
            }),
            PollOutcome::TimedOut => Err(InfraError::AwaitTimeout(container.name.clone())),
        }
    }

    pub async fn delete_containers(&self) -> Result<(), InfraError> {
        let Some(namespace) = self.containers.get_namespace_by_name(NAMESPACE_NAME).await? else {
            debug!("namespace {NAMESPACE_NAME} absent, no containers to delete");
            return Ok(());
        };

        for name in [ADMIN_CONTAINER_NAME, GATEWAY_CONTAINER_NAME] {
            match self.containers.get_container_by_name(&namespace.id, name).await? {
                Some(container) => {
                    info!("deleting container {name}");
                    self.containers.delete_container(&container.id).await?;
                }
                None => debug!("container {name} already absent"),
            }
        }
        Ok(())
    }

    /// Re-apply the container specs, reusing the same assembly as creation.
    ///
    /// The gateway's metrics token is recreated when the running container
    /// currently forwards metrics, so the secret env var stays live.
    pub async fn update_containers(
        &self,
        db_password: Option<String>,
        redeploy: bool,
    ) -> Result<(), InfraError> {
        let namespace = self.namespace_or_missing().await?;
        let admin = self.container_or_missing(&namespace.id, ADMIN_CONTAINER_NAME).await?;
        let gateway = self.container_or_missing(&namespace.id, GATEWAY_CONTAINER_NAME).await?;

        let instance = self.instance_or_missing().await?;
        let (db_host, db_port) = database_endpoint(&instance)?;
        let password = match db_password {
            Some(password) => password,
            None => self.db_password().await?,
        };

        info!("updating container {}", admin.name);
        let spec = admin_spec(&namespace.id, &db_host, db_port, &password).for_update();
        self.containers.update_container(&admin.id, &spec).await?;

        let metrics = if gateway.environment_variables.contains_key("FORWARD_METRICS") {
            Some(self.recreate_metrics_token().await?)
        } else {
            None
        };

        info!("updating container {}", gateway.name);
        let spec =
            gateway_spec(&namespace.id, &db_host, db_port, &password, metrics.as_ref()).for_update();
        self.containers.update_container(&gateway.id, &spec).await?;

        if redeploy {
            info!("redeploying containers");
            self.containers.deploy_container(&admin.id).await?;
            self.containers.deploy_container(&gateway.id).await?;
        }
        Ok(())
    }

    // ========================================================================
    // Observability
    // ========================================================================

    /// Activate the observability workspace if it is not already.
    pub async fn ensure_cockpit(&self) -> Result<(), InfraError> {
        match self.observability.get_cockpit().await {
            Ok(cockpit) if cockpit.status == CockpitStatus::Ready => return Ok(()),
            Ok(_) => {}
            Err(err) if err.is_not_found() => {
                info!("activating observability workspace");
                self.observability.activate_cockpit().await?;
            }
            Err(err) => return Err(err.into()),
        }

        let outcome = poll_until(
            &self.poll,
            || self.observability.get_cockpit(),
            |c| c.status.is_terminal(),
        )
        .await?;
        match outcome {
            PollOutcome::Settled(cockpit) if cockpit.status == CockpitStatus::Ready => Ok(()),
            PollOutcome::Settled(cockpit) => Err(InfraError::ResourceFailed {
                name: "cockpit".to_string(),
                message: format!("status {:?}", cockpit.status),
            }),
            PollOutcome::TimedOut => Err(InfraError::AwaitTimeout("cockpit".to_string())),
        }
    }

    /// Replace the metrics push token so the configured one is always live.
    async fn recreate_metrics_token(&self) -> Result<MetricsTarget, InfraError> {
        let tokens = self.observability.list_tokens().await?;
        if let Some(token) = tokens.into_iter().find(|t| t.name == METRICS_TOKEN_NAME) {
            info!("metrics token already exists, recreating");
            self.observability.delete_token(&token.id).await?;
        }

        let token = self.observability.create_token(METRICS_TOKEN_NAME).await?;
        let secret_key = token.secret_key.ok_or_else(|| InfraError::ResourceFailed {
            name: METRICS_TOKEN_NAME.to_string(),
            message: "creation response carried no secret key".to_string(),
        })?;

        let cockpit = self.observability.get_cockpit().await?;
        let push_url = cockpit
            .metrics_push_url()
            .ok_or_else(|| InfraError::NotFound("cockpit metrics endpoint".to_string()))?;

        Ok(MetricsTarget { token: secret_key, push_url })
    }

    // ========================================================================
    // Endpoints, tokens, config
    // ========================================================================

    pub async fn gateway_endpoint(&self) -> Result<String, InfraError> {
        let namespace = self.namespace_or_missing().await?;
        let container = self.container_or_missing(&namespace.id, GATEWAY_CONTAINER_NAME).await?;
        Ok(container.domain_name)
    }

    pub async fn admin_endpoint(&self) -> Result<String, InfraError> {
        let namespace = self.namespace_or_missing().await?;
        let container = self.container_or_missing(&namespace.id, ADMIN_CONTAINER_NAME).await?;
        Ok(container.domain_name)
    }

    /// Address and port of the database's first published endpoint.
    pub async fn database_address(&self) -> Result<(String, u16), InfraError> {
        let instance = self.instance_or_missing().await?;
        database_endpoint(&instance)
    }

    /// Mint a fresh access token for the admin container.
    pub async fn create_admin_token(&self) -> Result<String, InfraError> {
        let namespace = self.namespace_or_missing().await?;
        let admin = self.container_or_missing(&namespace.id, ADMIN_CONTAINER_NAME).await?;
        let token = self.containers.create_container_token(&admin.id).await?;
        Ok(token.token)
    }

    /// Snapshot the deployed topology into a configuration.
    ///
    /// Mints a new admin token on every call; prior tokens stay live.
    pub async fn config_from_cloud(&self) -> Result<InfraConfiguration, InfraError> {
        let admin_host = self.admin_endpoint().await?;
        let gw_host = self.gateway_endpoint().await?;
        let (db_host, db_port) = self.database_address().await?;
        let token = self.create_admin_token().await?;

        Ok(InfraConfiguration {
            protocol: "https".to_string(),
            gw_admin_host: admin_host,
            gw_admin_port: None,
            gw_admin_token: Some(token),
            gw_host,
            gw_port: None,
            db_host,
            db_port,
            db_name: DB_DATABASE_NAME.to_string(),
        })
    }

    /// Component statuses for `infra check`.
    pub async fn check(&self) -> Result<Vec<(&'static str, String)>, InfraError> {
        let instance = self.instance_or_missing().await?;
        let namespace = self.namespace_or_missing().await?;
        let admin = self.container_or_missing(&namespace.id, ADMIN_CONTAINER_NAME).await?;
        let gateway = self.container_or_missing(&namespace.id, GATEWAY_CONTAINER_NAME).await?;

        Ok(vec![
            ("database", format!("{:?}", instance.status).to_lowercase()),
            ("namespace", format!("{:?}", namespace.status).to_lowercase()),
            ("admin container", format!("{:?}", admin.status).to_lowercase()),
            ("gateway container", format!("{:?}", gateway.status).to_lowercase()),
        ])
    }

    // ========================================================================
    // Custom domains
    // ========================================================================

    /// Bind a custom domain to the gateway container and wait for it.
    pub async fn add_custom_domain(&self, hostname: &str) -> Result<Domain, InfraError> {
        let namespace = self.namespace_or_missing().await?;
        let gateway = self.container_or_missing(&namespace.id, GATEWAY_CONTAINER_NAME).await?;

        info!("binding domain {hostname} to container {}", gateway.name);
        let domain = self.containers.create_domain(&gateway.id, hostname).await?;

        let outcome = poll_until(
            &self.poll,
            || self.containers.get_domain(&domain.id),
            |d: &Domain| d.status.is_terminal(),
        )
        .await?;
        match outcome {
            PollOutcome::Settled(domain) if domain.status == DomainStatus::Ready => Ok(domain),
            PollOutcome::Settled(domain) => Err(InfraError::ResourceFailed {
                message: domain
                    .error_message
                    .clone()
                    .unwrap_or_else(|| format!("status {:?}", domain.status)),
                name: domain.hostname,
            }),
            PollOutcome::TimedOut => Err(InfraError::AwaitTimeout(hostname.to_string())),
        }
    }

    pub async fn list_custom_domains(&self) -> Result<Vec<Domain>, InfraError> {
        let namespace = self.namespace_or_missing().await?;
        let gateway = self.container_or_missing(&namespace.id, GATEWAY_CONTAINER_NAME).await?;
        Ok(self.containers.list_domains(&gateway.id).await?)
    }

    pub async fn delete_custom_domain(&self, hostname: &str) -> Result<(), InfraError> {
        let domains = self.list_custom_domains().await?;
        match domains.into_iter().find(|d| d.hostname == hostname) {
            Some(domain) => {
                info!("deleting domain {hostname}");
                self.containers.delete_domain(&domain.id).await?;
            }
            None => debug!("domain {hostname} already absent"),
        }
        Ok(())
    }

    // ========================================================================
    // Lookups
    // ========================================================================

    async fn instance_or_missing(&self) -> Result<Instance, InfraError> {
        self.rdb
            .get_instance_by_name(DB_INSTANCE_NAME)
            .await?
            .ok_or_else(|| InfraError::NotFound(format!("database instance {DB_INSTANCE_NAME}")))
    }

    async fn namespace_or_missing(
        &self,
    ) -> Result<crate::cloud::containers::Namespace, InfraError> {
        self.containers
            .get_namespace_by_name(NAMESPACE_NAME)
            .await?
            .ok_or_else(|| InfraError::NotFound(format!("namespace {NAMESPACE_NAME}")))
    }

    async fn container_or_missing(
        &self,
        namespace_id: &str,
        name: &str,
    ) -> Result<Container, InfraError> {
        self.containers
            .get_container_by_name(namespace_id, name)
            .await?
            .ok_or_else(|| InfraError::NotFound(format!("container {name}")))
    }
}

fn database_endpoint(instance: &Instance) -> Result<(String, u16), InfraError> {
    let endpoint = instance
        .endpoints
        .first()
        .ok_or_else(|| InfraError::NotFound(format!("endpoint of database {}", instance.name)))?;
    let address = endpoint
        .address()
        .ok_or_else(|| InfraError::NotFound(format!("address of database {}", instance.name)))?;
    Ok((address.to_string(), endpoint.port))
}
