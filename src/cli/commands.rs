//! Command dispatch for the CLI.
//!
//! Commands return Results; printing happens here, formatting lives in
//! [`super::display`].

use std::io::{self, Write};

use thiserror::Error;
use tracing::info;

use crate::admin::{GatewayError, GatewayManager, Route};
use crate::cloud::{CloudCredentials, CredentialsError};
use crate::config::{ConfigError, InfraConfiguration};
use crate::infra::{InfraError, InfraManager};

use super::display;
use super::{Cli, Commands, ConsumerAction, DevAction, DomainAction, InfraAction, JwtAction, RouteAction};

/// Errors that can occur during command execution
#[derive(Error, Debug)]
pub enum CommandError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Credentials(#[from] CredentialsError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Infra(#[from] InfraError),

    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("no admin token saved; run `gwctl infra new-admin-token`")]
    NoAdminToken,
}

/// Execute the parsed command line.
pub async fn run(cli: Cli) -> Result<(), CommandError> {
    let profile = cli.profile.as_deref();
    match cli.command {
        Commands::Infra(action) => run_infra(action, profile).await,
        Commands::Route(action) => run_route(action).await,
        Commands::Consumer(action) => run_consumer(action).await,
        Commands::Jwt(action) => run_jwt(action).await,
        Commands::Domain(action) => run_domain(action, profile).await,
        Commands::Dev(action) => run_dev(action, profile).await,
    }
}

fn infra_manager(profile: Option<&str>) -> Result<InfraManager, CommandError> {
    let credentials = CloudCredentials::load(profile)?;
    Ok(InfraManager::new(&credentials))
}

fn gateway_manager() -> Result<GatewayManager, CommandError> {
    let config = InfraConfiguration::load()?;
    Ok(GatewayManager::new(&config))
}

// ============================================================================
// Infra commands
// ============================================================================

async fn run_infra(action: InfraAction, profile: Option<&str>) -> Result<(), CommandError> {
    match action {
        InfraAction::Deploy { db_password, no_metrics } => {
            let manager = infra_manager(profile)?;

            manager.create_db(db_password.clone()).await?;
            manager.await_db().await?;
            manager.create_namespace().await?;
            manager.await_namespace().await?;
            if !no_metrics {
                manager.ensure_cockpit().await?;
            }
            manager.create_containers(db_password, !no_metrics).await?;
            manager.await_containers().await?;

            let config = manager.config_from_cloud().await?;
            let path = config.save()?;
            info!("gateway config written to {}", path.display());

            if !no_metrics {
                let gateway = GatewayManager::new(&config);
                gateway.install_global_statsd_plugin().await?;
            }

            println!("Gateway deployed at {}", config.gw_url());
        }

        InfraAction::Check => {
            let manager = infra_manager(profile)?;
            let components = manager.check().await?;
            print!("{}", display::format_check(&components));
        }

        InfraAction::Delete { yes } => {
            if !yes && !confirm("Delete the gateway containers, namespace and database?")? {
                println!("Aborted.");
                return Ok(());
            }
            let manager = infra_manager(profile)?;
            manager.delete_containers().await?;
            manager.delete_namespace().await?;
            manager.delete_db().await?;
            println!("Infrastructure deleted.");
        }

        InfraAction::Config => {
            let manager = infra_manager(profile)?;
            let config = manager.config_from_cloud().await?;
            let path = config.save()?;
            println!("Config written to {}", path.display());
        }

        InfraAction::Endpoint => {
            let manager = infra_manager(profile)?;
            println!("{}", manager.gateway_endpoint().await?);
        }

        InfraAction::Ip => {
            let manager = infra_manager(profile)?;
            let (host, port) = manager.database_address().await?;
            println!("{host}:{port}");
        }

        InfraAction::AdminEndpoint => {
            let manager = infra_manager(profile)?;
            println!("{}", manager.admin_endpoint().await?);
        }

        InfraAction::AdminToken => {
            let config = InfraConfiguration::load()?;
            let token = config.gw_admin_token.ok_or(CommandError::NoAdminToken)?;
            println!("{token}");
        }

        InfraAction::NewAdminToken => {
            let manager = infra_manager(profile)?;
            let token = manager.create_admin_token().await?;
            let mut config = InfraConfiguration::load()?;
            config.gw_admin_token = Some(token.clone());
            config.save()?;
            println!("{token}");
        }
    }
    Ok(())
}

// ============================================================================
// Gateway commands
// ============================================================================

async fn run_route(action: RouteAction) -> Result<(), CommandError> {
    let gateway = gateway_manager()?;
    match action {
        RouteAction::Ls => {
            let routes = gateway.list_routes().await?;
            print!("{}", display::format_routes(&routes));
        }

        RouteAction::Add { relative_url, target, cors, jwt, http_methods } => {
            let mut route = Route::new(&relative_url, &target);
            route.cors = cors;
            route.jwt = jwt;
            route.http_methods = http_methods;
            gateway.add_route(&route).await?;
            println!("Route {relative_url} -> {target} configured.");
        }

        RouteAction::Delete { relative_url } => {
            gateway.delete_route(&relative_url).await?;
            println!("Route {relative_url} deleted.");
        }
    }
    Ok(())
}

async fn run_consumer(action: ConsumerAction) -> Result<(), CommandError> {
    let gateway = gateway_manager()?;
    match action {
        ConsumerAction::Ls => {
            let consumers = gateway.list_consumers().await?;
            print!("{}", display::format_consumers(&consumers));
        }

        ConsumerAction::Add { username } => {
            gateway.add_consumer(&username).await?;
            println!("Consumer {username} created.");
        }

        ConsumerAction::Delete { username } => {
            gateway.delete_consumer(&username).await?;
            println!("Consumer {username} deleted.");
        }
    }
    Ok(())
}

async fn run_jwt(action: JwtAction) -> Result<(), CommandError> {
    let gateway = gateway_manager()?;
    match action {
        JwtAction::Add { consumer } => {
            let credential = gateway.add_jwt_credential(&consumer).await?;
            print!("{}", display::format_jwt_credentials(&[credential]));
        }

        JwtAction::Ls { consumer } => {
            let credentials = gateway.list_jwt_credentials(&consumer).await?;
            print!("{}", display::format_jwt_credentials(&credentials));
        }
    }
    Ok(())
}

// ============================================================================
// Domain commands
// ============================================================================

async fn run_domain(action: DomainAction, profile: Option<&str>) -> Result<(), CommandError> {
    let manager = infra_manager(profile)?;
    match action {
        DomainAction::Ls => {
            let domains = manager.list_custom_domains().await?;
            print!("{}", display::format_domains(&domains));
        }

        DomainAction::Add { hostname } => {
            let domain = manager.add_custom_domain(&hostname).await?;
            println!("Domain {} is ready.", domain.hostname);
        }

        DomainAction::Delete { hostname } => {
            manager.delete_custom_domain(&hostname).await?;
            println!("Domain {hostname} deleted.");
        }
    }
    Ok(())
}

// ============================================================================
// Dev commands
// ============================================================================

async fn run_dev(action: DevAction, profile: Option<&str>) -> Result<(), CommandError> {
    match action {
        DevAction::Config => {
            let config = InfraConfiguration::from_local();
            let path = config.save()?;
            println!("Local config written to {}", path.display());
        }

        DevAction::UpdateContainers { no_redeploy } => {
            let manager = infra_manager(profile)?;
            manager.update_containers(None, !no_redeploy).await?;
            println!("Containers updated.");
        }
    }
    Ok(())
}

fn confirm(prompt: &str) -> Result<bool, CommandError> {
    print!("{prompt} [y/N] ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(matches!(line.trim(), "y" | "Y" | "yes"))
}
