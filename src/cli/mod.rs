//! CLI module for gwctl
//!
//! Command groups:
//! - `gwctl infra` - Provision, inspect and tear down the cloud resources
//! - `gwctl route` - Manage gateway routes
//! - `gwctl consumer` - Manage API consumers
//! - `gwctl jwt` - Manage JWT credentials
//! - `gwctl domain` - Manage custom domains on the gateway container
//! - `gwctl dev` - Local stack config and container maintenance

use clap::{Parser, Subcommand};

mod commands;
mod display;

pub use commands::*;
pub use display::*;

#[derive(Parser, Debug)]
#[command(name = "gwctl")]
#[command(about = "Operate a self-hosted Kong gateway on serverless containers")]
#[command(version)]
pub struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Explicit log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Cloud credentials profile to use
    #[arg(short = 'p', long, global = true, env = "GWCTL_PROFILE")]
    pub profile: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Provision, inspect and tear down the cloud infrastructure
    #[command(subcommand)]
    Infra(InfraAction),

    /// Manage routes on the gateway
    #[command(subcommand)]
    Route(RouteAction),

    /// Manage API consumers
    #[command(subcommand)]
    Consumer(ConsumerAction),

    /// Manage JWT credentials for consumers
    #[command(subcommand)]
    Jwt(JwtAction),

    /// Manage custom domains bound to the gateway container
    #[command(subcommand)]
    Domain(DomainAction),

    /// Local development helpers
    #[command(subcommand)]
    Dev(DevAction),
}

#[derive(Subcommand, Debug)]
pub enum InfraAction {
    /// Provision the database, namespace and containers, then save the config
    Deploy {
        /// Database password (generated and stored when omitted)
        #[arg(long, env = "GWCTL_DB_PASSWORD")]
        db_password: Option<String>,

        /// Skip observability activation and the statsd plugin
        #[arg(long)]
        no_metrics: bool,
    },

    /// Show the status of each provisioned component
    Check,

    /// Tear down the containers, namespace and database
    Delete {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Rebuild the local config from the deployed resources
    Config,

    /// Print the public gateway endpoint
    Endpoint,

    /// Print the database endpoint address
    Ip,

    /// Print the admin API endpoint
    AdminEndpoint,

    /// Print the saved admin token
    AdminToken,

    /// Mint a fresh admin token and save it to the config
    NewAdminToken,
}

#[derive(Subcommand, Debug)]
pub enum RouteAction {
    /// List configured routes
    Ls,

    /// Add or update a route
    Add {
        /// Path on the gateway, e.g. /orders
        relative_url: String,

        /// Upstream URL, must start with http:// or https://
        target: String,

        /// Install the cors plugin on the route
        #[arg(long)]
        cors: bool,

        /// Require a JWT on the route
        #[arg(long)]
        jwt: bool,

        /// Restrict the route to specific HTTP methods (repeatable; all when omitted)
        #[arg(long = "http-methods", value_name = "METHOD")]
        http_methods: Vec<String>,
    },

    /// Delete a route and its service
    Delete {
        /// Path of the route to delete
        relative_url: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConsumerAction {
    /// List consumers
    Ls,

    /// Add a consumer
    Add {
        /// Consumer username
        username: String,
    },

    /// Delete a consumer
    Delete {
        /// Consumer username
        username: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum JwtAction {
    /// Create a JWT credential for a consumer
    Add {
        /// Consumer username
        consumer: String,
    },

    /// List the JWT credentials of a consumer
    Ls {
        /// Consumer username
        consumer: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum DomainAction {
    /// List custom domains on the gateway container
    Ls,

    /// Bind a custom domain to the gateway container and wait for it
    Add {
        /// Hostname (must already CNAME to the container endpoint)
        hostname: String,
    },

    /// Remove a custom domain
    Delete {
        /// Hostname to remove
        hostname: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum DevAction {
    /// Write a config pointing at the local docker-compose stack
    Config,

    /// Re-apply container specs to the deployed containers
    UpdateContainers {
        /// Patch the containers without triggering a redeploy
        #[arg(long)]
        no_redeploy: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_infra_deploy_no_metrics() {
        let cli = Cli::parse_from(["gwctl", "infra", "deploy", "--no-metrics"]);
        match cli.command {
            Commands::Infra(InfraAction::Deploy { db_password, no_metrics }) => {
                assert!(no_metrics);
                assert!(db_password.is_none());
            }
            _ => panic!("Expected infra deploy"),
        }
    }

    #[test]
    fn test_parse_infra_delete_yes() {
        let cli = Cli::parse_from(["gwctl", "infra", "delete", "--yes"]);
        match cli.command {
            Commands::Infra(InfraAction::Delete { yes }) => assert!(yes),
            _ => panic!("Expected infra delete"),
        }
    }

    #[test]
    fn test_parse_route_add_with_flags() {
        let cli = Cli::parse_from([
            "gwctl",
            "route",
            "add",
            "/orders",
            "https://orders.internal",
            "--cors",
            "--jwt",
            "--http-methods",
            "GET",
            "--http-methods",
            "POST",
        ]);
        match cli.command {
            Commands::Route(RouteAction::Add { relative_url, target, cors, jwt, http_methods }) => {
                assert_eq!(relative_url, "/orders");
                assert_eq!(target, "https://orders.internal");
                assert!(cors);
                assert!(jwt);
                assert_eq!(http_methods, vec!["GET", "POST"]);
            }
            _ => panic!("Expected route add"),
        }
    }

    #[test]
    fn test_parse_route_ls() {
        let cli = Cli::parse_from(["gwctl", "route", "ls"]);
        assert!(matches!(cli.command, Commands::Route(RouteAction::Ls)));
    }

    #[test]
    fn test_parse_jwt_add() {
        let cli = Cli::parse_from(["gwctl", "jwt", "add", "alice"]);
        match cli.command {
            Commands::Jwt(JwtAction::Add { consumer }) => assert_eq!(consumer, "alice"),
            _ => panic!("Expected jwt add"),
        }
    }

    #[test]
    fn test_parse_domain_add() {
        let cli = Cli::parse_from(["gwctl", "domain", "add", "api.example.com"]);
        match cli.command {
            Commands::Domain(DomainAction::Add { hostname }) => {
                assert_eq!(hostname, "api.example.com");
            }
            _ => panic!("Expected domain add"),
        }
    }

    #[test]
    fn test_parse_dev_update_containers() {
        let cli = Cli::parse_from(["gwctl", "dev", "update-containers", "--no-redeploy"]);
        match cli.command {
            Commands::Dev(DevAction::UpdateContainers { no_redeploy }) => assert!(no_redeploy),
            _ => panic!("Expected dev update-containers"),
        }
    }

    #[test]
    fn test_profile_is_global() {
        let cli = Cli::parse_from(["gwctl", "route", "ls", "--profile", "staging"]);
        assert_eq!(cli.profile.as_deref(), Some("staging"));
    }
}
