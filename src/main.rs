use std::process;

use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use gwctl::cli::{run, Cli};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging: --log-level wins, then --debug, then the default.
    // RUST_LOG overrides everything.
    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| if cli.debug { "debug".to_string() } else { "info".to_string() });

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .init();

    // Load .env so cloud credentials can come from a local file
    dotenvy::dotenv().ok();

    if let Err(e) = run(cli).await {
        error!("{e}");
        process::exit(1);
    }
}
