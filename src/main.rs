use std::path::PathBuf;

use axum::Router;
use clap::Parser;
use tokio::net::TcpListener;

use storefront_guard::config::{load_config, GuardConfig};
use storefront_guard::http::HttpServer;
use storefront_guard::lifecycle::Shutdown;
use storefront_guard::observability::{logging, metrics};

#[derive(Parser, Debug)]
#[command(
    name = "storefront-guard",
    about = "Request-protection gateway for the storefront API"
)]
struct Args {
    /// Path to the TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => GuardConfig::default(),
    };

    logging::init(&config.observability.log_level);
    tracing::info!("storefront-guard v0.1.0 starting");

    tracing::info!(
        bind_address = %config.listener.bind_address,
        rate_limit_rules = config.rate_limit.rules.len(),
        csrf_protected_prefixes = config.csrf.protected_prefixes.len(),
        cors_routes = config.cors.routes.len(),
        "Configuration loaded"
    );

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let local_addr = listener.local_addr()?;
    tracing::info!(address = %local_addr, "Listening for connections");

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    // Ctrl+C fans out through the shutdown coordinator to the server loop
    // and the background sweepers.
    let shutdown = Shutdown::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Ctrl+C received");
            signal.trigger();
        }
    });

    // Business handlers mount behind this router; the gateway ships none.
    let business = Router::new();

    let server = HttpServer::new(config, business);
    server.run(listener, shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
