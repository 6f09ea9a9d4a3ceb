//! Sales API service.
//!
//! # Lifecycle
//!
//! ```text
//!   load config ──▶ init logging/metrics ──▶ Supervisor::run
//!                                               │
//!                    ┌──────────────────────────┴──────────────────────┐
//!                    ▼                                                 ▼
//!            listener fails                             SIGINT / SIGTERM / admin
//!                    │                                                 │
//!                    │                                   graceful drain (grace period)
//!                    │                                                 │
//!                    │                                  timeout/error ─▶ force close
//!                    ▼                                                 ▼
//!                 exit 1                            exit 0 only if the drain succeeded
//! ```

use axum::Router;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use sales_api::admin;
use sales_api::config::{load_config, ServiceConfig};
use sales_api::http::HttpServer;
use sales_api::lifecycle::{OsSignals, Shutdown, Supervisor, TerminationSource};
use sales_api::observability;

#[derive(Parser)]
#[command(name = "sales-api", version)]
#[command(about = "Service for managing inventory and sales at a Garage Sale", long_about = None)]
struct Cli {
    /// TOML configuration file. SALES_* environment variables override it.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Only show the parsed configuration, then exit.
    #[arg(long)]
    config_only: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: parsing config: {e}");
            return ExitCode::FAILURE;
        }
    };

    if cli.config_only {
        return match serde_json::to_string_pretty(&config) {
            Ok(json) => {
                println!("{json}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("error: encoding config as json: {e}");
                ExitCode::FAILURE
            }
        };
    }

    if let Err(e) = observability::logging::init_logging(&config.observability) {
        eprintln!("error: initializing logging: {e}");
        return ExitCode::FAILURE;
    }

    match run(config).await {
        Ok(()) => {
            tracing::info!("Done");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Shutting down");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: ServiceConfig) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "sales-api starting");
    tracing::info!(
        address = %config.http.address,
        max_connections = config.http.max_connections,
        grace_period_secs = config.shutdown.grace_period_secs,
        admin_enabled = config.admin.enabled,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        let addr: std::net::SocketAddr = config.observability.metrics_address.parse()?;
        observability::metrics::init_metrics(addr)?;
    }

    let shutdown = Shutdown::new();
    let mut routes = Router::new();
    if config.admin.enabled {
        routes = routes.merge(admin::routes(shutdown.clone(), &config.admin.api_key));
    }

    let server = Arc::new(HttpServer::with_routes(&config.http, routes));
    let source = OsSignals::new()?.or(shutdown.subscribe());

    let supervisor = Supervisor::new(
        server,
        config.http.address.clone(),
        config.shutdown.grace_period(),
        source,
    );
    supervisor.run().await?;

    Ok(())
}
