mod config;
mod dispatcher;
mod params;
mod response;
mod routes;
mod state;
mod telemetry;

use clap::Parser;
use config::GatewayConfig;
use pnp_controller::{ControllerClient, ControllerConfig, HttpControllerClient, MockControllerClient};
use state::AppState;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pnp-gateway", version, about = "REST gateway for a pick-and-place machine controller")]
struct Cli {
    /// Path to a YAML config file; defaults are used for anything not set there.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Serve against an in-memory mock controller instead of a real one.
    #[arg(long)]
    mock_controller: bool,
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info,tower_http=debug".parse().unwrap()))
        .init();
}

async fn shutdown_signal(state: AppState) {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to listen for Ctrl-C");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to listen for SIGTERM")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutdown signal received, cancelling active tasks");
    state.tasks.cancel_all().await;
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let cli = Cli::parse();
    let config = GatewayConfig::load(cli.config.as_deref())?;

    let controller: Arc<dyn ControllerClient> = if cli.mock_controller {
        info!("using mock controller client");
        Arc::new(MockControllerClient::new())
    } else {
        Arc::new(HttpControllerClient::new(ControllerConfig {
            host: config.controller_host.clone(),
            port: config.controller_port,
            api_key: config.controller_api_key.clone(),
            timeout: config.controller_timeout(),
        })?)
    };

    let bind_addr = config.bind_addr.clone();
    let state = AppState::new(config, controller)?;
    let app = routes::build_router(state.clone()).layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(%bind_addr, "pnp-gateway listening");
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal(state)).await?;

    Ok(())
}
