use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tracing::info;

mod cli;
mod handlers;
mod rate_limit;
mod router;
mod state;


use kotoba_gateway::{ConnectionManager, GatewayConfig, RequestGateway};
use kotoba_vertex::{VertexConnector, VertexSettings};

use crate::cli::Cli;
use crate::rate_limit::RateLimiter;
use crate::state::AppState;

const RATE_LIMIT_CAPACITY: u32 = 30;
const RATE_LIMIT_REFILL_PER_MIN: u32 = 30;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    init_tracing();
    if let Err(err) = run().await {
        eprintln!("kotoba failed: {err}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();
    let config = GatewayConfig::from_env()?;
    info!(
        project = %config.project_id,
        location = %config.location,
        model = %config.model_name,
        credentials = config.credentials_path.is_some(),
        "config loaded"
    );

    let connector = Arc::new(VertexConnector::new(VertexSettings {
        project_id: config.project_id.clone(),
        location: config.location.clone(),
        model: config.model_name.clone(),
        credentials_path: config.credentials_path.clone(),
    }));
    let manager = Arc::new(ConnectionManager::new(config, connector));
    let gateway = Arc::new(RequestGateway::new(manager.clone()));
    let state = AppState {
        manager,
        gateway,
        limiter: RateLimiter::new(RATE_LIMIT_CAPACITY, RATE_LIMIT_REFILL_PER_MIN),
    };

    let app = router::router(state, cli.allowed_origin.as_deref())?;

    let bind = format!("{}:{}", cli.host, cli.port);
    let listener = tokio::net::TcpListener::bind(&bind).await?;
    info!(addr = %bind, "listening");
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new("kotoba=info,kotoba_gateway=info,kotoba_vertex=info")
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
