use std::env;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use nutrirec_engine::{EngineConfig, Recommender};
use tokio::task;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod api;

const DEFAULT_BIND: &str = "0.0.0.0:8000";

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = EngineConfig::load()?;
    let snapshot = config.snapshot_path.clone();
    // Warm up before binding so the first request never pays for the load.
    let recommender = task::spawn_blocking(move || Recommender::open(&config))
        .await?
        .with_context(|| format!("failed to load recipes from {}", snapshot.display()))?;
    let state = Arc::new(api::AppState::new(recommender));
    let app = api::router(state);

    let addr: SocketAddr = env::var("BIND_ADDR")
        .unwrap_or_else(|_| DEFAULT_BIND.to_string())
        .parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("listening" = %addr);
    axum::serve(listener, app).await?;
    Ok(())
}
