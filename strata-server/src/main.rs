//! # Strata Server
//!
//! Run with: `cargo run --bin strata-server`
//!
//! Configuration comes from the environment; see `strata_core::config` for
//! the variables and their defaults.

use std::sync::Arc;

use anyhow::Result;
use axum::middleware;
use tracing::{info, Level};

use strata_core::config::{ServerConfig, StoreConfig};
use strata_server::ratelimit::{rate_limit, RateLimiter};
use strata_server::server::{create_router, AppState};
use strata_store::Store;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .init();

    let store_config = StoreConfig::from_env();
    let server_config = ServerConfig::from_env();

    info!(data_dir = ?store_config.data_dir, "opening store");
    let store = Arc::new(Store::open(store_config).await?);

    let state = Arc::new(AppState::new(store.clone()));
    let limiter = Arc::new(RateLimiter::new(&server_config.rate_limit));
    let app = create_router(state).layer(middleware::from_fn_with_state(limiter, rate_limit));

    let listener = tokio::net::TcpListener::bind(&server_config.http_addr).await?;
    info!("HTTP listening on {}", server_config.http_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // The server has drained; flush what the memtable still holds.
    store.close().await?;
    info!("store closed, bye");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown signal received");
    }
}
