//! forum-hub server entry point.
//!
//! Starts the Axum HTTP server with REST and WebSocket endpoints.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use forum_hub::app_state::AppState;
use forum_hub::config::{ForumConfig, LogFormat};
use forum_hub::hub::Hub;
use forum_hub::persistence::SqliteStore;
use forum_hub::server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ForumConfig::from_env().map_err(|e| anyhow::anyhow!("{e}"))?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
    tracing::info!(addr = %config.listen_addr, "starting forum-hub");

    // Storage
    let store = Arc::new(
        SqliteStore::connect(&config.database())
            .await
            .context("failed to initialize database")?,
    );
    spawn_session_pruner(
        Arc::clone(&store),
        config.session_prune_interval_secs,
        config.session_retention(),
    );

    // Hub and application state
    let hub = Arc::new(Hub::new(
        config.broadcast_policy(),
        config.hub_write_timeout(),
    ));
    let app_state = AppState::new(
        Arc::clone(&store),
        hub,
        config.password_hash_cost,
        config.session_ttl(),
        &config.session_cookie_name,
    );

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr))?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    server::serve(listener, app_state, server::shutdown_signal()).await?;

    store.close().await;
    tracing::info!("server gracefully stopped");
    Ok(())
}

/// Periodically deletes sessions that ended more than `retention` ago.
fn spawn_session_pruner(store: Arc<SqliteStore>, interval_secs: u64, retention: Duration) {
    if interval_secs == 0 {
        return;
    }
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
        loop {
            ticker.tick().await;
            match store.prune_sessions(retention).await {
                Ok(0) => {}
                Ok(removed) => tracing::info!(removed, "pruned stale sessions"),
                Err(e) => tracing::warn!(error = %e, "session pruning failed"),
            }
        }
    });
}
