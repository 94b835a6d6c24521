//! chat-hub server entry point.
//!
//! Starts the Axum HTTP server with the WebSocket endpoint, diagnostics
//! REST, and the liveness monitor.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use chat_hub::app_state::AppState;
use chat_hub::auth::JwtAuthResolver;
use chat_hub::build_app;
use chat_hub::config::{HubConfig, LogFormat};
use chat_hub::hub::liveness::start_liveness_monitor;
use chat_hub::hub::{Hub, HubSettings};
use chat_hub::persistence::Collaborators;
use chat_hub::persistence::memory::MemoryStore;
use chat_hub::persistence::postgres::PostgresStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = HubConfig::from_env()
        .map_err(|e| anyhow::anyhow!("invalid configuration: {e}"))?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
    tracing::info!(addr = %config.listen_addr, "starting chat-hub");

    // Build persistence collaborators
    let collaborators = if config.persistence_enabled {
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .min_connections(config.database_min_connections)
            .acquire_timeout(Duration::from_secs(config.database_connect_timeout_secs))
            .connect(&config.database_url)
            .await
            .context("connecting to PostgreSQL")?;
        let store = Arc::new(PostgresStore::new(pool));
        store.migrate().await.context("running migrations")?;
        tracing::info!("persistence: PostgreSQL");
        Collaborators::from_store(store)
    } else {
        tracing::warn!("persistence disabled: using in-memory store");
        Collaborators::from_store(Arc::new(MemoryStore::new()))
    };

    // Build the hub and its background task
    let hub = Hub::new(collaborators, HubSettings::from(&config));
    let cancel_token = CancellationToken::new();
    let liveness = tokio::spawn(start_liveness_monitor(
        Arc::clone(&hub),
        cancel_token.clone(),
    ));

    // Build application state and router
    let app_state = AppState {
        hub,
        auth: Arc::new(JwtAuthResolver::new(config.jwt_secret.as_bytes())),
    };
    let app = build_app(app_state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("binding {}", config.listen_addr))?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    let shutdown = cancel_token.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for shutdown signal");
            }
            tracing::info!("shutdown signal received");
            shutdown.cancel();
        })
        .await
        .context("server error")?;

    cancel_token.cancel();
    let _ = liveness.await;
    tracing::info!("chat-hub stopped");
    Ok(())
}
