//! # TaskForge API Server
//!
//! Serves registration, sessions, projects and tasks over HTTP.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p taskforge-api
//! ```

use std::sync::Arc;

use anyhow::Context;
use taskforge_api::app::{build_router, AppState};
use taskforge_api::config::Config;
use taskforge_shared::config::log_json_from_env;
use taskforge_shared::db::{migrations::run_migrations, pool::create_pool};
use taskforge_shared::engine::Engine;
use taskforge_shared::redis::{RedisClient, RedisNotificationQueue, RedisSessionCache};
use taskforge_shared::store::PgStore;
use taskforge_shared::telemetry::init_tracing;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing(
        "taskforge_api=debug,taskforge_shared=info,tower_http=debug",
        log_json_from_env(),
    );

    tracing::info!(
        "TaskForge API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let config = Config::from_env()?;

    let pool = create_pool(&config.database)
        .await
        .context("connecting to the database")?;
    run_migrations(&pool).await.context("running migrations")?;

    let redis = RedisClient::new(config.redis.clone())
        .await
        .context("connecting to Redis")?;

    let engine = Engine::new(
        Arc::new(PgStore::new(pool.clone())),
        Arc::new(RedisSessionCache::new(redis.clone())),
        Arc::new(RedisNotificationQueue::new(
            redis.clone(),
            config.engine.notification_stream.clone(),
        )),
        config.engine.clone(),
    );

    let state = AppState::new(engine, config.api.clone()).with_backends(pool, redis);
    let app = build_router(state);

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("binding {}", address))?;

    tracing::info!("Server listening on http://{}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutdown signal received, draining connections...");
}
