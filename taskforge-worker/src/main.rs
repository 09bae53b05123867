//! # TaskForge Worker
//!
//! Sends inactivity reminders and anniversary notices on a timer.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p taskforge-worker
//! ```

use std::sync::Arc;

use anyhow::Context;
use taskforge_shared::config::log_json_from_env;
use taskforge_shared::db::pool::create_pool;
use taskforge_shared::engine::Engine;
use taskforge_shared::redis::{RedisClient, RedisNotificationQueue, RedisSessionCache};
use taskforge_shared::store::PgStore;
use taskforge_shared::telemetry::init_tracing;
use taskforge_worker::config::Config;
use taskforge_worker::jobs::{AnniversaryNoticeJob, InactivityReminderJob};
use taskforge_worker::scheduler::Scheduler;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing("taskforge_worker=debug,taskforge_shared=info", log_json_from_env());

    tracing::info!(
        "TaskForge Worker v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let config = Config::from_env()?;

    // Migrations are owned by the API server
    let pool = create_pool(&config.database)
        .await
        .context("connecting to the database")?;

    let redis = RedisClient::new(config.redis.clone())
        .await
        .context("connecting to Redis")?;

    let engine = Engine::new(
        Arc::new(PgStore::new(pool)),
        Arc::new(RedisSessionCache::new(redis.clone())),
        Arc::new(RedisNotificationQueue::new(
            redis,
            config.engine.notification_stream.clone(),
        )),
        config.engine.clone(),
    );

    let mut scheduler = Scheduler::new();
    scheduler.register(Arc::new(InactivityReminderJob::new(
        engine.clone(),
        config.jobs.inactivity_threshold,
        config.jobs.period,
    )));
    scheduler.register(Arc::new(AnniversaryNoticeJob::new(
        engine,
        config.jobs.anniversary_age,
        config.jobs.period,
    )));

    let shutdown = scheduler.shutdown_token();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for shutdown signal");
        }
        tracing::info!("Shutdown signal received, stopping jobs...");
        shutdown.cancel();
    });

    scheduler.run().await
}
