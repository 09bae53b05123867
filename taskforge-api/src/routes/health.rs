/// Health check endpoint
///
/// Reports liveness plus the state of the backends the server was started
/// with. Backends that are not configured (in-memory runs, tests) are
/// reported as `"none"`.
///
/// # Endpoint
///
/// ```text
/// GET /health
/// ```
///
/// # Response
///
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "database": "connected",
///   "redis": "connected"
/// }
/// ```

use crate::app::AppState;
use axum::{extract::State, Json};
use serde::Serialize;
use taskforge_shared::db::pool::{health_check as database_health, pool_stats, PoolStats};

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `healthy` or `degraded`
    pub status: String,

    /// Application version
    pub version: String,

    /// Database status
    pub database: String,

    /// Redis status
    pub redis: String,

    /// Connection counts when a database is configured
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pool: Option<PoolStats>,
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let database = match &state.db {
        Some(pool) => match database_health(pool).await {
            Ok(()) => "connected",
            Err(_) => "disconnected",
        },
        None => "none",
    };

    let redis = match &state.redis {
        Some(client) => match client.ping().await {
            Ok(true) => "connected",
            Ok(false) | Err(_) => "disconnected",
        },
        None => "none",
    };

    let degraded = database == "disconnected" || redis == "disconnected";

    Json(HealthResponse {
        status: if degraded { "degraded" } else { "healthy" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: database.to_string(),
        redis: redis.to_string(),
        pool: state.db.as_ref().map(pool_stats),
    })
}
