/// PostgreSQL connection pool
///
/// One `PgPool` backs every [`PgStore`](crate::store::PgStore) call. The
/// pool is checked with `SELECT 1` before it is handed out, so a bad
/// `DATABASE_URL` fails at startup rather than on the first request.
///
/// # Example
///
/// ```no_run
/// use taskforge_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> anyhow::Result<()> {
/// let pool = create_pool(&DatabaseConfig::from_env()?).await?;
/// # Ok(())
/// # }
/// ```

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::env;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::parse_var;

/// Pool settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL (`DATABASE_URL`)
    pub url: String,

    /// `DATABASE_MAX_CONNECTIONS`
    pub max_connections: u32,

    /// `DATABASE_MIN_CONNECTIONS`
    pub min_connections: u32,

    /// Wait for a free connection before giving up (`DATABASE_ACQUIRE_TIMEOUT_SECS`)
    pub acquire_timeout: Duration,

    /// Close connections idle for longer than this
    pub idle_timeout: Option<Duration>,

    /// Recycle connections after this long
    pub max_lifetime: Option<Duration>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: 10,
            min_connections: 2,
            acquire_timeout: Duration::from_secs(30),
            idle_timeout: Some(Duration::from_secs(600)),
            max_lifetime: Some(Duration::from_secs(1800)),
        }
    }
}

impl DatabaseConfig {
    /// Loads settings from the environment
    ///
    /// # Errors
    ///
    /// Returns an error if `DATABASE_URL` is missing or a numeric variable
    /// does not parse
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();
        let url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable not set"))?;

        Ok(Self {
            url,
            max_connections: parse_var("DATABASE_MAX_CONNECTIONS", defaults.max_connections)?,
            min_connections: parse_var("DATABASE_MIN_CONNECTIONS", defaults.min_connections)?,
            acquire_timeout: Duration::from_secs(parse_var(
                "DATABASE_ACQUIRE_TIMEOUT_SECS",
                defaults.acquire_timeout.as_secs(),
            )?),
            ..defaults
        })
    }
}

/// Connects and verifies the pool
///
/// # Errors
///
/// Returns the connection or health-check failure
pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    info!(
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        acquire_timeout_secs = config.acquire_timeout.as_secs(),
        "Connecting to PostgreSQL"
    );

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections.min(config.max_connections))
        .acquire_timeout(config.acquire_timeout)
        .idle_timeout(config.idle_timeout)
        .max_lifetime(config.max_lifetime)
        .connect(&config.url)
        .await?;

    health_check(&pool).await?;

    info!("PostgreSQL pool ready");
    Ok(pool)
}

/// Round-trips `SELECT 1`
pub async fn health_check(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    debug!("Database health check passed");
    Ok(())
}

/// Pool usage, reported by the API health endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct PoolStats {
    /// Open connections
    pub size: u32,

    /// Open connections not checked out
    pub idle: usize,
}

pub fn pool_stats(pool: &PgPool) -> PoolStats {
    PoolStats {
        size: pool.size(),
        idle: pool.num_idle(),
    }
}
