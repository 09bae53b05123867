/// Embedded schema migrations
///
/// The SQL under `taskforge-shared/migrations/` is compiled into
/// [`MIGRATOR`]. The API server applies it at startup; the worker only
/// reads the schema.
///
/// # Example
///
/// ```no_run
/// use taskforge_shared::db::migrations::{pending_migrations, run_migrations};
/// use taskforge_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> anyhow::Result<()> {
/// let pool = create_pool(&DatabaseConfig::from_env()?).await?;
/// run_migrations(&pool).await?;
/// assert_eq!(pending_migrations(&pool).await?, 0);
/// # Ok(())
/// # }
/// ```

use sqlx::migrate::{MigrateDatabase, Migrator};
use sqlx::postgres::PgPool;
use sqlx::Postgres;
use tracing::{error, info};

pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Applies every pending migration, each in its own transaction
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    info!(available = MIGRATOR.iter().count(), "Applying database migrations");

    MIGRATOR.run(pool).await.map_err(|e| {
        error!(error = %e, "Migration failed");
        e
    })?;

    info!("Database schema is up to date");
    Ok(())
}

/// Embedded migrations not yet recorded as applied
///
/// A database that was never migrated reports all of them.
pub async fn pending_migrations(pool: &PgPool) -> Result<usize, sqlx::Error> {
    let tracked: Option<String> =
        sqlx::query_scalar("SELECT to_regclass('public._sqlx_migrations')::text")
            .fetch_one(pool)
            .await?;

    let applied: Vec<i64> = match tracked {
        Some(_) => {
            sqlx::query_scalar("SELECT version FROM _sqlx_migrations WHERE success")
                .fetch_all(pool)
                .await?
        }
        None => Vec::new(),
    };

    Ok(MIGRATOR
        .iter()
        .filter(|m| !m.migration_type.is_down_migration())
        .filter(|m| !applied.contains(&m.version))
        .count())
}

/// Creates the database named in `database_url` when it is missing
///
/// For development and test setups.
pub async fn ensure_database_exists(database_url: &str) -> Result<(), sqlx::Error> {
    if !Postgres::database_exists(database_url).await? {
        info!("Creating missing database");
        Postgres::create_database(database_url).await?;
    }
    Ok(())
}
