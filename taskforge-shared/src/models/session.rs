/// Session ledger model
///
/// The ledger is the durable record of issued sessions and the fallback for
/// the session cache. Rows store the SHA-256 digest of the session token,
/// never the token itself (see [`crate::auth::token::digest_token`]).
///
/// # Schema
///
/// ```sql
/// CREATE TABLE sessions (
///     token_hash VARCHAR(64) PRIMARY KEY,
///     identity_id UUID NOT NULL REFERENCES identities(id) ON DELETE CASCADE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
///
/// CREATE INDEX sessions_identity_id ON sessions (identity_id);
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::identity::Principal;

/// Ledger row for one issued session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Session {
    /// Hex SHA-256 of the session token
    pub token_hash: String,

    /// Identity the session was issued to
    pub identity_id: Uuid,

    /// When the session was issued
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Records a newly issued session
    pub async fn create(
        pool: &PgPool,
        token_hash: &str,
        identity_id: Uuid,
    ) -> Result<Self, sqlx::Error> {
        let session = sqlx::query_as::<_, Session>(
            r#"
            INSERT INTO sessions (token_hash, identity_id)
            VALUES ($1, $2)
            RETURNING token_hash, identity_id, created_at
            "#,
        )
        .bind(token_hash)
        .bind(identity_id)
        .fetch_one(pool)
        .await?;

        Ok(session)
    }

    /// Joins the ledger with the identities table by token digest
    ///
    /// # Returns
    ///
    /// The owning identity's snapshot, None if the session is unknown or
    /// the identity was soft-deleted
    pub async fn resolve_principal(
        pool: &PgPool,
        token_hash: &str,
    ) -> Result<Option<Principal>, sqlx::Error> {
        let principal = sqlx::query_as::<_, Principal>(
            r#"
            SELECT i.id, i.email, i.role, i.verified, i.photo, i.created_at
            FROM sessions s
            INNER JOIN identities i ON i.id = s.identity_id
            WHERE s.token_hash = $1 AND i.deleted_at IS NULL
            "#,
        )
        .bind(token_hash)
        .fetch_optional(pool)
        .await?;

        Ok(principal)
    }

    /// Lists the token digests issued to an identity
    pub async fn token_hashes_for(
        pool: &PgPool,
        identity_id: Uuid,
    ) -> Result<Vec<String>, sqlx::Error> {
        let hashes: Vec<String> =
            sqlx::query_scalar("SELECT token_hash FROM sessions WHERE identity_id = $1")
                .bind(identity_id)
                .fetch_all(pool)
                .await?;

        Ok(hashes)
    }

    /// Revokes a session
    ///
    /// # Returns
    ///
    /// True if a row was removed
    pub async fn delete(pool: &PgPool, token_hash: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM sessions WHERE token_hash = $1")
            .bind(token_hash)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
