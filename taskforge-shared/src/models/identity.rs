/// Identity model and database operations
///
/// An identity is a registered account. Identities are never hard-deleted:
/// `deleted_at` marks a soft delete, and every lookup in this module ignores
/// soft-deleted rows. Email uniqueness only applies among live identities.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE identity_role AS ENUM ('user', 'admin');
///
/// CREATE TABLE identities (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     email VARCHAR(254) NOT NULL,
///     password_hash VARCHAR(255) NOT NULL,
///     role identity_role NOT NULL DEFAULT 'user',
///     verified BOOLEAN NOT NULL DEFAULT FALSE,
///     verification_code VARCHAR(64) NOT NULL,
///     photo TEXT,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     deleted_at TIMESTAMPTZ
/// );
///
/// CREATE UNIQUE INDEX identities_email_live ON identities (email) WHERE deleted_at IS NULL;
/// ```
///
/// # Example
///
/// ```no_run
/// use taskforge_shared::models::identity::{Identity, NewIdentity, Role};
/// use taskforge_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(&DatabaseConfig::from_env()?).await?;
///
/// let identity = Identity::create(&pool, NewIdentity {
///     email: "alice@example.com".to_string(),
///     password_hash: "$argon2id$...".to_string(),
///     role: Role::User,
///     verification_code: "k3Jd...".to_string(),
/// }).await?;
///
/// let found = Identity::find_by_email(&pool, "alice@example.com").await?;
/// assert_eq!(found.map(|i| i.id), Some(identity.id));
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Global role of an identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "identity_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Regular account; access is granted per project membership
    User,

    /// Operator account; bypasses membership checks
    Admin,
}

impl Role {
    /// Converts role to string for display
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

/// Identity record as persisted in the credential store
///
/// Carries the password hash and verification code, so it must never be
/// returned to clients directly. Use [`Identity::principal`] for that.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Identity {
    /// Unique identity ID
    pub id: Uuid,

    /// Lower-cased email address
    pub email: String,

    /// Argon2id password hash
    #[serde(skip_serializing)]
    pub password_hash: String,

    /// Global role
    pub role: Role,

    /// Whether the verification link has been followed
    pub verified: bool,

    /// Current verification code (rotated on resend)
    #[serde(skip_serializing)]
    pub verification_code: String,

    /// Optional photo reference (URL or data URI)
    pub photo: Option<String>,

    /// When the identity registered
    pub created_at: DateTime<Utc>,

    /// Soft-delete marker
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Public snapshot of an identity
///
/// This is what session resolution returns and what the session cache
/// stores. It is also the shape used for project member listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Principal {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
    pub verified: bool,
    pub photo: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Principal {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

/// Input for creating a new identity
#[derive(Debug, Clone)]
pub struct NewIdentity {
    /// Email address, already normalized by the caller
    pub email: String,

    /// Argon2id password hash (never plaintext)
    pub password_hash: String,

    /// Role to assign
    pub role: Role,

    /// Freshly generated verification code
    pub verification_code: String,
}

impl Identity {
    /// Returns the public snapshot of this identity
    pub fn principal(&self) -> Principal {
        Principal {
            id: self.id,
            email: self.email.clone(),
            role: self.role,
            verified: self.verified,
            photo: self.photo.clone(),
            created_at: self.created_at,
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Creates a new identity
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - A live identity already uses the email (unique violation on
    ///   `identities_email_live`)
    /// - Database connection fails
    pub async fn create(pool: &PgPool, data: NewIdentity) -> Result<Self, sqlx::Error> {
        let identity = sqlx::query_as::<_, Identity>(
            r#"
            INSERT INTO identities (email, password_hash, role, verification_code)
            VALUES ($1, $2, $3, $4)
            RETURNING id, email, password_hash, role, verified, verification_code,
                      photo, created_at, deleted_at
            "#,
        )
        .bind(data.email)
        .bind(data.password_hash)
        .bind(data.role)
        .bind(data.verification_code)
        .fetch_one(pool)
        .await?;

        Ok(identity)
    }

    /// Finds a live identity by ID
    ///
    /// # Returns
    ///
    /// The identity if found and not soft-deleted, None otherwise
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let identity = sqlx::query_as::<_, Identity>(
            r#"
            SELECT id, email, password_hash, role, verified, verification_code,
                   photo, created_at, deleted_at
            FROM identities
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(identity)
    }

    /// Finds a live identity by email address
    ///
    /// The caller is expected to pass a normalized (trimmed, lower-cased)
    /// address.
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        let identity = sqlx::query_as::<_, Identity>(
            r#"
            SELECT id, email, password_hash, role, verified, verification_code,
                   photo, created_at, deleted_at
            FROM identities
            WHERE email = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(email)
        .fetch_optional(pool)
        .await?;

        Ok(identity)
    }

    /// Lists all live identities, oldest first
    pub async fn list(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        let identities = sqlx::query_as::<_, Identity>(
            r#"
            SELECT id, email, password_hash, role, verified, verification_code,
                   photo, created_at, deleted_at
            FROM identities
            WHERE deleted_at IS NULL
            ORDER BY created_at ASC
            "#,
        )
        .fetch_all(pool)
        .await?;

        Ok(identities)
    }

    /// Marks the identity holding `code` as verified
    ///
    /// Matching a code that was already applied still counts as a match, so
    /// following the same link twice is harmless.
    ///
    /// # Returns
    ///
    /// True if a live identity holds the code, false otherwise
    pub async fn mark_verified(pool: &PgPool, code: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE identities
            SET verified = TRUE
            WHERE verification_code = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(code)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Replaces the verification code of an identity
    pub async fn rotate_verification_code(
        pool: &PgPool,
        id: Uuid,
        code: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE identities
            SET verification_code = $2
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .bind(code)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Sets or clears the photo reference
    ///
    /// # Returns
    ///
    /// The updated identity, None if it doesn't exist or was deleted
    pub async fn set_photo(
        pool: &PgPool,
        id: Uuid,
        photo: Option<String>,
    ) -> Result<Option<Self>, sqlx::Error> {
        let identity = sqlx::query_as::<_, Identity>(
            r#"
            UPDATE identities
            SET photo = $2
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING id, email, password_hash, role, verified, verification_code,
                      photo, created_at, deleted_at
            "#,
        )
        .bind(id)
        .bind(photo)
        .fetch_optional(pool)
        .await?;

        Ok(identity)
    }

    /// Soft-deletes an identity
    ///
    /// The email becomes available for a new registration.
    pub async fn soft_delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE identities SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Lists verified identities whose last activity falls in `[from, to)`
    ///
    /// Last activity is the newest session, or the registration time for
    /// identities that never logged in.
    pub async fn last_active_between(
        pool: &PgPool,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let identities = sqlx::query_as::<_, Identity>(
            r#"
            SELECT i.id, i.email, i.password_hash, i.role, i.verified, i.verification_code,
                   i.photo, i.created_at, i.deleted_at
            FROM identities i
            LEFT JOIN sessions s ON s.identity_id = i.id
            WHERE i.deleted_at IS NULL AND i.verified
            GROUP BY i.id
            HAVING COALESCE(MAX(s.created_at), i.created_at) >= $1
               AND COALESCE(MAX(s.created_at), i.created_at) < $2
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_all(pool)
        .await?;

        Ok(identities)
    }

    /// Lists verified identities registered in `[from, to)`
    pub async fn registered_between(
        pool: &PgPool,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let identities = sqlx::query_as::<_, Identity>(
            r#"
            SELECT id, email, password_hash, role, verified, verification_code,
                   photo, created_at, deleted_at
            FROM identities
            WHERE deleted_at IS NULL AND verified
              AND created_at >= $1 AND created_at < $2
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_all(pool)
        .await?;

        Ok(identities)
    }
}

/// Normalizes an email address for storage and lookup
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Identity {
        Identity {
            id: Uuid::new_v4(),
            email: "alice@example.com".to_string(),
            password_hash: "$argon2id$hash".to_string(),
            role: Role::User,
            verified: true,
            verification_code: "code".to_string(),
            photo: Some("https://cdn.example.com/a.png".to_string()),
            created_at: Utc::now(),
            deleted_at: None,
        }
    }

    #[test]
    fn test_role_as_str() {
        assert_eq!(Role::User.as_str(), "user");
        assert_eq!(Role::Admin.as_str(), "admin");
        assert!(Role::Admin.is_admin());
        assert!(!Role::User.is_admin());
    }

    #[test]
    fn test_principal_copies_public_fields() {
        let identity = sample();
        let principal = identity.principal();

        assert_eq!(principal.id, identity.id);
        assert_eq!(principal.email, identity.email);
        assert_eq!(principal.role, Role::User);
        assert!(principal.verified);
        assert_eq!(principal.photo, identity.photo);
        assert_eq!(principal.created_at, identity.created_at);
    }

    #[test]
    fn test_identity_serialization_hides_secrets() {
        let json = serde_json::to_string(&sample()).unwrap();
        assert!(!json.contains("password_hash"));
        assert!(!json.contains("verification_code"));
        assert!(json.contains("\"role\":\"user\""));
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Alice@Example.COM "), "alice@example.com");
    }
}
