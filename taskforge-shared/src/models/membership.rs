/// Membership and invitation models
///
/// A membership links an identity to a project and is what grants task-level
/// access. Invitations are the only way for a non-owner to become a member:
/// the owner issues a one-shot code, and accepting it inserts the membership.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE project_members (
///     project_id UUID NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
///     identity_id UUID NOT NULL REFERENCES identities(id) ON DELETE CASCADE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     PRIMARY KEY (project_id, identity_id)
/// );
///
/// CREATE TABLE project_invitations (
///     code VARCHAR(64) PRIMARY KEY,
///     project_id UUID NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
///     invitee_id UUID NOT NULL REFERENCES identities(id) ON DELETE CASCADE,
///     issued_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     accepted_at TIMESTAMPTZ
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use taskforge_shared::models::membership::{AcceptOutcome, Invitation, Membership};
/// use taskforge_shared::db::pool::{create_pool, DatabaseConfig};
/// use uuid::Uuid;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(&DatabaseConfig::from_env()?).await?;
///
/// let project_id = Uuid::new_v4();
/// let invitee_id = Uuid::new_v4();
///
/// Invitation::create(&pool, "q8ZkR2...", project_id, invitee_id).await?;
///
/// match Invitation::accept(&pool, "q8ZkR2...").await? {
///     Some(AcceptOutcome::Joined(invitation)) => {
///         assert!(Membership::exists(&pool, invitation.project_id, invitee_id).await?);
///     }
///     Some(AcceptOutcome::AlreadyAccepted(_)) => {}
///     None => println!("unknown code"),
/// }
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use super::identity::Principal;

/// Project membership row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Membership {
    /// Project ID
    pub project_id: Uuid,

    /// Member identity ID
    pub identity_id: Uuid,

    /// When the identity joined
    pub created_at: DateTime<Utc>,
}

impl Membership {
    /// Inserts a membership unless it already exists
    ///
    /// Takes a connection rather than the pool so it can run inside the
    /// caller's transaction (project creation, invitation acceptance).
    ///
    /// # Arguments
    ///
    /// * `conn` - Connection or open transaction
    /// * `project_id` - Project to join
    /// * `identity_id` - Identity joining
    ///
    /// # Returns
    ///
    /// True if a row was inserted, false if the identity was already a member
    pub async fn upsert(
        conn: &mut PgConnection,
        project_id: Uuid,
        identity_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO project_members (project_id, identity_id)
            VALUES ($1, $2)
            ON CONFLICT (project_id, identity_id) DO NOTHING
            "#,
        )
        .bind(project_id)
        .bind(identity_id)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Checks whether an identity is a current member of a project
    pub async fn exists(
        pool: &PgPool,
        project_id: Uuid,
        identity_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM project_members
                WHERE project_id = $1 AND identity_id = $2
            )
            "#,
        )
        .bind(project_id)
        .bind(identity_id)
        .fetch_one(pool)
        .await?;

        Ok(exists)
    }

    /// Lists the live identities that are members of a project
    ///
    /// Ordered by join time, so the owner comes first.
    pub async fn members(pool: &PgPool, project_id: Uuid) -> Result<Vec<Principal>, sqlx::Error> {
        let members = sqlx::query_as::<_, Principal>(
            r#"
            SELECT i.id, i.email, i.role, i.verified, i.photo, i.created_at
            FROM project_members m
            INNER JOIN identities i ON i.id = m.identity_id
            WHERE m.project_id = $1 AND i.deleted_at IS NULL
            ORDER BY m.created_at ASC
            "#,
        )
        .bind(project_id)
        .fetch_all(pool)
        .await?;

        Ok(members)
    }

    /// Removes a membership
    ///
    /// # Returns
    ///
    /// True if a row was removed, false if the identity wasn't a member
    pub async fn delete(
        pool: &PgPool,
        project_id: Uuid,
        identity_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM project_members WHERE project_id = $1 AND identity_id = $2",
        )
        .bind(project_id)
        .bind(identity_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// Pending or accepted project invitation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Invitation {
    /// One-shot code embedded in the join link
    #[serde(skip_serializing)]
    pub code: String,

    /// Project the invitee is asked to join
    pub project_id: Uuid,

    /// Identity the invitation is addressed to
    pub invitee_id: Uuid,

    /// When the invitation was issued
    pub issued_at: DateTime<Utc>,

    /// When the invitation was consumed
    pub accepted_at: Option<DateTime<Utc>>,
}

/// Result of consuming an invitation code
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcceptOutcome {
    /// The code was fresh and the invitee is now a member
    Joined(Invitation),

    /// The code had already been consumed; nothing was written
    AlreadyAccepted(Invitation),
}

impl AcceptOutcome {
    pub fn invitation(&self) -> &Invitation {
        match self {
            AcceptOutcome::Joined(invitation) | AcceptOutcome::AlreadyAccepted(invitation) => {
                invitation
            }
        }
    }
}

impl Invitation {
    pub fn is_accepted(&self) -> bool {
        self.accepted_at.is_some()
    }

    /// Persists a new invitation
    ///
    /// # Errors
    ///
    /// Returns an error if the code collides, the project or invitee doesn't
    /// exist, or the database fails
    pub async fn create(
        pool: &PgPool,
        code: &str,
        project_id: Uuid,
        invitee_id: Uuid,
    ) -> Result<Self, sqlx::Error> {
        let invitation = sqlx::query_as::<_, Invitation>(
            r#"
            INSERT INTO project_invitations (code, project_id, invitee_id)
            VALUES ($1, $2, $3)
            RETURNING code, project_id, invitee_id, issued_at, accepted_at
            "#,
        )
        .bind(code)
        .bind(project_id)
        .bind(invitee_id)
        .fetch_one(pool)
        .await?;

        Ok(invitation)
    }

    /// Consumes an invitation code and inserts the membership
    ///
    /// The invitation row is locked with `FOR UPDATE`, so two concurrent
    /// accepts of the same code serialize. Stamping `accepted_at` and the
    /// membership upsert commit together or not at all.
    ///
    /// # Returns
    ///
    /// - `None` if the code is unknown or its project was soft-deleted
    /// - `Some(Joined)` if this call consumed the code
    /// - `Some(AlreadyAccepted)` if the code was consumed earlier
    pub async fn accept(pool: &PgPool, code: &str) -> Result<Option<AcceptOutcome>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let invitation = sqlx::query_as::<_, Invitation>(
            r#"
            SELECT inv.code, inv.project_id, inv.invitee_id, inv.issued_at, inv.accepted_at
            FROM project_invitations inv
            INNER JOIN projects p ON p.id = inv.project_id
            WHERE inv.code = $1 AND p.deleted_at IS NULL
            FOR UPDATE OF inv
            "#,
        )
        .bind(code)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(invitation) = invitation else {
            return Ok(None);
        };

        if invitation.is_accepted() {
            return Ok(Some(AcceptOutcome::AlreadyAccepted(invitation)));
        }

        let invitation = sqlx::query_as::<_, Invitation>(
            r#"
            UPDATE project_invitations
            SET accepted_at = NOW()
            WHERE code = $1
            RETURNING code, project_id, invitee_id, issued_at, accepted_at
            "#,
        )
        .bind(code)
        .fetch_one(&mut *tx)
        .await?;

        Membership::upsert(&mut tx, invitation.project_id, invitation.invitee_id).await?;

        tx.commit().await?;

        Ok(Some(AcceptOutcome::Joined(invitation)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invitation(accepted: bool) -> Invitation {
        Invitation {
            code: "abc".to_string(),
            project_id: Uuid::new_v4(),
            invitee_id: Uuid::new_v4(),
            issued_at: Utc::now(),
            accepted_at: accepted.then(Utc::now),
        }
    }

    #[test]
    fn test_is_accepted() {
        assert!(!invitation(false).is_accepted());
        assert!(invitation(true).is_accepted());
    }

    #[test]
    fn test_outcome_exposes_invitation() {
        let inv = invitation(true);
        let outcome = AcceptOutcome::AlreadyAccepted(inv.clone());
        assert_eq!(outcome.invitation(), &inv);
    }

    #[test]
    fn test_invitation_serialization_hides_code() {
        let json = serde_json::to_string(&invitation(false)).unwrap();
        assert!(!json.contains("\"code\""));
    }
}
