/// Project model and database operations
///
/// A project groups tasks and members. The owner is enrolled as a member in
/// the same transaction that creates the project, so a project never exists
/// without its owner membership.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE projects (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(100) NOT NULL,
///     owner_id UUID NOT NULL REFERENCES identities(id),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     deleted_at TIMESTAMPTZ
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use taskforge_shared::models::project::Project;
/// use taskforge_shared::db::pool::{create_pool, DatabaseConfig};
/// use uuid::Uuid;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(&DatabaseConfig::from_env()?).await?;
///
/// let owner_id = Uuid::new_v4();
/// let project = Project::create_with_owner(&pool, "Website relaunch", owner_id).await?;
///
/// let projects = Project::list_for_member(&pool, owner_id).await?;
/// assert!(projects.iter().any(|p| p.id == project.id));
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::membership::Membership;

/// Project model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Project {
    /// Unique project ID
    pub id: Uuid,

    /// Display name
    pub name: String,

    /// Identity that created the project
    pub owner_id: Uuid,

    /// When the project was created
    pub created_at: DateTime<Utc>,

    /// When the project was last renamed
    pub updated_at: DateTime<Utc>,

    /// Soft-delete marker
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Project {
    pub fn is_owned_by(&self, identity_id: Uuid) -> bool {
        self.owner_id == identity_id
    }

    /// Creates a project and enrolls its owner as a member
    ///
    /// Both inserts run in one transaction. If the membership insert fails
    /// the project row is rolled back.
    ///
    /// # Errors
    ///
    /// Returns an error if the owner doesn't exist or the database fails
    pub async fn create_with_owner(
        pool: &PgPool,
        name: &str,
        owner_id: Uuid,
    ) -> Result<Self, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let project = sqlx::query_as::<_, Project>(
            r#"
            INSERT INTO projects (name, owner_id)
            VALUES ($1, $2)
            RETURNING id, name, owner_id, created_at, updated_at, deleted_at
            "#,
        )
        .bind(name)
        .bind(owner_id)
        .fetch_one(&mut *tx)
        .await?;

        Membership::upsert(&mut tx, project.id, owner_id).await?;

        tx.commit().await?;

        Ok(project)
    }

    /// Finds a live project by ID
    pub async fn find_live(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let project = sqlx::query_as::<_, Project>(
            r#"
            SELECT id, name, owner_id, created_at, updated_at, deleted_at
            FROM projects
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(project)
    }

    /// Lists every live project, newest first
    pub async fn list_all(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        let projects = sqlx::query_as::<_, Project>(
            r#"
            SELECT id, name, owner_id, created_at, updated_at, deleted_at
            FROM projects
            WHERE deleted_at IS NULL
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(pool)
        .await?;

        Ok(projects)
    }

    /// Lists live projects the identity is a member of, newest first
    pub async fn list_for_member(
        pool: &PgPool,
        identity_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let projects = sqlx::query_as::<_, Project>(
            r#"
            SELECT p.id, p.name, p.owner_id, p.created_at, p.updated_at, p.deleted_at
            FROM projects p
            INNER JOIN project_members m ON m.project_id = p.id
            WHERE m.identity_id = $1 AND p.deleted_at IS NULL
            ORDER BY p.created_at DESC
            "#,
        )
        .bind(identity_id)
        .fetch_all(pool)
        .await?;

        Ok(projects)
    }

    /// Renames a live project and bumps `updated_at`
    ///
    /// # Returns
    ///
    /// The updated project, None if it doesn't exist or was deleted
    pub async fn rename(
        pool: &PgPool,
        id: Uuid,
        name: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let project = sqlx::query_as::<_, Project>(
            r#"
            UPDATE projects
            SET name = $2, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING id, name, owner_id, created_at, updated_at, deleted_at
            "#,
        )
        .bind(id)
        .bind(name)
        .fetch_optional(pool)
        .await?;

        Ok(project)
    }

    /// Soft-deletes a project
    pub async fn soft_delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE projects SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Hard-deletes every soft-deleted project
    ///
    /// Members, invitations and tasks go with it through `ON DELETE CASCADE`.
    ///
    /// # Returns
    ///
    /// Number of projects removed
    pub async fn purge_deleted(pool: &PgPool) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM projects WHERE deleted_at IS NOT NULL")
            .execute(pool)
            .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_owned_by() {
        let owner = Uuid::new_v4();
        let project = Project {
            id: Uuid::new_v4(),
            name: "Roadmap".to_string(),
            owner_id: owner,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            deleted_at: None,
        };

        assert!(project.is_owned_by(owner));
        assert!(!project.is_owned_by(Uuid::new_v4()));
    }

    #[test]
    fn test_live_project_serializes_without_deleted_at() {
        let project = Project {
            id: Uuid::new_v4(),
            name: "Roadmap".to_string(),
            owner_id: Uuid::new_v4(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            deleted_at: None,
        };

        let json = serde_json::to_value(&project).unwrap();
        assert!(json.get("deleted_at").is_none());
        assert_eq!(json["name"], "Roadmap");
    }
}
