/// Task model and database operations
///
/// Tasks live inside a project. A task is only visible while both the task
/// and its project are live; soft-deleting either hides it.
///
/// # Status
///
/// ```text
/// not_done ⇄ in_progress ⇄ done
/// ```
///
/// Any status may be set from any other; there is no enforced ordering.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE task_status AS ENUM ('not_done', 'in_progress', 'done');
///
/// CREATE TABLE tasks (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     project_id UUID NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
///     creator_id UUID NOT NULL REFERENCES identities(id),
///     assignee_id UUID NOT NULL REFERENCES identities(id),
///     name VARCHAR(100) NOT NULL,
///     description TEXT NOT NULL DEFAULT '',
///     status task_status NOT NULL DEFAULT 'not_done',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     deleted_at TIMESTAMPTZ
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use taskforge_shared::models::task::{NewTask, Task, TaskChanges, TaskStatus};
/// use taskforge_shared::db::pool::{create_pool, DatabaseConfig};
/// use uuid::Uuid;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(&DatabaseConfig::from_env()?).await?;
///
/// let alice = Uuid::new_v4();
/// let task = Task::create(&pool, NewTask {
///     project_id: Uuid::new_v4(),
///     creator_id: alice,
///     assignee_id: alice,
///     name: "Write release notes".to_string(),
///     description: String::new(),
/// }).await?;
///
/// if let Some(task) = task {
///     Task::update(&pool, task.id, TaskChanges {
///         status: Some(TaskStatus::InProgress),
///         ..Default::default()
///     }).await?;
/// }
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Task progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    NotDone,
    InProgress,
    Done,
}

impl TaskStatus {
    /// Converts status to its stored string
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::NotDone => "not_done",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Done => "done",
        }
    }
}

/// Task model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    /// Unique task ID
    pub id: Uuid,

    /// Project this task belongs to
    pub project_id: Uuid,

    /// Identity that created the task
    pub creator_id: Uuid,

    /// Identity responsible for the task
    pub assignee_id: Uuid,

    /// Short title
    pub name: String,

    /// Free-form details
    pub description: String,

    /// Current status
    pub status: TaskStatus,

    /// When the task was created
    pub created_at: DateTime<Utc>,

    /// When the task was last updated
    pub updated_at: DateTime<Utc>,

    /// Soft-delete marker
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Input for creating a task
#[derive(Debug, Clone)]
pub struct NewTask {
    pub project_id: Uuid,
    pub creator_id: Uuid,
    pub assignee_id: Uuid,
    pub name: String,
    pub description: String,
}

/// Partial update of a task; `None` leaves the field unchanged
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub assignee_id: Option<Uuid>,
}

impl TaskChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.status.is_none()
            && self.assignee_id.is_none()
    }
}

/// Listing filter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskFilter {
    /// Only tasks of this project
    pub project_id: Option<Uuid>,

    /// Only tasks in projects this identity is a member of
    pub member_id: Option<Uuid>,
}

impl Task {
    /// Creates a task in `not_done` status
    ///
    /// The insert is conditional on the project being live, so a task can
    /// never be attached to a soft-deleted project even if the project was
    /// deleted after the caller's permission check.
    ///
    /// # Returns
    ///
    /// The new task, or None if the project doesn't exist or was deleted
    pub async fn create(pool: &PgPool, data: NewTask) -> Result<Option<Self>, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(
            r#"
            INSERT INTO tasks (project_id, creator_id, assignee_id, name, description)
            SELECT $1, $2, $3, $4, $5
            WHERE EXISTS (SELECT 1 FROM projects WHERE id = $1 AND deleted_at IS NULL)
            RETURNING id, project_id, creator_id, assignee_id, name, description, status,
                      created_at, updated_at, deleted_at
            "#,
        )
        .bind(data.project_id)
        .bind(data.creator_id)
        .bind(data.assignee_id)
        .bind(data.name)
        .bind(data.description)
        .fetch_optional(pool)
        .await?;

        Ok(task)
    }

    /// Finds a live task whose project is also live
    pub async fn find_live(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(
            r#"
            SELECT t.id, t.project_id, t.creator_id, t.assignee_id, t.name, t.description,
                   t.status, t.created_at, t.updated_at, t.deleted_at
            FROM tasks t
            INNER JOIN projects p ON p.id = t.project_id
            WHERE t.id = $1 AND t.deleted_at IS NULL AND p.deleted_at IS NULL
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(task)
    }

    /// Lists live tasks matching the filter, newest first
    pub async fn list(pool: &PgPool, filter: TaskFilter) -> Result<Vec<Self>, sqlx::Error> {
        let tasks = sqlx::query_as::<_, Task>(
            r#"
            SELECT t.id, t.project_id, t.creator_id, t.assignee_id, t.name, t.description,
                   t.status, t.created_at, t.updated_at, t.deleted_at
            FROM tasks t
            INNER JOIN projects p ON p.id = t.project_id
            WHERE t.deleted_at IS NULL AND p.deleted_at IS NULL
              AND ($1::uuid IS NULL OR t.project_id = $1)
              AND ($2::uuid IS NULL OR EXISTS (
                  SELECT 1 FROM project_members m
                  WHERE m.project_id = t.project_id AND m.identity_id = $2
              ))
            ORDER BY t.created_at DESC
            "#,
        )
        .bind(filter.project_id)
        .bind(filter.member_id)
        .fetch_all(pool)
        .await?;

        Ok(tasks)
    }

    /// Applies a partial update and bumps `updated_at`
    ///
    /// # Returns
    ///
    /// The updated task, None if it doesn't exist or was deleted
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        changes: TaskChanges,
    ) -> Result<Option<Self>, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(
            r#"
            UPDATE tasks
            SET name = COALESCE($2, name),
                description = COALESCE($3, description),
                status = COALESCE($4, status),
                assignee_id = COALESCE($5, assignee_id),
                updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING id, project_id, creator_id, assignee_id, name, description, status,
                      created_at, updated_at, deleted_at
            "#,
        )
        .bind(id)
        .bind(changes.name)
        .bind(changes.description)
        .bind(changes.status)
        .bind(changes.assignee_id)
        .fetch_optional(pool)
        .await?;

        Ok(task)
    }

    /// Soft-deletes a task
    pub async fn soft_delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE tasks SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_status_as_str() {
        assert_eq!(TaskStatus::NotDone.as_str(), "not_done");
        assert_eq!(TaskStatus::InProgress.as_str(), "in_progress");
        assert_eq!(TaskStatus::Done.as_str(), "done");
    }

    #[test]
    fn test_task_status_default() {
        assert_eq!(TaskStatus::default(), TaskStatus::NotDone);
    }

    #[test]
    fn test_task_status_serde_names() {
        let json = serde_json::to_string(&TaskStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");

        let parsed: TaskStatus = serde_json::from_str("\"done\"").unwrap();
        assert_eq!(parsed, TaskStatus::Done);
    }

    #[test]
    fn test_task_changes_is_empty() {
        assert!(TaskChanges::default().is_empty());
        assert!(!TaskChanges {
            status: Some(TaskStatus::Done),
            ..Default::default()
        }
        .is_empty());
    }
}
