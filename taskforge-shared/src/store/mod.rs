/// Durable store seams
///
/// The engine talks to persistence through the traits in this module, never
/// to `sqlx` directly. Two backends implement all of them:
///
/// - [`postgres::PgStore`]: the production backend, delegating to the SQL in
///   [`crate::models`]
/// - [`memory::MemoryStore`]: an in-process backend for tests and local runs
///
/// Every method distinguishes "absent" (`Ok(None)` / `Ok(false)`) from a
/// failure (`Err(StoreError)`).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::identity::{Identity, NewIdentity, Principal};
use crate::models::membership::{AcceptOutcome, Invitation};
use crate::models::project::Project;
use crate::models::task::{NewTask, Task, TaskChanges, TaskFilter};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Error type for store operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// A row the operation required does not exist
    #[error("Record not found")]
    NotFound,

    /// A uniqueness constraint rejected the write
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Any other backend failure
    #[error("Store backend error: {0}")]
    Backend(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                StoreError::Conflict(db_err.message().to_string())
            }
            other => StoreError::Backend(other.to_string()),
        }
    }
}

/// Identity records
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Inserts a new identity; `Conflict` if a live identity has the email
    async fn create_identity(&self, data: NewIdentity) -> Result<Identity, StoreError>;

    async fn identity_by_id(&self, id: Uuid) -> Result<Option<Identity>, StoreError>;

    async fn identity_by_email(&self, email: &str) -> Result<Option<Identity>, StoreError>;

    async fn list_identities(&self) -> Result<Vec<Identity>, StoreError>;

    /// Flips `verified` for the live identity holding `code`
    async fn mark_verified(&self, code: &str) -> Result<bool, StoreError>;

    async fn rotate_verification_code(&self, id: Uuid, code: &str) -> Result<bool, StoreError>;

    async fn set_photo(
        &self,
        id: Uuid,
        photo: Option<String>,
    ) -> Result<Option<Identity>, StoreError>;

    async fn soft_delete_identity(&self, id: Uuid) -> Result<bool, StoreError>;

    /// Verified identities whose last session (or registration) is in `[from, to)`
    async fn last_active_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Identity>, StoreError>;

    /// Verified identities registered in `[from, to)`
    async fn registered_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Identity>, StoreError>;
}

/// Durable record of issued sessions, keyed by token digest
#[async_trait]
pub trait SessionLedger: Send + Sync {
    async fn record_session(&self, token_hash: &str, identity_id: Uuid) -> Result<(), StoreError>;

    /// Joins the ledger with live identities
    async fn resolve_session(&self, token_hash: &str) -> Result<Option<Principal>, StoreError>;

    async fn session_hashes(&self, identity_id: Uuid) -> Result<Vec<String>, StoreError>;

    async fn revoke_session(&self, token_hash: &str) -> Result<bool, StoreError>;
}

/// Projects
#[async_trait]
pub trait ProjectStore: Send + Sync {
    /// Inserts the project and the owner membership atomically
    async fn create_project(&self, name: &str, owner_id: Uuid) -> Result<Project, StoreError>;

    /// Live project by ID
    async fn project(&self, id: Uuid) -> Result<Option<Project>, StoreError>;

    /// Live projects; restricted to those `member_id` belongs to when given
    async fn list_projects(&self, member_id: Option<Uuid>) -> Result<Vec<Project>, StoreError>;

    async fn rename_project(&self, id: Uuid, name: &str) -> Result<Option<Project>, StoreError>;

    async fn soft_delete_project(&self, id: Uuid) -> Result<bool, StoreError>;

    /// Hard-deletes soft-deleted projects with everything attached to them
    async fn purge_deleted_projects(&self) -> Result<u64, StoreError>;
}

/// Project members and invitations
#[async_trait]
pub trait MembershipStore: Send + Sync {
    async fn is_member(&self, project_id: Uuid, identity_id: Uuid) -> Result<bool, StoreError>;

    /// Live members of a project, in join order
    async fn members(&self, project_id: Uuid) -> Result<Vec<Principal>, StoreError>;

    async fn remove_member(&self, project_id: Uuid, identity_id: Uuid) -> Result<bool, StoreError>;

    async fn create_invitation(
        &self,
        code: &str,
        project_id: Uuid,
        invitee_id: Uuid,
    ) -> Result<Invitation, StoreError>;

    /// Consumes a code and upserts the membership in one atomic step
    ///
    /// `None` if the code is unknown or its project is no longer live.
    async fn accept_invitation(&self, code: &str) -> Result<Option<AcceptOutcome>, StoreError>;
}

/// Tasks
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// `None` if the project is not live at insert time
    async fn create_task(&self, data: NewTask) -> Result<Option<Task>, StoreError>;

    /// Live task whose project is also live
    async fn task(&self, id: Uuid) -> Result<Option<Task>, StoreError>;

    async fn list_tasks(&self, filter: TaskFilter) -> Result<Vec<Task>, StoreError>;

    async fn update_task(&self, id: Uuid, changes: TaskChanges)
        -> Result<Option<Task>, StoreError>;

    async fn soft_delete_task(&self, id: Uuid) -> Result<bool, StoreError>;
}

/// Everything the engine needs from persistence
pub trait Store:
    CredentialStore + SessionLedger + ProjectStore + MembershipStore + TaskStore
{
}

impl<T> Store for T where
    T: CredentialStore + SessionLedger + ProjectStore + MembershipStore + TaskStore
{
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        assert_eq!(StoreError::from(sqlx::Error::RowNotFound), StoreError::NotFound);
    }

    #[test]
    fn test_other_errors_map_to_backend() {
        let err = StoreError::from(sqlx::Error::PoolTimedOut);
        assert!(matches!(err, StoreError::Backend(_)));
    }
}
