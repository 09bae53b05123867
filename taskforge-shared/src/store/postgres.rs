/// PostgreSQL store backend
///
/// Thin adapter from the store traits to the model functions. All SQL lives
/// in [`crate::models`]; this file only maps errors.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{CredentialStore, MembershipStore, ProjectStore, SessionLedger, StoreError, TaskStore};
use crate::models::identity::{Identity, NewIdentity, Principal};
use crate::models::membership::{AcceptOutcome, Invitation, Membership};
use crate::models::project::Project;
use crate::models::session::Session;
use crate::models::task::{NewTask, Task, TaskChanges, TaskFilter};

/// Store backed by a PostgreSQL pool
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Underlying pool, for health checks and migrations
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl CredentialStore for PgStore {
    async fn create_identity(&self, data: NewIdentity) -> Result<Identity, StoreError> {
        Ok(Identity::create(&self.pool, data).await?)
    }

    async fn identity_by_id(&self, id: Uuid) -> Result<Option<Identity>, StoreError> {
        Ok(Identity::find_by_id(&self.pool, id).await?)
    }

    async fn identity_by_email(&self, email: &str) -> Result<Option<Identity>, StoreError> {
        Ok(Identity::find_by_email(&self.pool, email).await?)
    }

    async fn list_identities(&self) -> Result<Vec<Identity>, StoreError> {
        Ok(Identity::list(&self.pool).await?)
    }

    async fn mark_verified(&self, code: &str) -> Result<bool, StoreError> {
        Ok(Identity::mark_verified(&self.pool, code).await?)
    }

    async fn rotate_verification_code(&self, id: Uuid, code: &str) -> Result<bool, StoreError> {
        Ok(Identity::rotate_verification_code(&self.pool, id, code).await?)
    }

    async fn set_photo(
        &self,
        id: Uuid,
        photo: Option<String>,
    ) -> Result<Option<Identity>, StoreError> {
        Ok(Identity::set_photo(&self.pool, id, photo).await?)
    }

    async fn soft_delete_identity(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(Identity::soft_delete(&self.pool, id).await?)
    }

    async fn last_active_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Identity>, StoreError> {
        Ok(Identity::last_active_between(&self.pool, from, to).await?)
    }

    async fn registered_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Identity>, StoreError> {
        Ok(Identity::registered_between(&self.pool, from, to).await?)
    }
}

#[async_trait]
impl SessionLedger for PgStore {
    async fn record_session(&self, token_hash: &str, identity_id: Uuid) -> Result<(), StoreError> {
        Session::create(&self.pool, token_hash, identity_id).await?;
        Ok(())
    }

    async fn resolve_session(&self, token_hash: &str) -> Result<Option<Principal>, StoreError> {
        Ok(Session::resolve_principal(&self.pool, token_hash).await?)
    }

    async fn session_hashes(&self, identity_id: Uuid) -> Result<Vec<String>, StoreError> {
        Ok(Session::token_hashes_for(&self.pool, identity_id).await?)
    }

    async fn revoke_session(&self, token_hash: &str) -> Result<bool, StoreError> {
        Ok(Session::delete(&self.pool, token_hash).await?)
    }
}

#[async_trait]
impl ProjectStore for PgStore {
    async fn create_project(&self, name: &str, owner_id: Uuid) -> Result<Project, StoreError> {
        Ok(Project::create_with_owner(&self.pool, name, owner_id).await?)
    }

    async fn project(&self, id: Uuid) -> Result<Option<Project>, StoreError> {
        Ok(Project::find_live(&self.pool, id).await?)
    }

    async fn list_projects(&self, member_id: Option<Uuid>) -> Result<Vec<Project>, StoreError> {
        let projects = match member_id {
            Some(identity_id) => Project::list_for_member(&self.pool, identity_id).await?,
            None => Project::list_all(&self.pool).await?,
        };
        Ok(projects)
    }

    async fn rename_project(&self, id: Uuid, name: &str) -> Result<Option<Project>, StoreError> {
        Ok(Project::rename(&self.pool, id, name).await?)
    }

    async fn soft_delete_project(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(Project::soft_delete(&self.pool, id).await?)
    }

    async fn purge_deleted_projects(&self) -> Result<u64, StoreError> {
        Ok(Project::purge_deleted(&self.pool).await?)
    }
}

#[async_trait]
impl MembershipStore for PgStore {
    async fn is_member(&self, project_id: Uuid, identity_id: Uuid) -> Result<bool, StoreError> {
        Ok(Membership::exists(&self.pool, project_id, identity_id).await?)
    }

    async fn members(&self, project_id: Uuid) -> Result<Vec<Principal>, StoreError> {
        Ok(Membership::members(&self.pool, project_id).await?)
    }

    async fn remove_member(&self, project_id: Uuid, identity_id: Uuid) -> Result<bool, StoreError> {
        Ok(Membership::delete(&self.pool, project_id, identity_id).await?)
    }

    async fn create_invitation(
        &self,
        code: &str,
        project_id: Uuid,
        invitee_id: Uuid,
    ) -> Result<Invitation, StoreError> {
        Ok(Invitation::create(&self.pool, code, project_id, invitee_id).await?)
    }

    async fn accept_invitation(&self, code: &str) -> Result<Option<AcceptOutcome>, StoreError> {
        Ok(Invitation::accept(&self.pool, code).await?)
    }
}

#[async_trait]
impl TaskStore for PgStore {
    async fn create_task(&self, data: NewTask) -> Result<Option<Task>, StoreError> {
        Ok(Task::create(&self.pool, data).await?)
    }

    async fn task(&self, id: Uuid) -> Result<Option<Task>, StoreError> {
        Ok(Task::find_live(&self.pool, id).await?)
    }

    async fn list_tasks(&self, filter: TaskFilter) -> Result<Vec<Task>, StoreError> {
        Ok(Task::list(&self.pool, filter).await?)
    }

    async fn update_task(
        &self,
        id: Uuid,
        changes: TaskChanges,
    ) -> Result<Option<Task>, StoreError> {
        Ok(Task::update(&self.pool, id, changes).await?)
    }

    async fn soft_delete_task(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(Task::soft_delete(&self.pool, id).await?)
    }
}
