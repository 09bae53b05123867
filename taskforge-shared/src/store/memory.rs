/// In-process store backend
///
/// Mirrors the semantics of [`super::PgStore`] on plain collections behind a
/// mutex: soft deletes hide rows, email uniqueness only counts live
/// identities, invitation acceptance is atomic, purging cascades. Used by
/// the test suites and for running the API without PostgreSQL.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{CredentialStore, MembershipStore, ProjectStore, SessionLedger, StoreError, TaskStore};
use crate::models::identity::{Identity, NewIdentity, Principal};
use crate::models::membership::{AcceptOutcome, Invitation, Membership};
use crate::models::project::Project;
use crate::models::session::Session;
use crate::models::task::{NewTask, Task, TaskChanges, TaskFilter, TaskStatus};

#[derive(Debug, Default)]
struct State {
    identities: Vec<Identity>,
    sessions: Vec<Session>,
    projects: Vec<Project>,
    members: Vec<Membership>,
    invitations: HashMap<String, Invitation>,
    tasks: Vec<Task>,
}

impl State {
    fn live_identity(&self, id: Uuid) -> Option<&Identity> {
        self.identities
            .iter()
            .find(|i| i.id == id && !i.is_deleted())
    }

    fn live_identity_mut(&mut self, id: Uuid) -> Option<&mut Identity> {
        self.identities
            .iter_mut()
            .find(|i| i.id == id && i.deleted_at.is_none())
    }

    fn live_project(&self, id: Uuid) -> Option<&Project> {
        self.projects
            .iter()
            .find(|p| p.id == id && p.deleted_at.is_none())
    }

    fn is_member(&self, project_id: Uuid, identity_id: Uuid) -> bool {
        self.members
            .iter()
            .any(|m| m.project_id == project_id && m.identity_id == identity_id)
    }

    fn upsert_member(&mut self, project_id: Uuid, identity_id: Uuid) -> bool {
        if self.is_member(project_id, identity_id) {
            return false;
        }
        self.members.push(Membership {
            project_id,
            identity_id,
            created_at: Utc::now(),
        });
        true
    }

    fn task_is_visible(&self, task: &Task) -> bool {
        task.deleted_at.is_none() && self.live_project(task.project_id).is_some()
    }
}

/// Store kept entirely in memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> Result<MutexGuard<'_, State>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".to_string()))
    }

    /// Overrides an identity's registration time
    ///
    /// Fixture helper for time-window queries.
    pub fn backdate_identity(&self, id: Uuid, created_at: DateTime<Utc>) -> Result<(), StoreError> {
        let mut state = self.state()?;
        let identity = state
            .identities
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or(StoreError::NotFound)?;
        identity.created_at = created_at;
        Ok(())
    }

    /// Overrides the issue time of every session of an identity
    pub fn backdate_sessions(
        &self,
        identity_id: Uuid,
        created_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut state = self.state()?;
        for session in state.sessions.iter_mut().filter(|s| s.identity_id == identity_id) {
            session.created_at = created_at;
        }
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn create_identity(&self, data: NewIdentity) -> Result<Identity, StoreError> {
        let mut state = self.state()?;

        if state
            .identities
            .iter()
            .any(|i| i.email == data.email && !i.is_deleted())
        {
            return Err(StoreError::Conflict(format!(
                "email {} already registered",
                data.email
            )));
        }

        let identity = Identity {
            id: Uuid::new_v4(),
            email: data.email,
            password_hash: data.password_hash,
            role: data.role,
            verified: false,
            verification_code: data.verification_code,
            photo: None,
            created_at: Utc::now(),
            deleted_at: None,
        };
        state.identities.push(identity.clone());

        Ok(identity)
    }

    async fn identity_by_id(&self, id: Uuid) -> Result<Option<Identity>, StoreError> {
        Ok(self.state()?.live_identity(id).cloned())
    }

    async fn identity_by_email(&self, email: &str) -> Result<Option<Identity>, StoreError> {
        Ok(self
            .state()?
            .identities
            .iter()
            .find(|i| i.email == email && !i.is_deleted())
            .cloned())
    }

    async fn list_identities(&self) -> Result<Vec<Identity>, StoreError> {
        let mut identities: Vec<Identity> = self
            .state()?
            .identities
            .iter()
            .filter(|i| !i.is_deleted())
            .cloned()
            .collect();
        identities.sort_by_key(|i| i.created_at);
        Ok(identities)
    }

    async fn mark_verified(&self, code: &str) -> Result<bool, StoreError> {
        let mut state = self.state()?;
        match state
            .identities
            .iter_mut()
            .find(|i| i.verification_code == code && i.deleted_at.is_none())
        {
            Some(identity) => {
                identity.verified = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn rotate_verification_code(&self, id: Uuid, code: &str) -> Result<bool, StoreError> {
        let mut state = self.state()?;
        match state.live_identity_mut(id) {
            Some(identity) => {
                identity.verification_code = code.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn set_photo(
        &self,
        id: Uuid,
        photo: Option<String>,
    ) -> Result<Option<Identity>, StoreError> {
        let mut state = self.state()?;
        Ok(state.live_identity_mut(id).map(|identity| {
            identity.photo = photo;
            identity.clone()
        }))
    }

    async fn soft_delete_identity(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut state = self.state()?;
        match state.live_identity_mut(id) {
            Some(identity) => {
                identity.deleted_at = Some(Utc::now());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn last_active_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Identity>, StoreError> {
        let state = self.state()?;
        Ok(state
            .identities
            .iter()
            .filter(|i| !i.is_deleted() && i.verified)
            .filter(|i| {
                let last_active = state
                    .sessions
                    .iter()
                    .filter(|s| s.identity_id == i.id)
                    .map(|s| s.created_at)
                    .max()
                    .unwrap_or(i.created_at);
                last_active >= from && last_active < to
            })
            .cloned()
            .collect())
    }

    async fn registered_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Identity>, StoreError> {
        Ok(self
            .state()?
            .identities
            .iter()
            .filter(|i| !i.is_deleted() && i.verified)
            .filter(|i| i.created_at >= from && i.created_at < to)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl SessionLedger for MemoryStore {
    async fn record_session(&self, token_hash: &str, identity_id: Uuid) -> Result<(), StoreError> {
        let mut state = self.state()?;
        if state.sessions.iter().any(|s| s.token_hash == token_hash) {
            return Err(StoreError::Conflict("session already recorded".to_string()));
        }
        state.sessions.push(Session {
            token_hash: token_hash.to_string(),
            identity_id,
            created_at: Utc::now(),
        });
        Ok(())
    }

    async fn resolve_session(&self, token_hash: &str) -> Result<Option<Principal>, StoreError> {
        let state = self.state()?;
        Ok(state
            .sessions
            .iter()
            .find(|s| s.token_hash == token_hash)
            .and_then(|s| state.live_identity(s.identity_id))
            .map(Identity::principal))
    }

    async fn session_hashes(&self, identity_id: Uuid) -> Result<Vec<String>, StoreError> {
        Ok(self
            .state()?
            .sessions
            .iter()
            .filter(|s| s.identity_id == identity_id)
            .map(|s| s.token_hash.clone())
            .collect())
    }

    async fn revoke_session(&self, token_hash: &str) -> Result<bool, StoreError> {
        let mut state = self.state()?;
        let before = state.sessions.len();
        state.sessions.retain(|s| s.token_hash != token_hash);
        Ok(state.sessions.len() < before)
    }
}

#[async_trait]
impl ProjectStore for MemoryStore {
    async fn create_project(&self, name: &str, owner_id: Uuid) -> Result<Project, StoreError> {
        let mut state = self.state()?;

        if state.live_identity(owner_id).is_none() {
            return Err(StoreError::NotFound);
        }

        let now = Utc::now();
        let project = Project {
            id: Uuid::new_v4(),
            name: name.to_string(),
            owner_id,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        state.projects.push(project.clone());
        state.upsert_member(project.id, owner_id);

        Ok(project)
    }

    async fn project(&self, id: Uuid) -> Result<Option<Project>, StoreError> {
        Ok(self.state()?.live_project(id).cloned())
    }

    async fn list_projects(&self, member_id: Option<Uuid>) -> Result<Vec<Project>, StoreError> {
        let state = self.state()?;
        Ok(state
            .projects
            .iter()
            .rev()
            .filter(|p| p.deleted_at.is_none())
            .filter(|p| member_id.map_or(true, |id| state.is_member(p.id, id)))
            .cloned()
            .collect())
    }

    async fn rename_project(&self, id: Uuid, name: &str) -> Result<Option<Project>, StoreError> {
        let mut state = self.state()?;
        Ok(state
            .projects
            .iter_mut()
            .find(|p| p.id == id && p.deleted_at.is_none())
            .map(|project| {
                project.name = name.to_string();
                project.updated_at = Utc::now();
                project.clone()
            }))
    }

    async fn soft_delete_project(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut state = self.state()?;
        match state
            .projects
            .iter_mut()
            .find(|p| p.id == id && p.deleted_at.is_none())
        {
            Some(project) => {
                project.deleted_at = Some(Utc::now());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn purge_deleted_projects(&self) -> Result<u64, StoreError> {
        let mut state = self.state()?;

        let purged: Vec<Uuid> = state
            .projects
            .iter()
            .filter(|p| p.deleted_at.is_some())
            .map(|p| p.id)
            .collect();

        state.projects.retain(|p| !purged.contains(&p.id));
        state.members.retain(|m| !purged.contains(&m.project_id));
        state.invitations.retain(|_, inv| !purged.contains(&inv.project_id));
        state.tasks.retain(|t| !purged.contains(&t.project_id));

        Ok(purged.len() as u64)
    }
}

#[async_trait]
impl MembershipStore for MemoryStore {
    async fn is_member(&self, project_id: Uuid, identity_id: Uuid) -> Result<bool, StoreError> {
        Ok(self.state()?.is_member(project_id, identity_id))
    }

    async fn members(&self, project_id: Uuid) -> Result<Vec<Principal>, StoreError> {
        let state = self.state()?;
        Ok(state
            .members
            .iter()
            .filter(|m| m.project_id == project_id)
            .filter_map(|m| state.live_identity(m.identity_id))
            .map(Identity::principal)
            .collect())
    }

    async fn remove_member(&self, project_id: Uuid, identity_id: Uuid) -> Result<bool, StoreError> {
        let mut state = self.state()?;
        let before = state.members.len();
        state
            .members
            .retain(|m| !(m.project_id == project_id && m.identity_id == identity_id));
        Ok(state.members.len() < before)
    }

    async fn create_invitation(
        &self,
        code: &str,
        project_id: Uuid,
        invitee_id: Uuid,
    ) -> Result<Invitation, StoreError> {
        let mut state = self.state()?;

        if state.invitations.contains_key(code) {
            return Err(StoreError::Conflict("invitation code already issued".to_string()));
        }

        let invitation = Invitation {
            code: code.to_string(),
            project_id,
            invitee_id,
            issued_at: Utc::now(),
            accepted_at: None,
        };
        state
            .invitations
            .insert(code.to_string(), invitation.clone());

        Ok(invitation)
    }

    async fn accept_invitation(&self, code: &str) -> Result<Option<AcceptOutcome>, StoreError> {
        let mut state = self.state()?;

        let Some(invitation) = state.invitations.get(code).cloned() else {
            return Ok(None);
        };
        if state.live_project(invitation.project_id).is_none() {
            return Ok(None);
        }
        if invitation.is_accepted() {
            return Ok(Some(AcceptOutcome::AlreadyAccepted(invitation)));
        }

        let accepted = Invitation {
            accepted_at: Some(Utc::now()),
            ..invitation
        };
        state.invitations.insert(code.to_string(), accepted.clone());
        state.upsert_member(accepted.project_id, accepted.invitee_id);

        Ok(Some(AcceptOutcome::Joined(accepted)))
    }
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn create_task(&self, data: NewTask) -> Result<Option<Task>, StoreError> {
        let mut state = self.state()?;

        if state.live_project(data.project_id).is_none() {
            return Ok(None);
        }

        let now = Utc::now();
        let task = Task {
            id: Uuid::new_v4(),
            project_id: data.project_id,
            creator_id: data.creator_id,
            assignee_id: data.assignee_id,
            name: data.name,
            description: data.description,
            status: TaskStatus::NotDone,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        state.tasks.push(task.clone());

        Ok(Some(task))
    }

    async fn task(&self, id: Uuid) -> Result<Option<Task>, StoreError> {
        let state = self.state()?;
        Ok(state
            .tasks
            .iter()
            .find(|t| t.id == id && state.task_is_visible(t))
            .cloned())
    }

    async fn list_tasks(&self, filter: TaskFilter) -> Result<Vec<Task>, StoreError> {
        let state = self.state()?;
        Ok(state
            .tasks
            .iter()
            .rev()
            .filter(|t| state.task_is_visible(t))
            .filter(|t| filter.project_id.map_or(true, |id| t.project_id == id))
            .filter(|t| {
                filter
                    .member_id
                    .map_or(true, |id| state.is_member(t.project_id, id))
            })
            .cloned()
            .collect())
    }

    async fn update_task(
        &self,
        id: Uuid,
        changes: TaskChanges,
    ) -> Result<Option<Task>, StoreError> {
        let mut state = self.state()?;
        Ok(state
            .tasks
            .iter_mut()
            .find(|t| t.id == id && t.deleted_at.is_none())
            .map(|task| {
                if let Some(name) = changes.name {
                    task.name = name;
                }
                if let Some(description) = changes.description {
                    task.description = description;
                }
                if let Some(status) = changes.status {
                    task.status = status;
                }
                if let Some(assignee_id) = changes.assignee_id {
                    task.assignee_id = assignee_id;
                }
                task.updated_at = Utc::now();
                task.clone()
            }))
    }

    async fn soft_delete_task(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut state = self.state()?;
        match state
            .tasks
            .iter_mut()
            .find(|t| t.id == id && t.deleted_at.is_none())
        {
            Some(task) => {
                task.deleted_at = Some(Utc::now());
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::identity::Role;

    fn new_identity(email: &str) -> NewIdentity {
        NewIdentity {
            email: email.to_string(),
            password_hash: "hash".to_string(),
            role: Role::User,
            verification_code: format!("code-{}", email),
        }
    }

    #[tokio::test]
    async fn test_email_unique_among_live_identities() {
        let store = MemoryStore::new();
        let alice = store.create_identity(new_identity("alice@example.com")).await.unwrap();

        let dup = store.create_identity(new_identity("alice@example.com")).await;
        assert!(matches!(dup, Err(StoreError::Conflict(_))));

        store.soft_delete_identity(alice.id).await.unwrap();
        assert!(store.create_identity(new_identity("alice@example.com")).await.is_ok());
    }

    #[tokio::test]
    async fn test_create_project_enrolls_owner() {
        let store = MemoryStore::new();
        let owner = store.create_identity(new_identity("owner@example.com")).await.unwrap();

        let project = store.create_project("Roadmap", owner.id).await.unwrap();

        assert!(store.is_member(project.id, owner.id).await.unwrap());
        let members = store.members(project.id).await.unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].id, owner.id);
    }

    #[tokio::test]
    async fn test_accept_invitation_is_single_use() {
        let store = MemoryStore::new();
        let owner = store.create_identity(new_identity("owner@example.com")).await.unwrap();
        let bob = store.create_identity(new_identity("bob@example.com")).await.unwrap();
        let project = store.create_project("Roadmap", owner.id).await.unwrap();

        store.create_invitation("inv", project.id, bob.id).await.unwrap();

        let first = store.accept_invitation("inv").await.unwrap();
        assert!(matches!(first, Some(AcceptOutcome::Joined(_))));

        store.remove_member(project.id, bob.id).await.unwrap();

        let replay = store.accept_invitation("inv").await.unwrap();
        assert!(matches!(replay, Some(AcceptOutcome::AlreadyAccepted(_))));
        assert!(!store.is_member(project.id, bob.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_accept_invitation_for_deleted_project() {
        let store = MemoryStore::new();
        let owner = store.create_identity(new_identity("owner@example.com")).await.unwrap();
        let bob = store.create_identity(new_identity("bob@example.com")).await.unwrap();
        let project = store.create_project("Roadmap", owner.id).await.unwrap();
        store.create_invitation("inv", project.id, bob.id).await.unwrap();

        store.soft_delete_project(project.id).await.unwrap();

        assert!(store.accept_invitation("inv").await.unwrap().is_none());
        assert!(!store.is_member(project.id, bob.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_task_hidden_when_project_deleted() {
        let store = MemoryStore::new();
        let owner = store.create_identity(new_identity("owner@example.com")).await.unwrap();
        let project = store.create_project("Roadmap", owner.id).await.unwrap();
        let task = store
            .create_task(NewTask {
                project_id: project.id,
                creator_id: owner.id,
                assignee_id: owner.id,
                name: "Draft".to_string(),
                description: String::new(),
            })
            .await
            .unwrap()
            .unwrap();

        store.soft_delete_project(project.id).await.unwrap();

        assert!(store.task(task.id).await.unwrap().is_none());
        assert!(store.list_tasks(TaskFilter::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_purge_cascades() {
        let store = MemoryStore::new();
        let owner = store.create_identity(new_identity("owner@example.com")).await.unwrap();
        let kept = store.create_project("Kept project", owner.id).await.unwrap();
        let gone = store.create_project("Gone project", owner.id).await.unwrap();
        store.soft_delete_project(gone.id).await.unwrap();

        assert_eq!(store.purge_deleted_projects().await.unwrap(), 1);
        assert!(store.members(gone.id).await.unwrap().is_empty());
        assert_eq!(store.list_projects(None).await.unwrap().len(), 1);
        assert!(store.project(kept.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_resolve_session_ignores_deleted_identity() {
        let store = MemoryStore::new();
        let alice = store.create_identity(new_identity("alice@example.com")).await.unwrap();
        store.record_session("digest", alice.id).await.unwrap();

        assert!(store.resolve_session("digest").await.unwrap().is_some());

        store.soft_delete_identity(alice.id).await.unwrap();
        assert!(store.resolve_session("digest").await.unwrap().is_none());
    }
}
