/// Projects, invitations and membership

use serde::Serialize;
use uuid::Uuid;

use super::{validate_email, validate_project_name, Engine, EngineError};
use crate::auth::policy::Action;
use crate::auth::token::generate_code;
use crate::models::identity::{normalize_email, Principal};
use crate::models::membership::{AcceptOutcome, Invitation};
use crate::models::project::Project;
use crate::notify::Notification;

/// A project with its current members
#[derive(Debug, Clone, Serialize)]
pub struct ProjectDetail {
    #[serde(flatten)]
    pub project: Project,
    pub members: Vec<Principal>,
}

impl Engine {
    /// Creates a project owned by the actor, who becomes its first member
    pub async fn create_project(&self, actor: &Principal, name: &str) -> Result<Project, EngineError> {
        self.bounded("create_project", async {
            let name = name.trim();
            validate_project_name(name)?;

            let project = self.store.create_project(name, actor.id).await?;
            tracing::info!(project_id = %project.id, owner_id = %actor.id, "Project created");
            Ok(project)
        })
        .await
    }

    pub async fn get_project(&self, actor: &Principal, id: Uuid) -> Result<ProjectDetail, EngineError> {
        self.bounded("get_project", async {
            let project = self.authorize_project(actor, id, Action::ReadProject).await?;
            let members = self.store.members(project.id).await?;
            Ok(ProjectDetail { project, members })
        })
        .await
    }

    /// Live projects visible to the actor, newest first
    ///
    /// Admins see every live project; users see those they belong to.
    pub async fn list_projects(&self, actor: &Principal) -> Result<Vec<Project>, EngineError> {
        self.bounded("list_projects", async {
            let member_id = (!actor.is_admin()).then_some(actor.id);
            Ok(self.store.list_projects(member_id).await?)
        })
        .await
    }

    pub async fn update_project(
        &self,
        actor: &Principal,
        id: Uuid,
        name: &str,
    ) -> Result<Project, EngineError> {
        self.bounded("update_project", async {
            let name = name.trim();
            validate_project_name(name)?;

            self.authorize_project(actor, id, Action::MutateProject).await?;

            self.store
                .rename_project(id, name)
                .await?
                .ok_or_else(|| EngineError::not_found("project"))
        })
        .await
    }

    /// Soft-deletes a project; its tasks disappear with it
    pub async fn delete_project(&self, actor: &Principal, id: Uuid) -> Result<(), EngineError> {
        self.bounded("delete_project", async {
            self.authorize_project(actor, id, Action::MutateProject).await?;

            if !self.store.soft_delete_project(id).await? {
                return Err(EngineError::not_found("project"));
            }

            tracing::info!(project_id = %id, actor_id = %actor.id, "Project deleted");
            Ok(())
        })
        .await
    }

    /// Hard-deletes every soft-deleted project; admins only
    pub async fn purge_deleted_projects(&self, actor: &Principal) -> Result<u64, EngineError> {
        self.bounded("purge_deleted_projects", async {
            if !actor.is_admin() {
                return Err(EngineError::Forbidden);
            }

            let purged = self.store.purge_deleted_projects().await?;
            tracing::info!(purged, actor_id = %actor.id, "Purged deleted projects");
            Ok(purged)
        })
        .await
    }

    /// Invites an existing identity to the project
    ///
    /// Only the owner may invite. The invitee receives a single-use code by
    /// notification.
    pub async fn invite(
        &self,
        actor: &Principal,
        project_id: Uuid,
        invitee_email: &str,
    ) -> Result<Invitation, EngineError> {
        let (invitation, message) = self.bounded("invite", async {
            let invitee_email = normalize_email(invitee_email);
            validate_email(&invitee_email)?;

            let project = self
                .authorize_project(actor, project_id, Action::ManageMembers)
                .await?;

            let invitee = self
                .store
                .identity_by_email(&invitee_email)
                .await?
                .ok_or_else(|| EngineError::not_found("identity"))?;

            let code = generate_code();
            let invitation = self
                .store
                .create_invitation(&code, project.id, invitee.id)
                .await?;

            tracing::info!(
                project_id = %project.id,
                invitee_id = %invitee.id,
                "Invitation issued"
            );

            let message = Notification::invitation(
                &invitee.email,
                &self.config.app_url,
                &project.name,
                &code,
            );
            Ok((invitation, message))
        })
        .await?;

        self.notify(message).await;
        Ok(invitation)
    }

    /// Redeems an invitation code
    ///
    /// A code can only grant membership once; presenting it again returns
    /// the same invitation without touching membership, so a member removed
    /// after joining cannot rejoin with an old link.
    pub async fn accept_invite(&self, code: &str) -> Result<Invitation, EngineError> {
        self.bounded("accept_invite", async {
            if code.is_empty() {
                return Err(EngineError::validation("invitation code is required"));
            }

            let outcome = self
                .store
                .accept_invitation(code)
                .await?
                .ok_or_else(|| EngineError::not_found("invitation"))?;

            match &outcome {
                AcceptOutcome::Joined(invitation) => tracing::info!(
                    project_id = %invitation.project_id,
                    identity_id = %invitation.invitee_id,
                    "Invitation accepted"
                ),
                AcceptOutcome::AlreadyAccepted(invitation) => tracing::debug!(
                    project_id = %invitation.project_id,
                    "Invitation already used"
                ),
            }

            Ok(outcome.invitation().clone())
        })
        .await
    }

    /// Removes a member; the owner's own membership cannot be removed
    ///
    /// Removing someone who is not a member is a no-op.
    pub async fn remove_member(
        &self,
        actor: &Principal,
        project_id: Uuid,
        identity_id: Uuid,
    ) -> Result<(), EngineError> {
        self.bounded("remove_member", async {
            let project = self
                .authorize_project(actor, project_id, Action::RemoveMember)
                .await?;

            if project.is_owned_by(identity_id) {
                return Err(EngineError::validation("the project owner cannot be removed"));
            }

            let removed = self.store.remove_member(project.id, identity_id).await?;
            tracing::info!(
                project_id = %project.id,
                identity_id = %identity_id,
                removed,
                "Member removed"
            );
            Ok(())
        })
        .await
    }
}
