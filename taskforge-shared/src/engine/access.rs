/// Access checks over freshly loaded projects and tasks
///
/// Nothing here trusts a project or membership handed in by the caller: each
/// check reloads the live project and the actor's membership, then asks
/// [`crate::auth::policy::decide`]. A project or task that does not exist is
/// reported as `NotFound` before any permission is evaluated, for admins
/// too.

use uuid::Uuid;

use super::{Engine, EngineError};
use crate::auth::policy::{decide_for, Action, MemberStatus};
use crate::models::identity::Principal;
use crate::models::project::Project;
use crate::models::task::Task;

impl Engine {
    pub async fn can_access_project(
        &self,
        actor: &Principal,
        project_id: Uuid,
    ) -> Result<bool, EngineError> {
        self.bounded("can_access_project", self.check_project(actor, project_id, Action::ReadProject))
            .await
    }

    pub async fn can_mutate_project(
        &self,
        actor: &Principal,
        project_id: Uuid,
    ) -> Result<bool, EngineError> {
        self.bounded("can_mutate_project", self.check_project(actor, project_id, Action::MutateProject))
            .await
    }

    pub async fn can_access_task(&self, actor: &Principal, task_id: Uuid) -> Result<bool, EngineError> {
        self.bounded("can_access_task", self.check_task(actor, task_id, Action::ReadTask))
            .await
    }

    pub async fn can_mutate_task(&self, actor: &Principal, task_id: Uuid) -> Result<bool, EngineError> {
        self.bounded("can_mutate_task", self.check_task(actor, task_id, Action::MutateTask))
            .await
    }

    async fn check_project(
        &self,
        actor: &Principal,
        project_id: Uuid,
        action: Action,
    ) -> Result<bool, EngineError> {
        let project = self.load_project(project_id).await?;
        self.permits(actor, &project, action).await
    }

    async fn check_task(
        &self,
        actor: &Principal,
        task_id: Uuid,
        action: Action,
    ) -> Result<bool, EngineError> {
        let task = self.load_task(task_id).await?;
        let project = self.load_project(task.project_id).await?;
        self.permits(actor, &project, action).await
    }

    /// Live project, or `NotFound`
    pub(super) async fn load_project(&self, project_id: Uuid) -> Result<Project, EngineError> {
        self.store
            .project(project_id)
            .await?
            .ok_or_else(|| EngineError::not_found("project"))
    }

    /// Live task in a live project, or `NotFound`
    pub(super) async fn load_task(&self, task_id: Uuid) -> Result<Task, EngineError> {
        self.store
            .task(task_id)
            .await?
            .ok_or_else(|| EngineError::not_found("task"))
    }

    async fn permits(
        &self,
        actor: &Principal,
        project: &Project,
        action: Action,
    ) -> Result<bool, EngineError> {
        let member = MemberStatus::from(self.store.is_member(project.id, actor.id).await?);
        let decision = decide_for(actor, project, member, action);

        tracing::trace!(
            identity_id = %actor.id,
            project_id = %project.id,
            action = ?action,
            decision = ?decision,
            "Policy evaluated"
        );
        Ok(decision.is_allowed())
    }

    /// Loads the project and fails with `Forbidden` unless `action` is allowed
    pub(super) async fn authorize_project(
        &self,
        actor: &Principal,
        project_id: Uuid,
        action: Action,
    ) -> Result<Project, EngineError> {
        let project = self.load_project(project_id).await?;
        if !self.permits(actor, &project, action).await? {
            return Err(EngineError::Forbidden);
        }
        Ok(project)
    }

    /// Loads the task and its project, failing with `Forbidden` unless allowed
    pub(super) async fn authorize_task(
        &self,
        actor: &Principal,
        task_id: Uuid,
        action: Action,
    ) -> Result<(Task, Project), EngineError> {
        let task = self.load_task(task_id).await?;
        let project = self.authorize_project(actor, task.project_id, action).await?;
        Ok((task, project))
    }
}
