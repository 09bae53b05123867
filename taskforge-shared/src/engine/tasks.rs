/// Tasks and new-task fan-out

use serde::Deserialize;
use uuid::Uuid;

use super::{validate_description, validate_task_name, Engine, EngineError};
use crate::auth::policy::Action;
use crate::models::identity::Principal;
use crate::models::project::Project;
use crate::models::task::{NewTask, Task, TaskChanges, TaskFilter};
use crate::notify::{fan_out, FanoutReport, Notification};

/// Input for [`Engine::create_task`]
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTask {
    pub project_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: String,

    /// Defaults to the creator
    #[serde(default)]
    pub assignee_id: Option<Uuid>,
}

impl Engine {
    /// Creates a task and notifies the other project members
    ///
    /// The task is committed before any notification goes out. Fan-out runs
    /// outside the operation deadline and never fails the call.
    pub async fn create_task(&self, actor: &Principal, input: CreateTask) -> Result<Task, EngineError> {
        let (task, project) = self
            .bounded("create_task", async {
                let name = input.name.trim().to_string();
                validate_task_name(&name)?;
                validate_description(&input.description)?;

                let project = self
                    .authorize_project(actor, input.project_id, Action::MutateTask)
                    .await?;

                let assignee_id = match input.assignee_id {
                    Some(assignee_id) => {
                        self.require_member(&project, assignee_id).await?;
                        assignee_id
                    }
                    None => actor.id,
                };

                let task = self
                    .store
                    .create_task(NewTask {
                        project_id: project.id,
                        creator_id: actor.id,
                        assignee_id,
                        name,
                        description: input.description,
                    })
                    .await?
                    .ok_or_else(|| EngineError::not_found("project"))?;

                tracing::info!(task_id = %task.id, project_id = %project.id, "Task created");
                Ok((task, project))
            })
            .await?;

        let report = self.announce_task(actor, &project, &task).await;
        tracing::debug!(
            task_id = %task.id,
            attempted = report.attempted,
            delivered = report.delivered,
            "Task fan-out finished"
        );

        Ok(task)
    }

    pub async fn get_task(&self, actor: &Principal, id: Uuid) -> Result<Task, EngineError> {
        self.bounded("get_task", async {
            let (task, _) = self.authorize_task(actor, id, Action::ReadTask).await?;
            Ok(task)
        })
        .await
    }

    /// Live tasks visible to the actor, newest first
    ///
    /// With `project_id` the actor must be allowed to read that project's
    /// tasks. Without it, admins see every live task and users see tasks of
    /// projects they belong to.
    pub async fn list_tasks(
        &self,
        actor: &Principal,
        project_id: Option<Uuid>,
    ) -> Result<Vec<Task>, EngineError> {
        self.bounded("list_tasks", async {
            let filter = match project_id {
                Some(project_id) => {
                    self.authorize_project(actor, project_id, Action::ReadTask).await?;
                    TaskFilter {
                        project_id: Some(project_id),
                        member_id: None,
                    }
                }
                None => TaskFilter {
                    project_id: None,
                    member_id: (!actor.is_admin()).then_some(actor.id),
                },
            };

            Ok(self.store.list_tasks(filter).await?)
        })
        .await
    }

    pub async fn update_task(
        &self,
        actor: &Principal,
        id: Uuid,
        mut changes: TaskChanges,
    ) -> Result<Task, EngineError> {
        self.bounded("update_task", async {
            if let Some(name) = changes.name.as_mut() {
                *name = name.trim().to_string();
                validate_task_name(name)?;
            }
            if let Some(description) = &changes.description {
                validate_description(description)?;
            }

            let (task, project) = self.authorize_task(actor, id, Action::MutateTask).await?;

            if changes.is_empty() {
                return Ok(task);
            }

            if let Some(assignee_id) = changes.assignee_id {
                self.require_member(&project, assignee_id).await?;
            }

            self.store
                .update_task(task.id, changes)
                .await?
                .ok_or_else(|| EngineError::not_found("task"))
        })
        .await
    }

    pub async fn delete_task(&self, actor: &Principal, id: Uuid) -> Result<(), EngineError> {
        self.bounded("delete_task", async {
            let (task, _) = self.authorize_task(actor, id, Action::MutateTask).await?;

            if !self.store.soft_delete_task(task.id).await? {
                return Err(EngineError::not_found("task"));
            }

            tracing::info!(task_id = %task.id, actor_id = %actor.id, "Task deleted");
            Ok(())
        })
        .await
    }

    async fn require_member(&self, project: &Project, identity_id: Uuid) -> Result<(), EngineError> {
        if self.store.is_member(project.id, identity_id).await? {
            Ok(())
        } else {
            Err(EngineError::validation("assignee must be a project member"))
        }
    }

    /// Notifies every member except the creator
    async fn announce_task(&self, actor: &Principal, project: &Project, task: &Task) -> FanoutReport {
        let members = match self.store.members(project.id).await {
            Ok(members) => members,
            Err(e) => {
                tracing::warn!(
                    project_id = %project.id,
                    error = %e,
                    "Could not load members for task fan-out"
                );
                return FanoutReport::default();
            }
        };

        let messages = members
            .iter()
            .filter(|member| member.id != actor.id)
            .map(|member| {
                Notification::task_created(
                    &member.email,
                    &self.config.app_url,
                    &project.name,
                    project.id,
                    &task.name,
                )
            })
            .collect();

        fan_out(self.queue.as_ref(), messages).await
    }
}
