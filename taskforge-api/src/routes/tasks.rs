/// Task endpoints
///
/// - `POST   /v1/tasks` - Create a task; other members are notified
/// - `GET    /v1/tasks?project_id=` - Tasks visible to the caller
/// - `GET    /v1/tasks/:id`
/// - `PUT    /v1/tasks/:id` - Partial update
/// - `DELETE /v1/tasks/:id` - Soft-delete

use crate::{
    app::AppState,
    error::{validate_request, ApiResult},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use taskforge_shared::engine::CreateTask;
use taskforge_shared::models::identity::Principal;
use taskforge_shared::models::task::{Task, TaskChanges, TaskStatus};
use uuid::Uuid;
use validator::Validate;

/// Create request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTaskRequest {
    pub project_id: Uuid,

    #[validate(length(min = 1, max = 100, message = "Name must be 1 to 100 characters"))]
    pub name: String,

    #[validate(length(max = 2000, message = "Description must be at most 2000 characters"))]
    pub description: Option<String>,

    /// Defaults to the caller
    pub assignee_id: Option<Uuid>,
}

/// Update request; omitted fields stay unchanged
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateTaskRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1 to 100 characters"))]
    pub name: Option<String>,

    #[validate(length(max = 2000, message = "Description must be at most 2000 characters"))]
    pub description: Option<String>,

    pub status: Option<TaskStatus>,

    pub assignee_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct ListTasksQuery {
    pub project_id: Option<Uuid>,
}

pub async fn create_task(
    State(state): State<AppState>,
    Extension(actor): Extension<Principal>,
    Json(req): Json<CreateTaskRequest>,
) -> ApiResult<(StatusCode, Json<Task>)> {
    validate_request(&req)?;

    let task = state
        .engine
        .create_task(
            &actor,
            CreateTask {
                project_id: req.project_id,
                name: req.name,
                description: req.description.unwrap_or_default(),
                assignee_id: req.assignee_id,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(task)))
}

pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(actor): Extension<Principal>,
    Query(query): Query<ListTasksQuery>,
) -> ApiResult<Json<Vec<Task>>> {
    Ok(Json(state.engine.list_tasks(&actor, query.project_id).await?))
}

pub async fn get_task(
    State(state): State<AppState>,
    Extension(actor): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Task>> {
    Ok(Json(state.engine.get_task(&actor, id).await?))
}

pub async fn update_task(
    State(state): State<AppState>,
    Extension(actor): Extension<Principal>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateTaskRequest>,
) -> ApiResult<Json<Task>> {
    validate_request(&req)?;

    let changes = TaskChanges {
        name: req.name,
        description: req.description,
        status: req.status,
        assignee_id: req.assignee_id,
    };

    Ok(Json(state.engine.update_task(&actor, id, changes).await?))
}

pub async fn delete_task(
    State(state): State<AppState>,
    Extension(actor): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.engine.delete_task(&actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
