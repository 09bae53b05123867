/// Project endpoints
///
/// - `POST   /v1/projects` - Create a project owned by the caller
/// - `GET    /v1/projects` - Projects visible to the caller
/// - `DELETE /v1/projects` - Purge soft-deleted projects (admin)
/// - `GET    /v1/projects/:id` - Project with members
/// - `PUT    /v1/projects/:id` - Rename
/// - `DELETE /v1/projects/:id` - Soft-delete
/// - `POST   /v1/projects/:id/invitations` - Invite by email (owner)
/// - `DELETE /v1/projects/:id/members/:identity_id` - Remove a member
/// - `GET    /v1/invitations/accept?code=` - Redeem an invitation (public)

use crate::{
    app::AppState,
    error::{validate_request, ApiResult},
    routes::auth::{trimmed_email, CodeQuery},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use taskforge_shared::engine::ProjectDetail;
use taskforge_shared::models::identity::Principal;
use taskforge_shared::models::membership::Invitation;
use taskforge_shared::models::project::Project;
use uuid::Uuid;
use validator::Validate;

/// Create or rename request
#[derive(Debug, Deserialize, Validate)]
pub struct ProjectRequest {
    #[validate(length(min = 5, max = 100, message = "Name must be 5 to 100 characters"))]
    pub name: String,
}

/// Invitation request
#[derive(Debug, Deserialize, Validate)]
pub struct InviteRequest {
    #[validate(custom(function = "trimmed_email"))]
    pub email: String,
}

/// Purge response
#[derive(Debug, Serialize)]
pub struct PurgeResponse {
    pub purged: u64,
}

pub async fn create_project(
    State(state): State<AppState>,
    Extension(actor): Extension<Principal>,
    Json(req): Json<ProjectRequest>,
) -> ApiResult<(StatusCode, Json<Project>)> {
    validate_request(&req)?;

    let project = state.engine.create_project(&actor, &req.name).await?;
    Ok((StatusCode::CREATED, Json(project)))
}

pub async fn list_projects(
    State(state): State<AppState>,
    Extension(actor): Extension<Principal>,
) -> ApiResult<Json<Vec<Project>>> {
    Ok(Json(state.engine.list_projects(&actor).await?))
}

pub async fn purge_projects(
    State(state): State<AppState>,
    Extension(actor): Extension<Principal>,
) -> ApiResult<Json<PurgeResponse>> {
    let purged = state.engine.purge_deleted_projects(&actor).await?;
    Ok(Json(PurgeResponse { purged }))
}

pub async fn get_project(
    State(state): State<AppState>,
    Extension(actor): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ProjectDetail>> {
    Ok(Json(state.engine.get_project(&actor, id).await?))
}

pub async fn update_project(
    State(state): State<AppState>,
    Extension(actor): Extension<Principal>,
    Path(id): Path<Uuid>,
    Json(req): Json<ProjectRequest>,
) -> ApiResult<Json<Project>> {
    validate_request(&req)?;

    Ok(Json(state.engine.update_project(&actor, id, &req.name).await?))
}

pub async fn delete_project(
    State(state): State<AppState>,
    Extension(actor): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.engine.delete_project(&actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn invite(
    State(state): State<AppState>,
    Extension(actor): Extension<Principal>,
    Path(id): Path<Uuid>,
    Json(req): Json<InviteRequest>,
) -> ApiResult<(StatusCode, Json<Invitation>)> {
    validate_request(&req)?;

    let invitation = state.engine.invite(&actor, id, &req.email).await?;
    Ok((StatusCode::CREATED, Json(invitation)))
}

pub async fn remove_member(
    State(state): State<AppState>,
    Extension(actor): Extension<Principal>,
    Path((id, identity_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<StatusCode> {
    state.engine.remove_member(&actor, id, identity_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Redeem the code from an invitation message
///
/// Public: the code itself is the credential.
pub async fn accept_invitation(
    State(state): State<AppState>,
    Query(query): Query<CodeQuery>,
) -> ApiResult<Json<Invitation>> {
    validate_request(&query)?;

    Ok(Json(state.engine.accept_invite(&query.code).await?))
}
