/// Identity endpoints
///
/// - `GET    /v1/users/me` - Own profile
/// - `PUT    /v1/users/me/photo` - Set or clear the photo reference
/// - `GET    /v1/users` - All identities (admin)
/// - `GET    /v1/users/:id` - One identity (admin or self)
/// - `DELETE /v1/users/:id` - Soft-delete an identity (admin or self)

use crate::{
    app::AppState,
    error::{validate_request, ApiResult},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use taskforge_shared::models::identity::Principal;
use uuid::Uuid;
use validator::Validate;

/// Photo update request; `null` clears the photo
#[derive(Debug, Deserialize, Validate)]
pub struct PhotoRequest {
    #[validate(length(min = 1, max = 2048, message = "Photo reference must be 1 to 2048 characters"))]
    pub photo: Option<String>,
}

pub async fn me(
    State(state): State<AppState>,
    Extension(actor): Extension<Principal>,
) -> ApiResult<Json<Principal>> {
    Ok(Json(state.engine.profile(&actor).await?))
}

pub async fn update_photo(
    State(state): State<AppState>,
    Extension(actor): Extension<Principal>,
    Json(req): Json<PhotoRequest>,
) -> ApiResult<Json<Principal>> {
    validate_request(&req)?;

    Ok(Json(state.engine.update_photo(&actor, req.photo).await?))
}

pub async fn list_users(
    State(state): State<AppState>,
    Extension(actor): Extension<Principal>,
) -> ApiResult<Json<Vec<Principal>>> {
    Ok(Json(state.engine.list_identities(&actor).await?))
}

pub async fn get_user(
    State(state): State<AppState>,
    Extension(actor): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Principal>> {
    Ok(Json(state.engine.identity_by_id(&actor, id).await?))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Extension(actor): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.engine.delete_identity(&actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
