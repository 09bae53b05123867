/// Authentication endpoints
///
/// - `POST /v1/auth/register` - Register a new identity
/// - `GET  /v1/auth/verify?code=` - Confirm an email address
/// - `POST /v1/auth/verify/resend` - Send a new verification link
/// - `POST /v1/auth/login` - Issue a session (cookie and body)
/// - `POST /v1/auth/logout` - Revoke the current session

use crate::{
    app::AppState,
    error::{validate_request, ApiResult},
    middleware::session::{expired_session_cookie, session_cookie, session_token},
};
use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use taskforge_shared::models::identity::Principal;
use validator::{Validate, ValidateEmail, ValidationError};

/// Register request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(custom(function = "trimmed_email"))]
    pub email: String,

    #[validate(length(min = 1, max = 128, message = "Password must be 1 to 128 characters"))]
    pub password: String,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Email is required"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Login response
///
/// The token is also set as the `session_id` cookie; clients that can't
/// use cookies send it back as a Bearer token.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub identity: Principal,
}

/// Resend request
#[derive(Debug, Deserialize, Validate)]
pub struct ResendRequest {
    #[validate(custom(function = "trimmed_email"))]
    pub email: String,
}

/// Email check on the trimmed value
///
/// The engine trims and lowercases emails before use, so surrounding
/// whitespace is not an error here either.
pub(crate) fn trimmed_email(email: &str) -> Result<(), ValidationError> {
    if email.trim().validate_email() {
        Ok(())
    } else {
        Err(ValidationError::new("email").with_message("Invalid email format".into()))
    }
}

/// `?code=` query
#[derive(Debug, Deserialize, Validate)]
pub struct CodeQuery {
    #[validate(length(min = 1, message = "Code is required"))]
    pub code: String,
}

/// Register a new identity
///
/// # Endpoint
///
/// ```text
/// POST /v1/auth/register
/// Content-Type: application/json
///
/// { "email": "alice@example.com", "password": "pw1" }
/// ```
///
/// # Errors
///
/// - `409 Conflict`: Email already registered
/// - `422 Unprocessable Entity`: Validation failed
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<Principal>)> {
    validate_request(&req)?;

    let principal = state.engine.register(&req.email, &req.password).await?;
    Ok((StatusCode::CREATED, Json(principal)))
}

/// Confirm an email address from the link in the verification message
pub async fn verify(
    State(state): State<AppState>,
    Query(query): Query<CodeQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    validate_request(&query)?;

    state.engine.verify(&query.code).await?;
    Ok(Json(serde_json::json!({ "verified": true })))
}

pub async fn resend_verification(
    State(state): State<AppState>,
    Json(req): Json<ResendRequest>,
) -> ApiResult<StatusCode> {
    validate_request(&req)?;

    state.engine.resend_verification(&req.email).await?;
    Ok(StatusCode::ACCEPTED)
}

/// Login endpoint
///
/// # Errors
///
/// - `401 Unauthorized`: Unknown email or wrong password
/// - `403 Forbidden` (`not_verified`): Email not verified yet
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    validate_request(&req)?;

    let session = state.engine.login(&req.email, &req.password).await?;
    let cookie = session_cookie(&session.token, state.config.production);

    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(LoginResponse {
            token: session.token,
            identity: session.principal,
        }),
    ))
}

/// Revoke the presented session and clear the cookie
///
/// Succeeds without a session as well.
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<impl IntoResponse> {
    if let Some(token) = session_token(&headers) {
        state.engine.logout(&token).await?;
    }

    Ok((
        StatusCode::NO_CONTENT,
        [(header::SET_COOKIE, expired_session_cookie(state.config.production))],
    ))
}
