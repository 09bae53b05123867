/// HTTP error mapping
///
/// Handlers return [`ApiResult`]. Engine errors convert into the matching
/// status; backend detail never reaches the body.
///
/// | Engine error | Status | `error` |
/// |---|---|---|
/// | `NotAuthenticated` | 401 | `unauthorized` |
/// | `NotVerification` | 403 | `not_verified` |
/// | `Forbidden` | 403 | `forbidden` |
/// | `NotFound` | 404 | `not_found` |
/// | `EmailExists` | 409 | `conflict` |
/// | `Validation` | 422 | `validation_error` |
/// | `Transient` | 503 | `service_unavailable` |
///
/// Body shape:
///
/// ```json
/// { "error": "validation_error", "message": "...", "details": [{ "field": "email", "message": "..." }] }
/// ```

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use taskforge_shared::engine::EngineError;
use validator::{Validate, ValidationErrors};

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("not verified: {0}")]
    NotVerified(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("{} invalid field(s)", .0.len())]
    Invalid(Vec<FieldError>),

    #[error("unavailable: {0}")]
    Unavailable(String),
}

/// One rejected field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Vec<FieldError>>,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotVerified(_) | ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Invalid(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Machine-readable `error` value
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Unauthorized(_) => "unauthorized",
            ApiError::NotVerified(_) => "not_verified",
            ApiError::Forbidden(_) => "forbidden",
            ApiError::NotFound(_) => "not_found",
            ApiError::Conflict(_) => "conflict",
            ApiError::Invalid(_) => "validation_error",
            ApiError::Unavailable(_) => "service_unavailable",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = self.code();

        let (message, details) = match self {
            ApiError::Invalid(fields) => ("Request validation failed".to_string(), Some(fields)),
            ApiError::Unauthorized(msg)
            | ApiError::NotVerified(msg)
            | ApiError::Forbidden(msg)
            | ApiError::NotFound(msg)
            | ApiError::Conflict(msg)
            | ApiError::Unavailable(msg) => (msg, None),
        };

        (
            status,
            Json(ErrorBody {
                error,
                message,
                details,
            }),
        )
            .into_response()
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::NotAuthenticated => ApiError::Unauthorized("Not authenticated".into()),
            EngineError::NotVerification => {
                ApiError::NotVerified("Email address not verified".into())
            }
            EngineError::Forbidden => ApiError::Forbidden("Not allowed".into()),
            EngineError::NotFound(what) => ApiError::NotFound(format!("{} not found", what)),
            EngineError::EmailExists => ApiError::Conflict("Email already registered".into()),
            EngineError::Validation(message) => ApiError::Invalid(vec![FieldError {
                field: "request".to_string(),
                message,
            }]),
            EngineError::Transient(reason) => {
                tracing::warn!(%reason, "Request failed with transient error");
                ApiError::Unavailable("Service temporarily unavailable".into())
            }
        }
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        let mut fields: Vec<FieldError> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, failures)| {
                failures.iter().map(move |failure| FieldError {
                    field: field.to_string(),
                    message: failure
                        .message
                        .as_deref()
                        .unwrap_or("is invalid")
                        .to_string(),
                })
            })
            .collect();
        fields.sort_by(|a, b| a.field.cmp(&b.field));
        ApiError::Invalid(fields)
    }
}

/// Runs the request's `validator` rules
pub fn validate_request<T: Validate>(req: &T) -> ApiResult<()> {
    req.validate().map_err(ApiError::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_error_statuses() {
        let cases = [
            (EngineError::NotAuthenticated, StatusCode::UNAUTHORIZED),
            (EngineError::NotVerification, StatusCode::FORBIDDEN),
            (EngineError::Forbidden, StatusCode::FORBIDDEN),
            (EngineError::not_found("task"), StatusCode::NOT_FOUND),
            (EngineError::EmailExists, StatusCode::CONFLICT),
            (EngineError::validation("too short"), StatusCode::UNPROCESSABLE_ENTITY),
            (
                EngineError::Transient("pool timed out".to_string()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(ApiError::from(err).into_response().status(), status);
        }
    }

    #[test]
    fn test_not_verified_is_distinguishable_from_forbidden() {
        let not_verified = ApiError::from(EngineError::NotVerification);
        let forbidden = ApiError::from(EngineError::Forbidden);

        assert_eq!(not_verified.status(), forbidden.status());
        assert_ne!(not_verified.code(), forbidden.code());
    }

    #[test]
    fn test_transient_message_is_generic() {
        let err = ApiError::from(EngineError::Transient("db host 10.0.0.7 refused".to_string()));
        assert!(!err.to_string().contains("10.0.0.7"));
    }

    #[test]
    fn test_invalid_display_counts_fields() {
        let err = ApiError::Invalid(vec![
            FieldError {
                field: "email".to_string(),
                message: "Invalid email format".to_string(),
            },
            FieldError {
                field: "password".to_string(),
                message: "Password is required".to_string(),
            },
        ]);
        assert_eq!(err.to_string(), "2 invalid field(s)");
    }
}
