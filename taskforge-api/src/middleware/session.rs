/// Session token transport
///
/// A session token arrives either as `Authorization: Bearer <token>` or in
/// the `session_id` cookie; the header wins when both are present. The
/// authentication layer resolves it through the engine and stores the
/// resulting [`Principal`] in the request extensions for handlers to pick up
/// with `Extension<Principal>`.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use taskforge_shared::models::identity::Principal;

use crate::{app::AppState, error::ApiError};

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "session_id";

/// Extracts the session token from the request headers
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    bearer_token(headers).or_else(|| cookie_token(headers))
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

fn cookie_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim().to_string())
        .filter(|token| !token.is_empty())
}

/// `Set-Cookie` value carrying a new session
pub fn session_cookie(token: &str, secure: bool) -> String {
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=None{}",
        SESSION_COOKIE,
        token,
        if secure { "; Secure" } else { "" }
    )
}

/// `Set-Cookie` value that clears the session cookie
pub fn expired_session_cookie(secure: bool) -> String {
    format!(
        "{}=; Path=/; Max-Age=0; HttpOnly; SameSite=None{}",
        SESSION_COOKIE,
        if secure { "; Secure" } else { "" }
    )
}

/// Authentication layer for session-protected routes
///
/// Rejects the request with 401 when no token is present or it does not
/// resolve to a live identity.
pub async fn require_session(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = session_token(req.headers())
        .ok_or_else(|| ApiError::Unauthorized("Missing session".to_string()))?;

    let principal: Principal = state.engine.resolve(&token).await?;

    tracing::trace!(identity_id = %principal.id, "Session authenticated");
    req.extensions_mut().insert(principal);

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_token() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer tf_abc"));
        assert_eq!(session_token(&headers), Some("tf_abc".to_string()));
    }

    #[test]
    fn test_cookie_token() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; session_id=tf_xyz; lang=en"),
        );
        assert_eq!(session_token(&headers), Some("tf_xyz".to_string()));
    }

    #[test]
    fn test_header_wins_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer tf_header"));
        headers.insert(header::COOKIE, HeaderValue::from_static("session_id=tf_cookie"));
        assert_eq!(session_token(&headers), Some("tf_header".to_string()));
    }

    #[test]
    fn test_missing_or_empty_token() {
        let mut headers = HeaderMap::new();
        assert_eq!(session_token(&headers), None);

        headers.insert(header::COOKIE, HeaderValue::from_static("session_id="));
        assert_eq!(session_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(session_token(&headers), None);
    }

    #[test]
    fn test_cookie_attributes() {
        let cookie = session_cookie("tf_abc", true);
        assert!(cookie.starts_with("session_id=tf_abc;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=None"));
        assert!(cookie.contains("Secure"));

        assert!(expired_session_cookie(false).contains("Max-Age=0"));
        assert!(!expired_session_cookie(false).contains("Secure"));
    }
}
