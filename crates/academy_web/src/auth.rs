use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::error::{ApiError, ApiResult};
use crate::session::SESSION_COOKIE;
use crate::AppState;

/// Rejects requests without a live admin session. The session is handed to
/// handlers as a request extension.
pub async fn require_admin(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> ApiResult<Response> {
    let token = session_token(request.headers()).ok_or_else(ApiError::unauthorized)?;
    let session = state
        .sessions
        .validate(&token)
        .await
        .ok_or_else(ApiError::unauthorized)?;

    request.extensions_mut().insert(session);
    Ok(next.run(request).await)
}

/// `Authorization: Bearer <token>` first, then the `admin_session` cookie.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

pub fn session_cookie(token: &str, max_age_secs: i64) -> String {
    format!(
        "{}={}; HttpOnly; Path=/; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE, token, max_age_secs
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_session_token_sources() {
        let mut headers = HeaderMap::new();
        assert_eq!(session_token(&headers), None);

        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; admin_session=abc-123"),
        );
        assert_eq!(session_token(&headers).as_deref(), Some("abc-123"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer xyz"));
        assert_eq!(session_token(&headers).as_deref(), Some("xyz"));
    }

    #[test]
    fn test_empty_cookie_is_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("admin_session="));
        assert_eq!(session_token(&headers), None);
    }
}
