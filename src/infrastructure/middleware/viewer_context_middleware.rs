// Viewer middleware - verifies the access token and injects the viewer
// into request extensions for the routes it wraps.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::entities::{Entity, EntUser};
use crate::error::{AppError, AppResult};
use crate::infrastructure::viewer::ViewerContext;

pub const ACCESS_TOKEN_COOKIE: &str = "accessToken";
pub const REFRESH_TOKEN_COOKIE: &str = "refreshToken";

/// Rejects the request with 401 unless it carries a valid access token for
/// an existing user.
pub async fn viewer_context_middleware(
    State(app_state): State<AppState>,
    mut request: Request,
    next: Next,
) -> AppResult<Response> {
    let token = extract_token_from_request(request.headers())
        .ok_or_else(|| AppError::Unauthorized("Unauthorized request".to_string()))?;

    let viewer_context = create_viewer_context(&app_state, &token).await?;
    debug!(user = %viewer_context.user_id(), request_id = %viewer_context.request_id, "viewer resolved");

    request.extensions_mut().insert(viewer_context);
    Ok(next.run(request).await)
}

/// Bearer token from the `Authorization` header, or the `accessToken` cookie.
pub fn extract_token_from_request(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    cookie_value(&CookieJar::from_headers(headers), ACCESS_TOKEN_COOKIE)
}

/// Value of the named cookie, if the jar holds a non-empty one.
pub fn cookie_value(jar: &CookieJar, name: &str) -> Option<String> {
    jar.get(name)
        .map(|cookie| cookie.value().to_string())
        .filter(|value| !value.is_empty())
}

async fn create_viewer_context(app_state: &AppState, token: &str) -> AppResult<Arc<ViewerContext>> {
    let claims = app_state.security.verify_access_token(token)?;
    let user = EntUser::gen_nullable(&app_state.store, claims.id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid access token".to_string()))?;

    let request_id = format!("req-{}", Uuid::new_v4());
    Ok(Arc::new(ViewerContext::new(user, request_id)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_extract_bearer_token() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer token123"));
        assert_eq!(extract_token_from_request(&headers).as_deref(), Some("token123"));
    }

    #[test]
    fn test_extract_cookie_token() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "cookie",
            HeaderValue::from_static("theme=dark; accessToken=abc.def.ghi; other=1"),
        );
        assert_eq!(extract_token_from_request(&headers).as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn test_empty_cookie_is_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert("cookie", HeaderValue::from_static("accessToken=; refreshToken=r1"));
        assert!(extract_token_from_request(&headers).is_none());

        let jar = CookieJar::from_headers(&headers);
        assert_eq!(cookie_value(&jar, REFRESH_TOKEN_COOKIE).as_deref(), Some("r1"));
    }

    #[test]
    fn test_no_credentials() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Basic Zm9vOmJhcg=="));
        assert!(extract_token_from_request(&headers).is_none());
    }
}
