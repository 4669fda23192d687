// Viewer extractor - hands the authenticated user to handlers

use axum::{extract::FromRequestParts, http::request::Parts};
use std::sync::Arc;

use crate::error::AppError;
use crate::infrastructure::viewer::ViewerContext;

/// Authenticated viewer placed in request extensions by
/// [`viewer_context_middleware`](super::viewer_context_middleware).
///
/// Derefs to [`ViewerContext`]; cloning only bumps the `Arc`.
#[derive(Debug, Clone)]
pub struct Viewer(Arc<ViewerContext>);

impl Viewer {
    pub fn new(vc: Arc<ViewerContext>) -> Self {
        Self(vc)
    }

    pub fn arc(self) -> Arc<ViewerContext> {
        self.0
    }
}

impl std::ops::Deref for Viewer {
    type Target = ViewerContext;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<ViewerContext> for Viewer {
    fn as_ref(&self) -> &ViewerContext {
        &self.0
    }
}

impl<S> FromRequestParts<S> for Viewer
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Arc<ViewerContext>>()
            .map(|vc| Viewer(vc.clone()))
            .ok_or_else(|| AppError::Unauthorized("Unauthorized request".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{DocId, Timestamp};
    use crate::entities::EntUser;
    use axum::http::Request;

    fn user() -> EntUser {
        let now = Timestamp::now();
        EntUser {
            id: DocId::new(),
            username: "ana".into(),
            email: "ana@example.com".into(),
            full_name: "Ana Lima".into(),
            avatar: String::new(),
            avatar_public_id: String::new(),
            cover_image: String::new(),
            cover_image_public_id: String::new(),
            password: String::new(),
            refresh_token: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_missing_viewer_is_unauthorized() {
        let (mut parts, _) = Request::new(()).into_parts();
        let err = Viewer::from_request_parts(&mut parts, &()).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_viewer_derefs_to_context() {
        let user = user();
        let id = user.id;
        let (mut parts, _) = Request::new(()).into_parts();
        parts
            .extensions
            .insert(Arc::new(ViewerContext::new(user, "req-1".into())));

        let viewer = Viewer::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(viewer.user_id(), id);
        assert_eq!(viewer.request_id, "req-1");
    }
}
