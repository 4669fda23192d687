// HTTP surface - every route lives under /api/v1

pub mod comments;
pub mod dashboard;
pub mod extract;
pub mod likes;
pub mod playlists;
pub mod subscriptions;
pub mod tweets;
pub mod users;
pub mod videos;

use axum::{
    extract::{DefaultBodyLimit, State},
    middleware,
    routing::get,
    Router,
};
use serde_json::{json, Value};
use tower_http::services::ServeDir;

use crate::app_state::AppState;
use crate::config::MediaConfig;
use crate::error::AppError;
use crate::infrastructure::middleware::viewer_context_middleware;
use crate::response::ApiResponse;

pub use extract::{JsonBody, MultipartForm, TempUpload};

/// Build the application router.
///
/// Routes that need an acting identity sit behind
/// [`viewer_context_middleware`]; registration, login, token refresh and the
/// health check do not.
pub fn create_router(state: AppState) -> Router {
    let protected = Router::new()
        .nest("/users", users::protected_routes())
        .nest("/videos", videos::routes())
        .nest("/playlists", playlists::routes())
        .nest("/likes", likes::routes())
        .nest("/comments", comments::routes())
        .nest("/tweets", tweets::routes())
        .nest("/subscriptions", subscriptions::routes())
        .nest("/dashboard", dashboard::routes())
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            viewer_context_middleware,
        ));

    let public = Router::new()
        .route("/healthcheck", get(healthcheck_handler))
        .nest("/users", users::public_routes());

    let api = public
        .merge(protected)
        .layer(DefaultBodyLimit::max(state.config.server.max_upload_bytes));

    let mut router = Router::new().nest("/api/v1", api);
    if let MediaConfig::Local(local) = &state.config.media {
        router = router.nest_service("/media", ServeDir::new(&local.dir));
    }

    router.with_state(state)
}

pub async fn healthcheck_handler(
    State(state): State<AppState>,
) -> Result<ApiResponse<Value>, AppError> {
    state.store.health_check().await?;
    Ok(ApiResponse::ok(json!({ "status": "ok" }), "OK"))
}
