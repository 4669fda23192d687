use axum::{
    extract::{Path, State},
    routing::get,
    Router,
};
use serde_json::{json, Value};

use crate::app_state::AppState;
use crate::error::AppError;
use crate::infrastructure::middleware::Viewer;
use crate::response::ApiResponse;
use crate::services::SubscriptionService;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/c/{channel_id}",
            get(get_channel_subscribers_handler).post(toggle_subscription_handler),
        )
        .route("/u/{subscriber_id}", get(get_subscribed_channels_handler))
}

pub async fn toggle_subscription_handler(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(channel_id): Path<String>,
) -> Result<ApiResponse<Value>, AppError> {
    let subscribed = SubscriptionService::from_state(&state)
        .toggle_subscription(viewer.user_id(), &channel_id)
        .await?;
    let message = if subscribed {
        "Subscribed successfully"
    } else {
        "Unsubscribed successfully"
    };
    Ok(ApiResponse::ok(json!({ "subscribed": subscribed }), message))
}

pub async fn get_channel_subscribers_handler(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(channel_id): Path<String>,
) -> Result<ApiResponse<Vec<Value>>, AppError> {
    let subscribers = SubscriptionService::from_state(&state)
        .get_channel_subscribers(viewer.user_id(), &channel_id)
        .await?;
    Ok(ApiResponse::ok(subscribers, "Subscribers fetched successfully"))
}

pub async fn get_subscribed_channels_handler(
    State(state): State<AppState>,
    Path(subscriber_id): Path<String>,
) -> Result<ApiResponse<Vec<Value>>, AppError> {
    let channels = SubscriptionService::from_state(&state)
        .get_subscribed_channels(&subscriber_id)
        .await?;
    Ok(ApiResponse::ok(channels, "Subscribed channels fetched successfully"))
}
