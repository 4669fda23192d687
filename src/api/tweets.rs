use axum::{
    extract::{Path, State},
    routing::{delete, get, patch, post},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::extract::JsonBody;
use crate::app_state::AppState;
use crate::entities::EntTweet;
use crate::error::AppError;
use crate::infrastructure::middleware::Viewer;
use crate::response::ApiResponse;
use crate::services::TweetService;

#[derive(Debug, Deserialize)]
pub struct TweetRequest {
    pub content: Option<String>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_tweet_handler))
        .route("/user/{user_id}", get(get_user_tweets_handler))
        .route("/u/{tweet_id}", patch(update_tweet_handler))
        .route("/d/{tweet_id}", delete(delete_tweet_handler))
}

pub async fn create_tweet_handler(
    State(state): State<AppState>,
    viewer: Viewer,
    JsonBody(req): JsonBody<TweetRequest>,
) -> Result<ApiResponse<EntTweet>, AppError> {
    let tweet = TweetService::from_state(&state)
        .create_tweet(viewer.user_id(), req.content.as_deref())
        .await?;
    Ok(ApiResponse::created(tweet, "Tweet created successfully"))
}

pub async fn get_user_tweets_handler(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(user_id): Path<String>,
) -> Result<ApiResponse<Vec<Value>>, AppError> {
    let tweets = TweetService::from_state(&state)
        .get_user_tweets(viewer.user_id(), &user_id)
        .await?;
    Ok(ApiResponse::ok(tweets, "Tweets fetched successfully"))
}

pub async fn update_tweet_handler(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(tweet_id): Path<String>,
    JsonBody(req): JsonBody<TweetRequest>,
) -> Result<ApiResponse<EntTweet>, AppError> {
    let tweet = TweetService::from_state(&state)
        .update_tweet(viewer.user_id(), &tweet_id, req.content.as_deref())
        .await?;
    Ok(ApiResponse::ok(tweet, "Tweet updated successfully"))
}

pub async fn delete_tweet_handler(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(tweet_id): Path<String>,
) -> Result<ApiResponse<Value>, AppError> {
    let id = TweetService::from_state(&state)
        .delete_tweet(viewer.user_id(), &tweet_id)
        .await?;
    Ok(ApiResponse::ok(json!({ "tweetId": id }), "Tweet deleted successfully"))
}
