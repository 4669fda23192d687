use axum::{
    body::Bytes,
    extract::{Multipart, Path, State},
    routing::{get, patch, post},
    Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use serde_json::{json, Value};

use super::extract::{JsonBody, MultipartForm};
use crate::app_state::AppState;
use crate::entities::PublicUser;
use crate::error::AppError;
use crate::infrastructure::middleware::{
    cookie_value, Viewer, ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE,
};
use crate::response::ApiResponse;
use crate::services::{LoginOutcome, RegisterInput, TokenPair, UserService};
use time::Duration;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenRequest {
    pub refresh_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub old_password: Option<String>,
    pub new_password: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAccountRequest {
    pub full_name: Option<String>,
    pub email: Option<String>,
}

pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register_handler))
        .route("/login", post(login_handler))
        .route("/refresh-token", post(refresh_token_handler))
}

pub fn protected_routes() -> Router<AppState> {
    Router::new()
        .route("/logout", post(logout_handler))
        .route("/change-password", post(change_password_handler))
        .route("/current-user", get(current_user_handler))
        .route("/update-account", patch(update_account_handler))
        .route("/avatar", patch(update_avatar_handler))
        .route("/cover-image", patch(update_cover_image_handler))
        .route("/c/{username}", get(channel_profile_handler))
}

fn session_cookie(name: &'static str, value: String, max_age_secs: u64) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .max_age(Duration::seconds(i64::try_from(max_age_secs).unwrap_or(i64::MAX)))
        .build()
}

fn expired_cookie(name: &'static str) -> Cookie<'static> {
    let mut cookie = session_cookie(name, String::new(), 0);
    cookie.make_removal();
    cookie
}

fn with_session_cookies(jar: CookieJar, state: &AppState, tokens: &TokenPair) -> CookieJar {
    jar.add(session_cookie(
        ACCESS_TOKEN_COOKIE,
        tokens.access_token.clone(),
        state.config.auth.access_token_expiry_secs,
    ))
    .add(session_cookie(
        REFRESH_TOKEN_COOKIE,
        tokens.refresh_token.clone(),
        state.config.auth.refresh_token_expiry_secs,
    ))
}

pub async fn register_handler(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<ApiResponse<PublicUser>, AppError> {
    let form = MultipartForm::read(multipart, &state.config.server.upload_temp_dir).await?;

    let user = UserService::from_state(&state)
        .register(RegisterInput {
            full_name: form.text("fullName"),
            email: form.text("email"),
            username: form.text("username"),
            password: form.text("password"),
            avatar: form.file("avatar"),
            cover_image: form.file("coverImage"),
        })
        .await?;

    Ok(ApiResponse::created(user, "User registered successfully"))
}

pub async fn login_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    JsonBody(req): JsonBody<LoginRequest>,
) -> Result<(CookieJar, ApiResponse<LoginOutcome>), AppError> {
    let outcome: LoginOutcome = UserService::from_state(&state)
        .login(
            req.email.as_deref(),
            req.username.as_deref(),
            req.password.as_deref(),
        )
        .await?;

    let jar = with_session_cookies(jar, &state, &outcome.tokens);
    Ok((jar, ApiResponse::ok(outcome, "User logged in successfully")))
}

pub async fn logout_handler(
    State(state): State<AppState>,
    viewer: Viewer,
    jar: CookieJar,
) -> Result<(CookieJar, ApiResponse<Value>), AppError> {
    UserService::from_state(&state).logout(viewer.user_id()).await?;

    let jar = jar
        .add(expired_cookie(ACCESS_TOKEN_COOKIE))
        .add(expired_cookie(REFRESH_TOKEN_COOKIE));
    Ok((jar, ApiResponse::ok(json!({}), "User logged out")))
}

/// Reads the refresh token from its cookie, falling back to the JSON body.
/// The body is optional, so it is parsed by hand rather than extracted.
pub async fn refresh_token_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    body: Bytes,
) -> Result<(CookieJar, ApiResponse<TokenPair>), AppError> {
    let from_body = if body.is_empty() {
        None
    } else {
        serde_json::from_slice::<RefreshTokenRequest>(&body)
            .unwrap_or_default()
            .refresh_token
    };
    let token = cookie_value(&jar, REFRESH_TOKEN_COOKIE).or(from_body);

    let tokens = UserService::from_state(&state)
        .refresh_access_token(token.as_deref())
        .await?;

    let jar = with_session_cookies(jar, &state, &tokens);
    Ok((jar, ApiResponse::ok(tokens, "Access token refreshed")))
}

pub async fn change_password_handler(
    State(state): State<AppState>,
    viewer: Viewer,
    JsonBody(req): JsonBody<ChangePasswordRequest>,
) -> Result<ApiResponse<Value>, AppError> {
    UserService::from_state(&state)
        .change_password(
            viewer.user_id(),
            req.old_password.as_deref(),
            req.new_password.as_deref(),
        )
        .await?;

    Ok(ApiResponse::ok(json!({}), "Password changed successfully"))
}

pub async fn current_user_handler(
    State(state): State<AppState>,
    viewer: Viewer,
) -> Result<ApiResponse<PublicUser>, AppError> {
    let user = UserService::from_state(&state)
        .current_user(viewer.user_id())
        .await?;
    Ok(ApiResponse::ok(user, "User fetched successfully"))
}

pub async fn update_account_handler(
    State(state): State<AppState>,
    viewer: Viewer,
    JsonBody(req): JsonBody<UpdateAccountRequest>,
) -> Result<ApiResponse<PublicUser>, AppError> {
    let user = UserService::from_state(&state)
        .update_account(viewer.user_id(), req.full_name.as_deref(), req.email.as_deref())
        .await?;
    Ok(ApiResponse::ok(user, "Account details updated successfully"))
}

pub async fn update_avatar_handler(
    State(state): State<AppState>,
    viewer: Viewer,
    multipart: Multipart,
) -> Result<ApiResponse<PublicUser>, AppError> {
    let form = MultipartForm::read(multipart, &state.config.server.upload_temp_dir).await?;
    let user = UserService::from_state(&state)
        .update_avatar(viewer.user_id(), form.file("avatar"))
        .await?;
    Ok(ApiResponse::ok(user, "Avatar image updated successfully"))
}

pub async fn update_cover_image_handler(
    State(state): State<AppState>,
    viewer: Viewer,
    multipart: Multipart,
) -> Result<ApiResponse<PublicUser>, AppError> {
    let form = MultipartForm::read(multipart, &state.config.server.upload_temp_dir).await?;
    let user = UserService::from_state(&state)
        .update_cover_image(viewer.user_id(), form.file("coverImage"))
        .await?;
    Ok(ApiResponse::ok(user, "Cover image updated successfully"))
}

pub async fn channel_profile_handler(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(username): Path<String>,
) -> Result<ApiResponse<Value>, AppError> {
    let channel = UserService::from_state(&state)
        .channel_profile(&username, viewer.user_id())
        .await?;
    Ok(ApiResponse::ok(channel, "User channel fetched successfully"))
}
