// UserService - accounts, credentials and profile media

use serde::Serialize;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::required;
use crate::app_state::AppState;
use crate::core::{DocId, Timestamp};
use crate::entities::{EntUser, Entity, PublicUser};
use crate::error::{AppError, AppResult};
use crate::feeds;
use crate::infrastructure::database::Store;
use crate::infrastructure::media::{MediaService, ResourceKind};
use crate::infrastructure::query::{Filter, Update};
use crate::infrastructure::security::{hash_password, verify_password, SecurityService, TokenSubject};

#[derive(Debug, Default)]
pub struct RegisterInput<'a> {
    pub full_name: Option<&'a str>,
    pub email: Option<&'a str>,
    pub username: Option<&'a str>,
    pub password: Option<&'a str>,
    pub avatar: Option<&'a Path>,
    pub cover_image: Option<&'a Path>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginOutcome {
    pub user: PublicUser,
    #[serde(flatten)]
    pub tokens: TokenPair,
}

#[derive(Clone)]
pub struct UserService {
    store: Store,
    media: MediaService,
    security: Arc<SecurityService>,
}

/// Which profile image an upload replaces.
#[derive(Debug, Clone, Copy)]
enum ProfileImage {
    Avatar,
    Cover,
}

impl ProfileImage {
    fn fields(&self) -> (&'static str, &'static str) {
        match self {
            ProfileImage::Avatar => ("avatar", "avatarPublicId"),
            ProfileImage::Cover => ("coverImage", "coverImagePublicId"),
        }
    }

    fn label(&self) -> &'static str {
        match self {
            ProfileImage::Avatar => "avatar",
            ProfileImage::Cover => "cover image",
        }
    }
}

impl UserService {
    pub fn new(store: Store, media: MediaService, security: Arc<SecurityService>) -> Self {
        Self {
            store,
            media,
            security,
        }
    }

    pub fn from_state(state: &AppState) -> Self {
        Self::new(state.store.clone(), state.media.clone(), state.security.clone())
    }

    #[instrument(skip(self, input), fields(username = ?input.username))]
    pub async fn register(&self, input: RegisterInput<'_>) -> AppResult<PublicUser> {
        let message = "All fields are required";
        let full_name = required(input.full_name, message)?;
        let email = required(input.email, message)?.to_lowercase();
        let username = required(input.username, message)?.to_lowercase();
        let password = required(input.password, message)?;

        let existing = EntUser::gen_one(
            &self.store,
            &Filter::or(vec![
                Filter::eq("username", username.clone()),
                Filter::eq("email", email.clone()),
            ]),
        )
        .await?;
        if existing.is_some() {
            return Err(AppError::Conflict(
                "User with email or username already exists".to_string(),
            ));
        }

        let avatar_path = input
            .avatar
            .ok_or_else(|| AppError::Validation("Avatar file is required".to_string()))?;
        let avatar = self
            .media
            .upload(avatar_path)
            .await
            .ok_or_else(|| AppError::Validation("Avatar file is required".to_string()))?;
        let cover = match input.cover_image {
            Some(path) => self.media.upload(path).await,
            None => None,
        };

        let now = Timestamp::now();
        let user = EntUser {
            id: DocId::new(),
            username,
            email,
            full_name,
            avatar: avatar.url.clone(),
            avatar_public_id: avatar.public_id.clone(),
            cover_image: cover.as_ref().map(|c| c.url.clone()).unwrap_or_default(),
            cover_image_public_id: cover.as_ref().map(|c| c.public_id.clone()).unwrap_or_default(),
            password: hash_password(&password)?,
            refresh_token: None,
            created_at: now,
            updated_at: now,
        };

        match user.create(&self.store).await {
            Ok(user) => {
                info!(user = %user.id, "user registered");
                Ok(user.public())
            }
            Err(e) => {
                self.media.destroy(&avatar.public_id, ResourceKind::Image).await;
                if let Some(cover) = cover {
                    self.media.destroy(&cover.public_id, ResourceKind::Image).await;
                }
                Err(e)
            }
        }
    }

    #[instrument(skip(self, password))]
    pub async fn login(
        &self,
        email: Option<&str>,
        username: Option<&str>,
        password: Option<&str>,
    ) -> AppResult<LoginOutcome> {
        let email = email.map(str::trim).filter(|v| !v.is_empty());
        let username = username.map(str::trim).filter(|v| !v.is_empty());

        let mut lookups = Vec::new();
        if let Some(email) = email {
            lookups.push(Filter::eq("email", email.to_lowercase()));
        }
        if let Some(username) = username {
            lookups.push(Filter::eq("username", username.to_lowercase()));
        }
        if lookups.is_empty() {
            return Err(AppError::Validation("username or email is required".to_string()));
        }
        let password = required(password, "Password is required")?;

        let user = EntUser::gen_one(&self.store, &Filter::or(lookups))
            .await?
            .ok_or_else(|| AppError::NotFound("User does not exist".to_string()))?;

        if !verify_password(&password, &user.password)? {
            warn!(user = %user.id, "login with invalid password");
            return Err(AppError::Unauthorized("Invalid user credentials".to_string()));
        }

        let tokens = self.issue_tokens(&user, None).await?;
        info!(user = %user.id, "user logged in");
        Ok(LoginOutcome {
            user: user.public(),
            tokens,
        })
    }

    /// Mint a token pair and store the refresh token. With `expected` set,
    /// the stored refresh token must still equal it for the rotation to
    /// happen.
    async fn issue_tokens(&self, user: &EntUser, expected: Option<&str>) -> AppResult<TokenPair> {
        let access_token = self.security.issue_access_token(&TokenSubject {
            id: user.id,
            email: &user.email,
            username: &user.username,
            full_name: &user.full_name,
        })?;
        let refresh_token = self.security.issue_refresh_token(user.id)?;

        let guard = match expected {
            Some(current) => Filter::eq("refreshToken", current),
            None => Filter::All,
        };
        EntUser::update_guarded(
            &self.store,
            user.id,
            guard,
            &[Update::set("refreshToken", refresh_token.clone())],
        )
        .await?
        .ok_or_else(|| AppError::Unauthorized("Refresh token is expired or used".to_string()))?;

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    #[instrument(skip(self))]
    pub async fn logout(&self, viewer: DocId) -> AppResult<()> {
        EntUser::update_guarded(&self.store, viewer, Filter::All, &[Update::unset("refreshToken")])
            .await?;
        info!(user = %viewer, "user logged out");
        Ok(())
    }

    /// Exchange a refresh token for a new pair. Every failure surfaces as 401.
    #[instrument(skip_all)]
    pub async fn refresh_access_token(&self, token: Option<&str>) -> AppResult<TokenPair> {
        let token = token
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::Unauthorized("Unauthorized request".to_string()))?;

        self.rotate_refresh_token(token).await.map_err(|e| match e {
            AppError::Unauthorized(message) => AppError::Unauthorized(message),
            other => {
                warn!(error = %other, "refresh token rotation failed");
                AppError::Unauthorized("Invalid refresh token".to_string())
            }
        })
    }

    async fn rotate_refresh_token(&self, token: &str) -> AppResult<TokenPair> {
        let claims = self.security.verify_refresh_token(token)?;
        let user = EntUser::gen_nullable(&self.store, claims.id)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Invalid refresh token".to_string()))?;

        if user.refresh_token.as_deref() != Some(token) {
            return Err(AppError::Unauthorized(
                "Refresh token is expired or used".to_string(),
            ));
        }

        self.issue_tokens(&user, Some(token)).await
    }

    #[instrument(skip(self, old_password, new_password))]
    pub async fn change_password(
        &self,
        viewer: DocId,
        old_password: Option<&str>,
        new_password: Option<&str>,
    ) -> AppResult<()> {
        let old_password = required(old_password, "Old and new password are required")?;
        let new_password = required(new_password, "Old and new password are required")?;

        let user = EntUser::gen_enforce(&self.store, viewer).await?;
        if !verify_password(&old_password, &user.password)? {
            return Err(AppError::Validation("Invalid old password".to_string()));
        }

        EntUser::update_guarded(
            &self.store,
            viewer,
            Filter::All,
            &[Update::set("password", hash_password(&new_password)?)],
        )
        .await?;
        info!(user = %viewer, "password changed");
        Ok(())
    }

    pub async fn current_user(&self, viewer: DocId) -> AppResult<PublicUser> {
        Ok(EntUser::gen_enforce(&self.store, viewer).await?.public())
    }

    #[instrument(skip(self))]
    pub async fn update_account(
        &self,
        viewer: DocId,
        full_name: Option<&str>,
        email: Option<&str>,
    ) -> AppResult<PublicUser> {
        let full_name = required(full_name, "All fields are required")?;
        let email = required(email, "All fields are required")?.to_lowercase();

        let user = EntUser::gen_enforce(&self.store, viewer).await?;
        let keys = vec![EntUser::username_key(&user.username), EntUser::email_key(&email)];

        let updated = self
            .store
            .update_one(
                EntUser::COLLECTION,
                &Filter::eq("_id", viewer),
                &[Update::set("fullName", full_name), Update::set("email", email)],
                Some(keys),
            )
            .await
            .map_err(|e| match e {
                AppError::Conflict(_) => AppError::Conflict("Email is already in use".to_string()),
                other => other,
            })?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        Ok(EntUser::from_document(updated)?.public())
    }

    pub async fn update_avatar(&self, viewer: DocId, file: Option<&Path>) -> AppResult<PublicUser> {
        self.replace_profile_image(viewer, file, ProfileImage::Avatar).await
    }

    pub async fn update_cover_image(&self, viewer: DocId, file: Option<&Path>) -> AppResult<PublicUser> {
        self.replace_profile_image(viewer, file, ProfileImage::Cover).await
    }

    #[instrument(skip(self, file))]
    async fn replace_profile_image(
        &self,
        viewer: DocId,
        file: Option<&Path>,
        image: ProfileImage,
    ) -> AppResult<PublicUser> {
        let file = file.ok_or_else(|| {
            AppError::Validation(format!("{} file is missing", capitalize(image.label())))
        })?;
        let previous = EntUser::gen_enforce(&self.store, viewer).await?;

        let uploaded = self.media.upload(file).await.ok_or_else(|| {
            AppError::Upstream(format!("Error while uploading {}", image.label()))
        })?;

        let (url_field, id_field) = image.fields();
        let updated = EntUser::update_guarded(
            &self.store,
            viewer,
            Filter::All,
            &[
                Update::set(url_field, uploaded.url.clone()),
                Update::set(id_field, uploaded.public_id.clone()),
            ],
        )
        .await;

        let updated = match updated {
            Ok(Some(user)) => user,
            Ok(None) => {
                self.media.destroy(&uploaded.public_id, ResourceKind::Image).await;
                return Err(AppError::NotFound("User not found".to_string()));
            }
            Err(e) => {
                self.media.destroy(&uploaded.public_id, ResourceKind::Image).await;
                return Err(e);
            }
        };

        let old_public_id = match image {
            ProfileImage::Avatar => previous.avatar_public_id,
            ProfileImage::Cover => previous.cover_image_public_id,
        };
        self.media.destroy(&old_public_id, ResourceKind::Image).await;

        Ok(updated.public())
    }

    pub async fn channel_profile(&self, username: &str, viewer: DocId) -> AppResult<Value> {
        feeds::channel_profile(&self.store, username, Some(viewer)).await
    }
}

fn capitalize(label: &str) -> String {
    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
