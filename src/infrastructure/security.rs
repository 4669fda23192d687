// Security - password hashing and signed access/refresh tokens

use argon2::password_hash::{rand_core::OsRng, SaltString};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::instrument;

use crate::config::AuthConfig;
use crate::core::DocId;
use crate::error::{AppError, AppResult};

/// Claims carried by an access token
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccessClaims {
    #[serde(rename = "_id")]
    pub id: DocId,
    pub email: String,
    pub username: String,
    #[serde(rename = "fullName")]
    pub full_name: String,
    pub iat: u64,
    pub exp: u64,
}

/// Claims carried by a refresh token
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RefreshClaims {
    #[serde(rename = "_id")]
    pub id: DocId,
    /// Random per-issue nonce so two refresh tokens minted in the same second differ
    pub jti: String,
    pub iat: u64,
    pub exp: u64,
}

/// Identity fields embedded in an access token
pub struct TokenSubject<'a> {
    pub id: DocId,
    pub email: &'a str,
    pub username: &'a str,
    pub full_name: &'a str,
}

/// Token issuing and verification service, built once from configuration
pub struct SecurityService {
    access_encoding_key: EncodingKey,
    access_decoding_key: DecodingKey,
    refresh_encoding_key: EncodingKey,
    refresh_decoding_key: DecodingKey,
    access_expiry: Duration,
    refresh_expiry: Duration,
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

impl SecurityService {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            access_encoding_key: EncodingKey::from_secret(config.access_token_secret.as_bytes()),
            access_decoding_key: DecodingKey::from_secret(config.access_token_secret.as_bytes()),
            refresh_encoding_key: EncodingKey::from_secret(config.refresh_token_secret.as_bytes()),
            refresh_decoding_key: DecodingKey::from_secret(config.refresh_token_secret.as_bytes()),
            access_expiry: Duration::from_secs(config.access_token_expiry_secs),
            refresh_expiry: Duration::from_secs(config.refresh_token_expiry_secs),
        }
    }

    pub fn issue_access_token(&self, subject: &TokenSubject<'_>) -> AppResult<String> {
        let now = now_secs();
        let claims = AccessClaims {
            id: subject.id,
            email: subject.email.to_string(),
            username: subject.username.to_string(),
            full_name: subject.full_name.to_string(),
            iat: now,
            exp: now + self.access_expiry.as_secs(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.access_encoding_key)
            .map_err(|e| AppError::Internal(format!("Failed to create access token: {}", e)))
    }

    pub fn issue_refresh_token(&self, id: DocId) -> AppResult<String> {
        let now = now_secs();
        let claims = RefreshClaims {
            id,
            jti: DocId::new().to_string(),
            iat: now,
            exp: now + self.refresh_expiry.as_secs(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.refresh_encoding_key)
            .map_err(|e| AppError::Internal(format!("Failed to create refresh token: {}", e)))
    }

    #[instrument(skip_all)]
    pub fn verify_access_token(&self, token: &str) -> AppResult<AccessClaims> {
        decode::<AccessClaims>(token, &self.access_decoding_key, &Validation::new(Algorithm::HS256))
            .map(|data| data.claims)
            .map_err(|e| AppError::Unauthorized(format!("Invalid access token: {}", e)))
    }

    #[instrument(skip_all)]
    pub fn verify_refresh_token(&self, token: &str) -> AppResult<RefreshClaims> {
        decode::<RefreshClaims>(token, &self.refresh_decoding_key, &Validation::new(Algorithm::HS256))
            .map(|data| data.claims)
            .map_err(|e| AppError::Unauthorized(format!("Invalid refresh token: {}", e)))
    }
}

/// Hash password securely using Argon2
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;

    Ok(password_hash.to_string())
}

/// Verify password against hash
pub fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| AppError::Internal(format!("Invalid password hash: {}", e)))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> SecurityService {
        SecurityService::new(&AuthConfig {
            access_token_secret: "access-secret".into(),
            access_token_expiry_secs: 60,
            refresh_token_secret: "refresh-secret".into(),
            refresh_token_expiry_secs: 600,
        })
    }

    #[test]
    fn test_password_hash_roundtrip() {
        let hash = hash_password("hunter22").unwrap();
        assert_ne!(hash, "hunter22");
        assert!(verify_password("hunter22", &hash).unwrap());
        assert!(!verify_password("hunter23", &hash).unwrap());
    }

    #[test]
    fn test_access_token_carries_identity() {
        let security = service();
        let id = DocId::new();
        let token = security
            .issue_access_token(&TokenSubject {
                id,
                email: "ana@example.com",
                username: "ana",
                full_name: "Ana Lima",
            })
            .unwrap();

        let claims = security.verify_access_token(&token).unwrap();
        assert_eq!(claims.id, id);
        assert_eq!(claims.username, "ana");
    }

    #[test]
    fn test_tokens_are_not_interchangeable() {
        let security = service();
        let refresh = security.issue_refresh_token(DocId::new()).unwrap();

        assert!(security.verify_refresh_token(&refresh).is_ok());
        let err = security.verify_access_token(&refresh).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
        assert_ne!(refresh, security.issue_refresh_token(DocId::new()).unwrap());
    }
}
