// EntUser - account record and its public projection

use serde::{Deserialize, Serialize};

use super::Entity;
use crate::core::{DocId, Timestamp};

pub const COLLECTION: &str = "users";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntUser {
    #[serde(rename = "_id")]
    pub id: DocId,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub avatar: String,
    #[serde(default)]
    pub avatar_public_id: String,
    #[serde(default)]
    pub cover_image: String,
    #[serde(default)]
    pub cover_image_public_id: String,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// User without credentials, safe to hand back to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    #[serde(rename = "_id")]
    pub id: DocId,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub avatar: String,
    pub cover_image: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl EntUser {
    pub fn username_key(username: &str) -> String {
        format!("username:{}", username)
    }

    pub fn email_key(email: &str) -> String {
        format!("email:{}", email)
    }

    pub fn public(&self) -> PublicUser {
        PublicUser {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            full_name: self.full_name.clone(),
            avatar: self.avatar.clone(),
            cover_image: self.cover_image.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

impl From<EntUser> for PublicUser {
    fn from(user: EntUser) -> Self {
        user.public()
    }
}

impl Entity for EntUser {
    const COLLECTION: &'static str = COLLECTION;
    const NAME: &'static str = "User";

    fn id(&self) -> DocId {
        self.id
    }

    fn unique_keys(&self) -> Vec<String> {
        vec![Self::username_key(&self.username), Self::email_key(&self.email)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_view_drops_credentials() {
        let now = Timestamp::now();
        let user = EntUser {
            id: DocId::new(),
            username: "ana".into(),
            email: "ana@example.com".into(),
            full_name: "Ana Lima".into(),
            avatar: "https://media.test/a.png".into(),
            avatar_public_id: "image/a".into(),
            cover_image: String::new(),
            cover_image_public_id: String::new(),
            password: "$argon2id$hash".into(),
            refresh_token: Some("token".into()),
            created_at: now,
            updated_at: now,
        };

        let json = serde_json::to_value(user.public()).unwrap();
        assert!(json.get("password").is_none());
        assert!(json.get("refreshToken").is_none());
        assert_eq!(json["fullName"], "Ana Lima");

        let stored = user.to_document().unwrap();
        assert_eq!(stored["refreshToken"], "token");
        assert_eq!(stored["_id"], user.id.to_string());
    }
}
