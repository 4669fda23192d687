// EntLike - presence of a row means the user likes the subject

use serde::{Deserialize, Serialize};

use super::Entity;
use crate::core::{DocId, Timestamp};
use crate::infrastructure::query::Filter;

pub const COLLECTION: &str = "likes";

/// What a like points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeSubject {
    Video(DocId),
    Comment(DocId),
    Tweet(DocId),
}

impl LikeSubject {
    /// Document field holding the subject id
    pub fn field(&self) -> &'static str {
        match self {
            LikeSubject::Video(_) => "video",
            LikeSubject::Comment(_) => "comment",
            LikeSubject::Tweet(_) => "tweet",
        }
    }

    pub fn id(&self) -> DocId {
        match *self {
            LikeSubject::Video(id) | LikeSubject::Comment(id) | LikeSubject::Tweet(id) => id,
        }
    }

    pub fn filter(&self) -> Filter {
        Filter::eq(self.field(), self.id())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntLike {
    #[serde(rename = "_id")]
    pub id: DocId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video: Option<DocId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<DocId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tweet: Option<DocId>,
    pub liked_by: DocId,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl EntLike {
    pub fn new(subject: LikeSubject, liked_by: DocId) -> Self {
        let now = Timestamp::now();
        let mut like = Self {
            id: DocId::new(),
            video: None,
            comment: None,
            tweet: None,
            liked_by,
            created_at: now,
            updated_at: now,
        };
        match subject {
            LikeSubject::Video(id) => like.video = Some(id),
            LikeSubject::Comment(id) => like.comment = Some(id),
            LikeSubject::Tweet(id) => like.tweet = Some(id),
        }
        like
    }

    pub fn subject(&self) -> Option<LikeSubject> {
        self.video
            .map(LikeSubject::Video)
            .or(self.comment.map(LikeSubject::Comment))
            .or(self.tweet.map(LikeSubject::Tweet))
    }

    /// At most one like per (subject, user).
    pub fn subject_key(subject: LikeSubject, liked_by: DocId) -> String {
        format!("{}:{}:{}", subject.field(), subject.id(), liked_by)
    }

    /// Filter matching the like of `liked_by` on `subject`.
    pub fn filter_for(subject: LikeSubject, liked_by: DocId) -> Filter {
        subject.filter().and(Filter::eq("likedBy", liked_by))
    }
}

impl Entity for EntLike {
    const COLLECTION: &'static str = COLLECTION;
    const NAME: &'static str = "Like";

    fn id(&self) -> DocId {
        self.id
    }

    fn unique_keys(&self) -> Vec<String> {
        self.subject()
            .map(|subject| vec![Self::subject_key(subject, self.liked_by)])
            .unwrap_or_default()
    }
}
