use crate::core::DocId;
use crate::entities::{EntUser, PublicUser};

/// Acting identity of an authenticated request.
#[derive(Debug, Clone)]
pub struct ViewerContext {
    pub user: EntUser,
    pub request_id: String,
}

impl ViewerContext {
    pub fn new(user: EntUser, request_id: String) -> Self {
        ViewerContext { user, request_id }
    }

    pub fn user_id(&self) -> DocId {
        self.user.id
    }

    pub fn public_user(&self) -> PublicUser {
        self.user.public()
    }
}
