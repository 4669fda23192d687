// Services - business logic behind the HTTP handlers.
//
// Every operation validates its input, runs store and media calls one after
// another and returns a typed value or an `AppError`.

pub mod comment_service;
pub mod dashboard_service;
pub mod like_service;
pub mod playlist_service;
pub mod subscription_service;
pub mod tweet_service;
pub mod user_service;
pub mod video_service;

pub use comment_service::CommentService;
pub use dashboard_service::{ChannelStats, DashboardService};
pub use like_service::LikeService;
pub use playlist_service::PlaylistService;
pub use subscription_service::SubscriptionService;
pub use tweet_service::TweetService;
pub use user_service::{LoginOutcome, RegisterInput, TokenPair, UserService};
pub use video_service::{PublishVideoInput, UpdateVideoInput, VideoService};

use crate::error::{AppError, AppResult};

/// Trimmed value of a required text field; blank counts as missing.
pub(crate) fn required(value: Option<&str>, message: &str) -> AppResult<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| AppError::Validation(message.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_trims_and_rejects_blank() {
        assert_eq!(required(Some("  hi "), "x").unwrap(), "hi");
        assert!(matches!(required(Some("   "), "x"), Err(AppError::Validation(_))));
        assert!(required(None, "x").is_err());
    }
}
