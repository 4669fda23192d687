// Feeds - read composition over the document store.
//
// Each feed is an aggregation pipeline built from typed stages. Builders are
// kept separate from execution so the stage order can be inspected directly.

use serde_json::Value;
use tracing::instrument;

use crate::core::DocId;
use crate::entities::{
    EntComment, EntLike, EntPlaylist, EntSubscription, EntTweet, EntUser, EntVideo, Entity,
};
use crate::error::{AppError, AppResult};
use crate::infrastructure::database::Store;
use crate::infrastructure::query::{
    Accumulator, Expr, Filter, Lookup, Page, PageRequest, Pipeline, Projection, SortOrder,
};

/// Fields a video listing may be sorted by.
pub const VIDEO_SORT_FIELDS: &[&str] = &["createdAt", "updatedAt", "views", "duration", "title"];

/// Owner fields exposed next to content records.
const OWNER_SUMMARY: [&str; 3] = ["username", "fullName", "avatar"];

#[derive(Debug, Clone, Default)]
pub struct VideoFeedQuery {
    pub query: Option<String>,
    pub owner: Option<String>,
    pub sort_by: Option<String>,
    pub sort_type: Option<String>,
    pub page: PageRequest,
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn owner_summary() -> Pipeline {
    Pipeline::new().project(Projection::include(OWNER_SUMMARY))
}

/// Published videos, optionally searched and filtered by owner.
pub fn video_feed_pipeline(query: &VideoFeedQuery) -> AppResult<Pipeline> {
    let owner = DocId::parse_optional(non_blank(&query.owner), "userId")?;

    let mut pipeline = Pipeline::new();
    if let Some(text) = non_blank(&query.query) {
        pipeline = pipeline.search(text, &["title", "description"]);
    }
    if let Some(owner) = owner {
        pipeline = pipeline.matching(Filter::eq("owner", owner));
    }
    pipeline = pipeline.matching(Filter::eq("isPublished", true));

    pipeline = match (non_blank(&query.sort_by), non_blank(&query.sort_type)) {
        (Some(field), Some(direction)) => {
            if !VIDEO_SORT_FIELDS.contains(&field) {
                return Err(AppError::Validation(format!(
                    "sortBy must be one of {}",
                    VIDEO_SORT_FIELDS.join(", ")
                )));
            }
            pipeline.sort(field, SortOrder::from_token(direction))
        }
        _ => pipeline.sort("createdAt", SortOrder::Descending),
    };

    Ok(pipeline
        .lookup(
            Lookup::new(EntUser::COLLECTION, "owner", "_id", "ownerDetails")
                .pipeline(Pipeline::new().project(Projection::include(["username", "avatar"]))),
        )
        .unwind("ownerDetails"))
}

#[instrument(skip(store))]
pub async fn video_feed(store: &Store, query: &VideoFeedQuery) -> AppResult<Page> {
    let pipeline = video_feed_pipeline(query)?;
    store
        .aggregate_paginate(EntVideo::COLLECTION, &pipeline, query.page)
        .await
}

pub fn liked_videos_pipeline(user: DocId) -> Pipeline {
    let video_with_owner = Pipeline::new()
        .lookup(Lookup::new(EntUser::COLLECTION, "owner", "_id", "ownerDetails"))
        .unwind("ownerDetails");

    Pipeline::new()
        .matching(Filter::eq("likedBy", user).and(Filter::exists("video")))
        .lookup(
            Lookup::new(EntVideo::COLLECTION, "video", "_id", "likedVideo")
                .pipeline(video_with_owner),
        )
        .unwind("likedVideo")
        .sort("createdAt", SortOrder::Descending)
        .project(
            Projection::include([
                "likedVideo._id",
                "likedVideo.videoFile.url",
                "likedVideo.thumbnail.url",
                "likedVideo.owner",
                "likedVideo.title",
                "likedVideo.description",
                "likedVideo.views",
                "likedVideo.duration",
                "likedVideo.createdAt",
                "likedVideo.isPublished",
                "likedVideo.ownerDetails.username",
                "likedVideo.ownerDetails.fullName",
                "likedVideo.ownerDetails.avatar",
            ])
            .without_id(),
        )
}

/// Videos liked by `user`, newest like first. Likes whose video is gone are
/// left out.
#[instrument(skip(store))]
pub async fn liked_videos(store: &Store, user: DocId) -> AppResult<Vec<Value>> {
    store
        .aggregate(EntLike::COLLECTION, &liked_videos_pipeline(user))
        .await
}

pub fn playlist_contents_pipeline(playlist: DocId) -> Pipeline {
    let published_videos = Pipeline::new()
        .matching(Filter::eq("isPublished", true))
        .lookup(Lookup::new(EntUser::COLLECTION, "owner", "_id", "ownerDetails").pipeline(owner_summary()))
        .unwind("ownerDetails");

    Pipeline::new()
        .matching(Filter::eq("_id", playlist))
        .lookup(Lookup::new(EntVideo::COLLECTION, "videos", "_id", "videos").pipeline(published_videos))
        .lookup(Lookup::new(EntUser::COLLECTION, "owner", "_id", "owner").pipeline(owner_summary()))
        .add_fields(vec![
            ("totalVideos", Expr::Size("videos".into())),
            ("totalViews", Expr::Sum("videos.views".into())),
            ("owner", Expr::First("owner".into())),
        ])
        .project(Projection::include([
            "name",
            "description",
            "createdAt",
            "updatedAt",
            "totalVideos",
            "totalViews",
            "owner",
            "videos._id",
            "videos.videoFile.url",
            "videos.thumbnail.url",
            "videos.title",
            "videos.description",
            "videos.duration",
            "videos.createdAt",
            "videos.views",
            "videos.ownerDetails",
        ]))
}

/// A playlist with its published videos in playlist order.
#[instrument(skip(store))]
pub async fn playlist_contents(store: &Store, playlist: DocId) -> AppResult<Value> {
    if !EntPlaylist::exists(store, playlist).await? {
        return Err(AppError::NotFound("Playlist not found".to_string()));
    }

    store
        .aggregate(EntPlaylist::COLLECTION, &playlist_contents_pipeline(playlist))
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| AppError::NotFound("Playlist not found".to_string()))
}

pub fn user_playlists_pipeline(user: DocId) -> Pipeline {
    Pipeline::new()
        .matching(Filter::eq("owner", user))
        .lookup(Lookup::new(EntVideo::COLLECTION, "videos", "_id", "videos"))
        .add_fields(vec![
            ("totalVideos", Expr::Size("videos".into())),
            ("totalViews", Expr::Sum("videos.views".into())),
        ])
        .sort("updatedAt", SortOrder::Descending)
        .project(Projection::include([
            "name",
            "description",
            "totalVideos",
            "totalViews",
            "updatedAt",
        ]))
}

#[instrument(skip(store))]
pub async fn user_playlists(store: &Store, user: DocId) -> AppResult<Vec<Value>> {
    store
        .aggregate(EntPlaylist::COLLECTION, &user_playlists_pipeline(user))
        .await
}

pub fn video_comments_pipeline(video: DocId, viewer: DocId) -> Pipeline {
    Pipeline::new()
        .matching(Filter::eq("video", video))
        .lookup(Lookup::new(EntUser::COLLECTION, "owner", "_id", "owner").pipeline(owner_summary()))
        .lookup(Lookup::new(EntLike::COLLECTION, "_id", "comment", "likes"))
        .add_fields(vec![
            ("likesCount", Expr::Size("likes".into())),
            ("isLiked", Expr::Contains("likes.likedBy".into(), viewer.into())),
            ("owner", Expr::First("owner".into())),
        ])
        .matching(Filter::exists("owner"))
        .sort("createdAt", SortOrder::Descending)
        .project(Projection::include([
            "content",
            "createdAt",
            "updatedAt",
            "likesCount",
            "isLiked",
            "owner",
        ]))
}

/// Comments of a video, newest first, with their like counts.
#[instrument(skip(store))]
pub async fn video_comments(
    store: &Store,
    video: DocId,
    viewer: DocId,
    page: PageRequest,
) -> AppResult<Page> {
    store
        .aggregate_paginate(EntComment::COLLECTION, &video_comments_pipeline(video, viewer), page)
        .await
}

pub fn channel_videos_pipeline(owner: DocId) -> Pipeline {
    Pipeline::new()
        .matching(Filter::eq("owner", owner))
        .lookup(Lookup::new(EntLike::COLLECTION, "_id", "video", "likes"))
        .add_fields(vec![("likesCount", Expr::Size("likes".into()))])
        .sort("createdAt", SortOrder::Descending)
        .project(Projection::include([
            "videoFile.url",
            "thumbnail.url",
            "title",
            "description",
            "duration",
            "views",
            "isPublished",
            "likesCount",
            "createdAt",
        ]))
}

/// Every video of a channel, published or not.
#[instrument(skip(store))]
pub async fn channel_videos(store: &Store, owner: DocId) -> AppResult<Vec<Value>> {
    store
        .aggregate(EntVideo::COLLECTION, &channel_videos_pipeline(owner))
        .await
}

pub fn user_tweets_pipeline(user: DocId, viewer: DocId) -> Pipeline {
    Pipeline::new()
        .matching(Filter::eq("owner", user))
        .lookup(
            Lookup::new(EntUser::COLLECTION, "owner", "_id", "ownerDetails")
                .pipeline(Pipeline::new().project(Projection::include(["username", "avatar"]))),
        )
        .lookup(Lookup::new(EntLike::COLLECTION, "_id", "tweet", "likeDetails"))
        .add_fields(vec![
            ("likesCount", Expr::Size("likeDetails".into())),
            ("isLiked", Expr::Contains("likeDetails.likedBy".into(), viewer.into())),
            ("ownerDetails", Expr::First("ownerDetails".into())),
        ])
        .sort("createdAt", SortOrder::Descending)
        .project(Projection::include([
            "content",
            "ownerDetails",
            "likesCount",
            "isLiked",
            "createdAt",
        ]))
}

#[instrument(skip(store))]
pub async fn user_tweets(store: &Store, user: DocId, viewer: DocId) -> AppResult<Vec<Value>> {
    store
        .aggregate(EntTweet::COLLECTION, &user_tweets_pipeline(user, viewer))
        .await
}

pub fn subscribers_pipeline(channel: DocId, viewer: DocId) -> Pipeline {
    let subscriber_summary = Pipeline::new()
        .lookup(Lookup::new(EntSubscription::COLLECTION, "_id", "channel", "subscribedToSubscriber"))
        .add_fields(vec![
            ("subscribersCount", Expr::Size("subscribedToSubscriber".into())),
            (
                "subscribedToSubscriber",
                Expr::Contains("subscribedToSubscriber.subscriber".into(), viewer.into()),
            ),
        ]);

    Pipeline::new()
        .matching(Filter::eq("channel", channel))
        .lookup(
            Lookup::new(EntUser::COLLECTION, "subscriber", "_id", "subscriber")
                .pipeline(subscriber_summary),
        )
        .unwind("subscriber")
        .sort("createdAt", SortOrder::Descending)
        .project(
            Projection::include([
                "subscriber._id",
                "subscriber.username",
                "subscriber.fullName",
                "subscriber.avatar",
                "subscriber.subscribedToSubscriber",
                "subscriber.subscribersCount",
            ])
            .without_id(),
        )
}

/// Users subscribed to `channel`. `subscribedToSubscriber` tells whether the
/// viewer follows each of them back.
#[instrument(skip(store))]
pub async fn subscribers(store: &Store, channel: DocId, viewer: DocId) -> AppResult<Vec<Value>> {
    store
        .aggregate(EntSubscription::COLLECTION, &subscribers_pipeline(channel, viewer))
        .await
}

pub fn subscribed_channels_pipeline(subscriber: DocId) -> Pipeline {
    let latest_published = Pipeline::new()
        .matching(Filter::eq("isPublished", true))
        .sort("createdAt", SortOrder::Descending);

    let channel_summary = Pipeline::new()
        .lookup(Lookup::new(EntVideo::COLLECTION, "_id", "owner", "videos").pipeline(latest_published))
        .add_fields(vec![("latestVideo", Expr::First("videos".into()))]);

    Pipeline::new()
        .matching(Filter::eq("subscriber", subscriber))
        .lookup(
            Lookup::new(EntUser::COLLECTION, "channel", "_id", "subscribedChannel")
                .pipeline(channel_summary),
        )
        .unwind("subscribedChannel")
        .sort("createdAt", SortOrder::Descending)
        .project(
            Projection::include([
                "subscribedChannel._id",
                "subscribedChannel.username",
                "subscribedChannel.fullName",
                "subscribedChannel.avatar",
                "subscribedChannel.latestVideo._id",
                "subscribedChannel.latestVideo.videoFile.url",
                "subscribedChannel.latestVideo.thumbnail.url",
                "subscribedChannel.latestVideo.owner",
                "subscribedChannel.latestVideo.title",
                "subscribedChannel.latestVideo.description",
                "subscribedChannel.latestVideo.duration",
                "subscribedChannel.latestVideo.createdAt",
                "subscribedChannel.latestVideo.views",
            ])
            .without_id(),
        )
}

/// Channels `subscriber` follows, each with its latest published video.
#[instrument(skip(store))]
pub async fn subscribed_channels(store: &Store, subscriber: DocId) -> AppResult<Vec<Value>> {
    store
        .aggregate(EntSubscription::COLLECTION, &subscribed_channels_pipeline(subscriber))
        .await
}

pub fn channel_profile_pipeline(username: &str, viewer: Option<DocId>) -> Pipeline {
    let viewer_value = viewer.map(Value::from).unwrap_or(Value::Null);

    Pipeline::new()
        .matching(Filter::eq("username", username.to_lowercase()))
        .lookup(Lookup::new(EntSubscription::COLLECTION, "_id", "channel", "subscribers"))
        .lookup(Lookup::new(EntSubscription::COLLECTION, "_id", "subscriber", "subscribedTo"))
        .add_fields(vec![
            ("subscribersCount", Expr::Size("subscribers".into())),
            ("channelsSubscribedToCount", Expr::Size("subscribedTo".into())),
            ("isSubscribed", Expr::Contains("subscribers.subscriber".into(), viewer_value)),
        ])
        .project(Projection::include([
            "fullName",
            "username",
            "email",
            "avatar",
            "coverImage",
            "subscribersCount",
            "channelsSubscribedToCount",
            "isSubscribed",
        ]))
}

/// Public channel page for `username`.
#[instrument(skip(store))]
pub async fn channel_profile(store: &Store, username: &str, viewer: Option<DocId>) -> AppResult<Value> {
    let username = username.trim();
    if username.is_empty() {
        return Err(AppError::Validation("username is missing".to_string()));
    }

    store
        .aggregate(EntUser::COLLECTION, &channel_profile_pipeline(username, viewer))
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| AppError::NotFound("Channel does not exist".to_string()))
}

pub fn channel_stats_pipeline(owner: DocId) -> Pipeline {
    Pipeline::new()
        .matching(Filter::eq("owner", owner))
        .lookup(Lookup::new(EntLike::COLLECTION, "_id", "video", "likes"))
        .add_fields(vec![("likesCount", Expr::Size("likes".into()))])
        .group(
            None,
            vec![
                ("totalVideos", Accumulator::Count),
                ("totalViews", Accumulator::Sum("views".into())),
                ("totalLikes", Accumulator::Sum("likesCount".into())),
            ],
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::query::Stage;

    #[test]
    fn test_video_feed_stage_order() {
        let owner = DocId::new();
        let pipeline = video_feed_pipeline(&VideoFeedQuery {
            query: Some("rust".into()),
            owner: Some(owner.to_string()),
            sort_by: Some("views".into()),
            sort_type: Some("asc".into()),
            page: PageRequest::default(),
        })
        .unwrap();

        let kinds: Vec<&str> = pipeline
            .stages
            .iter()
            .map(|stage| match stage {
                Stage::Search { .. } => "search",
                Stage::Match(_) => "match",
                Stage::Sort(_) => "sort",
                Stage::Lookup(_) => "lookup",
                Stage::Unwind { .. } => "unwind",
                _ => "other",
            })
            .collect();
        assert_eq!(kinds, vec!["search", "match", "match", "sort", "lookup", "unwind"]);
        assert_eq!(
            pipeline.stages[3],
            Stage::Sort(vec![("views".to_string(), SortOrder::Ascending)])
        );
    }

    #[test]
    fn test_video_feed_defaults_to_newest_first() {
        let pipeline = video_feed_pipeline(&VideoFeedQuery {
            sort_by: Some("views".into()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(pipeline.stages[0], Stage::Match(Filter::eq("isPublished", true)));
        assert_eq!(
            pipeline.stages[1],
            Stage::Sort(vec![("createdAt".to_string(), SortOrder::Descending)])
        );
    }

    #[test]
    fn test_video_feed_rejects_bad_input() {
        let bad_owner = video_feed_pipeline(&VideoFeedQuery {
            owner: Some("not-an-id".into()),
            ..Default::default()
        });
        assert!(matches!(bad_owner, Err(AppError::Validation(_))));

        let bad_sort = video_feed_pipeline(&VideoFeedQuery {
            sort_by: Some("password".into()),
            sort_type: Some("desc".into()),
            ..Default::default()
        });
        assert!(matches!(bad_sort, Err(AppError::Validation(_))));
    }

    #[test]
    fn test_liked_videos_joins_videos_and_owners() {
        use crate::infrastructure::query::Stage;

        let pipeline = liked_videos_pipeline(DocId::new());
        assert!(matches!(pipeline.stages.first(), Some(Stage::Match(_))));
        let Some(Stage::Lookup(videos)) = pipeline.stages.get(1) else {
            panic!("liked videos should join videos second");
        };
        assert_eq!(videos.from, "videos");
        assert!(matches!(videos.pipeline.first(), Some(Stage::Lookup(owner)) if owner.from == "users"));
    }
}
