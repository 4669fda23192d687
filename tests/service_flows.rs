mod common;

use serde_json::Value;

use common::{test_app, PASSWORD};
use vidshare::entities::{EntComment, EntLike, EntPlaylist, EntVideo, Entity};
use vidshare::error::AppError;
use vidshare::feeds::VideoFeedQuery;
use vidshare::infrastructure::query::Filter;
use vidshare::services::{
    CommentService, DashboardService, LikeService, PlaylistService, SubscriptionService,
    TweetService, UpdateVideoInput,
};

fn feed_ids(docs: &[Value]) -> Vec<String> {
    docs.iter()
        .filter_map(|d| d["_id"].as_str().map(str::to_string))
        .collect()
}

#[tokio::test]
async fn test_like_toggle_twice_restores_state() {
    let app = test_app().await;
    let alice = app.register("alice").await;
    let video = app.publish_visible(alice.id, "first").await;
    let likes = LikeService::from_state(&app.state);
    let video_id = video.id.to_string();

    assert!(likes.toggle_video_like(alice.id, &video_id).await.unwrap());
    assert!(!likes.toggle_video_like(alice.id, &video_id).await.unwrap());

    let remaining = app
        .state
        .store
        .count(EntLike::COLLECTION, &Filter::eq("video", video.id))
        .await
        .unwrap();
    assert_eq!(remaining, 0);
}

#[tokio::test]
async fn test_like_on_missing_subject_is_not_found() {
    let app = test_app().await;
    let alice = app.register("alice").await;
    let likes = LikeService::from_state(&app.state);

    let missing = vidshare::core::DocId::new().to_string();
    let err = likes.toggle_tweet_like(alice.id, &missing).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let err = likes.toggle_comment_like(alice.id, "not-an-id").await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn test_feed_only_returns_published_videos_of_requested_owner() {
    let app = test_app().await;
    let alice = app.register("alice").await;
    let bob = app.register("bob").await;

    let visible = app.publish_visible(alice.id, "alice public").await;
    let _draft = app.publish(alice.id, "alice draft").await;
    let _other = app.publish_visible(bob.id, "bob public").await;

    let page = app
        .videos()
        .get_all_videos(&VideoFeedQuery {
            owner: Some(alice.id.to_string()),
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(page.total_docs, 1);
    for doc in &page.docs {
        assert_eq!(doc["isPublished"], Value::Bool(true));
        assert_eq!(doc["owner"].as_str(), Some(alice.id.to_string().as_str()));
        assert_eq!(doc["ownerDetails"]["username"], "alice");
    }
    assert_eq!(feed_ids(&page.docs), vec![visible.id.to_string()]);
}

#[tokio::test]
async fn test_feed_search_matches_any_term() {
    let app = test_app().await;
    let alice = app.register("alice").await;
    app.publish_visible(alice.id, "rust ownership explained").await;
    app.publish_visible(alice.id, "cooking pasta").await;

    let page = app
        .videos()
        .get_all_videos(&VideoFeedQuery {
            query: Some("ownership gardening".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(page.total_docs, 1);
    assert_eq!(page.docs[0]["title"], "rust ownership explained");
}

#[tokio::test]
async fn test_playlist_totals_match_published_videos() {
    let app = test_app().await;
    let alice = app.register("alice").await;
    let playlists = PlaylistService::from_state(&app.state);

    let first = app.publish_visible(alice.id, "one").await;
    let second = app.publish_visible(alice.id, "two").await;
    let draft = app.publish(alice.id, "draft").await;

    // Two views on the first video, one on the second.
    for _ in 0..2 {
        app.videos().get_video_by_id(alice.id, &first.id.to_string()).await.unwrap();
    }
    app.videos().get_video_by_id(alice.id, &second.id.to_string()).await.unwrap();

    let playlist = playlists
        .create(alice.id, Some("favourites"), Some("the good ones"))
        .await
        .unwrap();
    let playlist_id = playlist.id.to_string();
    for video in [&first, &second, &draft] {
        playlists
            .add_video(alice.id, &video.id.to_string(), &playlist_id)
            .await
            .unwrap();
    }

    let contents = playlists.get_playlist_by_id(&playlist_id).await.unwrap();
    let videos = contents["videos"].as_array().unwrap();

    assert_eq!(contents["totalVideos"].as_u64(), Some(videos.len() as u64));
    assert_eq!(videos.len(), 2);
    let view_sum: u64 = videos.iter().filter_map(|v| v["views"].as_u64()).sum();
    assert_eq!(contents["totalViews"].as_u64(), Some(view_sum));
    assert_eq!(view_sum, 3);
    assert_eq!(contents["owner"]["username"], "alice");
}

#[tokio::test]
async fn test_foreign_owner_mutations_are_rejected_without_changes() {
    let app = test_app().await;
    let alice = app.register("alice").await;
    let mallory = app.register("mallory").await;

    let video = app.publish(alice.id, "mine").await;
    let video_id = video.id.to_string();

    let err = app
        .videos()
        .toggle_publish_status(mallory.id, &video_id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let err = app
        .videos()
        .update_video(
            mallory.id,
            &video_id,
            UpdateVideoInput {
                title: Some("hijacked"),
                description: Some("hijacked"),
                thumbnail: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let err = app.videos().delete_video(mallory.id, &video_id).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let stored = EntVideo::gen_enforce(&app.state.store, video.id).await.unwrap();
    assert_eq!(stored, video);

    let playlists = PlaylistService::from_state(&app.state);
    let playlist = playlists.create(alice.id, Some("mine"), Some("mine")).await.unwrap();
    let err = playlists
        .add_video(mallory.id, &video_id, &playlist.id.to_string())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
    let stored = EntPlaylist::gen_enforce(&app.state.store, playlist.id).await.unwrap();
    assert!(stored.videos.is_empty());

    let tweets = TweetService::from_state(&app.state);
    let tweet = tweets.create_tweet(alice.id, Some("hello")).await.unwrap();
    let err = tweets
        .update_tweet(mallory.id, &tweet.id.to_string(), Some("pwned"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
}

#[tokio::test]
async fn test_video_delete_cascades_to_likes_and_comments() {
    let app = test_app().await;
    let alice = app.register("alice").await;
    let bob = app.register("bob").await;
    let video = app.publish_visible(alice.id, "doomed").await;
    let keeper = app.publish_visible(alice.id, "keeper").await;
    let video_id = video.id.to_string();

    let comments = CommentService::from_state(&app.state);
    let likes = LikeService::from_state(&app.state);

    let comment = comments.add_comment(bob.id, &video_id, Some("nice")).await.unwrap();
    comments
        .add_comment(bob.id, &keeper.id.to_string(), Some("also nice"))
        .await
        .unwrap();
    likes.toggle_video_like(bob.id, &video_id).await.unwrap();
    likes.toggle_comment_like(alice.id, &comment.id.to_string()).await.unwrap();
    likes.toggle_video_like(bob.id, &keeper.id.to_string()).await.unwrap();

    app.videos().delete_video(alice.id, &video_id).await.unwrap();

    let store = &app.state.store;
    assert!(!EntVideo::exists(store, video.id).await.unwrap());
    assert_eq!(
        store.count(EntLike::COLLECTION, &Filter::eq("video", video.id)).await.unwrap(),
        0
    );
    assert_eq!(
        store.count(EntComment::COLLECTION, &Filter::eq("video", video.id)).await.unwrap(),
        0
    );
    assert_eq!(
        store.count(EntLike::COLLECTION, &Filter::eq("comment", comment.id)).await.unwrap(),
        0
    );

    // The other video keeps its comment and like.
    assert_eq!(
        store.count(EntComment::COLLECTION, &Filter::eq("video", keeper.id)).await.unwrap(),
        1
    );
    assert_eq!(
        store.count(EntLike::COLLECTION, &Filter::eq("video", keeper.id)).await.unwrap(),
        1
    );

    let destroyed = app.host.destroyed.lock().unwrap().clone();
    assert!(destroyed.contains(&video.video_file.public_id));
    assert!(destroyed.contains(&video.thumbnail.public_id));
}

#[tokio::test]
async fn test_register_login_publish_toggle_flow() {
    let app = test_app().await;
    let alice = app.register("alice").await;

    let outcome = app
        .users()
        .login(Some("alice@example.com"), None, Some(PASSWORD))
        .await
        .unwrap();
    assert_eq!(outcome.user.id, alice.id);
    let claims = app
        .state
        .security
        .verify_access_token(&outcome.tokens.access_token)
        .unwrap();
    assert_eq!(claims.id, alice.id);

    let video = app.publish(alice.id, "launch").await;
    assert!(!video.is_published);
    assert_eq!(video.duration, 42.5);

    let feed = |app: &common::TestApp| {
        let videos = app.videos();
        async move {
            let page = videos.get_all_videos(&VideoFeedQuery::default()).await.unwrap();
            feed_ids(&page.docs)
        }
    };
    assert!(feed(&app).await.is_empty());

    let status = app
        .videos()
        .toggle_publish_status(alice.id, &video.id.to_string())
        .await
        .unwrap();
    assert_eq!(status["isPublished"], Value::Bool(true));
    assert_eq!(feed(&app).await, vec![video.id.to_string()]);

    app.videos()
        .toggle_publish_status(alice.id, &video.id.to_string())
        .await
        .unwrap();
    assert!(feed(&app).await.is_empty());
}

#[tokio::test]
async fn test_playlist_add_then_remove_flow() {
    let app = test_app().await;
    let alice = app.register("alice").await;
    let video = app.publish_visible(alice.id, "track").await;
    let playlists = PlaylistService::from_state(&app.state);

    let playlist = playlists.create(alice.id, Some("mix"), Some("weekly")).await.unwrap();
    let playlist_id = playlist.id.to_string();
    let video_id = video.id.to_string();

    playlists.add_video(alice.id, &video_id, &playlist_id).await.unwrap();
    // Adding twice keeps a single entry.
    let updated = playlists.add_video(alice.id, &video_id, &playlist_id).await.unwrap();
    assert_eq!(updated.videos, vec![video.id]);

    let contents = playlists.get_playlist_by_id(&playlist_id).await.unwrap();
    assert_eq!(contents["totalVideos"].as_u64(), Some(1));
    assert_eq!(contents["videos"][0]["_id"].as_str(), Some(video_id.as_str()));

    playlists.remove_video(alice.id, &video_id, &playlist_id).await.unwrap();
    let contents = playlists.get_playlist_by_id(&playlist_id).await.unwrap();
    assert_eq!(contents["totalVideos"].as_u64(), Some(0));
}

#[tokio::test]
async fn test_refresh_token_rotates_once() {
    let app = test_app().await;
    app.register("alice").await;
    let users = app.users();

    let outcome = users.login(None, Some("ALICE"), Some(PASSWORD)).await.unwrap();
    let old = outcome.tokens.refresh_token;

    let rotated = users.refresh_access_token(Some(&old)).await.unwrap();
    assert_ne!(rotated.refresh_token, old);

    let err = users.refresh_access_token(Some(&old)).await.unwrap_err();
    assert!(matches!(err, AppError::Unauthorized(_)));

    let err = users.refresh_access_token(Some("garbage")).await.unwrap_err();
    assert!(matches!(err, AppError::Unauthorized(_)));
}

#[tokio::test]
async fn test_register_rejects_duplicates_and_missing_avatar() {
    let app = test_app().await;
    app.register("alice").await;
    let users = app.users();

    let avatar = app.upload_file("avatar.png");
    let err = users
        .register(vidshare::services::RegisterInput {
            full_name: Some("Other Alice"),
            email: Some("ALICE@example.com"),
            username: Some("alice2"),
            password: Some("pw"),
            avatar: Some(&avatar),
            cover_image: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let err = users
        .register(vidshare::services::RegisterInput {
            full_name: Some("Bob"),
            email: Some("bob@example.com"),
            username: Some("bob"),
            password: Some("pw"),
            avatar: None,
            cover_image: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn test_login_failures() {
    let app = test_app().await;
    app.register("alice").await;
    let users = app.users();

    let err = users.login(None, Some("nobody"), Some(PASSWORD)).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let err = users.login(None, Some("alice"), Some("wrong")).await.unwrap_err();
    assert!(matches!(err, AppError::Unauthorized(_)));

    let err = users.login(None, None, Some(PASSWORD)).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn test_avatar_replacement_destroys_previous_image() {
    let app = test_app().await;
    let alice = app.register("alice").await;
    let before = app.host.uploaded.lock().unwrap().clone();

    let file = app.upload_file("new-avatar.png");
    let updated = app.users().update_avatar(alice.id, Some(&file)).await.unwrap();

    assert_ne!(updated.avatar, alice.avatar);
    let destroyed = app.host.destroyed.lock().unwrap().clone();
    assert_eq!(destroyed, vec![before[0].clone()]);
}

#[tokio::test]
async fn test_subscriptions_and_dashboard_stats() {
    let app = test_app().await;
    let alice = app.register("alice").await;
    let bob = app.register("bob").await;
    let subscriptions = SubscriptionService::from_state(&app.state);

    let err = subscriptions
        .toggle_subscription(alice.id, &alice.id.to_string())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    assert!(subscriptions
        .toggle_subscription(bob.id, &alice.id.to_string())
        .await
        .unwrap());

    let subscribers = subscriptions
        .get_channel_subscribers(alice.id, &alice.id.to_string())
        .await
        .unwrap();
    assert_eq!(subscribers.len(), 1);

    let channels = subscriptions
        .get_subscribed_channels(&bob.id.to_string())
        .await
        .unwrap();
    assert_eq!(channels.len(), 1);

    let video = app.publish_visible(alice.id, "stats").await;
    app.videos().get_video_by_id(bob.id, &video.id.to_string()).await.unwrap();
    LikeService::from_state(&app.state)
        .toggle_video_like(bob.id, &video.id.to_string())
        .await
        .unwrap();

    let stats = DashboardService::from_state(&app.state)
        .get_channel_stats(alice.id)
        .await
        .unwrap();
    assert_eq!(stats.total_subscribers, 1);
    assert_eq!(stats.total_videos, 1);
    assert_eq!(stats.total_views, 1);
    assert_eq!(stats.total_likes, 1);

    let profile = app.users().channel_profile("alice", bob.id).await.unwrap();
    assert_eq!(profile["subscribersCount"].as_u64(), Some(1));
    assert_eq!(profile["isSubscribed"], Value::Bool(true));
}

#[tokio::test]
async fn test_unpublished_video_hidden_from_other_users() {
    let app = test_app().await;
    let alice = app.register("alice").await;
    let bob = app.register("bob").await;
    let draft = app.publish(alice.id, "secret").await;

    let err = app
        .videos()
        .get_video_by_id(bob.id, &draft.id.to_string())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let seen = app
        .videos()
        .get_video_by_id(alice.id, &draft.id.to_string())
        .await
        .unwrap();
    assert_eq!(seen.views, 1);
}

#[tokio::test]
async fn test_liked_videos_skip_deleted_videos_and_summarise_owner() {
    let app = test_app().await;
    let alice = app.register("alice").await;
    let bob = app.register("bob").await;
    let kept = app.publish_visible(bob.id, "kept").await;
    let removed = app.publish_visible(bob.id, "removed").await;
    let vanished = app.publish_visible(bob.id, "vanished").await;
    let likes = LikeService::from_state(&app.state);

    for video in [&kept, &removed, &vanished] {
        assert!(likes.toggle_video_like(alice.id, &video.id.to_string()).await.unwrap());
    }

    app.videos()
        .delete_video(bob.id, &removed.id.to_string())
        .await
        .unwrap();
    // Leave the like behind with nothing to join against.
    app.state
        .store
        .delete_one(EntVideo::COLLECTION, &Filter::eq("_id", vanished.id))
        .await
        .unwrap()
        .unwrap();

    let liked = likes.get_liked_videos(alice.id).await.unwrap();
    assert_eq!(liked.len(), 1);

    let entry = liked[0].as_object().unwrap();
    assert!(entry.get("_id").is_none());
    let video = &entry["likedVideo"];
    assert_eq!(video["_id"], kept.id.to_string());
    assert_eq!(video["title"], "kept");

    let owner = video["ownerDetails"].as_object().unwrap();
    let mut keys: Vec<_> = owner.keys().cloned().collect();
    keys.sort();
    assert_eq!(keys, vec!["avatar", "fullName", "username"]);
    assert_eq!(owner["username"], "bob");
    assert_eq!(owner["fullName"], "Test User");
    assert_eq!(owner["avatar"], bob.avatar.as_str());
}

#[tokio::test]
async fn test_user_playlists_report_totals_and_summary_fields() {
    let app = test_app().await;
    let alice = app.register("alice").await;
    let bob = app.register("bob").await;
    let first = app.publish_visible(alice.id, "first").await;
    let second = app.publish_visible(alice.id, "second").await;
    let playlists = PlaylistService::from_state(&app.state);

    for _ in 0..2 {
        app.videos().get_video_by_id(bob.id, &first.id.to_string()).await.unwrap();
    }
    app.videos().get_video_by_id(bob.id, &second.id.to_string()).await.unwrap();

    playlists.create(alice.id, Some("empty"), Some("nothing yet")).await.unwrap();
    let mix = playlists.create(alice.id, Some("mix"), Some("weekly")).await.unwrap();
    for video in [&first, &second] {
        playlists
            .add_video(alice.id, &video.id.to_string(), &mix.id.to_string())
            .await
            .unwrap();
    }
    playlists.create(bob.id, Some("other"), Some("not alice's")).await.unwrap();

    let listed = playlists.get_user_playlists(&alice.id.to_string()).await.unwrap();
    assert_eq!(listed.len(), 2);

    let by_name = |name: &str| {
        listed
            .iter()
            .find(|p| p["name"] == name)
            .cloned()
            .unwrap()
    };

    let mix_summary = by_name("mix");
    assert_eq!(mix_summary["_id"], mix.id.to_string());
    assert_eq!(mix_summary["totalVideos"], 2);
    assert_eq!(mix_summary["totalViews"], 3);

    let empty_summary = by_name("empty");
    assert_eq!(empty_summary["totalVideos"], 0);
    assert_eq!(empty_summary["totalViews"], 0);

    let mut keys: Vec<_> = mix_summary.as_object().unwrap().keys().cloned().collect();
    keys.sort();
    assert_eq!(
        keys,
        vec!["_id", "description", "name", "totalVideos", "totalViews", "updatedAt"]
    );
}
