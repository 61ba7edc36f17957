//! Integration tests for hermon-api endpoints
//!
//! Every test runs the full router against an in-memory database with the
//! external collaborators (video catalog, media storage, identity provider)
//! replaced by stubs.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use hermon_api::db::users::{self, NewUser};
use hermon_api::services::{
    CounterQueue, IdentityVerifier, MediaKind, MediaStorage, ServiceError, UploadedMedia,
    VerifiedIdentity, VideoCatalog, VideoDetails, VideoSummary,
};
use hermon_api::{build_router, AppState, AuthSettings};
use hermon_common::api::policy::all_permissions;
use hermon_common::api::{Permissions, Role};
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tower::util::ServiceExt; // for `oneshot` method

const TEST_SECRET: &str = "integration-test-secret";

// =============================================================================
// Stub collaborators
// =============================================================================

struct StubVideos;

#[async_trait]
impl VideoCatalog for StubVideos {
    async fn search(&self, query: &str, max_results: u32) -> Result<Vec<VideoSummary>, ServiceError> {
        Ok((0..max_results.min(2))
            .map(|i| VideoSummary {
                video_id: format!("vid{}", i),
                title: format!("{} {}", query, i),
                thumbnail_url: String::new(),
                channel_title: "Hermon".to_string(),
                published_at: "2024-01-01T00:00:00Z".to_string(),
                youtube_url: format!("https://www.youtube.com/watch?v=vid{}", i),
            })
            .collect())
    }

    async fn details(&self, video_id: &str) -> Result<VideoDetails, ServiceError> {
        if video_id == "missing" {
            return Err(ServiceError::NotFound("Video not found".to_string()));
        }
        Ok(VideoDetails {
            video_id: video_id.to_string(),
            title: "Stub video".to_string(),
            description: String::new(),
            thumbnail_url: format!("https://img.test/{}.jpg", video_id),
            channel_title: "Hermon".to_string(),
            duration: "PT4M13S".to_string(),
            view_count: None,
            like_count: None,
            youtube_url: format!("https://www.youtube.com/watch?v={}", video_id),
        })
    }
}

struct StubMedia;

#[async_trait]
impl MediaStorage for StubMedia {
    async fn upload(&self, _bytes: Vec<u8>, _kind: MediaKind, filename: &str) -> Result<UploadedMedia, ServiceError> {
        Ok(UploadedMedia {
            secure_url: format!("https://cdn.test/{}", filename),
            storage_id: format!("stored/{}", filename),
            width: None,
            height: None,
            duration: Some(180.0),
        })
    }

    async fn delete(&self, _storage_id: &str, _kind: MediaKind) -> Result<(), ServiceError> {
        Ok(())
    }
}

/// Accepts the single token "good-token"
struct StubIdentity;

#[async_trait]
impl IdentityVerifier for StubIdentity {
    async fn verify(&self, id_token: &str) -> Result<VerifiedIdentity, ServiceError> {
        if id_token != "good-token" {
            return Err(ServiceError::Rejected("Invalid Google token".to_string()));
        }
        Ok(VerifiedIdentity {
            subject: "google-subject-1".to_string(),
            email: "Federated@Example.com".to_string(),
            name: Some("Federated Singer".to_string()),
            picture: None,
        })
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Test helper: fresh database and router
async fn setup_app() -> (Router, SqlitePool) {
    let db = hermon_common::db::connect_memory()
        .await
        .expect("Should create in-memory database");
    let (counters, _handle) = CounterQueue::start(db.clone());

    let state = AppState {
        db: db.clone(),
        auth: Arc::new(AuthSettings {
            jwt_secret: TEST_SECRET.to_string(),
            token_ttl: Duration::from_secs(3600),
        }),
        videos: Arc::new(StubVideos),
        media: Arc::new(StubMedia),
        identity: Arc::new(StubIdentity),
        counters,
    };

    (build_router(state, &[]), db)
}

fn request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Test helper: Extract JSON body from response
async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    (status, extract_json(response.into_body()).await)
}

/// Register an account and return (token, user id)
async fn register(app: &Router, email: &str) -> (String, String) {
    let (status, body) = send(
        app,
        request(
            "POST",
            "/api/v1/auth/register",
            None,
            Some(json!({ "email": email, "password": "secret123", "displayName": "Test User" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "register failed: {}", body);
    (
        body["token"].as_str().unwrap().to_string(),
        body["user"]["id"].as_str().unwrap().to_string(),
    )
}

/// Register an account and promote it with the given permissions
async fn register_admin(app: &Router, db: &SqlitePool, email: &str, permissions: Permissions) -> String {
    let (token, user_id) = register(app, email).await;
    users::update_role(db, &user_id, Role::Admin, &permissions)
        .await
        .unwrap();
    token
}

async fn create_song(app: &Router, admin_token: &str, title: &str) -> String {
    let (status, body) = send(
        app,
        request(
            "POST",
            "/api/v1/admin/songs",
            Some(admin_token),
            Some(json!({
                "title": title,
                "artist": "Choir",
                "category": "Worship",
                "youtubeUrl": "https://youtu.be/abc123",
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create song failed: {}", body);
    body["data"]["id"].as_str().unwrap().to_string()
}

// =============================================================================
// Health and routing
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let (app, _db) = setup_app().await;

    let (status, body) = send(&app, request("GET", "/health", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "hermon-api");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_unknown_route_returns_json_404() {
    let (app, _db) = setup_app().await;

    let (status, body) = send(&app, request("GET", "/api/v1/nope", None, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Route not found");
    assert_eq!(body["path"], "/api/v1/nope");
}

// =============================================================================
// Authentication
// =============================================================================

#[tokio::test]
async fn test_register_then_login() {
    let (app, _db) = setup_app().await;
    let (register_token, user_id) = register(&app, "Singer@Example.com").await;

    let (status, body) = send(
        &app,
        request(
            "POST",
            "/api/v1/auth/login",
            None,
            Some(json!({ "email": "singer@example.com", "password": "secret123" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["id"], user_id.as_str());
    assert_eq!(body["user"]["email"], "singer@example.com");
    assert!(body["user"].get("passwordHash").is_none());
    let login_token = body["token"].as_str().unwrap();

    for token in [register_token.as_str(), login_token] {
        let (status, profile) = send(&app, request("GET", "/api/v1/auth/profile", Some(token), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(profile["data"]["id"], user_id.as_str());
    }
}

#[tokio::test]
async fn test_duplicate_registration_rejected() {
    let (app, _db) = setup_app().await;
    register(&app, "dup@example.com").await;

    let (status, body) = send(
        &app,
        request(
            "POST",
            "/api/v1/auth/register",
            None,
            Some(json!({ "email": "DUP@example.com", "password": "another1" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_wrong_password_is_generic() {
    let (app, _db) = setup_app().await;
    register(&app, "user@example.com").await;

    for (email, password) in [("user@example.com", "wrong-pass"), ("ghost@example.com", "secret123")] {
        let (status, body) = send(
            &app,
            request(
                "POST",
                "/api/v1/auth/login",
                None,
                Some(json!({ "email": email, "password": password })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Invalid email or password");
    }
}

#[tokio::test]
async fn test_missing_and_bad_tokens() {
    let (app, _db) = setup_app().await;

    let (status, body) = send(&app, request("GET", "/api/v1/auth/profile", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "No token provided");

    let (status, body) = send(&app, request("GET", "/api/v1/auth/profile", Some("garbage"), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid or expired token");
}

#[tokio::test]
async fn test_federated_login_creates_then_reuses_account() {
    let (app, _db) = setup_app().await;
    let login = || request("POST", "/api/v1/auth/google", None, Some(json!({ "idToken": "good-token" })));

    let (status, first) = send(&app, login()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["isNewUser"], true);
    assert_eq!(first["user"]["email"], "federated@example.com");
    assert_eq!(first["user"]["authProvider"], "google");

    let (status, second) = send(&app, login()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["isNewUser"], false);
    assert_eq!(second["user"]["id"], first["user"]["id"]);

    let (status, _) = send(
        &app,
        request("POST", "/api/v1/auth/google", None, Some(json!({ "idToken": "forged" }))),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// =============================================================================
// Songs
// =============================================================================

#[tokio::test]
async fn test_song_youtube_id_extracted() {
    let (app, db) = setup_app().await;
    let admin = register_admin(&app, &db, "admin@example.com", all_permissions()).await;
    let song_id = create_song(&app, &admin, "Short link").await;

    let (status, body) = send(&app, request("GET", &format!("/api/v1/songs/{}", song_id), None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["youtubeId"], "abc123");

    let (status, body) = send(
        &app,
        request(
            "PUT",
            &format!("/api/v1/songs/{}/youtube", song_id),
            Some(&admin),
            Some(json!({ "youtubeUrl": "https://www.youtube.com/watch?v=abc123&t=5" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["youtubeId"], "abc123");
    assert_eq!(body["data"]["duration"], 253);

    let (status, _) = send(&app, request("GET", "/api/v1/songs/youtube/missing", None, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_repeated_soft_delete_succeeds() {
    let (app, db) = setup_app().await;
    let admin = register_admin(&app, &db, "admin@example.com", all_permissions()).await;
    let song_id = create_song(&app, &admin, "Fading").await;
    let uri = format!("/api/v1/admin/songs/{}", song_id);

    for _ in 0..2 {
        let (status, body) = send(&app, request("DELETE", &uri, Some(&admin), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
    }

    let (status, _) = send(&app, request("GET", &format!("/api/v1/songs/{}", song_id), None, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_song_listing_pagination() {
    let (app, db) = setup_app().await;
    let admin = register_admin(&app, &db, "admin@example.com", all_permissions()).await;
    for title in ["A", "B", "C"] {
        create_song(&app, &admin, title).await;
    }

    let (status, body) = send(&app, request("GET", "/api/v1/songs?limit=2&offset=0", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
    assert_eq!(body["pagination"]["total"], 3);
    assert_eq!(body["pagination"]["hasMore"], true);

    let (status, body) = send(&app, request("GET", "/api/v1/songs?limit=0", None, None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_youtube_search_uses_catalog() {
    let (app, _db) = setup_app().await;

    let (status, body) = send(&app, request("GET", "/api/v1/songs/youtube/search?q=hymn", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["videoId"], "vid0");

    let (status, _) = send(&app, request("GET", "/api/v1/songs/youtube/search", None, None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// =============================================================================
// Activity
// =============================================================================

#[tokio::test]
async fn test_like_unlike_cycle() {
    let (app, db) = setup_app().await;
    let admin = register_admin(&app, &db, "admin@example.com", all_permissions()).await;
    let song_id = create_song(&app, &admin, "Beloved").await;
    let (token, _) = register(&app, "fan@example.com").await;

    let like = || {
        request(
            "POST",
            "/api/v1/activity/like",
            Some(&token),
            Some(json!({ "songId": song_id })),
        )
    };
    let unlike = || {
        request(
            "DELETE",
            &format!("/api/v1/activity/like/{}", song_id),
            Some(&token),
            None,
        )
    };

    let (status, body) = send(&app, like()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["liked"], true);

    let (status, _) = send(&app, like()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, request("GET", "/api/v1/activity/liked-songs", Some(&token), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["songId"], song_id.as_str());

    let (status, body) = send(&app, unlike()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["liked"], false);

    let (status, _) = send(&app, unlike()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_like_counter_applied_in_background() {
    let (app, db) = setup_app().await;
    let admin = register_admin(&app, &db, "admin@example.com", all_permissions()).await;
    let song_id = create_song(&app, &admin, "Counted").await;
    let (token, _) = register(&app, "fan@example.com").await;

    send(
        &app,
        request("POST", "/api/v1/activity/like", Some(&token), Some(json!({ "songId": song_id }))),
    )
    .await;

    let mut like_count = 0;
    for _ in 0..50 {
        let (_, body) = send(&app, request("GET", &format!("/api/v1/songs/{}", song_id), None, None)).await;
        like_count = body["data"]["likeCount"].as_i64().unwrap();
        if like_count == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(like_count, 1);
}

#[tokio::test]
async fn test_recently_played_deduplicated() {
    let (app, db) = setup_app().await;
    let admin = register_admin(&app, &db, "admin@example.com", all_permissions()).await;
    let first = create_song(&app, &admin, "First").await;
    let second = create_song(&app, &admin, "Second").await;
    let (token, _) = register(&app, "listener@example.com").await;

    for song_id in [&first, &second, &first] {
        let (status, _) = send(
            &app,
            request("POST", "/api/v1/activity/play", Some(&token), Some(json!({ "songId": song_id }))),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = send(&app, request("GET", "/api/v1/activity/recently-played", Some(&token), None)).await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["songId"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec![first.as_str(), second.as_str()]);

    let (status, body) = send(&app, request("GET", "/api/v1/user-activity/top-played", Some(&token), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["id"], first.as_str());
    assert_eq!(body["data"][0]["userPlayCount"], 2);
}

// =============================================================================
// Playlists
// =============================================================================

#[tokio::test]
async fn test_playlist_skips_removed_songs() {
    let (app, db) = setup_app().await;
    let admin = register_admin(&app, &db, "admin@example.com", all_permissions()).await;
    let a = create_song(&app, &admin, "A").await;
    let b = create_song(&app, &admin, "B").await;
    let c = create_song(&app, &admin, "C").await;

    let (status, body) = send(
        &app,
        request(
            "POST",
            "/api/v1/admin/playlists",
            Some(&admin),
            Some(json!({ "name": "Sunday", "songIds": [a, b, c] })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let playlist_id = body["data"]["id"].as_str().unwrap().to_string();

    send(&app, request("DELETE", &format!("/api/v1/admin/songs/{}", b), Some(&admin), None)).await;

    let (status, body) = send(&app, request("GET", &format!("/api/v1/playlists/{}", playlist_id), None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["songCount"], 3);
    let ids: Vec<&str> = body["data"]["songs"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["songId"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec![a.as_str(), c.as_str()]);
}

#[tokio::test]
async fn test_private_playlist_hidden_from_public() {
    let (app, db) = setup_app().await;
    let admin = register_admin(&app, &db, "admin@example.com", all_permissions()).await;
    let song = create_song(&app, &admin, "Quiet").await;

    let (_, body) = send(
        &app,
        request(
            "POST",
            "/api/v1/admin/playlists",
            Some(&admin),
            Some(json!({ "name": "Drafts", "songIds": [song], "isPublic": false })),
        ),
    )
    .await;
    let uri = format!("/api/v1/playlists/{}", body["data"]["id"].as_str().unwrap());

    let (status, _) = send(&app, request("GET", &uri, None, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, request("GET", &uri, Some(&admin), None)).await;
    assert_eq!(status, StatusCode::OK);
}

// =============================================================================
// Admin access
// =============================================================================

#[tokio::test]
async fn test_non_admin_rejected() {
    let (app, _db) = setup_app().await;
    let (token, _) = register(&app, "plain@example.com").await;

    let (status, body) = send(&app, request("GET", "/api/v1/admin/users", Some(&token), None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Access denied. Admin privileges required.");
}

#[tokio::test]
async fn test_role_change_requires_manage_users() {
    let (app, db) = setup_app().await;
    let (_, target_id) = register(&app, "target@example.com").await;
    let limited = register_admin(&app, &db, "limited@example.com", Permissions::new()).await;
    let full = register_admin(&app, &db, "full@example.com", all_permissions()).await;
    let uri = format!("/api/v1/admin/users/{}/role", target_id);

    let (status, body) = send(&app, request("PUT", &uri, Some(&limited), Some(json!({ "role": "admin" })))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Access denied. Permission 'manageUsers' required.");

    let (status, body) = send(&app, request("PUT", &uri, Some(&full), Some(json!({ "role": "superuser" })))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid role. Must be \"user\" or \"admin\"");

    let (status, body) = send(&app, request("PUT", &uri, Some(&full), Some(json!({ "role": "admin" })))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["role"], "admin");

    let (status, body) = send(&app, request("GET", "/api/v1/admin/activities", Some(&full), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["type"], "role_changed");
}

// =============================================================================
// Church content
// =============================================================================

#[tokio::test]
async fn test_church_info_merge() {
    let (app, db) = setup_app().await;
    let admin = register_admin(&app, &db, "admin@example.com", all_permissions()).await;

    let (status, body) = send(
        &app,
        request(
            "PUT",
            "/api/v1/church/info",
            Some(&admin),
            Some(json!({ "phone": "+91 99999 00000" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["phone"], "+91 99999 00000");

    let (status, body) = send(&app, request("GET", "/api/v1/church/info", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["phone"], "+91 99999 00000");

    let (status, _) = send(&app, request("PUT", "/api/v1/church/info", Some(&admin), Some(json!({ "id": "x" })))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_seed_admin_from_database() {
    let (app, db) = setup_app().await;
    let user = users::insert_user(
        &db,
        &NewUser {
            email: "seeded@example.com".to_string(),
            password_hash: None,
            auth_provider: "email".to_string(),
            provider_subject: None,
            display_name: "Seeded".to_string(),
            photo_url: None,
            fcm_token: None,
        },
    )
    .await
    .unwrap();
    users::update_role(&db, &user.id, Role::Admin, &all_permissions())
        .await
        .unwrap();

    let token = hermon_common::api::issue_token(TEST_SECRET, &user.id, &user.email, Duration::from_secs(60)).unwrap();
    let (status, body) = send(&app, request("GET", "/api/v1/admin/statistics", Some(&token), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["totalUsers"], 1);
}

#[tokio::test]
async fn test_listing_at_largest_offset_is_empty() {
    let (app, db) = setup_app().await;
    let admin = register_admin(&app, &db, "admin@example.com", all_permissions()).await;
    create_song(&app, &admin, "Only").await;

    let uri = format!("/api/v1/songs?limit=50&offset={}", i64::MAX);
    let (status, body) = send(&app, request("GET", &uri, None, None)).await;
    assert_eq!(status, StatusCode::OK, "unexpected body: {}", body);
    assert!(body["data"].as_array().unwrap().is_empty());
    assert_eq!(body["pagination"]["total"], 1);
    assert_eq!(body["pagination"]["hasMore"], false);
}

// =============================================================================
// Hard delete
// =============================================================================

#[tokio::test]
async fn test_hard_delete_purges_activity() {
    let (app, db) = setup_app().await;
    let admin = register_admin(&app, &db, "admin@example.com", all_permissions()).await;
    let doomed = create_song(&app, &admin, "Doomed").await;
    let kept = create_song(&app, &admin, "Kept").await;
    let (token, user_id) = register(&app, "fan@example.com").await;

    for song_id in [&doomed, &kept] {
        let body = Some(json!({ "songId": song_id }));
        let (status, _) = send(&app, request("POST", "/api/v1/activity/like", Some(&token), body.clone())).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = send(&app, request("POST", "/api/v1/activity/play", Some(&token), body)).await;
        assert_eq!(status, StatusCode::OK);
    }

    let uri = format!("/api/v1/admin/songs/{}?hard=true", doomed);
    let (status, body) = send(&app, request("DELETE", &uri, Some(&admin), None)).await;
    assert_eq!(status, StatusCode::OK, "hard delete failed: {}", body);
    assert_eq!(body["message"], "Song permanently deleted");

    let stored = hermon_api::db::activity::load(&db, &user_id).await.unwrap().unwrap();
    assert_eq!(stored.ledger.liked_song_ids(), vec![kept.clone()]);
    assert_eq!(stored.ledger.recently_played_ids(), vec![kept.clone()]);

    let plays = hermon_api::db::play_events::top_played(&db, &user_id, 10).await.unwrap();
    assert_eq!(plays, vec![(kept.clone(), 1)]);

    let (status, _) = send(&app, request("GET", &format!("/api/v1/songs/{}", doomed), None, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, request("DELETE", &uri, Some(&admin), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// =============================================================================
// Uploads
// =============================================================================

const BOUNDARY: &str = "hermon-test-boundary";

enum FormPart<'a> {
    Text(&'a str, &'a str),
    File {
        field: &'a str,
        filename: &'a str,
        content_type: &'a str,
        bytes: Vec<u8>,
    },
}

fn multipart_request(uri: &str, token: &str, parts: Vec<FormPart<'_>>) -> Request<Body> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part {
            FormPart::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n", name, value).as_bytes(),
                );
            }
            FormPart::File {
                field,
                filename,
                content_type,
                bytes,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                        field, filename, content_type
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(&bytes);
                body.extend_from_slice(b"\r\n");
            }
        }
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

fn image<'a>(field: &'a str, filename: &'a str, size: usize) -> FormPart<'a> {
    FormPart::File {
        field,
        filename,
        content_type: "image/png",
        bytes: vec![0u8; size],
    }
}

#[tokio::test]
async fn test_audio_upload_creates_song() {
    let (app, db) = setup_app().await;
    let admin = register_admin(&app, &db, "admin@example.com", all_permissions()).await;

    let req = multipart_request(
        "/api/v1/songs/upload",
        &admin,
        vec![
            FormPart::Text("title", "Morning Hymn"),
            FormPart::Text("artist", "Choir"),
            FormPart::Text("category", "Worship"),
            FormPart::File {
                field: "audio",
                filename: "hymn.mp3",
                content_type: "audio/mpeg",
                bytes: vec![1u8; 2048],
            },
        ],
    );
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::CREATED, "upload failed: {}", body);
    assert_eq!(body["data"]["title"], "Morning Hymn");
    assert_eq!(body["data"]["audioUrl"], "https://cdn.test/hymn.mp3");
    assert_eq!(body["data"]["duration"], 180);
}

#[tokio::test]
async fn test_audio_upload_requires_file_and_fields() {
    let (app, db) = setup_app().await;
    let admin = register_admin(&app, &db, "admin@example.com", all_permissions()).await;

    let req = multipart_request(
        "/api/v1/songs/upload",
        &admin,
        vec![FormPart::Text("title", "No Audio"), FormPart::Text("artist", "Choir")],
    );
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "No audio file provided");

    let req = multipart_request(
        "/api/v1/songs/upload",
        &admin,
        vec![FormPart::File {
            field: "audio",
            filename: "hymn.mp3",
            content_type: "audio/mpeg",
            bytes: vec![1u8; 16],
        }],
    );
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Title, artist, and category are required");
}

#[tokio::test]
async fn test_upload_rejects_wrong_file_type() {
    let (app, db) = setup_app().await;
    let admin = register_admin(&app, &db, "admin@example.com", all_permissions()).await;

    let req = multipart_request(
        "/api/v1/songs/upload-thumbnail",
        &admin,
        vec![FormPart::File {
            field: "thumbnail",
            filename: "notes.txt",
            content_type: "text/plain",
            bytes: b"not an image".to_vec(),
        }],
    );
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Only images (jpeg, jpg, png, gif, webp) are allowed");

    let req = multipart_request(
        "/api/v1/songs/upload-thumbnail",
        &admin,
        vec![image("thumbnail", "cover.png", 64)],
    );
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK, "thumbnail upload failed: {}", body);
    assert_eq!(body["data"]["url"], "https://cdn.test/cover.png");
    assert_eq!(body["data"]["storageId"], "stored/cover.png");
}

#[tokio::test]
async fn test_oversized_image_is_payload_too_large() {
    let (app, db) = setup_app().await;
    let admin = register_admin(&app, &db, "admin@example.com", all_permissions()).await;

    let req = multipart_request(
        "/api/v1/songs/upload-thumbnail",
        &admin,
        vec![image("thumbnail", "huge.png", 10 * 1024 * 1024 + 1)],
    );
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "huge.png exceeds the 10 MB limit");
}

#[tokio::test]
async fn test_gallery_upload_batch_limit() {
    let (app, db) = setup_app().await;
    let admin = register_admin(&app, &db, "admin@example.com", all_permissions()).await;

    let names = ["a.png", "b.png", "c.png", "d.png", "e.png", "f.png"];
    let too_many = names.iter().map(|name| image("images", name, 32)).collect();
    let req = multipart_request("/api/v1/church/gallery/upload", &admin, too_many);
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "At most 5 files may be uploaded at once");

    let mut parts: Vec<FormPart<'_>> = names[..2].iter().map(|name| image("images", name, 32)).collect();
    parts.push(FormPart::Text("title", "Easter"));
    let req = multipart_request("/api/v1/church/gallery/upload", &admin, parts);
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::CREATED, "gallery upload failed: {}", body);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
    assert_eq!(body["message"], "2 image(s) uploaded successfully");
}

#[tokio::test]
async fn test_upload_requires_admin() {
    let (app, _db) = setup_app().await;
    let (token, _) = register(&app, "fan@example.com").await;

    let req = multipart_request(
        "/api/v1/songs/upload-thumbnail",
        &token,
        vec![image("thumbnail", "cover.png", 64)],
    );
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
