//! Per-user liked and recently played songs

use axum::{
    extract::{Path, State},
    routing::{delete, get, post},
    Json, Router,
};
use hermon_common::ledger::join_ordered;
use hermon_common::time::now_rfc3339;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::warn;

use super::validate;
use crate::db::songs::{self, Counter};
use crate::db::{activity, play_events};
use crate::error::{ApiError, ApiResult};
use crate::extractors::{ApiJson, AuthUser};
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SongRefRequest {
    pub song_id: Option<String>,
}

/// A ledger entry joined with its song
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerSong {
    pub song_id: String,
    pub title: String,
    pub artist: String,
    pub thumbnail_url: Option<String>,
    pub duration: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub liked_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub played_at: Option<String>,
}

impl LedgerSong {
    fn from_song(song: &songs::Song) -> Self {
        Self {
            song_id: song.id.clone(),
            title: song.title.clone(),
            artist: song.artist.clone(),
            thumbnail_url: song.thumbnail_url.clone(),
            duration: song.duration,
            liked_at: None,
            played_at: None,
        }
    }
}

async fn load_ledger(state: &AppState, user_id: &str) -> ApiResult<hermon_common::ledger::ActivityLedger> {
    Ok(activity::load(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User activity not found".to_string()))?
        .ledger)
}

/// Liked songs, most recent first, dropping missing or inactive songs
pub async fn liked_songs_for(state: &AppState, user_id: &str) -> ApiResult<Vec<LedgerSong>> {
    let ledger = load_ledger(state, user_id).await?;
    let found = songs::fetch_active_by_ids(&state.db, &ledger.liked_song_ids()).await?;

    Ok(join_ordered(
        &ledger.liked_songs,
        &found,
        |entry| entry.song_id.as_str(),
        |entry, song| LedgerSong {
            liked_at: Some(entry.liked_at.clone()),
            ..LedgerSong::from_song(song)
        },
    ))
}

/// Recently played songs, most recent first
pub async fn recently_played_for(state: &AppState, user_id: &str) -> ApiResult<Vec<LedgerSong>> {
    let ledger = load_ledger(state, user_id).await?;
    let found = songs::fetch_active_by_ids(&state.db, &ledger.recently_played_ids()).await?;

    Ok(join_ordered(
        &ledger.recently_played,
        &found,
        |entry| entry.song_id.as_str(),
        |entry, song| LedgerSong {
            played_at: Some(entry.played_at.clone()),
            ..LedgerSong::from_song(song)
        },
    ))
}

/// Record a play in the ledger, the play log and the song counter
pub async fn track_play_for(state: &AppState, user_id: &str, song_id: &str) -> ApiResult<()> {
    activity::mutate(&state.db, user_id, |ledger| {
        ledger.track_play(song_id, &now_rfc3339());
        Ok(())
    })
    .await?;

    if let Err(e) = play_events::record_play(&state.db, user_id, song_id).await {
        warn!(user_id, song_id, error = %e, "Failed to record play event");
    }
    state.counters.enqueue(song_id, Counter::Play, 1);
    Ok(())
}

/// POST /activity/like
pub async fn like_song(
    State(state): State<AppState>,
    caller: AuthUser,
    ApiJson(req): ApiJson<SongRefRequest>,
) -> ApiResult<Json<Value>> {
    let song_id = validate::required("Song ID", req.song_id.as_deref())?;

    activity::mutate(&state.db, &caller.user_id, |ledger| {
        ledger.like(&song_id, &now_rfc3339()).map_err(Into::into)
    })
    .await?;
    state.counters.enqueue(&song_id, Counter::Like, 1);

    Ok(Json(json!({ "success": true, "liked": true })))
}

/// DELETE /activity/like/:songId
pub async fn unlike_song(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(song_id): Path<String>,
) -> ApiResult<Json<Value>> {
    activity::mutate(&state.db, &caller.user_id, |ledger| {
        ledger.unlike(&song_id).map_err(Into::into)
    })
    .await?;
    state.counters.enqueue(&song_id, Counter::Like, -1);

    Ok(Json(json!({ "success": true, "liked": false })))
}

/// GET /activity/liked-songs
pub async fn get_liked_songs(State(state): State<AppState>, caller: AuthUser) -> ApiResult<Json<Value>> {
    let data = liked_songs_for(&state, &caller.user_id).await?;
    Ok(Json(json!({ "success": true, "data": data })))
}

/// POST /activity/play
pub async fn track_play(
    State(state): State<AppState>,
    caller: AuthUser,
    ApiJson(req): ApiJson<SongRefRequest>,
) -> ApiResult<Json<Value>> {
    let song_id = validate::required("Song ID", req.song_id.as_deref())?;
    track_play_for(&state, &caller.user_id, &song_id).await?;

    Ok(Json(json!({ "success": true })))
}

/// GET /activity/recently-played
pub async fn get_recently_played(State(state): State<AppState>, caller: AuthUser) -> ApiResult<Json<Value>> {
    let data = recently_played_for(&state, &caller.user_id).await?;
    Ok(Json(json!({ "success": true, "data": data })))
}

pub fn activity_routes() -> Router<AppState> {
    Router::new()
        .route("/activity/like", post(like_song))
        .route("/activity/like/:song_id", delete(unlike_song))
        .route("/activity/liked-songs", get(get_liked_songs))
        .route("/activity/play", post(track_play))
        .route("/activity/recently-played", get(get_recently_played))
}
