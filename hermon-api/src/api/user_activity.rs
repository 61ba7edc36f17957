//! `/user-activity` routes: play tracking aliases and per-user top played

use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::activity::{recently_played_for, track_play_for, SongRefRequest};
use super::validate;
use crate::db::{play_events, songs};
use crate::error::{ApiError, ApiResult};
use crate::extractors::{ApiJson, AuthUser};
use crate::AppState;

const DEFAULT_TOP_PLAYED: i64 = 5;
const MAX_TOP_PLAYED: i64 = 50;

#[derive(Debug, Deserialize)]
pub struct TopPlayedQuery {
    pub limit: Option<String>,
}

/// A song with the caller's own play count
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopPlayedSong {
    #[serde(flatten)]
    pub song: songs::Song,
    pub user_play_count: i64,
}

/// POST /user-activity/play
pub async fn play(
    State(state): State<AppState>,
    caller: AuthUser,
    ApiJson(req): ApiJson<SongRefRequest>,
) -> ApiResult<Json<Value>> {
    let song_id = validate::required("Song ID", req.song_id.as_deref())?;
    track_play_for(&state, &caller.user_id, &song_id).await?;

    Ok(Json(json!({ "success": true, "message": "Play tracked" })))
}

/// GET /user-activity/top-played
pub async fn top_played(
    State(state): State<AppState>,
    caller: AuthUser,
    Query(query): Query<TopPlayedQuery>,
) -> ApiResult<Json<Value>> {
    let limit = match query.limit.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        None => DEFAULT_TOP_PLAYED,
        Some(raw) => raw
            .parse::<i64>()
            .ok()
            .filter(|n| (1..=MAX_TOP_PLAYED).contains(n))
            .ok_or_else(|| {
                ApiError::BadRequest(format!("limit must be an integer between 1 and {}", MAX_TOP_PLAYED))
            })?,
    };

    let counts = play_events::top_played(&state.db, &caller.user_id, limit).await?;
    let ids: Vec<String> = counts.iter().map(|(id, _)| id.clone()).collect();
    let mut found = songs::fetch_active_by_ids(&state.db, &ids).await?;

    let data: Vec<TopPlayedSong> = counts
        .into_iter()
        .filter_map(|(id, user_play_count)| {
            found.remove(&id).map(|song| TopPlayedSong { song, user_play_count })
        })
        .collect();

    Ok(Json(json!({ "success": true, "data": data })))
}

/// GET /user-activity/recently-played
pub async fn recently_played(State(state): State<AppState>, caller: AuthUser) -> ApiResult<Json<Value>> {
    let data = recently_played_for(&state, &caller.user_id).await?;
    Ok(Json(json!({ "success": true, "data": data })))
}

pub fn user_activity_routes() -> Router<AppState> {
    Router::new()
        .route("/user-activity/play", post(play))
        .route("/user-activity/top-played", get(top_played))
        .route("/user-activity/recently-played", get(recently_played))
}
