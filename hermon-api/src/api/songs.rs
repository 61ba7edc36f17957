//! Song catalog endpoints
//!
//! Reads are public and only ever see active songs. Writes require an admin
//! and are also mounted under `/admin/songs`.

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use hermon_common::time::now_rfc3339;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use tracing::{info, warn};
use uuid::Uuid;

use super::uploads::{read_form, UploadForm, UploadedFile};
use super::validate;
use crate::db::songs::{self, Counter, Song, SongQuery, OTHER_ALPHABET};
use crate::db::{activities, activity, play_events};
use crate::error::{ApiError, ApiResult};
use crate::extractors::{AdminUser, ApiJson};
use crate::pagination::Page;
use crate::services::youtube_client::{extract_video_id, parse_iso8601_duration, thumbnail_url};
use crate::services::MediaKind;
use crate::AppState;

const MAX_TAGS: usize = 5;
const DEFAULT_LANGUAGE: &str = "telugu";
const DEFAULT_YOUTUBE_RESULTS: u32 = 5;
const MAX_YOUTUBE_RESULTS: u32 = 50;

/// Editable song fields
///
/// Used for creation (required fields checked by the handler) and for
/// partial updates. Ids, counters and timestamps have no field here.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SongFields {
    pub title: Option<String>,
    pub title_telugu: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub lyrics: Option<String>,
    pub lyrics_telugu: Option<String>,
    pub language: Option<String>,
    pub description: Option<String>,
    pub duration: Option<i64>,
    #[serde(alias = "youtubeURL")]
    pub youtube_url: Option<String>,
    pub audio_url: Option<String>,
    pub storage_id: Option<String>,
    #[serde(alias = "thumbnailURL")]
    pub thumbnail_url: Option<String>,
    pub category: Option<String>,
    pub category_telugu: Option<String>,
    pub tags: Option<Vec<String>>,
    pub is_active: Option<bool>,
}

impl SongFields {
    fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.title_telugu.is_none()
            && self.artist.is_none()
            && self.album.is_none()
            && self.lyrics.is_none()
            && self.lyrics_telugu.is_none()
            && self.language.is_none()
            && self.description.is_none()
            && self.duration.is_none()
            && self.youtube_url.is_none()
            && self.audio_url.is_none()
            && self.storage_id.is_none()
            && self.thumbnail_url.is_none()
            && self.category.is_none()
            && self.category_telugu.is_none()
            && self.tags.is_none()
            && self.is_active.is_none()
    }
}

fn youtube_id_for(url: &str) -> ApiResult<String> {
    extract_video_id(url.trim()).ok_or_else(|| ApiError::BadRequest("Invalid YouTube URL".to_string()))
}

fn check_tags(tags: Vec<String>) -> ApiResult<Vec<String>> {
    let tags: Vec<String> = tags
        .into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();
    if tags.len() > MAX_TAGS {
        return Err(ApiError::BadRequest(format!("At most {} tags are allowed", MAX_TAGS)));
    }
    Ok(tags)
}

fn check_duration(duration: i64) -> ApiResult<i64> {
    if duration < 0 {
        return Err(ApiError::BadRequest("Duration must be a non-negative number of seconds".to_string()));
    }
    Ok(duration)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Build a new active song from `fields`
pub fn new_song(fields: SongFields, created_by: &str) -> ApiResult<Song> {
    let title = validate::text_in_range("Title", fields.title.as_deref().unwrap_or(""), 1, 200)?;
    let artist = validate::text_in_range("Artist", fields.artist.as_deref().unwrap_or(""), 1, 100)?;
    let category = validate::required("Category", fields.category.as_deref())?;

    let youtube_url = non_empty(fields.youtube_url);
    let audio_url = non_empty(fields.audio_url);
    if youtube_url.is_none() && audio_url.is_none() {
        return Err(ApiError::BadRequest(
            "Either a YouTube URL or an audio URL is required".to_string(),
        ));
    }
    let youtube_id = youtube_url.as_deref().map(youtube_id_for).transpose()?;

    let thumbnail = non_empty(fields.thumbnail_url).or_else(|| youtube_id.as_deref().map(thumbnail_url));
    let title_telugu = non_empty(fields.title_telugu);
    let now = now_rfc3339();

    Ok(Song {
        id: format!("song_{}", Uuid::new_v4()),
        telugu_alphabet: songs::telugu_alphabet(title_telugu.as_deref()),
        title,
        title_telugu,
        artist,
        album: non_empty(fields.album),
        lyrics: fields.lyrics.unwrap_or_default(),
        lyrics_telugu: non_empty(fields.lyrics_telugu),
        language: non_empty(fields.language).unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
        description: fields.description.unwrap_or_default(),
        duration: check_duration(fields.duration.unwrap_or(0))?,
        youtube_id,
        youtube_url,
        audio_url,
        storage_id: non_empty(fields.storage_id),
        thumbnail_url: thumbnail,
        category,
        category_telugu: non_empty(fields.category_telugu),
        tags: check_tags(fields.tags.unwrap_or_default())?,
        like_count: 0,
        share_count: 0,
        play_count: 0,
        is_active: true,
        created_by: created_by.to_string(),
        created_at: now.clone(),
        updated_at: now,
    })
}

/// Apply a partial update in place
pub fn apply_changes(song: &mut Song, fields: SongFields) -> ApiResult<()> {
    if fields.is_empty() {
        return Err(ApiError::BadRequest("No fields to update".to_string()));
    }

    if let Some(title) = fields.title {
        song.title = validate::text_in_range("Title", &title, 1, 200)?;
    }
    if let Some(artist) = fields.artist {
        song.artist = validate::text_in_range("Artist", &artist, 1, 100)?;
    }
    if let Some(category) = fields.category {
        song.category = validate::required("Category", Some(category.as_str()))?;
    }
    if let Some(title_telugu) = fields.title_telugu {
        song.title_telugu = non_empty(Some(title_telugu));
        song.telugu_alphabet = songs::telugu_alphabet(song.title_telugu.as_deref());
    }
    if let Some(url) = fields.youtube_url {
        let id = youtube_id_for(&url)?;
        song.thumbnail_url = Some(thumbnail_url(&id));
        song.youtube_id = Some(id);
        song.youtube_url = Some(url.trim().to_string());
    }
    // An explicit thumbnail wins over the one derived from a new video
    if let Some(thumb) = fields.thumbnail_url {
        song.thumbnail_url = non_empty(Some(thumb));
    }
    if let Some(album) = fields.album {
        song.album = non_empty(Some(album));
    }
    if let Some(lyrics) = fields.lyrics {
        song.lyrics = lyrics;
    }
    if let Some(lyrics_telugu) = fields.lyrics_telugu {
        song.lyrics_telugu = non_empty(Some(lyrics_telugu));
    }
    if let Some(language) = fields.language {
        song.language = language;
    }
    if let Some(description) = fields.description {
        song.description = description;
    }
    if let Some(duration) = fields.duration {
        song.duration = check_duration(duration)?;
    }
    if let Some(audio_url) = fields.audio_url {
        song.audio_url = non_empty(Some(audio_url));
    }
    if let Some(storage_id) = fields.storage_id {
        song.storage_id = non_empty(Some(storage_id));
    }
    if let Some(category_telugu) = fields.category_telugu {
        song.category_telugu = non_empty(Some(category_telugu));
    }
    if let Some(tags) = fields.tags {
        song.tags = check_tags(tags)?;
    }
    if let Some(is_active) = fields.is_active {
        song.is_active = is_active;
    }

    Ok(())
}

// ========================================
// Catalog reads
// ========================================

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub category: Option<String>,
    pub search: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationInfo {
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
    pub has_more: bool,
}

/// GET /songs
pub async fn list_songs(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Value>> {
    let page = Page::parse(query.limit.as_deref(), query.offset.as_deref())?;

    let (data, total) = songs::list_songs(
        &state.db,
        &SongQuery {
            category: non_empty(query.category),
            search: non_empty(query.search),
            limit: page.limit,
            offset: page.offset,
        },
    )
    .await?;

    Ok(Json(json!({
        "success": true,
        "data": data,
        "pagination": PaginationInfo {
            total,
            limit: page.limit,
            offset: page.offset,
            has_more: page.has_more(total),
        },
    })))
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(alias = "query")]
    pub q: Option<String>,
}

/// GET /songs/search
pub async fn search_songs(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<Value>> {
    let term = validate::required("Search query", query.q.as_deref())?;
    let data = songs::search_songs(&state.db, &term).await?;

    Ok(Json(json!({ "success": true, "data": data })))
}

#[derive(Debug, Deserialize)]
pub struct AlphabetQuery {
    pub letter: Option<String>,
}

/// GET /songs/alphabet
pub async fn songs_by_alphabet(
    State(state): State<AppState>,
    Query(query): Query<AlphabetQuery>,
) -> ApiResult<Json<Value>> {
    let letter = non_empty(query.letter);
    let data = songs::songs_by_letter(&state.db, letter.as_deref()).await?;

    Ok(Json(json!({ "success": true, "data": data })))
}

#[derive(Debug, Serialize)]
pub struct AlphabetGroup {
    pub alphabet: String,
    pub count: usize,
    pub songs: Vec<Song>,
}

/// Group songs by their Telugu alphabet bucket, the "other" bucket last
pub fn group_by_telugu_alphabet(all: Vec<Song>) -> Vec<AlphabetGroup> {
    let mut groups: BTreeMap<String, Vec<Song>> = BTreeMap::new();
    for song in all {
        groups.entry(song.telugu_alphabet.clone()).or_default().push(song);
    }

    let other = groups.remove(OTHER_ALPHABET);
    groups
        .into_iter()
        .chain(other.map(|songs| (OTHER_ALPHABET.to_string(), songs)))
        .map(|(alphabet, songs)| AlphabetGroup {
            alphabet,
            count: songs.len(),
            songs,
        })
        .collect()
}

/// GET /songs/telugu-alphabet
pub async fn songs_by_telugu_alphabet(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let all = songs::songs_by_letter(&state.db, None).await?;
    Ok(Json(json!({ "success": true, "data": group_by_telugu_alphabet(all) })))
}

#[derive(Debug, Deserialize)]
pub struct CategoryQuery {
    pub category: Option<String>,
}

/// GET /songs/category
pub async fn songs_by_category(
    State(state): State<AppState>,
    Query(query): Query<CategoryQuery>,
) -> ApiResult<Json<Value>> {
    let category = non_empty(query.category)
        .ok_or_else(|| ApiError::BadRequest("Category parameter is required".to_string()))?;
    let data = songs::songs_by_category(&state.db, &category).await?;

    Ok(Json(json!({ "success": true, "data": data })))
}

/// GET /songs/:id
pub async fn get_song(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Value>> {
    let song = songs::find_active_song(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Song not found".to_string()))?;

    Ok(Json(json!({ "success": true, "data": song })))
}

/// POST /songs/:id/share
pub async fn share_song(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Value>> {
    if songs::find_active_song(&state.db, &id).await?.is_none()
        || !songs::apply_counter(&state.db, &id, Counter::Share, 1).await?
    {
        return Err(ApiError::NotFound("Song not found".to_string()));
    }

    Ok(Json(json!({ "success": true, "message": "Song shared successfully" })))
}

// ========================================
// Video lookup
// ========================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YouTubeSearchQuery {
    #[serde(alias = "q")]
    pub query: Option<String>,
    pub max_results: Option<String>,
}

/// GET /songs/youtube/search
pub async fn search_youtube(
    State(state): State<AppState>,
    Query(query): Query<YouTubeSearchQuery>,
) -> ApiResult<Json<Value>> {
    let term = validate::required("Search query", query.query.as_deref())?;
    let max_results = match query.max_results.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        None => DEFAULT_YOUTUBE_RESULTS,
        Some(raw) => raw
            .parse::<u32>()
            .ok()
            .filter(|n| (1..=MAX_YOUTUBE_RESULTS).contains(n))
            .ok_or_else(|| {
                ApiError::BadRequest(format!("maxResults must be between 1 and {}", MAX_YOUTUBE_RESULTS))
            })?,
    };

    let videos = state.videos.search(&term, max_results).await?;
    Ok(Json(json!({ "success": true, "data": videos })))
}

/// GET /songs/youtube/:videoId
pub async fn get_youtube_video(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
) -> ApiResult<Json<Value>> {
    let video_id = validate::required("Video ID", Some(video_id.as_str()))?;
    let details = state.videos.details(&video_id).await?;

    Ok(Json(json!({ "success": true, "data": details })))
}

// ========================================
// Admin writes
// ========================================

/// POST /songs, /admin/songs
pub async fn create_song(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    ApiJson(fields): ApiJson<SongFields>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let song = new_song(fields, &admin.id)?;
    songs::insert_song(&state.db, &song).await?;
    info!(song_id = %song.id, admin = %admin.id, "Song created");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Song created successfully",
            "data": song,
        })),
    ))
}

/// PUT /songs/:id, /admin/songs/:id
pub async fn update_song(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
    ApiJson(fields): ApiJson<SongFields>,
) -> ApiResult<Json<Value>> {
    let mut song = songs::find_song(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Song not found".to_string()))?;

    apply_changes(&mut song, fields)?;
    songs::save_song(&state.db, &song).await?;
    info!(song_id = %id, admin = %admin.id, "Song updated");

    let song = songs::find_song(&state.db, &id).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Song updated successfully",
        "data": song,
    })))
}

#[derive(Debug, Deserialize)]
pub struct DeleteQuery {
    #[serde(default)]
    pub hard: bool,
}

/// DELETE /songs/:id, /admin/songs/:id
///
/// Soft delete by default; `?hard=true` removes the row and purges the song
/// from every user's ledger.
pub async fn delete_song(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
    Query(query): Query<DeleteQuery>,
) -> ApiResult<Json<Value>> {
    let mut event = activities::ActivityEvent::new(activities::SONG_DELETED);
    event.user_id = Some(admin.id.clone());
    event.song_id = Some(id.clone());

    let message = if query.hard {
        if songs::find_song(&state.db, &id).await?.is_none() {
            return Err(ApiError::NotFound("Song not found".to_string()));
        }

        // Row removal comes last so every earlier step can be repeated
        let purged = activity::purge_song_everywhere(&state.db, &id).await?;
        play_events::delete_for_song(&state.db, &id).await?;
        let song = songs::hard_delete(&state.db, &id).await?;
        if let Some(storage_id) = song.storage_id.as_deref() {
            if let Err(e) = state.media.delete(storage_id, MediaKind::Audio).await {
                warn!(song_id = %id, storage_id, error = %e, "Failed to delete hosted audio");
            }
        }

        info!(song_id = %id, admin = %admin.id, ledgers = purged, "Song permanently deleted");
        event.detail = json!({ "title": song.title, "hard": true, "ledgersPurged": purged });
        "Song permanently deleted"
    } else {
        songs::soft_delete(&state.db, &id).await?;
        info!(song_id = %id, admin = %admin.id, "Song deleted");
        event.detail = json!({ "hard": false });
        "Song deleted successfully"
    };

    if let Err(e) = activities::record(&state.db, &event).await {
        warn!(song_id = %id, error = %e, "Failed to record song deletion");
    }

    Ok(Json(json!({ "success": true, "message": message })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkYouTubeRequest {
    #[serde(alias = "youtubeURL")]
    pub youtube_url: Option<String>,
}

/// PUT /songs/:id/youtube
pub async fn link_youtube(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<LinkYouTubeRequest>,
) -> ApiResult<Json<Value>> {
    let url = validate::required("YouTube URL", req.youtube_url.as_deref())?;
    let video_id = youtube_id_for(&url)?;

    let mut song = songs::find_song(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Song not found".to_string()))?;

    let details = state.videos.details(&video_id).await?;

    song.youtube_id = Some(video_id.clone());
    song.youtube_url = Some(url.clone());
    song.thumbnail_url = Some(details.thumbnail_url.clone());
    if let Some(seconds) = parse_iso8601_duration(&details.duration) {
        song.duration = seconds;
    }
    songs::save_song(&state.db, &song).await?;
    info!(song_id = %id, video_id = %video_id, admin = %admin.id, "Video linked to song");

    Ok(Json(json!({
        "success": true,
        "message": "YouTube video linked successfully",
        "data": {
            "songId": id,
            "youtubeId": video_id,
            "youtubeUrl": url,
            "thumbnailUrl": song.thumbnail_url,
            "duration": song.duration,
        },
    })))
}

fn first_file(form: &mut UploadForm, missing: &str) -> ApiResult<UploadedFile> {
    if form.files.is_empty() {
        return Err(ApiError::BadRequest(missing.to_string()));
    }
    Ok(form.files.remove(0))
}

/// POST /songs/upload
///
/// Multipart with an `audio` file plus title, artist and category fields.
pub async fn upload_audio(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    multipart: Multipart,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let mut form = read_form(multipart, "audio", MediaKind::Audio, 1).await?;
    let file = first_file(&mut form, "No audio file provided")?;

    if form.text("title").is_none() || form.text("artist").is_none() || form.text("category").is_none() {
        return Err(ApiError::BadRequest(
            "Title, artist, and category are required".to_string(),
        ));
    }

    let size = file.bytes.len();
    let uploaded = state
        .media
        .upload(file.bytes, MediaKind::Audio, &file.filename)
        .await?;

    let fields = SongFields {
        title: form.text("title"),
        title_telugu: form.text("titleTelugu"),
        artist: form.text("artist"),
        category: form.text("category"),
        description: form.text("description"),
        lyrics: form.text("lyrics"),
        youtube_url: form.text("youtubeUrl"),
        audio_url: Some(uploaded.secure_url.clone()),
        storage_id: Some(uploaded.storage_id.clone()),
        duration: uploaded.duration.map(|d| d.round() as i64),
        ..Default::default()
    };

    let saved = match new_song(fields, &admin.id) {
        Ok(song) => songs::insert_song(&state.db, &song)
            .await
            .map(|_| song)
            .map_err(ApiError::from),
        Err(e) => Err(e),
    };
    let song = match saved {
        Ok(song) => song,
        Err(e) => {
            if let Err(del) = state.media.delete(&uploaded.storage_id, MediaKind::Audio).await {
                warn!(storage_id = %uploaded.storage_id, error = %del, "Failed to remove orphaned upload");
            }
            return Err(e);
        }
    };
    info!(song_id = %song.id, bytes = size, "Song uploaded");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Song uploaded successfully",
            "data": song,
        })),
    ))
}

/// POST /songs/upload-thumbnail
pub async fn upload_thumbnail(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    multipart: Multipart,
) -> ApiResult<Json<Value>> {
    let mut form = read_form(multipart, "thumbnail", MediaKind::Image, 1).await?;
    let file = first_file(&mut form, "No image file provided")?;

    let uploaded = state
        .media
        .upload(file.bytes, MediaKind::Image, &file.filename)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Thumbnail uploaded successfully",
        "data": {
            "url": uploaded.secure_url,
            "storageId": uploaded.storage_id,
        },
    })))
}

pub fn song_routes() -> Router<AppState> {
    Router::new()
        .route("/songs", get(list_songs).post(create_song))
        .route("/songs/search", get(search_songs))
        .route("/songs/alphabet", get(songs_by_alphabet))
        .route("/songs/telugu-alphabet", get(songs_by_telugu_alphabet))
        .route("/songs/category", get(songs_by_category))
        .route("/songs/upload", post(upload_audio))
        .route("/songs/upload-thumbnail", post(upload_thumbnail))
        .route("/songs/youtube/search", get(search_youtube))
        .route("/songs/youtube/:video_id", get(get_youtube_video))
        .route("/songs/:id", get(get_song).put(update_song).delete(delete_song))
        .route("/songs/:id/youtube", put(link_youtube))
        .route("/songs/:id/share", post(share_song))
}
