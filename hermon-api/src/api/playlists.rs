//! Playlist endpoints
//!
//! Reads are public with optional authentication; admins additionally see
//! private playlists. Writes are admin-only and mounted under
//! `/admin/playlists`.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use hermon_common::api::Role;
use hermon_common::time::now_rfc3339;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use super::validate;
use crate::db::playlists::{self, Playlist, PlaylistType};
use crate::db::{songs, users};
use crate::error::{ApiError, ApiResult};
use crate::extractors::{AdminUser, ApiJson, MaybeAuthUser};
use crate::AppState;

pub const DEFAULT_ORDER: i64 = 999;
pub const PLACEHOLDER_COVER: &str = "https://via.placeholder.com/400x400?text=Playlist";
const MAX_SONGS: usize = 100;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistFields {
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(alias = "coverImageURL")]
    pub cover_image_url: Option<String>,
    pub song_ids: Option<Vec<String>>,
    #[serde(rename = "type")]
    pub playlist_type: Option<PlaylistType>,
    pub is_public: Option<bool>,
    pub order: Option<i64>,
}

impl PlaylistFields {
    fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.cover_image_url.is_none()
            && self.song_ids.is_none()
            && self.playlist_type.is_none()
            && self.is_public.is_none()
            && self.order.is_none()
    }
}

/// Listing entry without song ids
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistSummary {
    pub id: String,
    pub name: String,
    pub description: String,
    pub cover_image_url: String,
    pub song_count: i64,
    #[serde(rename = "type")]
    pub playlist_type: PlaylistType,
    pub is_public: bool,
    pub order: i64,
}

impl From<Playlist> for PlaylistSummary {
    fn from(p: Playlist) -> Self {
        Self {
            id: p.id,
            name: p.name,
            description: p.description,
            cover_image_url: p.cover_image_url,
            song_count: p.song_count,
            playlist_type: p.playlist_type,
            is_public: p.is_public,
            order: p.order,
        }
    }
}

/// A playlist entry hydrated from the catalog
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistSong {
    pub song_id: String,
    pub title: String,
    pub artist: String,
    pub thumbnail_url: Option<String>,
    pub duration: i64,
}

fn check_name(name: &str) -> ApiResult<String> {
    validate::text_in_range("Name", name, 1, 100)
}

fn check_song_ids(ids: Vec<String>) -> ApiResult<Vec<String>> {
    let ids: Vec<String> = ids.into_iter().map(|id| id.trim().to_string()).collect();
    if ids.is_empty() || ids.len() > MAX_SONGS {
        return Err(ApiError::BadRequest(format!(
            "Playlist must contain between 1 and {} songs",
            MAX_SONGS
        )));
    }
    if ids.iter().any(String::is_empty) {
        return Err(ApiError::BadRequest("Song ids must not be empty".to_string()));
    }
    Ok(ids)
}

/// Build a new playlist, applying defaults for absent fields
pub fn new_playlist(fields: PlaylistFields, created_by: &str) -> ApiResult<Playlist> {
    let name = check_name(fields.name.as_deref().unwrap_or(""))?;
    let description = validate::text_at_most("Description", fields.description.as_deref(), 200)?.unwrap_or_default();
    let song_ids = check_song_ids(fields.song_ids.unwrap_or_default())?;
    let now = now_rfc3339();

    Ok(Playlist {
        id: format!("playlist_{}", Uuid::new_v4()),
        name,
        description,
        cover_image_url: fields
            .cover_image_url
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| PLACEHOLDER_COVER.to_string()),
        song_count: song_ids.len() as i64,
        song_ids,
        playlist_type: fields.playlist_type.unwrap_or(PlaylistType::Curated),
        is_public: fields.is_public.unwrap_or(true),
        order: fields.order.unwrap_or(DEFAULT_ORDER),
        created_by: created_by.to_string(),
        created_at: now.clone(),
        updated_at: now,
    })
}

/// Apply a partial update; replacing the ids recomputes the count
pub fn apply_changes(playlist: &mut Playlist, fields: PlaylistFields) -> ApiResult<()> {
    if fields.is_empty() {
        return Err(ApiError::BadRequest("No fields to update".to_string()));
    }

    if let Some(name) = fields.name {
        playlist.name = check_name(&name)?;
    }
    if let Some(description) = validate::text_at_most("Description", fields.description.as_deref(), 200)? {
        playlist.description = description;
    }
    if let Some(cover) = fields.cover_image_url {
        playlist.cover_image_url = cover;
    }
    if let Some(ids) = fields.song_ids {
        playlist.song_ids = check_song_ids(ids)?;
        playlist.song_count = playlist.song_ids.len() as i64;
    }
    if let Some(kind) = fields.playlist_type {
        playlist.playlist_type = kind;
    }
    if let Some(is_public) = fields.is_public {
        playlist.is_public = is_public;
    }
    if let Some(order) = fields.order {
        playlist.order = order;
    }
    Ok(())
}

async fn caller_is_admin(state: &AppState, caller: &MaybeAuthUser) -> ApiResult<bool> {
    let Some(auth) = &caller.0 else {
        return Ok(false);
    };
    Ok(users::find_by_id(&state.db, &auth.user_id)
        .await?
        .is_some_and(|u| u.role == Role::Admin))
}

/// GET /playlists
pub async fn list_playlists(State(state): State<AppState>, caller: MaybeAuthUser) -> ApiResult<Json<Value>> {
    let all = if caller_is_admin(&state, &caller).await? {
        playlists::list_all(&state.db).await?
    } else {
        playlists::list_public(&state.db).await?
    };
    let data: Vec<PlaylistSummary> = all.into_iter().map(Into::into).collect();

    Ok(Json(json!({ "success": true, "data": data })))
}

/// GET /playlists/:id
///
/// Songs come back in playlist order; missing or inactive ones are
/// dropped while the stored song count is reported as is.
pub async fn get_playlist(
    State(state): State<AppState>,
    caller: MaybeAuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let not_found = || ApiError::NotFound("Playlist not found".to_string());

    let playlist = playlists::find_playlist(&state.db, &id).await?.ok_or_else(not_found)?;
    if !playlist.is_public && !caller_is_admin(&state, &caller).await? {
        return Err(not_found());
    }

    let found = songs::fetch_active_by_ids(&state.db, &playlist.song_ids).await?;
    let songs: Vec<PlaylistSong> = playlist
        .song_ids
        .iter()
        .filter_map(|song_id| found.get(song_id))
        .map(|song| PlaylistSong {
            song_id: song.id.clone(),
            title: song.title.clone(),
            artist: song.artist.clone(),
            thumbnail_url: song.thumbnail_url.clone(),
            duration: song.duration,
        })
        .collect();

    Ok(Json(json!({
        "success": true,
        "data": {
            "id": playlist.id,
            "name": playlist.name,
            "description": playlist.description,
            "coverImageUrl": playlist.cover_image_url,
            "type": playlist.playlist_type,
            "isPublic": playlist.is_public,
            "order": playlist.order,
            "songCount": playlist.song_count,
            "songs": songs,
        },
    })))
}

/// GET /admin/playlists
pub async fn list_all_playlists(State(state): State<AppState>, _admin: AdminUser) -> ApiResult<Json<Value>> {
    let data = playlists::list_all(&state.db).await?;
    Ok(Json(json!({ "success": true, "data": data })))
}

/// POST /admin/playlists
pub async fn create_playlist(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    ApiJson(fields): ApiJson<PlaylistFields>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let playlist = new_playlist(fields, &admin.id)?;
    playlists::insert_playlist(&state.db, &playlist).await?;
    info!(playlist_id = %playlist.id, admin = %admin.id, "Playlist created");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Playlist created successfully",
            "data": playlist,
        })),
    ))
}

/// PUT /admin/playlists/:id
pub async fn update_playlist(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
    ApiJson(fields): ApiJson<PlaylistFields>,
) -> ApiResult<Json<Value>> {
    let mut playlist = playlists::find_playlist(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Playlist not found".to_string()))?;

    apply_changes(&mut playlist, fields)?;
    playlists::save_playlist(&state.db, &playlist).await?;
    info!(playlist_id = %id, admin = %admin.id, "Playlist updated");

    Ok(Json(json!({
        "success": true,
        "message": "Playlist updated successfully",
        "data": playlist,
    })))
}

/// DELETE /admin/playlists/:id
pub async fn delete_playlist(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    playlists::delete_playlist(&state.db, &id).await?;
    info!(playlist_id = %id, admin = %admin.id, "Playlist deleted");

    Ok(Json(json!({ "success": true, "message": "Playlist deleted successfully" })))
}

pub fn playlist_routes() -> Router<AppState> {
    Router::new()
        .route("/playlists", get(list_playlists))
        .route("/playlists/:id", get(get_playlist))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(list: &[&str]) -> Option<Vec<String>> {
        Some(list.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_defaults() {
        let playlist = new_playlist(
            PlaylistFields {
                name: Some("Morning".to_string()),
                song_ids: ids(&["a", "b"]),
                ..Default::default()
            },
            "admin",
        )
        .unwrap();

        assert!(playlist.id.starts_with("playlist_"));
        assert_eq!(playlist.order, DEFAULT_ORDER);
        assert!(playlist.is_public);
        assert_eq!(playlist.playlist_type, PlaylistType::Curated);
        assert_eq!(playlist.cover_image_url, PLACEHOLDER_COVER);
        assert_eq!(playlist.song_count, 2);
    }

    #[test]
    fn test_song_id_bounds() {
        let empty = PlaylistFields {
            name: Some("Empty".to_string()),
            song_ids: Some(vec![]),
            ..Default::default()
        };
        assert!(new_playlist(empty, "admin").is_err());

        let too_many = PlaylistFields {
            name: Some("Big".to_string()),
            song_ids: Some((0..101).map(|i| i.to_string()).collect()),
            ..Default::default()
        };
        assert!(new_playlist(too_many, "admin").is_err());
    }

    #[test]
    fn test_replacing_ids_recomputes_count() {
        let mut playlist = new_playlist(
            PlaylistFields {
                name: Some("P".to_string()),
                song_ids: ids(&["a"]),
                ..Default::default()
            },
            "admin",
        )
        .unwrap();

        apply_changes(
            &mut playlist,
            PlaylistFields {
                song_ids: ids(&["x", "y", "x"]),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(playlist.song_count, 3);

        assert!(apply_changes(&mut playlist, PlaylistFields::default()).is_err());
    }

    #[test]
    fn test_unknown_type_rejected() {
        let parsed: Result<PlaylistFields, _> = serde_json::from_value(json!({ "type": "smart" }));
        assert!(parsed.is_err());
    }
}
