//! Playlist persistence

use super::{from_json, to_json};
use hermon_common::time::now_rfc3339;
use hermon_common::{Error, Result};
use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaylistType {
    Curated,
    Auto,
    Featured,
}

impl PlaylistType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlaylistType::Curated => "curated",
            PlaylistType::Auto => "auto",
            PlaylistType::Featured => "featured",
        }
    }

    fn parse(s: &str) -> Result<Self> {
        match s {
            "curated" => Ok(PlaylistType::Curated),
            "auto" => Ok(PlaylistType::Auto),
            "featured" => Ok(PlaylistType::Featured),
            other => Err(Error::Internal(format!("Unknown playlist type: {}", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Playlist {
    pub id: String,
    pub name: String,
    pub description: String,
    pub cover_image_url: String,
    pub song_ids: Vec<String>,
    pub song_count: i64,
    #[serde(rename = "type")]
    pub playlist_type: PlaylistType,
    pub is_public: bool,
    pub order: i64,
    pub created_by: String,
    pub created_at: String,
    pub updated_at: String,
}

const PLAYLIST_COLUMNS: &str = "id, name, description, cover_image_url, song_ids, song_count, \
     playlist_type, is_public, sort_order, created_by, created_at, updated_at";

fn row_to_playlist(row: &SqliteRow) -> Result<Playlist> {
    let song_ids: String = row.get("song_ids");
    let playlist_type: String = row.get("playlist_type");

    Ok(Playlist {
        id: row.get("id"),
        name: row.get("name"),
        description: row.get("description"),
        cover_image_url: row.get("cover_image_url"),
        song_ids: from_json("playlists.song_ids", &song_ids)?,
        song_count: row.get("song_count"),
        playlist_type: PlaylistType::parse(&playlist_type)?,
        is_public: row.get("is_public"),
        order: row.get("sort_order"),
        created_by: row.get("created_by"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

pub async fn insert_playlist(pool: &SqlitePool, playlist: &Playlist) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO playlists (
            id, name, description, cover_image_url, song_ids, song_count, playlist_type,
            is_public, sort_order, created_by, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&playlist.id)
    .bind(&playlist.name)
    .bind(&playlist.description)
    .bind(&playlist.cover_image_url)
    .bind(to_json(&playlist.song_ids)?)
    .bind(playlist.song_count)
    .bind(playlist.playlist_type.as_str())
    .bind(playlist.is_public)
    .bind(playlist.order)
    .bind(&playlist.created_by)
    .bind(&playlist.created_at)
    .bind(&playlist.updated_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Write back every editable field
///
/// The caller keeps `song_count` in step with `song_ids`.
pub async fn save_playlist(pool: &SqlitePool, playlist: &Playlist) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE playlists SET
            name = ?, description = ?, cover_image_url = ?, song_ids = ?, song_count = ?,
            playlist_type = ?, is_public = ?, sort_order = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&playlist.name)
    .bind(&playlist.description)
    .bind(&playlist.cover_image_url)
    .bind(to_json(&playlist.song_ids)?)
    .bind(playlist.song_count)
    .bind(playlist.playlist_type.as_str())
    .bind(playlist.is_public)
    .bind(playlist.order)
    .bind(now_rfc3339())
    .bind(&playlist.id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound("Playlist not found".to_string()));
    }
    Ok(())
}

pub async fn find_playlist(pool: &SqlitePool, id: &str) -> Result<Option<Playlist>> {
    let sql = format!("SELECT {} FROM playlists WHERE id = ?", PLAYLIST_COLUMNS);
    let row = sqlx::query(&sql).bind(id).fetch_optional(pool).await?;

    row.as_ref().map(row_to_playlist).transpose()
}

/// Public playlists by display order
pub async fn list_public(pool: &SqlitePool) -> Result<Vec<Playlist>> {
    let sql = format!(
        "SELECT {} FROM playlists WHERE is_public = 1 ORDER BY sort_order ASC, created_at ASC",
        PLAYLIST_COLUMNS
    );
    let rows = sqlx::query(&sql).fetch_all(pool).await?;
    rows.iter().map(row_to_playlist).collect()
}

/// Every playlist, including private ones
pub async fn list_all(pool: &SqlitePool) -> Result<Vec<Playlist>> {
    let sql = format!(
        "SELECT {} FROM playlists ORDER BY sort_order ASC, created_at ASC",
        PLAYLIST_COLUMNS
    );
    let rows = sqlx::query(&sql).fetch_all(pool).await?;
    rows.iter().map(row_to_playlist).collect()
}

pub async fn delete_playlist(pool: &SqlitePool, id: &str) -> Result<()> {
    let result = sqlx::query("DELETE FROM playlists WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound("Playlist not found".to_string()));
    }
    Ok(())
}

pub async fn count_playlists(pool: &SqlitePool) -> Result<i64> {
    Ok(sqlx::query_scalar("SELECT COUNT(*) FROM playlists")
        .fetch_one(pool)
        .await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hermon_common::db::connect_memory;

    fn playlist(id: &str, order: i64, is_public: bool) -> Playlist {
        let now = now_rfc3339();
        Playlist {
            id: id.to_string(),
            name: id.to_string(),
            description: String::new(),
            cover_image_url: "https://example.org/cover.jpg".to_string(),
            song_ids: vec!["a".to_string(), "b".to_string(), "a".to_string()],
            song_count: 3,
            playlist_type: PlaylistType::Curated,
            is_public,
            order,
            created_by: "admin".to_string(),
            created_at: now.clone(),
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_roundtrip_keeps_duplicate_ids_in_order() {
        let pool = connect_memory().await.unwrap();
        insert_playlist(&pool, &playlist("p1", 1, true)).await.unwrap();

        let loaded = find_playlist(&pool, "p1").await.unwrap().unwrap();
        assert_eq!(loaded.song_ids, vec!["a", "b", "a"]);
        assert_eq!(loaded.playlist_type, PlaylistType::Curated);
    }

    #[tokio::test]
    async fn test_public_listing_sorted_by_order() {
        let pool = connect_memory().await.unwrap();
        insert_playlist(&pool, &playlist("late", 5, true)).await.unwrap();
        insert_playlist(&pool, &playlist("early", 1, true)).await.unwrap();
        insert_playlist(&pool, &playlist("private", 0, false)).await.unwrap();

        let public = list_public(&pool).await.unwrap();
        assert_eq!(
            public.iter().map(|p| p.id.as_str()).collect::<Vec<_>>(),
            vec!["early", "late"]
        );
        assert_eq!(list_all(&pool).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_type_serializes_as_type_field() {
        let json = serde_json::to_value(playlist("p", 0, true)).unwrap();
        assert_eq!(json["type"], "curated");
        assert_eq!(json["songCount"], 3);
    }
}
