//! Song catalog persistence
//!
//! Counters are only ever changed through [`apply_counter`], a single
//! atomic `UPDATE`; full-record writes never touch them.

use super::{from_json, to_json};
use hermon_common::time::now_rfc3339;
use hermon_common::{Error, Result};
use serde::Serialize;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use std::collections::HashMap;

/// Bucket for titles that do not start with a Telugu letter
pub const OTHER_ALPHABET: &str = "ఇతర";

/// Maximum ids per `IN (...)` lookup
pub const ID_CHUNK_SIZE: usize = 10;

/// Canonical song record
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Song {
    pub id: String,
    pub title: String,
    pub title_telugu: Option<String>,
    pub artist: String,
    pub album: Option<String>,
    pub lyrics: String,
    pub lyrics_telugu: Option<String>,
    pub language: String,
    pub description: String,
    pub duration: i64,
    pub youtube_id: Option<String>,
    pub youtube_url: Option<String>,
    pub audio_url: Option<String>,
    pub storage_id: Option<String>,
    pub thumbnail_url: Option<String>,
    pub category: String,
    pub category_telugu: Option<String>,
    pub telugu_alphabet: String,
    pub tags: Vec<String>,
    pub like_count: i64,
    pub share_count: i64,
    pub play_count: i64,
    pub is_active: bool,
    pub created_by: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Counter columns adjustable through [`apply_counter`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Counter {
    Like,
    Share,
    Play,
}

impl Counter {
    fn column(&self) -> &'static str {
        match self {
            Counter::Like => "like_count",
            Counter::Share => "share_count",
            Counter::Play => "play_count",
        }
    }
}

/// Filters for the paginated listing
#[derive(Debug, Clone, Default)]
pub struct SongQuery {
    pub category: Option<String>,
    pub search: Option<String>,
    pub limit: i64,
    pub offset: i64,
}

/// Derive the alphabet bucket from a localized title
///
/// The first character is used when it is a Telugu vowel or consonant
/// (U+0C05..=U+0C39); anything else lands in [`OTHER_ALPHABET`].
pub fn telugu_alphabet(title_telugu: Option<&str>) -> String {
    match title_telugu.and_then(|t| t.chars().next()) {
        Some(c) if ('\u{0C05}'..='\u{0C39}').contains(&c) => c.to_string(),
        _ => OTHER_ALPHABET.to_string(),
    }
}

const SONG_COLUMNS: &str = "id, title, title_telugu, artist, album, lyrics, lyrics_telugu, language, \
     description, duration, youtube_id, youtube_url, audio_url, storage_id, thumbnail_url, category, \
     category_telugu, telugu_alphabet, tags, like_count, share_count, play_count, is_active, \
     created_by, created_at, updated_at";

fn row_to_song(row: &SqliteRow) -> Result<Song> {
    let tags: String = row.get("tags");

    Ok(Song {
        id: row.get("id"),
        title: row.get("title"),
        title_telugu: row.get("title_telugu"),
        artist: row.get("artist"),
        album: row.get("album"),
        lyrics: row.get("lyrics"),
        lyrics_telugu: row.get("lyrics_telugu"),
        language: row.get("language"),
        description: row.get("description"),
        duration: row.get("duration"),
        youtube_id: row.get("youtube_id"),
        youtube_url: row.get("youtube_url"),
        audio_url: row.get("audio_url"),
        storage_id: row.get("storage_id"),
        thumbnail_url: row.get("thumbnail_url"),
        category: row.get("category"),
        category_telugu: row.get("category_telugu"),
        telugu_alphabet: row.get("telugu_alphabet"),
        tags: from_json("songs.tags", &tags)?,
        like_count: row.get("like_count"),
        share_count: row.get("share_count"),
        play_count: row.get("play_count"),
        is_active: row.get("is_active"),
        created_by: row.get("created_by"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

/// Insert a fully-formed song (id assigned by the caller)
pub async fn insert_song(pool: &SqlitePool, song: &Song) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO songs (
            id, title, title_telugu, artist, album, lyrics, lyrics_telugu, language,
            description, duration, youtube_id, youtube_url, audio_url, storage_id, thumbnail_url,
            category, category_telugu, telugu_alphabet, tags, like_count, share_count, play_count,
            is_active, created_by, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&song.id)
    .bind(&song.title)
    .bind(&song.title_telugu)
    .bind(&song.artist)
    .bind(&song.album)
    .bind(&song.lyrics)
    .bind(&song.lyrics_telugu)
    .bind(&song.language)
    .bind(&song.description)
    .bind(song.duration)
    .bind(&song.youtube_id)
    .bind(&song.youtube_url)
    .bind(&song.audio_url)
    .bind(&song.storage_id)
    .bind(&song.thumbnail_url)
    .bind(&song.category)
    .bind(&song.category_telugu)
    .bind(&song.telugu_alphabet)
    .bind(to_json(&song.tags)?)
    .bind(song.like_count)
    .bind(song.share_count)
    .bind(song.play_count)
    .bind(song.is_active)
    .bind(&song.created_by)
    .bind(&song.created_at)
    .bind(&song.updated_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Write back every editable field of an existing song
///
/// Counters, `created_by` and `created_at` are left as stored.
pub async fn save_song(pool: &SqlitePool, song: &Song) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE songs SET
            title = ?, title_telugu = ?, artist = ?, album = ?, lyrics = ?, lyrics_telugu = ?,
            language = ?, description = ?, duration = ?, youtube_id = ?, youtube_url = ?,
            audio_url = ?, storage_id = ?, thumbnail_url = ?, category = ?, category_telugu = ?,
            telugu_alphabet = ?, tags = ?, is_active = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&song.title)
    .bind(&song.title_telugu)
    .bind(&song.artist)
    .bind(&song.album)
    .bind(&song.lyrics)
    .bind(&song.lyrics_telugu)
    .bind(&song.language)
    .bind(&song.description)
    .bind(song.duration)
    .bind(&song.youtube_id)
    .bind(&song.youtube_url)
    .bind(&song.audio_url)
    .bind(&song.storage_id)
    .bind(&song.thumbnail_url)
    .bind(&song.category)
    .bind(&song.category_telugu)
    .bind(&song.telugu_alphabet)
    .bind(to_json(&song.tags)?)
    .bind(song.is_active)
    .bind(now_rfc3339())
    .bind(&song.id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound("Song not found".to_string()));
    }
    Ok(())
}

/// Load a song regardless of its active flag
pub async fn find_song(pool: &SqlitePool, id: &str) -> Result<Option<Song>> {
    let sql = format!("SELECT {} FROM songs WHERE id = ?", SONG_COLUMNS);
    let row = sqlx::query(&sql).bind(id).fetch_optional(pool).await?;

    row.as_ref().map(row_to_song).transpose()
}

/// Load an active song
pub async fn find_active_song(pool: &SqlitePool, id: &str) -> Result<Option<Song>> {
    Ok(find_song(pool, id).await?.filter(|s| s.is_active))
}

/// Batch-fetch active songs by id in chunks of [`ID_CHUNK_SIZE`]
///
/// Missing and inactive ids are simply absent from the result.
pub async fn fetch_active_by_ids(pool: &SqlitePool, ids: &[String]) -> Result<HashMap<String, Song>> {
    let mut unique: Vec<&String> = Vec::with_capacity(ids.len());
    for id in ids {
        if !unique.contains(&id) {
            unique.push(id);
        }
    }

    let mut songs = HashMap::with_capacity(unique.len());

    for chunk in unique.chunks(ID_CHUNK_SIZE) {
        let placeholders = vec!["?"; chunk.len()].join(", ");
        let sql = format!(
            "SELECT {} FROM songs WHERE is_active = 1 AND id IN ({})",
            SONG_COLUMNS, placeholders
        );

        let mut query = sqlx::query(&sql);
        for id in chunk {
            query = query.bind(id.as_str());
        }

        for row in query.fetch_all(pool).await? {
            let song = row_to_song(&row)?;
            songs.insert(song.id.clone(), song);
        }
    }

    Ok(songs)
}

/// Mark inactive; succeeds again on an already inactive song
pub async fn soft_delete(pool: &SqlitePool, id: &str) -> Result<()> {
    let result = sqlx::query("UPDATE songs SET is_active = 0, updated_at = ? WHERE id = ?")
        .bind(now_rfc3339())
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound("Song not found".to_string()));
    }
    Ok(())
}

/// Remove the row, returning what was deleted
pub async fn hard_delete(pool: &SqlitePool, id: &str) -> Result<Song> {
    let song = find_song(pool, id)
        .await?
        .ok_or_else(|| Error::NotFound("Song not found".to_string()))?;

    sqlx::query("DELETE FROM songs WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(song)
}

/// Case-insensitive substring match; both sides folded with Unicode rules
fn contains_folded(haystack: &str, needle_folded: &str) -> bool {
    haystack.to_lowercase().contains(needle_folded)
}

impl Song {
    /// Whether `term` (already lowercased) occurs in any searchable text
    fn matches_search(&self, term: &str) -> bool {
        contains_folded(&self.title, term)
            || self.title_telugu.as_deref().is_some_and(|t| contains_folded(t, term))
            || contains_folded(&self.artist, term)
            || contains_folded(&self.lyrics, term)
            || self.lyrics_telugu.as_deref().is_some_and(|t| contains_folded(t, term))
            || self.tags.iter().any(|t| contains_folded(t, term))
    }
}

/// Active songs, optionally in one category, sorted by title
async fn active_songs(pool: &SqlitePool, category: Option<&str>) -> Result<Vec<Song>> {
    let sql = format!(
        r#"
        SELECT {} FROM songs
        WHERE is_active = 1 AND (? IS NULL OR category = ?)
        ORDER BY title COLLATE NOCASE ASC, id ASC
        "#,
        SONG_COLUMNS
    );

    let rows = sqlx::query(&sql)
        .bind(category)
        .bind(category)
        .fetch_all(pool)
        .await?;
    rows.iter().map(row_to_song).collect()
}

/// Paginated listing of active songs sorted by title
///
/// Returns the page and the total number of matches. A search term matches
/// title or artist, case-insensitively.
pub async fn list_songs(pool: &SqlitePool, query: &SongQuery) -> Result<(Vec<Song>, i64)> {
    let Some(term) = query.search.as_deref().map(str::to_lowercase) else {
        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM songs WHERE is_active = 1 AND (? IS NULL OR category = ?)")
                .bind(&query.category)
                .bind(&query.category)
                .fetch_one(pool)
                .await?;

        let sql = format!(
            r#"
            SELECT {} FROM songs
            WHERE is_active = 1 AND (? IS NULL OR category = ?)
            ORDER BY title COLLATE NOCASE ASC, id ASC LIMIT ? OFFSET ?
            "#,
            SONG_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(&query.category)
            .bind(&query.category)
            .bind(query.limit)
            .bind(query.offset)
            .fetch_all(pool)
            .await?;

        let songs = rows.iter().map(row_to_song).collect::<Result<Vec<_>>>()?;
        return Ok((songs, total));
    };

    let matching: Vec<Song> = active_songs(pool, query.category.as_deref())
        .await?
        .into_iter()
        .filter(|song| contains_folded(&song.title, &term) || contains_folded(&song.artist, &term))
        .collect();

    let total = matching.len() as i64;
    let page = matching
        .into_iter()
        .skip(usize::try_from(query.offset).unwrap_or(usize::MAX))
        .take(usize::try_from(query.limit).unwrap_or(0))
        .collect();
    Ok((page, total))
}

/// Substring search over titles, artist, lyrics and tags
pub async fn search_songs(pool: &SqlitePool, term: &str) -> Result<Vec<Song>> {
    let term = term.to_lowercase();
    Ok(active_songs(pool, None)
        .await?
        .into_iter()
        .filter(|song| song.matches_search(&term))
        .collect())
}

/// Active songs whose title starts with `letter` (or all, when absent)
pub async fn songs_by_letter(pool: &SqlitePool, letter: Option<&str>) -> Result<Vec<Song>> {
    let songs = active_songs(pool, None).await?;
    let Some(prefix) = letter.map(str::to_lowercase) else {
        return Ok(songs);
    };

    Ok(songs
        .into_iter()
        .filter(|song| song.title.to_lowercase().starts_with(&prefix))
        .collect())
}

/// Active songs in a category, newest first
pub async fn songs_by_category(pool: &SqlitePool, category: &str) -> Result<Vec<Song>> {
    let sql = format!(
        "SELECT {} FROM songs WHERE is_active = 1 AND category = ? ORDER BY created_at DESC",
        SONG_COLUMNS
    );

    let rows = sqlx::query(&sql).bind(category).fetch_all(pool).await?;
    rows.iter().map(row_to_song).collect()
}

/// Atomically add `delta` to a counter, flooring at zero
///
/// Returns false when the song does not exist.
pub async fn apply_counter(pool: &SqlitePool, id: &str, counter: Counter, delta: i64) -> Result<bool> {
    let sql = format!(
        "UPDATE songs SET {col} = MAX({col} + ?, 0) WHERE id = ?",
        col = counter.column()
    );

    let result = sqlx::query(&sql).bind(delta).bind(id).execute(pool).await?;
    Ok(result.rows_affected() > 0)
}

pub async fn count_active(pool: &SqlitePool) -> Result<i64> {
    Ok(sqlx::query_scalar("SELECT COUNT(*) FROM songs WHERE is_active = 1")
        .fetch_one(pool)
        .await?)
}

pub async fn count_active_in_category(pool: &SqlitePool, category: &str) -> Result<i64> {
    Ok(
        sqlx::query_scalar("SELECT COUNT(*) FROM songs WHERE is_active = 1 AND category = ?")
            .bind(category)
            .fetch_one(pool)
            .await?,
    )
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use hermon_common::db::connect_memory;

    pub(crate) fn sample_song(id: &str, title: &str) -> Song {
        let now = now_rfc3339();
        Song {
            id: id.to_string(),
            title: title.to_string(),
            title_telugu: None,
            artist: "Artist".to_string(),
            album: None,
            lyrics: String::new(),
            lyrics_telugu: None,
            language: "telugu".to_string(),
            description: String::new(),
            duration: 180,
            youtube_id: None,
            youtube_url: None,
            audio_url: None,
            storage_id: None,
            thumbnail_url: None,
            category: "worship".to_string(),
            category_telugu: None,
            telugu_alphabet: OTHER_ALPHABET.to_string(),
            tags: vec![],
            like_count: 0,
            share_count: 0,
            play_count: 0,
            is_active: true,
            created_by: "admin".to_string(),
            created_at: now.clone(),
            updated_at: now,
        }
    }

    #[test]
    fn test_telugu_alphabet_derivation() {
        assert_eq!(telugu_alphabet(Some("యేసు నా")), "య");
        assert_eq!(telugu_alphabet(Some("అద్భుత")), "అ");
        assert_eq!(telugu_alphabet(Some("Jesus")), OTHER_ALPHABET);
        assert_eq!(telugu_alphabet(Some("")), OTHER_ALPHABET);
        assert_eq!(telugu_alphabet(None), OTHER_ALPHABET);
        // Vowel sign, not a letter
        assert_eq!(telugu_alphabet(Some("\u{0C3E}")), OTHER_ALPHABET);
    }

    #[tokio::test]
    async fn test_chunked_fetch_filters_inactive_and_missing() {
        let pool = connect_memory().await.unwrap();
        let mut ids = Vec::new();
        for i in 0..25 {
            let mut song = sample_song(&format!("song_{}", i), &format!("Title {}", i));
            song.is_active = i != 3;
            insert_song(&pool, &song).await.unwrap();
            ids.push(song.id);
        }
        ids.push("song_missing".to_string());
        ids.push("song_0".to_string());

        let found = fetch_active_by_ids(&pool, &ids).await.unwrap();
        assert_eq!(found.len(), 24);
        assert!(!found.contains_key("song_3"));
        assert!(!found.contains_key("song_missing"));
    }

    #[tokio::test]
    async fn test_counter_floors_at_zero() {
        let pool = connect_memory().await.unwrap();
        insert_song(&pool, &sample_song("s1", "A")).await.unwrap();

        assert!(apply_counter(&pool, "s1", Counter::Like, -1).await.unwrap());
        assert!(apply_counter(&pool, "s1", Counter::Play, 1).await.unwrap());
        assert!(!apply_counter(&pool, "nope", Counter::Like, 1).await.unwrap());

        let song = find_song(&pool, "s1").await.unwrap().unwrap();
        assert_eq!(song.like_count, 0);
        assert_eq!(song.play_count, 1);
    }

    #[tokio::test]
    async fn test_soft_delete_idempotent() {
        let pool = connect_memory().await.unwrap();
        insert_song(&pool, &sample_song("s1", "A")).await.unwrap();

        soft_delete(&pool, "s1").await.unwrap();
        soft_delete(&pool, "s1").await.unwrap();

        assert!(find_active_song(&pool, "s1").await.unwrap().is_none());
        assert!(!find_song(&pool, "s1").await.unwrap().unwrap().is_active);
        assert!(matches!(soft_delete(&pool, "nope").await, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_list_filters_sorts_and_counts() {
        let pool = connect_memory().await.unwrap();
        for (id, title, artist) in [
            ("s1", "grace", "Anna"),
            ("s2", "Amazing", "Ben"),
            ("s3", "Blessed", "Grace Choir"),
            ("s4", "Hidden", "Ben"),
        ] {
            let mut song = sample_song(id, title);
            song.artist = artist.to_string();
            song.is_active = id != "s4";
            insert_song(&pool, &song).await.unwrap();
        }

        let (page, total) = list_songs(
            &pool,
            &SongQuery {
                search: Some("GRACE".to_string()),
                limit: 10,
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(total, 2);
        assert_eq!(
            page.iter().map(|s| s.id.as_str()).collect::<Vec<_>>(),
            vec!["s3", "s1"]
        );

        let (page, total) = list_songs(&pool, &SongQuery { limit: 1, offset: 1, ..Default::default() })
            .await
            .unwrap();
        assert_eq!(total, 3);
        assert_eq!(page[0].title, "Blessed");
    }

    #[tokio::test]
    async fn test_search_covers_lyrics_and_tags() {
        let pool = connect_memory().await.unwrap();
        let mut a = sample_song("s1", "One");
        a.lyrics = "hallelujah chorus".to_string();
        let mut b = sample_song("s2", "Two");
        b.tags = vec!["christmas".to_string()];
        insert_song(&pool, &a).await.unwrap();
        insert_song(&pool, &b).await.unwrap();

        assert_eq!(search_songs(&pool, "hallelujah").await.unwrap()[0].id, "s1");
        assert_eq!(search_songs(&pool, "christ").await.unwrap()[0].id, "s2");
        assert!(search_songs(&pool, "nothing").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_folds_non_ascii_case() {
        let pool = connect_memory().await.unwrap();
        let mut song = sample_song("s1", "Éternel Amour");
        song.artist = "Chœur Ünited".to_string();
        insert_song(&pool, &song).await.unwrap();

        assert_eq!(search_songs(&pool, "éternel").await.unwrap().len(), 1);
        assert_eq!(search_songs(&pool, "ÜNITED").await.unwrap().len(), 1);

        let (page, total) = list_songs(
            &pool,
            &SongQuery {
                search: Some("éternel".to_string()),
                limit: 10,
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(total, 1);
        assert_eq!(page[0].id, "s1");

        assert_eq!(songs_by_letter(&pool, Some("é")).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_search_page_beyond_end_is_empty() {
        let pool = connect_memory().await.unwrap();
        insert_song(&pool, &sample_song("s1", "Grace")).await.unwrap();

        let (page, total) = list_songs(
            &pool,
            &SongQuery {
                search: Some("grace".to_string()),
                limit: 10,
                offset: i64::MAX,
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(total, 1);
        assert!(page.is_empty());
    }

    #[tokio::test]
    async fn test_songs_by_letter_case_insensitive() {
        let pool = connect_memory().await.unwrap();
        insert_song(&pool, &sample_song("s1", "abide")).await.unwrap();
        insert_song(&pool, &sample_song("s2", "Amen")).await.unwrap();
        insert_song(&pool, &sample_song("s3", "Bread")).await.unwrap();

        let a = songs_by_letter(&pool, Some("a")).await.unwrap();
        assert_eq!(a.len(), 2);
        assert_eq!(songs_by_letter(&pool, None).await.unwrap().len(), 3);
    }
}
