//! User activity ledger persistence
//!
//! Each row carries a `version`. Writers read `(lists, version)`, apply a
//! pure transform from `hermon_common::ledger`, then write back with
//! `WHERE version = ?`. A lost race surfaces as `Error::VersionConflict`
//! and the whole read-transform-write is retried.

use super::retry::{retry_on_conflict, DEFAULT_MAX_ATTEMPTS};
use super::{from_json, to_json};
use hermon_common::ledger::ActivityLedger;
use hermon_common::time::now_rfc3339;
use hermon_common::{Error, Result};
use sqlx::{Row, SqlitePool};
use tracing::{debug, info};

/// Ledger plus the version it was read at
#[derive(Debug, Clone)]
pub struct StoredLedger {
    pub ledger: ActivityLedger,
    pub version: i64,
}

/// Create an empty ledger for a new user (no-op if one exists)
pub async fn create_empty(pool: &SqlitePool, user_id: &str) -> Result<()> {
    sqlx::query(
        r#"
        INSERT OR IGNORE INTO user_activity (user_id, liked_songs, recently_played, version, updated_at)
        VALUES (?, '[]', '[]', 0, ?)
        "#,
    )
    .bind(user_id)
    .bind(now_rfc3339())
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn load(pool: &SqlitePool, user_id: &str) -> Result<Option<StoredLedger>> {
    let row = sqlx::query(
        "SELECT liked_songs, recently_played, version FROM user_activity WHERE user_id = ?",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let liked: String = row.get("liked_songs");
    let recent: String = row.get("recently_played");

    Ok(Some(StoredLedger {
        ledger: ActivityLedger {
            liked_songs: from_json("user_activity.liked_songs", &liked)?,
            recently_played: from_json("user_activity.recently_played", &recent)?,
        },
        version: row.get("version"),
    }))
}

/// Version-checked write
async fn store(pool: &SqlitePool, user_id: &str, ledger: &ActivityLedger, expected_version: i64) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE user_activity
        SET liked_songs = ?, recently_played = ?, version = version + 1, updated_at = ?
        WHERE user_id = ? AND version = ?
        "#,
    )
    .bind(to_json(&ledger.liked_songs)?)
    .bind(to_json(&ledger.recently_played)?)
    .bind(now_rfc3339())
    .bind(user_id)
    .bind(expected_version)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::VersionConflict(format!("user_activity/{}", user_id)));
    }
    Ok(())
}

/// Apply `transform` to a user's ledger with optimistic concurrency
///
/// The transform runs again on every retry against freshly read lists, so
/// validation (already liked, not liked) always sees current state.
pub async fn mutate<T, F>(pool: &SqlitePool, user_id: &str, transform: F) -> Result<T>
where
    F: Fn(&mut ActivityLedger) -> Result<T>,
{
    let transform = &transform;

    retry_on_conflict("user activity update", DEFAULT_MAX_ATTEMPTS, || async move {
        let stored = load(pool, user_id)
            .await?
            .ok_or_else(|| Error::NotFound("User activity not found".to_string()))?;

        let mut ledger = stored.ledger;
        let output = transform(&mut ledger)?;
        store(pool, user_id, &ledger, stored.version).await?;
        Ok(output)
    })
    .await
}

/// Remove a song from every user's ledger
///
/// Returns the number of ledgers changed.
pub async fn purge_song_everywhere(pool: &SqlitePool, song_id: &str) -> Result<usize> {
    let user_ids: Vec<String> = sqlx::query_scalar(
        r#"
        SELECT user_id FROM user_activity
        WHERE EXISTS (SELECT 1 FROM json_each(liked_songs) WHERE json_extract(value, '$.songId') = ?)
           OR EXISTS (SELECT 1 FROM json_each(recently_played) WHERE json_extract(value, '$.songId') = ?)
        "#,
    )
    .bind(song_id)
    .bind(song_id)
    .fetch_all(pool)
    .await?;

    let mut changed = 0;
    for batch in user_ids.chunks(100) {
        for user_id in batch {
            if mutate(pool, user_id, |ledger| Ok(ledger.purge_song(song_id))).await? {
                changed += 1;
            }
        }
        debug!(song_id, batch = batch.len(), "Purged song from ledger batch");
    }

    if changed > 0 {
        info!(song_id, users = changed, "Removed deleted song from user activity");
    }
    Ok(changed)
}
