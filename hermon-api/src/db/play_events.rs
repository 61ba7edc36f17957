//! Per-play history used for "top played"

use hermon_common::time::now_rfc3339;
use hermon_common::Result;
use sqlx::SqlitePool;

pub async fn record_play(pool: &SqlitePool, user_id: &str, song_id: &str) -> Result<()> {
    sqlx::query("INSERT INTO play_events (user_id, song_id, played_at) VALUES (?, ?, ?)")
        .bind(user_id)
        .bind(song_id)
        .bind(now_rfc3339())
        .execute(pool)
        .await?;

    Ok(())
}

/// `(song_id, plays)` for one user, most played first
///
/// Ties go to the most recently played song.
pub async fn top_played(pool: &SqlitePool, user_id: &str, limit: i64) -> Result<Vec<(String, i64)>> {
    Ok(sqlx::query_as(
        r#"
        SELECT song_id, COUNT(*) AS plays
        FROM play_events
        WHERE user_id = ?
        GROUP BY song_id
        ORDER BY plays DESC, MAX(played_at) DESC
        LIMIT ?
        "#,
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(pool)
    .await?)
}

pub async fn delete_for_song(pool: &SqlitePool, song_id: &str) -> Result<()> {
    sqlx::query("DELETE FROM play_events WHERE song_id = ?")
        .bind(song_id)
        .execute(pool)
        .await?;

    Ok(())
}
