//! Append-only audit events

use super::{from_json, to_json};
use hermon_common::time::now_rfc3339;
use hermon_common::Result;
use serde::Serialize;
use serde_json::Value;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

pub const PASSWORD_RESET_REQUESTED: &str = "password_reset_requested";
pub const ROLE_CHANGED: &str = "role_changed";
pub const SONG_DELETED: &str = "song_deleted";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub user_id: Option<String>,
    pub email: Option<String>,
    pub song_id: Option<String>,
    pub detail: Value,
    pub timestamp: String,
}

impl ActivityEvent {
    pub fn new(kind: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind: kind.to_string(),
            user_id: None,
            email: None,
            song_id: None,
            detail: Value::Object(Default::default()),
            timestamp: now_rfc3339(),
        }
    }
}

pub async fn record(pool: &SqlitePool, event: &ActivityEvent) -> Result<()> {
    sqlx::query(
        "INSERT INTO activities (id, kind, user_id, email, song_id, detail, timestamp) VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&event.id)
    .bind(&event.kind)
    .bind(&event.user_id)
    .bind(&event.email)
    .bind(&event.song_id)
    .bind(to_json(&event.detail)?)
    .bind(&event.timestamp)
    .execute(pool)
    .await?;

    Ok(())
}

/// Most recent events first
pub async fn list_recent(pool: &SqlitePool, limit: i64) -> Result<Vec<ActivityEvent>> {
    let rows = sqlx::query(
        "SELECT id, kind, user_id, email, song_id, detail, timestamp FROM activities ORDER BY timestamp DESC LIMIT ?",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| {
            let detail: String = row.get("detail");
            Ok(ActivityEvent {
                id: row.get("id"),
                kind: row.get("kind"),
                user_id: row.get("user_id"),
                email: row.get("email"),
                song_id: row.get("song_id"),
                detail: from_json("activities.detail", &detail)?,
                timestamp: row.get("timestamp"),
            })
        })
        .collect()
}

pub async fn count(pool: &SqlitePool) -> Result<i64> {
    Ok(sqlx::query_scalar("SELECT COUNT(*) FROM activities")
        .fetch_one(pool)
        .await?)
}
