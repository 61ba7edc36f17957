//! Database operations for hermon-api
//!
//! One module per table. Functions take `&SqlitePool` and return
//! `hermon_common::Result`; handlers convert into `ApiError`.

pub mod activities;
pub mod activity;
pub mod categories;
pub mod gallery;
pub mod play_events;
pub mod playlists;
pub mod retry;
pub mod settings;
pub mod songs;
pub mod users;

use hermon_common::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Decode a JSON text column
pub(crate) fn from_json<T: DeserializeOwned>(column: &str, raw: &str) -> Result<T> {
    serde_json::from_str(raw)
        .map_err(|e| Error::Internal(format!("Corrupt JSON in column {}: {}", column, e)))
}

/// Encode a value for a JSON text column
pub(crate) fn to_json<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

/// Map a unique-constraint violation onto `Error::Conflict`
pub(crate) fn conflict_on_unique(err: sqlx::Error, message: &str) -> Error {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            Error::Conflict(message.to_string())
        }
        _ => Error::Database(err),
    }
}
