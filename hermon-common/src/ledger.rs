//! Per-user activity ledger
//!
//! Two bounded lists kept most-recent-first by construction:
//! - liked songs: no duplicate song ids, capped at [`MAX_LIKED_SONGS`]
//! - recently played: deduplicated on insert (move to front), capped at
//!   [`MAX_RECENTLY_PLAYED`]
//!
//! Everything here is pure. Persistence and optimistic-concurrency retries
//! live in the service crate; these transforms are re-applied on every retry.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Maximum number of liked songs retained per user
pub const MAX_LIKED_SONGS: usize = 500;

/// Maximum number of recently played songs retained per user
pub const MAX_RECENTLY_PLAYED: usize = 50;

/// A liked song reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikedEntry {
    pub song_id: String,
    pub liked_at: String,
}

/// A recently played song reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayedEntry {
    pub song_id: String,
    pub played_at: String,
}

/// Rejections raised by ledger transforms
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("Song already liked")]
    AlreadyLiked(String),

    #[error("Song was not liked")]
    NotLiked(String),
}

impl From<LedgerError> for crate::Error {
    fn from(err: LedgerError) -> Self {
        crate::Error::InvalidInput(err.to_string())
    }
}

/// The liked / recently played lists of one user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityLedger {
    #[serde(default)]
    pub liked_songs: Vec<LikedEntry>,
    #[serde(default)]
    pub recently_played: Vec<PlayedEntry>,
}

impl ActivityLedger {
    pub fn is_liked(&self, song_id: &str) -> bool {
        self.liked_songs.iter().any(|e| e.song_id == song_id)
    }

    /// Prepend a like, dropping the oldest entries beyond the cap
    pub fn like(&mut self, song_id: &str, liked_at: &str) -> Result<(), LedgerError> {
        if self.is_liked(song_id) {
            return Err(LedgerError::AlreadyLiked(song_id.to_string()));
        }

        self.liked_songs.insert(
            0,
            LikedEntry {
                song_id: song_id.to_string(),
                liked_at: liked_at.to_string(),
            },
        );
        self.liked_songs.truncate(MAX_LIKED_SONGS);
        Ok(())
    }

    pub fn unlike(&mut self, song_id: &str) -> Result<(), LedgerError> {
        let before = self.liked_songs.len();
        self.liked_songs.retain(|e| e.song_id != song_id);

        if self.liked_songs.len() == before {
            return Err(LedgerError::NotLiked(song_id.to_string()));
        }
        Ok(())
    }

    /// Move `song_id` to the front of the recently played list
    pub fn track_play(&mut self, song_id: &str, played_at: &str) {
        self.recently_played.retain(|e| e.song_id != song_id);
        self.recently_played.insert(
            0,
            PlayedEntry {
                song_id: song_id.to_string(),
                played_at: played_at.to_string(),
            },
        );
        self.recently_played.truncate(MAX_RECENTLY_PLAYED);
    }

    /// Remove every reference to `song_id`; returns true if anything changed
    pub fn purge_song(&mut self, song_id: &str) -> bool {
        let before = self.liked_songs.len() + self.recently_played.len();
        self.liked_songs.retain(|e| e.song_id != song_id);
        self.recently_played.retain(|e| e.song_id != song_id);
        before != self.liked_songs.len() + self.recently_played.len()
    }

    pub fn liked_song_ids(&self) -> Vec<String> {
        self.liked_songs.iter().map(|e| e.song_id.clone()).collect()
    }

    pub fn recently_played_ids(&self) -> Vec<String> {
        self.recently_played.iter().map(|e| e.song_id.clone()).collect()
    }
}

/// Join ordered references against a lookup of fetched records
///
/// Output follows the order of `entries`. Entries whose record is absent
/// from `records` (missing or inactive) are dropped silently.
pub fn join_ordered<E, R, O>(
    entries: &[E],
    records: &HashMap<String, R>,
    key: impl Fn(&E) -> &str,
    project: impl Fn(&E, &R) -> O,
) -> Vec<O> {
    entries
        .iter()
        .filter_map(|entry| records.get(key(entry)).map(|record| project(entry, record)))
        .collect()
}
