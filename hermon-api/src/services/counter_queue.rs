//! Best-effort counter updates
//!
//! Handlers enqueue counter deltas and return immediately. One background
//! task drains the channel and applies each delta as a single atomic
//! `UPDATE`. Failures are logged, never surfaced to the caller.

use crate::db::songs::{self, Counter};
use sqlx::SqlitePool;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounterUpdate {
    pub song_id: String,
    pub counter: Counter,
    pub delta: i64,
}

/// Sending half of the counter channel
#[derive(Clone)]
pub struct CounterQueue {
    tx: mpsc::UnboundedSender<CounterUpdate>,
}

impl CounterQueue {
    /// Spawn the drain task and return the queue plus its handle
    ///
    /// The task ends once every `CounterQueue` clone is dropped.
    pub fn start(pool: SqlitePool) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(drain(pool, rx));
        (Self { tx }, handle)
    }

    pub fn enqueue(&self, song_id: &str, counter: Counter, delta: i64) {
        let update = CounterUpdate {
            song_id: song_id.to_string(),
            counter,
            delta,
        };

        if let Err(e) = self.tx.send(update) {
            warn!(song_id = %e.0.song_id, "Counter queue closed, dropping update");
        }
    }
}

async fn drain(pool: SqlitePool, mut rx: mpsc::UnboundedReceiver<CounterUpdate>) {
    while let Some(update) = rx.recv().await {
        match songs::apply_counter(&pool, &update.song_id, update.counter, update.delta).await {
            Ok(true) => debug!(song_id = %update.song_id, counter = ?update.counter, delta = update.delta, "Counter applied"),
            Ok(false) => warn!(song_id = %update.song_id, counter = ?update.counter, "Counter update for missing song"),
            Err(e) => warn!(song_id = %update.song_id, counter = ?update.counter, error = %e, "Counter update failed"),
        }
    }
    debug!("Counter queue drained and closed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::songs::tests::sample_song;
    use hermon_common::db::connect_memory;

    #[tokio::test]
    async fn test_updates_applied_in_order_and_floored() {
        let pool = connect_memory().await.unwrap();
        songs::insert_song(&pool, &sample_song("s1", "A")).await.unwrap();

        let (queue, handle) = CounterQueue::start(pool.clone());
        queue.enqueue("s1", Counter::Like, 1);
        queue.enqueue("s1", Counter::Like, -1);
        queue.enqueue("s1", Counter::Like, -1);
        queue.enqueue("s1", Counter::Share, 1);
        queue.enqueue("missing", Counter::Play, 1);
        drop(queue);
        handle.await.unwrap();

        let song = songs::find_song(&pool, "s1").await.unwrap().unwrap();
        assert_eq!(song.like_count, 0);
        assert_eq!(song.share_count, 1);
    }
}
