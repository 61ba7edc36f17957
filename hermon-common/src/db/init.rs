//! Database initialization
//!
//! Creates the SQLite file on first run and brings the schema up with
//! idempotent `CREATE TABLE IF NOT EXISTS` statements. List-shaped
//! attributes (tags, playlist song ids, ledger lists, permissions) are
//! stored as JSON text.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// Settings key holding the church information document
pub const CHURCH_INFO_KEY: &str = "church_info";

/// Settings key holding the app configuration document
pub const APP_CONFIG_KEY: &str = "app_config";

/// How long a connection waits on a locked database before giving up
const BUSY_TIMEOUT: Duration = Duration::from_millis(5000);

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    // Pragmas are per connection; every pooled connection gets them
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(BUSY_TIMEOUT)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_schema(&pool).await?;

    Ok(pool)
}

/// Single-connection in-memory database with the full schema
///
/// Every connection to `sqlite::memory:` is a separate database, so the
/// pool is pinned to one connection.
pub async fn connect_memory() -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;

    create_schema(&pool).await?;
    Ok(pool)
}

/// Create all tables and indexes (idempotent)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_users_table(pool).await?;
    create_user_activity_table(pool).await?;
    create_songs_table(pool).await?;
    create_playlists_table(pool).await?;
    create_categories_table(pool).await?;
    create_gallery_images_table(pool).await?;
    create_settings_table(pool).await?;
    create_activities_table(pool).await?;
    create_play_events_table(pool).await?;
    Ok(())
}

async fn create_users_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            password_hash TEXT,
            auth_provider TEXT NOT NULL DEFAULT 'email',
            provider_subject TEXT UNIQUE,
            display_name TEXT NOT NULL,
            photo_url TEXT,
            role TEXT NOT NULL DEFAULT 'user' CHECK (role IN ('user', 'admin')),
            permissions TEXT NOT NULL DEFAULT '{}',
            fcm_token TEXT,
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            last_login_at TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_user_activity_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS user_activity (
            user_id TEXT PRIMARY KEY REFERENCES users(id),
            liked_songs TEXT NOT NULL DEFAULT '[]',
            recently_played TEXT NOT NULL DEFAULT '[]',
            version INTEGER NOT NULL DEFAULT 0,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_songs_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS songs (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            title_telugu TEXT,
            artist TEXT NOT NULL,
            album TEXT,
            lyrics TEXT NOT NULL DEFAULT '',
            lyrics_telugu TEXT,
            language TEXT NOT NULL DEFAULT 'telugu',
            description TEXT NOT NULL DEFAULT '',
            duration INTEGER NOT NULL DEFAULT 0,
            youtube_id TEXT,
            youtube_url TEXT,
            audio_url TEXT,
            storage_id TEXT,
            thumbnail_url TEXT,
            category TEXT NOT NULL,
            category_telugu TEXT,
            telugu_alphabet TEXT NOT NULL,
            tags TEXT NOT NULL DEFAULT '[]',
            like_count INTEGER NOT NULL DEFAULT 0 CHECK (like_count >= 0),
            share_count INTEGER NOT NULL DEFAULT 0 CHECK (share_count >= 0),
            play_count INTEGER NOT NULL DEFAULT 0 CHECK (play_count >= 0),
            is_active INTEGER NOT NULL DEFAULT 1,
            created_by TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_songs_category ON songs(category, is_active)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_songs_title ON songs(title COLLATE NOCASE)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_playlists_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS playlists (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            cover_image_url TEXT NOT NULL,
            song_ids TEXT NOT NULL DEFAULT '[]',
            song_count INTEGER NOT NULL DEFAULT 0,
            playlist_type TEXT NOT NULL DEFAULT 'curated'
                CHECK (playlist_type IN ('curated', 'auto', 'featured')),
            is_public INTEGER NOT NULL DEFAULT 1,
            sort_order INTEGER NOT NULL DEFAULT 999,
            created_by TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_categories_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS categories (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            name_telugu TEXT NOT NULL DEFAULT '',
            description TEXT NOT NULL DEFAULT '',
            description_telugu TEXT NOT NULL DEFAULT '',
            icon TEXT NOT NULL DEFAULT 'music',
            color TEXT NOT NULL DEFAULT '#9C27B0',
            sort_order INTEGER NOT NULL DEFAULT 0,
            song_count INTEGER NOT NULL DEFAULT 0,
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_gallery_images_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS gallery_images (
            id TEXT PRIMARY KEY,
            url TEXT NOT NULL,
            storage_id TEXT,
            title TEXT NOT NULL DEFAULT '',
            title_telugu TEXT NOT NULL DEFAULT '',
            description TEXT NOT NULL DEFAULT '',
            description_telugu TEXT NOT NULL DEFAULT '',
            sort_order INTEGER NOT NULL DEFAULT 0,
            is_active INTEGER NOT NULL DEFAULT 1,
            uploaded_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Key/value store for singleton JSON documents
async fn create_settings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_activities_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS activities (
            id TEXT PRIMARY KEY,
            kind TEXT NOT NULL,
            user_id TEXT,
            email TEXT,
            song_id TEXT,
            detail TEXT NOT NULL DEFAULT '{}',
            timestamp TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_activities_timestamp ON activities(timestamp)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_play_events_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS play_events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id TEXT NOT NULL,
            song_id TEXT NOT NULL,
            played_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_play_events_user ON play_events(user_id, song_id)")
        .execute(pool)
        .await?;

    Ok(())
}
