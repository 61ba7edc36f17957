//! HTTP API handlers for hermon-api
//!
//! Each module exposes a `*_routes()` builder; [`v1_routes`] merges them for
//! mounting under `/api/v1`.

pub mod activity;
pub mod admin;
pub mod auth;
pub mod categories;
pub mod church;
pub mod health;
pub mod playlists;
pub mod songs;
pub mod uploads;
pub mod user_activity;
pub mod users;
pub mod validate;

use axum::Router;

use crate::AppState;

pub use health::{health_routes, root_routes};

/// Every route served below `/api/v1`
pub fn v1_routes() -> Router<AppState> {
    Router::new()
        .merge(auth::auth_routes())
        .merge(users::user_routes())
        .merge(activity::activity_routes())
        .merge(user_activity::user_activity_routes())
        .merge(songs::song_routes())
        .merge(playlists::playlist_routes())
        .merge(categories::category_routes())
        .merge(church::church_routes())
        .merge(admin::admin_routes())
}
