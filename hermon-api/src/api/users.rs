//! Caller profile under `/users/me`

use axum::{routing::get, Router};

use super::auth::{get_profile, update_profile};
use crate::AppState;

pub fn user_routes() -> Router<AppState> {
    Router::new().route("/users/me", get(get_profile).put(update_profile))
}
