//! Admin endpoints
//!
//! Song and playlist writes reuse the catalog handlers. Role changes need
//! the `manageUsers` permission and the audit log needs `viewActivities`.

use axum::{
    extract::{Path, Query, State},
    routing::{get, post, put},
    Json, Router,
};
use hermon_common::api::{Permission, Permissions, Role};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::str::FromStr;
use tracing::{info, warn};

use super::{playlists, songs as song_api};
use crate::db::{activities, playlists as playlist_db, songs, users};
use crate::error::{ApiError, ApiResult};
use crate::extractors::{AdminUser, ApiJson, Authorized, ManageUsers, ViewActivities};
use crate::AppState;

const DEFAULT_ACTIVITY_LIMIT: i64 = 100;
const MAX_ACTIVITY_LIMIT: i64 = 500;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: String,
    pub email: String,
    pub display_name: String,
    pub role: Role,
    pub is_active: bool,
    pub created_at: String,
}

impl From<users::User> for UserSummary {
    fn from(u: users::User) -> Self {
        Self {
            id: u.id,
            email: u.email,
            display_name: u.display_name,
            role: u.role,
            is_active: u.is_active,
            created_at: u.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RoleRequest {
    pub role: Option<String>,
    pub permissions: Option<Permissions>,
}

#[derive(Debug, Deserialize)]
pub struct ActivityQuery {
    pub limit: Option<String>,
}

/// Check every permission key is one the policy knows
pub fn check_permission_keys(permissions: &Permissions) -> ApiResult<()> {
    match permissions
        .keys()
        .find(|key| !Permission::ALL.iter().any(|p| p.key() == key.as_str()))
    {
        Some(unknown) => Err(ApiError::BadRequest(format!("Unknown permission '{}'", unknown))),
        None => Ok(()),
    }
}

/// GET /admin/users
pub async fn list_users(State(state): State<AppState>, _admin: AdminUser) -> ApiResult<Json<Value>> {
    let data: Vec<UserSummary> = users::list_users(&state.db)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();

    Ok(Json(json!({ "success": true, "count": data.len(), "data": data })))
}

/// GET /admin/users/:id
pub async fn get_user(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let user = users::find_by_id(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(json!({ "success": true, "data": user })))
}

/// PUT /admin/users/:id/role
///
/// Demotion to `user` clears permission flags; promotion keeps existing
/// flags unless new ones are given.
pub async fn update_user_role(
    State(state): State<AppState>,
    caller: Authorized<ManageUsers>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<RoleRequest>,
) -> ApiResult<Json<Value>> {
    let role = req
        .role
        .as_deref()
        .and_then(|r| Role::from_str(r).ok())
        .ok_or_else(|| ApiError::BadRequest("Invalid role. Must be \"user\" or \"admin\"".to_string()))?;

    let target = users::find_by_id(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let permissions = match (role, req.permissions) {
        (Role::User, _) => Permissions::new(),
        (Role::Admin, Some(given)) => {
            check_permission_keys(&given)?;
            given
        }
        (Role::Admin, None) => target.permissions.clone(),
    };

    let updated = users::update_role(&state.db, &id, role, &permissions).await?;
    info!(user_id = %id, role = %role, admin = %caller.user.id, "User role updated");

    let mut event = activities::ActivityEvent::new(activities::ROLE_CHANGED);
    event.user_id = Some(caller.user.id.clone());
    event.email = Some(updated.email.clone());
    event.detail = json!({
        "targetUserId": id,
        "from": target.role,
        "to": role,
    });
    if let Err(e) = activities::record(&state.db, &event).await {
        warn!(user_id = %id, error = %e, "Failed to record role change");
    }

    Ok(Json(json!({
        "success": true,
        "message": "User role updated successfully",
        "data": updated,
    })))
}

/// GET /admin/statistics
pub async fn get_statistics(State(state): State<AppState>, _admin: AdminUser) -> ApiResult<Json<Value>> {
    let total_songs = songs::count_active(&state.db).await?;
    let total_users = users::count_users(&state.db).await?;
    let total_playlists = playlist_db::count_playlists(&state.db).await?;
    let total_activities = activities::count(&state.db).await?;

    Ok(Json(json!({
        "success": true,
        "data": {
            "totalSongs": total_songs,
            "totalUsers": total_users,
            "totalPlaylists": total_playlists,
            "totalActivities": total_activities,
        },
    })))
}

/// GET /admin/activities
pub async fn list_activities(
    State(state): State<AppState>,
    _caller: Authorized<ViewActivities>,
    Query(query): Query<ActivityQuery>,
) -> ApiResult<Json<Value>> {
    let limit = match query.limit.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        None => DEFAULT_ACTIVITY_LIMIT,
        Some(raw) => raw
            .parse::<i64>()
            .ok()
            .filter(|n| (1..=MAX_ACTIVITY_LIMIT).contains(n))
            .ok_or_else(|| {
                ApiError::BadRequest(format!("limit must be an integer between 1 and {}", MAX_ACTIVITY_LIMIT))
            })?,
    };

    let data = activities::list_recent(&state.db, limit).await?;
    Ok(Json(json!({ "success": true, "count": data.len(), "data": data })))
}

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/songs", post(song_api::create_song))
        .route(
            "/admin/songs/:id",
            put(song_api::update_song).delete(song_api::delete_song),
        )
        .route(
            "/admin/playlists",
            get(playlists::list_all_playlists).post(playlists::create_playlist),
        )
        .route(
            "/admin/playlists/:id",
            put(playlists::update_playlist).delete(playlists::delete_playlist),
        )
        .route("/admin/users", get(list_users))
        .route("/admin/users/:id", get(get_user))
        .route("/admin/users/:id/role", put(update_user_role))
        .route("/admin/statistics", get(get_statistics))
        .route("/admin/activities", get(list_activities))
}
