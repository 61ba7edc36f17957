//! Song category endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use hermon_common::time::now_rfc3339;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use super::validate;
use crate::db::categories::{self, Category};
use crate::db::songs;
use crate::error::{ApiError, ApiResult};
use crate::extractors::{AdminUser, ApiJson};
use crate::AppState;

const DEFAULT_ICON: &str = "music";
const DEFAULT_COLOR: &str = "#1976D2";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryFields {
    pub name: Option<String>,
    pub name_telugu: Option<String>,
    pub description: Option<String>,
    pub description_telugu: Option<String>,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub order: Option<i64>,
    pub is_active: Option<bool>,
}

fn not_found() -> ApiError {
    ApiError::NotFound("Category not found".to_string())
}

/// GET /categories
pub async fn list_categories(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let data = categories::list_active(&state.db).await?;
    Ok(Json(json!({ "success": true, "data": data })))
}

/// GET /categories/:id
pub async fn get_category(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Value>> {
    let category = categories::find_category(&state.db, &id).await?.ok_or_else(not_found)?;
    Ok(Json(json!({ "success": true, "data": category })))
}

/// POST /categories
pub async fn create_category(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    ApiJson(fields): ApiJson<CategoryFields>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let name = validate::text_in_range("Name", fields.name.as_deref().unwrap_or(""), 1, 50)?;
    let now = now_rfc3339();

    let category = Category {
        id: format!("category_{}", Uuid::new_v4()),
        name_telugu: fields.name_telugu.unwrap_or_else(|| name.clone()),
        name,
        description: fields.description.unwrap_or_default(),
        description_telugu: fields.description_telugu.unwrap_or_default(),
        icon: fields.icon.unwrap_or_else(|| DEFAULT_ICON.to_string()),
        color: fields.color.unwrap_or_else(|| DEFAULT_COLOR.to_string()),
        order: fields.order.unwrap_or(0),
        song_count: 0,
        is_active: fields.is_active.unwrap_or(true),
        created_at: now.clone(),
        updated_at: now,
    };

    categories::insert_category(&state.db, &category).await?;
    info!(category_id = %category.id, admin = %admin.id, "Category created");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Category created successfully",
            "data": category,
        })),
    ))
}

/// PUT /categories/:id
pub async fn update_category(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
    ApiJson(fields): ApiJson<CategoryFields>,
) -> ApiResult<Json<Value>> {
    let mut category = categories::find_category(&state.db, &id).await?.ok_or_else(not_found)?;

    if let Some(name) = fields.name {
        category.name = validate::text_in_range("Name", &name, 1, 50)?;
    }
    if let Some(v) = fields.name_telugu {
        category.name_telugu = v;
    }
    if let Some(v) = fields.description {
        category.description = v;
    }
    if let Some(v) = fields.description_telugu {
        category.description_telugu = v;
    }
    if let Some(v) = fields.icon {
        category.icon = v;
    }
    if let Some(v) = fields.color {
        category.color = v;
    }
    if let Some(v) = fields.order {
        category.order = v;
    }
    if let Some(v) = fields.is_active {
        category.is_active = v;
    }

    categories::save_category(&state.db, &category).await?;
    info!(category_id = %id, admin = %admin.id, "Category updated");

    Ok(Json(json!({
        "success": true,
        "message": "Category updated successfully",
        "data": category,
    })))
}

/// DELETE /categories/:id
pub async fn delete_category(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    categories::soft_delete(&state.db, &id).await?;
    info!(category_id = %id, admin = %admin.id, "Category deleted");

    Ok(Json(json!({ "success": true, "message": "Category deleted successfully" })))
}

/// POST /categories/:id/recount
///
/// Recomputes the song count from active songs carrying the category name.
pub async fn recount_category(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let category = categories::find_category(&state.db, &id).await?.ok_or_else(not_found)?;
    let count = songs::count_active_in_category(&state.db, &category.name).await?;
    categories::set_song_count(&state.db, &id, count).await?;

    Ok(Json(json!({
        "success": true,
        "data": { "id": id, "songCount": count },
    })))
}

pub fn category_routes() -> Router<AppState> {
    Router::new()
        .route("/categories", get(list_categories).post(create_category))
        .route(
            "/categories/:id",
            get(get_category).put(update_category).delete(delete_category),
        )
        .route("/categories/:id/recount", post(recount_category))
}
