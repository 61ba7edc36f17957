//! Church info, gallery and app configuration endpoints

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use hermon_common::time::now_rfc3339;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{info, warn};
use uuid::Uuid;

use super::uploads::read_form;
use super::validate;
use crate::db::gallery::{self, GalleryImage};
use crate::db::settings::{self, Document};
use crate::error::{ApiError, ApiResult};
use crate::extractors::{AdminUser, ApiJson};
use crate::services::cloudinary_client::MAX_IMAGES_PER_BATCH;
use crate::services::MediaKind;
use crate::AppState;

/// Drop bookkeeping keys clients may echo back
fn clean_patch(mut patch: Map<String, Value>) -> ApiResult<Map<String, Value>> {
    patch.remove("id");
    patch.remove("updatedAt");
    if patch.is_empty() {
        return Err(ApiError::BadRequest("No fields to update".to_string()));
    }
    Ok(patch)
}

// ========================================
// Church info
// ========================================

/// GET /church/info
pub async fn get_church_info(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let data = settings::get_document(&state.db, Document::ChurchInfo).await?;
    Ok(Json(json!({ "success": true, "data": data })))
}

/// PUT /church/info
pub async fn update_church_info(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    ApiJson(patch): ApiJson<Map<String, Value>>,
) -> ApiResult<Json<Value>> {
    let data = settings::merge_document(&state.db, Document::ChurchInfo, clean_patch(patch)?).await?;
    info!(admin = %admin.id, "Church info updated");

    Ok(Json(json!({
        "success": true,
        "message": "Church info updated successfully",
        "data": data,
    })))
}

// ========================================
// Gallery
// ========================================

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryFields {
    pub url: Option<String>,
    pub storage_id: Option<String>,
    pub title: Option<String>,
    pub title_telugu: Option<String>,
    pub description: Option<String>,
    pub description_telugu: Option<String>,
    pub order: Option<i64>,
}

fn new_image(url: String, storage_id: Option<String>, fields: GalleryFields) -> GalleryImage {
    let now = now_rfc3339();
    GalleryImage {
        id: Uuid::new_v4().to_string(),
        url,
        storage_id,
        title: fields.title.unwrap_or_default(),
        title_telugu: fields.title_telugu.unwrap_or_default(),
        description: fields.description.unwrap_or_default(),
        description_telugu: fields.description_telugu.unwrap_or_default(),
        order: fields.order.unwrap_or(0),
        is_active: true,
        uploaded_at: now.clone(),
        updated_at: now,
    }
}

/// GET /church/gallery
pub async fn get_gallery(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let data = gallery::list_ordered(&state.db).await?;
    Ok(Json(json!({ "success": true, "data": data })))
}

/// GET /gallery
pub async fn get_recent_gallery(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let data = gallery::list_recent(&state.db).await?;
    Ok(Json(json!({ "success": true, "data": data })))
}

/// POST /church/gallery
pub async fn add_gallery_image(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    ApiJson(mut fields): ApiJson<GalleryFields>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let url = validate::required("Image URL", fields.url.take().as_deref())?;
    let storage_id = fields.storage_id.take();
    let image = new_image(url, storage_id, fields);

    gallery::insert_image(&state.db, &image).await?;
    info!(image_id = %image.id, admin = %admin.id, "Gallery image added");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Gallery image added",
            "data": image,
        })),
    ))
}

/// PUT /church/gallery/:id
pub async fn update_gallery_image(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<String>,
    ApiJson(fields): ApiJson<GalleryFields>,
) -> ApiResult<Json<Value>> {
    let mut image = gallery::find_image(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Image not found".to_string()))?;

    if let Some(url) = fields.url {
        image.url = validate::required("Image URL", Some(url.as_str()))?;
    }
    if let Some(v) = fields.storage_id {
        image.storage_id = Some(v);
    }
    if let Some(v) = fields.title {
        image.title = v;
    }
    if let Some(v) = fields.title_telugu {
        image.title_telugu = v;
    }
    if let Some(v) = fields.description {
        image.description = v;
    }
    if let Some(v) = fields.description_telugu {
        image.description_telugu = v;
    }
    if let Some(v) = fields.order {
        image.order = v;
    }

    gallery::save_image(&state.db, &image).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Gallery image updated",
        "data": image,
    })))
}

/// DELETE /church/gallery/:id
pub async fn delete_gallery_image(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    gallery::soft_delete(&state.db, &id).await?;
    Ok(Json(json!({ "success": true, "message": "Gallery image deleted" })))
}

/// POST /church/gallery/upload
///
/// Multipart with up to five `images` files, each stored as a gallery entry.
pub async fn upload_gallery_images(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    multipart: Multipart,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let form = read_form(multipart, "images", MediaKind::Image, MAX_IMAGES_PER_BATCH).await?;
    if form.files.is_empty() {
        return Err(ApiError::BadRequest("No image files provided".to_string()));
    }

    let title = form.text("title");
    let mut created = Vec::with_capacity(form.files.len());

    for file in form.files {
        let uploaded = state.media.upload(file.bytes, MediaKind::Image, &file.filename).await?;

        let image = new_image(
            uploaded.secure_url,
            Some(uploaded.storage_id.clone()),
            GalleryFields {
                title: title.clone(),
                ..Default::default()
            },
        );
        if let Err(e) = gallery::insert_image(&state.db, &image).await {
            warn!(storage_id = %uploaded.storage_id, error = %e, "Gallery insert failed after upload");
            if let Err(del) = state.media.delete(&uploaded.storage_id, MediaKind::Image).await {
                warn!(storage_id = %uploaded.storage_id, error = %del, "Failed to remove orphaned upload");
            }
            return Err(e.into());
        }
        created.push(image);
    }

    info!(count = created.len(), admin = %admin.id, "Gallery images uploaded");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": format!("{} image(s) uploaded successfully", created.len()),
            "data": created,
        })),
    ))
}

// ========================================
// App configuration
// ========================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeRequest {
    pub primary_color: Option<String>,
    pub secondary_color: Option<String>,
    pub accent_color: Option<String>,
    pub theme: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IconRequest {
    pub icon_url: Option<String>,
}

/// GET /church/config
pub async fn get_app_config(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let data = settings::get_document(&state.db, Document::AppConfig).await?;
    Ok(Json(json!({ "success": true, "data": data })))
}

/// PUT /church/config
pub async fn update_app_config(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiJson(patch): ApiJson<Map<String, Value>>,
) -> ApiResult<Json<Value>> {
    let data = settings::merge_document(&state.db, Document::AppConfig, clean_patch(patch)?).await?;

    Ok(Json(json!({
        "success": true,
        "message": "App config updated successfully",
        "data": data,
    })))
}

/// PUT /church/config/theme
pub async fn update_theme(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiJson(req): ApiJson<ThemeRequest>,
) -> ApiResult<Json<Value>> {
    let mut patch = Map::new();
    let fields = [
        ("primaryColor", req.primary_color),
        ("secondaryColor", req.secondary_color),
        ("accentColor", req.accent_color),
        ("theme", req.theme),
    ];
    for (key, value) in fields {
        if let Some(v) = value {
            patch.insert(key.to_string(), Value::String(v));
        }
    }

    let data = settings::merge_document(&state.db, Document::AppConfig, clean_patch(patch)?).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Theme updated successfully",
        "data": data,
    })))
}

/// PUT /church/config/icon
pub async fn update_icon(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiJson(req): ApiJson<IconRequest>,
) -> ApiResult<Json<Value>> {
    let icon_url = validate::required("Icon URL", req.icon_url.as_deref())?;

    let mut patch = Map::new();
    patch.insert("appIcon".to_string(), Value::String(icon_url));
    let data = settings::merge_document(&state.db, Document::AppConfig, patch).await?;

    Ok(Json(json!({
        "success": true,
        "message": "App icon updated successfully",
        "data": data,
    })))
}

pub fn church_routes() -> Router<AppState> {
    Router::new()
        .route("/church/info", get(get_church_info).put(update_church_info))
        .route("/church/gallery", get(get_gallery).post(add_gallery_image))
        .route("/church/gallery/upload", post(upload_gallery_images))
        .route(
            "/church/gallery/:id",
            put(update_gallery_image).delete(delete_gallery_image),
        )
        .route("/church/config", get(get_app_config).put(update_app_config))
        .route("/church/config/theme", put(update_theme))
        .route("/church/config/icon", put(update_icon))
        .route("/gallery", get(get_recent_gallery))
}
