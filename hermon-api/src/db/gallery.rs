//! Church gallery persistence

use hermon_common::time::now_rfc3339;
use hermon_common::{Error, Result};
use serde::Serialize;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryImage {
    pub id: String,
    pub url: String,
    pub storage_id: Option<String>,
    pub title: String,
    pub title_telugu: String,
    pub description: String,
    pub description_telugu: String,
    pub order: i64,
    pub is_active: bool,
    pub uploaded_at: String,
    pub updated_at: String,
}

const IMAGE_COLUMNS: &str = "id, url, storage_id, title, title_telugu, description, \
     description_telugu, sort_order, is_active, uploaded_at, updated_at";

fn row_to_image(row: &SqliteRow) -> GalleryImage {
    GalleryImage {
        id: row.get("id"),
        url: row.get("url"),
        storage_id: row.get("storage_id"),
        title: row.get("title"),
        title_telugu: row.get("title_telugu"),
        description: row.get("description"),
        description_telugu: row.get("description_telugu"),
        order: row.get("sort_order"),
        is_active: row.get("is_active"),
        uploaded_at: row.get("uploaded_at"),
        updated_at: row.get("updated_at"),
    }
}

pub async fn insert_image(pool: &SqlitePool, image: &GalleryImage) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO gallery_images (
            id, url, storage_id, title, title_telugu, description, description_telugu,
            sort_order, is_active, uploaded_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&image.id)
    .bind(&image.url)
    .bind(&image.storage_id)
    .bind(&image.title)
    .bind(&image.title_telugu)
    .bind(&image.description)
    .bind(&image.description_telugu)
    .bind(image.order)
    .bind(image.is_active)
    .bind(&image.uploaded_at)
    .bind(&image.updated_at)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn save_image(pool: &SqlitePool, image: &GalleryImage) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE gallery_images SET
            url = ?, title = ?, title_telugu = ?, description = ?, description_telugu = ?,
            sort_order = ?, is_active = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&image.url)
    .bind(&image.title)
    .bind(&image.title_telugu)
    .bind(&image.description)
    .bind(&image.description_telugu)
    .bind(image.order)
    .bind(image.is_active)
    .bind(now_rfc3339())
    .bind(&image.id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound("Image not found".to_string()));
    }
    Ok(())
}

pub async fn find_image(pool: &SqlitePool, id: &str) -> Result<Option<GalleryImage>> {
    let sql = format!("SELECT {} FROM gallery_images WHERE id = ?", IMAGE_COLUMNS);
    let row = sqlx::query(&sql).bind(id).fetch_optional(pool).await?;
    Ok(row.as_ref().map(row_to_image))
}

/// Active images by display order, newest upload first within an order
pub async fn list_ordered(pool: &SqlitePool) -> Result<Vec<GalleryImage>> {
    let sql = format!(
        "SELECT {} FROM gallery_images WHERE is_active = 1 ORDER BY sort_order ASC, uploaded_at DESC",
        IMAGE_COLUMNS
    );
    let rows = sqlx::query(&sql).fetch_all(pool).await?;
    Ok(rows.iter().map(row_to_image).collect())
}

/// Active images, newest upload first
pub async fn list_recent(pool: &SqlitePool) -> Result<Vec<GalleryImage>> {
    let sql = format!(
        "SELECT {} FROM gallery_images WHERE is_active = 1 ORDER BY uploaded_at DESC",
        IMAGE_COLUMNS
    );
    let rows = sqlx::query(&sql).fetch_all(pool).await?;
    Ok(rows.iter().map(row_to_image).collect())
}

pub async fn soft_delete(pool: &SqlitePool, id: &str) -> Result<()> {
    let result = sqlx::query("UPDATE gallery_images SET is_active = 0, updated_at = ? WHERE id = ?")
        .bind(now_rfc3339())
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound("Image not found".to_string()));
    }
    Ok(())
}
