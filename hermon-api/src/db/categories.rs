//! Category persistence

use hermon_common::time::now_rfc3339;
use hermon_common::{Error, Result};
use serde::Serialize;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub name: String,
    pub name_telugu: String,
    pub description: String,
    pub description_telugu: String,
    pub icon: String,
    pub color: String,
    pub order: i64,
    pub song_count: i64,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

const CATEGORY_COLUMNS: &str = "id, name, name_telugu, description, description_telugu, icon, color, \
     sort_order, song_count, is_active, created_at, updated_at";

fn row_to_category(row: &SqliteRow) -> Category {
    Category {
        id: row.get("id"),
        name: row.get("name"),
        name_telugu: row.get("name_telugu"),
        description: row.get("description"),
        description_telugu: row.get("description_telugu"),
        icon: row.get("icon"),
        color: row.get("color"),
        order: row.get("sort_order"),
        song_count: row.get("song_count"),
        is_active: row.get("is_active"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

pub async fn insert_category(pool: &SqlitePool, category: &Category) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO categories (
            id, name, name_telugu, description, description_telugu, icon, color,
            sort_order, song_count, is_active, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&category.id)
    .bind(&category.name)
    .bind(&category.name_telugu)
    .bind(&category.description)
    .bind(&category.description_telugu)
    .bind(&category.icon)
    .bind(&category.color)
    .bind(category.order)
    .bind(category.song_count)
    .bind(category.is_active)
    .bind(&category.created_at)
    .bind(&category.updated_at)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn save_category(pool: &SqlitePool, category: &Category) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE categories SET
            name = ?, name_telugu = ?, description = ?, description_telugu = ?, icon = ?,
            color = ?, sort_order = ?, is_active = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&category.name)
    .bind(&category.name_telugu)
    .bind(&category.description)
    .bind(&category.description_telugu)
    .bind(&category.icon)
    .bind(&category.color)
    .bind(category.order)
    .bind(category.is_active)
    .bind(now_rfc3339())
    .bind(&category.id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound("Category not found".to_string()));
    }
    Ok(())
}

pub async fn find_category(pool: &SqlitePool, id: &str) -> Result<Option<Category>> {
    let sql = format!("SELECT {} FROM categories WHERE id = ?", CATEGORY_COLUMNS);
    let row = sqlx::query(&sql).bind(id).fetch_optional(pool).await?;
    Ok(row.as_ref().map(row_to_category))
}

/// Active categories by display order, then Telugu name
pub async fn list_active(pool: &SqlitePool) -> Result<Vec<Category>> {
    let sql = format!(
        "SELECT {} FROM categories WHERE is_active = 1 ORDER BY sort_order ASC, name_telugu ASC",
        CATEGORY_COLUMNS
    );
    let rows = sqlx::query(&sql).fetch_all(pool).await?;
    Ok(rows.iter().map(row_to_category).collect())
}

pub async fn soft_delete(pool: &SqlitePool, id: &str) -> Result<()> {
    let result = sqlx::query("UPDATE categories SET is_active = 0, updated_at = ? WHERE id = ?")
        .bind(now_rfc3339())
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound("Category not found".to_string()));
    }
    Ok(())
}

/// Store a recomputed song count
pub async fn set_song_count(pool: &SqlitePool, id: &str, count: i64) -> Result<()> {
    sqlx::query("UPDATE categories SET song_count = ?, updated_at = ? WHERE id = ?")
        .bind(count)
        .bind(now_rfc3339())
        .bind(id)
        .execute(pool)
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hermon_common::db::connect_memory;

    fn category(id: &str, order: i64, name_telugu: &str) -> Category {
        let now = now_rfc3339();
        Category {
            id: id.to_string(),
            name: id.to_string(),
            name_telugu: name_telugu.to_string(),
            description: String::new(),
            description_telugu: String::new(),
            icon: "music".to_string(),
            color: "#1976D2".to_string(),
            order,
            song_count: 0,
            is_active: true,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_list_orders_and_hides_inactive() {
        let pool = connect_memory().await.unwrap();
        insert_category(&pool, &category("b", 1, "బ")).await.unwrap();
        insert_category(&pool, &category("a", 1, "అ")).await.unwrap();
        insert_category(&pool, &category("first", 0, "జ")).await.unwrap();
        insert_category(&pool, &category("gone", 0, "క")).await.unwrap();
        soft_delete(&pool, "gone").await.unwrap();

        let ids: Vec<String> = list_active(&pool).await.unwrap().into_iter().map(|c| c.id).collect();
        assert_eq!(ids, vec!["first", "a", "b"]);
    }

    #[tokio::test]
    async fn test_save_missing_is_not_found() {
        let pool = connect_memory().await.unwrap();
        let err = save_category(&pool, &category("nope", 0, "")).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
