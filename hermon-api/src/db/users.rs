//! User persistence

use super::{conflict_on_unique, from_json, to_json};
use hermon_common::api::policy::{Permissions, Role};
use hermon_common::time::now_rfc3339;
use hermon_common::{Error, Result};
use serde::Serialize;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use uuid::Uuid;

/// Stored user record
///
/// The password hash and provider subject are never serialized.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(skip)]
    pub password_hash: Option<String>,
    pub auth_provider: String,
    #[serde(skip)]
    pub provider_subject: Option<String>,
    pub display_name: String,
    pub photo_url: Option<String>,
    pub role: Role,
    pub permissions: Permissions,
    pub fcm_token: Option<String>,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
    pub last_login_at: Option<String>,
}

/// Fields for a new account
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: Option<String>,
    pub auth_provider: String,
    pub provider_subject: Option<String>,
    pub display_name: String,
    pub photo_url: Option<String>,
    pub fcm_token: Option<String>,
}

const USER_COLUMNS: &str = "id, email, password_hash, auth_provider, provider_subject, display_name, \
     photo_url, role, permissions, fcm_token, is_active, created_at, updated_at, last_login_at";

fn row_to_user(row: &SqliteRow) -> Result<User> {
    let role: String = row.get("role");
    let permissions: String = row.get("permissions");

    Ok(User {
        id: row.get("id"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        auth_provider: row.get("auth_provider"),
        provider_subject: row.get("provider_subject"),
        display_name: row.get("display_name"),
        photo_url: row.get("photo_url"),
        role: role.parse().map_err(Error::Internal)?,
        permissions: from_json("users.permissions", &permissions)?,
        fcm_token: row.get("fcm_token"),
        is_active: row.get("is_active"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        last_login_at: row.get("last_login_at"),
    })
}

/// Insert a new user with role `user`
///
/// Fails with `Error::Conflict` if the email (or provider subject) is taken.
pub async fn insert_user(pool: &SqlitePool, new_user: &NewUser) -> Result<User> {
    let id = Uuid::new_v4().to_string();
    let now = now_rfc3339();

    sqlx::query(
        r#"
        INSERT INTO users (
            id, email, password_hash, auth_provider, provider_subject, display_name,
            photo_url, role, permissions, fcm_token, is_active, created_at, updated_at, last_login_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, 'user', '{}', ?, 1, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(&new_user.email)
    .bind(&new_user.password_hash)
    .bind(&new_user.auth_provider)
    .bind(&new_user.provider_subject)
    .bind(&new_user.display_name)
    .bind(&new_user.photo_url)
    .bind(&new_user.fcm_token)
    .bind(&now)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await
    .map_err(|e| conflict_on_unique(e, "User already exists with this email"))?;

    find_by_id(pool, &id)
        .await?
        .ok_or_else(|| Error::Internal("Inserted user not readable".to_string()))
}

async fn find_one(pool: &SqlitePool, column: &str, value: &str) -> Result<Option<User>> {
    let sql = format!("SELECT {} FROM users WHERE {} = ?", USER_COLUMNS, column);
    let row = sqlx::query(&sql).bind(value).fetch_optional(pool).await?;

    row.as_ref().map(row_to_user).transpose()
}

pub async fn find_by_id(pool: &SqlitePool, id: &str) -> Result<Option<User>> {
    find_one(pool, "id", id).await
}

pub async fn find_by_email(pool: &SqlitePool, email: &str) -> Result<Option<User>> {
    find_one(pool, "email", email).await
}

pub async fn find_by_provider_subject(pool: &SqlitePool, subject: &str) -> Result<Option<User>> {
    find_one(pool, "provider_subject", subject).await
}

/// Stamp last_login_at and optionally replace the push token
pub async fn record_login(pool: &SqlitePool, id: &str, fcm_token: Option<&str>) -> Result<()> {
    let now = now_rfc3339();

    sqlx::query(
        r#"
        UPDATE users
        SET last_login_at = ?, updated_at = ?, fcm_token = COALESCE(?, fcm_token)
        WHERE id = ?
        "#,
    )
    .bind(&now)
    .bind(&now)
    .bind(fcm_token)
    .bind(id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Partial profile update; absent fields are left untouched
pub async fn update_profile(
    pool: &SqlitePool,
    id: &str,
    display_name: Option<&str>,
    photo_url: Option<&str>,
) -> Result<User> {
    let result = sqlx::query(
        r#"
        UPDATE users
        SET display_name = COALESCE(?, display_name),
            photo_url = COALESCE(?, photo_url),
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(display_name)
    .bind(photo_url)
    .bind(now_rfc3339())
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound("User not found".to_string()));
    }

    find_by_id(pool, id)
        .await?
        .ok_or_else(|| Error::NotFound("User not found".to_string()))
}

pub async fn update_fcm_token(pool: &SqlitePool, id: &str, fcm_token: &str) -> Result<()> {
    let result = sqlx::query("UPDATE users SET fcm_token = ?, updated_at = ? WHERE id = ?")
        .bind(fcm_token)
        .bind(now_rfc3339())
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound("User not found".to_string()));
    }
    Ok(())
}

/// Replace role and permission flags
pub async fn update_role(
    pool: &SqlitePool,
    id: &str,
    role: Role,
    permissions: &Permissions,
) -> Result<User> {
    let result = sqlx::query("UPDATE users SET role = ?, permissions = ?, updated_at = ? WHERE id = ?")
        .bind(role.as_str())
        .bind(to_json(permissions)?)
        .bind(now_rfc3339())
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound("User not found".to_string()));
    }

    find_by_id(pool, id)
        .await?
        .ok_or_else(|| Error::NotFound("User not found".to_string()))
}

/// All users, newest first
pub async fn list_users(pool: &SqlitePool) -> Result<Vec<User>> {
    let sql = format!("SELECT {} FROM users ORDER BY created_at DESC", USER_COLUMNS);
    let rows = sqlx::query(&sql).fetch_all(pool).await?;

    rows.iter().map(row_to_user).collect()
}

pub async fn count_users(pool: &SqlitePool) -> Result<i64> {
    Ok(sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await?)
}
