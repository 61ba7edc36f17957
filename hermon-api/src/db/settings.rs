//! Singleton JSON documents (church info, app config)
//!
//! Stored in the `settings` table as JSON objects. A document is created
//! with its defaults the first time it is read.

use super::from_json;
use hermon_common::db::{APP_CONFIG_KEY, CHURCH_INFO_KEY};
use hermon_common::time::now_rfc3339;
use hermon_common::{Error, Result};
use serde_json::{json, Map, Value};
use sqlx::SqlitePool;
use tracing::info;

pub fn default_church_info() -> Value {
    json!({
        "name": "Hermon Church",
        "nameTelugu": "హెర్మోన్ చర్చి",
        "address": "",
        "addressTelugu": "",
        "phone": "",
        "email": "",
        "website": "",
        "latitude": null,
        "longitude": null,
        "mapUrl": null,
        "description": "",
        "descriptionTelugu": "",
        "logo": null,
        "coverImage": null,
    })
}

pub fn default_app_config() -> Value {
    json!({
        "appName": "HERMON KEERTHANALU",
        "appNameTelugu": "హెర్మోన్ కీర్తనలు",
        "splashText": "PRAISE THE LORD",
        "splashTextTelugu": "యెహోవాను స్తుతించుడి",
        "primaryColor": "#1976D2",
        "secondaryColor": "#FFA726",
        "accentColor": "#4CAF50",
        "appIcon": null,
        "appLogo": null,
        "splashBackground": null,
        "theme": "professional",
        "fontSizeMultiplier": 1.0,
        "enableNotifications": true,
        "enableYouTube": true,
        "enableSharing": true,
        "enableOfflineMode": true,
        "version": "1.0.0",
        "minVersion": "1.0.0",
        "forceUpdate": false,
        "maintenanceMode": false,
    })
}

/// Which singleton document to address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Document {
    ChurchInfo,
    AppConfig,
}

impl Document {
    fn key(&self) -> &'static str {
        match self {
            Document::ChurchInfo => CHURCH_INFO_KEY,
            Document::AppConfig => APP_CONFIG_KEY,
        }
    }

    fn defaults(&self) -> Value {
        let mut value = match self {
            Document::ChurchInfo => default_church_info(),
            Document::AppConfig => default_app_config(),
        };
        if let Some(obj) = value.as_object_mut() {
            obj.insert("updatedAt".to_string(), Value::String(now_rfc3339()));
        }
        value
    }
}

/// Read a document, creating it from defaults when absent
pub async fn get_document(pool: &SqlitePool, doc: Document) -> Result<Value> {
    let result = sqlx::query("INSERT OR IGNORE INTO settings (key, value, updated_at) VALUES (?, ?, ?)")
        .bind(doc.key())
        .bind(doc.defaults().to_string())
        .bind(now_rfc3339())
        .execute(pool)
        .await?;

    if result.rows_affected() > 0 {
        info!(key = doc.key(), "Created default settings document");
    }

    let raw: String = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
        .bind(doc.key())
        .fetch_one(pool)
        .await?;

    from_json(doc.key(), &raw)
}

/// Shallow-merge `patch` into a document and return the result
pub async fn merge_document(pool: &SqlitePool, doc: Document, patch: Map<String, Value>) -> Result<Value> {
    let mut current = get_document(pool, doc).await?;

    let obj = current
        .as_object_mut()
        .ok_or_else(|| Error::Internal(format!("Settings document {} is not an object", doc.key())))?;

    for (key, value) in patch {
        obj.insert(key, value);
    }
    obj.insert("updatedAt".to_string(), Value::String(now_rfc3339()));

    sqlx::query("UPDATE settings SET value = ?, updated_at = ? WHERE key = ?")
        .bind(current.to_string())
        .bind(now_rfc3339())
        .bind(doc.key())
        .execute(pool)
        .await?;

    Ok(current)
}
