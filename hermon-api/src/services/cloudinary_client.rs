//! Media CDN client (Cloudinary signed upload API)
//!
//! Requests are signed with SHA-256 over the alphabetically sorted
//! parameters followed by the API secret.

use super::ServiceError;
use async_trait::async_trait;
use hermon_common::config::CloudinaryConfig;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::Duration;

const CLOUDINARY_BASE_URL: &str = "https://api.cloudinary.com/v1_1";

/// Maximum audio upload size (single file)
pub const MAX_AUDIO_BYTES: usize = 50 * 1024 * 1024;

/// Maximum size of each uploaded image
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

/// Maximum images per batch upload
pub const MAX_IMAGES_PER_BATCH: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Audio,
    Image,
}

impl MediaKind {
    /// Cloudinary resource type; audio is stored under "video"
    fn resource_type(&self) -> &'static str {
        match self {
            MediaKind::Audio => "video",
            MediaKind::Image => "image",
        }
    }

    pub fn max_bytes(&self) -> usize {
        match self {
            MediaKind::Audio => MAX_AUDIO_BYTES,
            MediaKind::Image => MAX_IMAGE_BYTES,
        }
    }
}

/// Result of a successful upload
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedMedia {
    pub secure_url: String,
    pub storage_id: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Seconds, for audio
    pub duration: Option<f64>,
}

/// Hosted media storage
#[async_trait]
pub trait MediaStorage: Send + Sync {
    async fn upload(&self, bytes: Vec<u8>, kind: MediaKind, filename: &str) -> Result<UploadedMedia, ServiceError>;

    async fn delete(&self, storage_id: &str, kind: MediaKind) -> Result<(), ServiceError>;
}

/// Hex SHA-256 signature over sorted `key=value` pairs plus the secret
pub fn sign_params(params: &[(&str, String)], api_secret: &str) -> String {
    let mut sorted: Vec<&(&str, String)> = params.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    let to_sign = sorted
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    let digest = Sha256::digest(format!("{}{}", to_sign, api_secret).as_bytes());
    format!("{:x}", digest)
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
    public_id: String,
    width: Option<u32>,
    height: Option<u32>,
    duration: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct DestroyResponse {
    result: String,
}

struct Credentials {
    cloud_name: String,
    api_key: String,
    api_secret: String,
}

pub struct CloudinaryClient {
    http_client: reqwest::Client,
    credentials: Option<Credentials>,
    audio_folder: String,
    image_folder: String,
}

impl CloudinaryClient {
    pub fn new(config: &CloudinaryConfig) -> Result<Self, ServiceError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| ServiceError::Network(e.to_string()))?;

        let credentials = match (&config.cloud_name, &config.api_key, &config.api_secret) {
            (Some(cloud_name), Some(api_key), Some(api_secret)) => Some(Credentials {
                cloud_name: cloud_name.clone(),
                api_key: api_key.clone(),
                api_secret: api_secret.clone(),
            }),
            _ => None,
        };

        Ok(Self {
            http_client,
            credentials,
            audio_folder: config.audio_folder.clone(),
            image_folder: config.image_folder.clone(),
        })
    }

    fn credentials(&self) -> Result<&Credentials, ServiceError> {
        self.credentials
            .as_ref()
            .ok_or(ServiceError::NotConfigured("Media storage"))
    }

    fn endpoint(&self, creds: &Credentials, kind: MediaKind, action: &str) -> String {
        format!(
            "{}/{}/{}/{}",
            CLOUDINARY_BASE_URL,
            creds.cloud_name,
            kind.resource_type(),
            action
        )
    }
}

#[async_trait]
impl MediaStorage for CloudinaryClient {
    async fn upload(&self, bytes: Vec<u8>, kind: MediaKind, filename: &str) -> Result<UploadedMedia, ServiceError> {
        let creds = self.credentials()?;
        let folder = match kind {
            MediaKind::Audio => self.audio_folder.clone(),
            MediaKind::Image => self.image_folder.clone(),
        };
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let signature = sign_params(
            &[("folder", folder.clone()), ("timestamp", timestamp.clone())],
            &creds.api_secret,
        );

        let size = bytes.len();
        let part = reqwest::multipart::Part::bytes(bytes).file_name(filename.to_string());
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("api_key", creds.api_key.clone())
            .text("timestamp", timestamp)
            .text("folder", folder)
            .text("signature", signature)
            .text("signature_algorithm", "sha256");

        tracing::debug!(filename = %filename, size, ?kind, "Uploading media");

        let response = self
            .http_client
            .post(self.endpoint(creds, kind, "upload"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| ServiceError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ServiceError::Api(status.as_u16(), error_text));
        }

        let uploaded: UploadResponse = response
            .json()
            .await
            .map_err(|e| ServiceError::Parse(e.to_string()))?;

        tracing::info!(storage_id = %uploaded.public_id, ?kind, "Uploaded media");

        Ok(UploadedMedia {
            secure_url: uploaded.secure_url,
            storage_id: uploaded.public_id,
            width: uploaded.width,
            height: uploaded.height,
            duration: uploaded.duration,
        })
    }

    async fn delete(&self, storage_id: &str, kind: MediaKind) -> Result<(), ServiceError> {
        let creds = self.credentials()?;
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let signature = sign_params(
            &[("public_id", storage_id.to_string()), ("timestamp", timestamp.clone())],
            &creds.api_secret,
        );

        let params = [
            ("public_id", storage_id.to_string()),
            ("timestamp", timestamp),
            ("api_key", creds.api_key.clone()),
            ("signature", signature),
            ("signature_algorithm", "sha256".to_string()),
        ];

        let response = self
            .http_client
            .post(self.endpoint(creds, kind, "destroy"))
            .form(&params)
            .send()
            .await
            .map_err(|e| ServiceError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ServiceError::Api(status.as_u16(), error_text));
        }

        let body: DestroyResponse = response
            .json()
            .await
            .map_err(|e| ServiceError::Parse(e.to_string()))?;

        if body.result != "ok" && body.result != "not found" {
            return Err(ServiceError::Api(status.as_u16(), body.result));
        }

        tracing::info!(storage_id = %storage_id, "Deleted media");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_sorts_params() {
        let a = sign_params(&[("timestamp", "1".into()), ("folder", "x".into())], "secret");
        let b = sign_params(&[("folder", "x".into()), ("timestamp", "1".into())], "secret");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_signature_known_value() {
        // sha256("folder=x&timestamp=1secret")
        let expected = format!("{:x}", Sha256::digest(b"folder=x&timestamp=1secret"));
        assert_eq!(
            sign_params(&[("folder", "x".into()), ("timestamp", "1".into())], "secret"),
            expected
        );
    }

    #[test]
    fn test_limits() {
        assert_eq!(MediaKind::Audio.max_bytes(), 50 * 1024 * 1024);
        assert_eq!(MediaKind::Image.max_bytes(), 10 * 1024 * 1024);
    }

    #[tokio::test]
    async fn test_unconfigured_upload_fails() {
        let client = CloudinaryClient::new(&CloudinaryConfig::default()).unwrap();
        let err = client.upload(vec![1, 2, 3], MediaKind::Image, "a.png").await.unwrap_err();
        assert!(matches!(err, ServiceError::NotConfigured(_)));
    }
}
