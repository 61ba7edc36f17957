//! Multipart form collection for media uploads

use axum::extract::{multipart::MultipartError, Multipart};
use axum::http::StatusCode;
use std::collections::HashMap;

use crate::error::ApiError;
use crate::services::MediaKind;

const AUDIO_EXTENSIONS: [&str; 6] = ["mp3", "wav", "m4a", "aac", "ogg", "flac"];
const IMAGE_EXTENSIONS: [&str; 5] = ["jpeg", "jpg", "png", "gif", "webp"];

/// One uploaded file held in memory
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Files from one named field plus every plain text field
#[derive(Debug, Default)]
pub struct UploadForm {
    pub files: Vec<UploadedFile>,
    pub fields: HashMap<String, String>,
}

impl UploadForm {
    /// Non-empty trimmed text field
    pub fn text(&self, name: &str) -> Option<String> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }
}

fn multipart_error(e: MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge("Upload exceeds the request size limit".to_string())
    } else {
        ApiError::BadRequest(format!("Multipart error: {}", e.body_text()))
    }
}

/// Whether a file looks like `kind`, by content type or extension
pub fn accepts(kind: MediaKind, filename: &str, content_type: Option<&str>) -> bool {
    let (prefix, extensions): (&str, &[&str]) = match kind {
        MediaKind::Audio => ("audio/", &AUDIO_EXTENSIONS),
        MediaKind::Image => ("image/", &IMAGE_EXTENSIONS),
    };

    if content_type.is_some_and(|ct| ct.starts_with(prefix)) {
        return true;
    }

    filename
        .rsplit_once('.')
        .map(|(_, ext)| extensions.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Drain a multipart body
///
/// Files are taken only from `file_field`, at most `max_files` of them,
/// each checked against the size limit and type of `kind`.
pub async fn read_form(
    mut multipart: Multipart,
    file_field: &str,
    kind: MediaKind,
    max_files: usize,
) -> Result<UploadForm, ApiError> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or("").to_string();

        if name == file_field {
            if form.files.len() >= max_files {
                return Err(ApiError::BadRequest(format!(
                    "At most {} files may be uploaded at once",
                    max_files
                )));
            }

            let filename = field.file_name().unwrap_or("upload").to_string();
            let content_type = field.content_type().map(str::to_string);
            if !accepts(kind, &filename, content_type.as_deref()) {
                return Err(ApiError::BadRequest(match kind {
                    MediaKind::Audio => "Only audio files (mp3, wav, m4a, aac, ogg, flac) are allowed".to_string(),
                    MediaKind::Image => "Only images (jpeg, jpg, png, gif, webp) are allowed".to_string(),
                }));
            }

            let bytes = field.bytes().await.map_err(multipart_error)?;
            if bytes.len() > kind.max_bytes() {
                return Err(ApiError::PayloadTooLarge(format!(
                    "{} exceeds the {} MB limit",
                    filename,
                    kind.max_bytes() / (1024 * 1024)
                )));
            }

            form.files.push(UploadedFile {
                filename,
                bytes: bytes.to_vec(),
            });
        } else if field.file_name().is_none() {
            let value = field.text().await.map_err(multipart_error)?;
            form.fields.insert(name, value);
        }
    }

    Ok(form)
}
