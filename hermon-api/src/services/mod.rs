//! External collaborators and background services
//!
//! Each integration is a trait so handlers can be exercised against stubs.
//! Production implementations talk HTTP through `reqwest`.

pub mod cloudinary_client;
pub mod counter_queue;
pub mod google_identity;
pub mod youtube_client;

pub use cloudinary_client::{CloudinaryClient, MediaKind, MediaStorage, UploadedMedia};
pub use counter_queue::{CounterQueue, CounterUpdate};
pub use google_identity::{GoogleIdentityVerifier, IdentityVerifier, VerifiedIdentity};
pub use youtube_client::{VideoCatalog, VideoDetails, VideoSummary, YouTubeClient};

use crate::error::ApiError;
use thiserror::Error;

/// Failures talking to an external service
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Rejected(String),
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::NotFound(msg) => ApiError::NotFound(msg),
            ServiceError::Rejected(msg) => ApiError::Unauthorized(msg),
            other => ApiError::Upstream(other.to_string()),
        }
    }
}
