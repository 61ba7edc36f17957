//! Federated identity verification against Google's tokeninfo endpoint

use super::ServiceError;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

const TOKENINFO_URL: &str = "https://oauth2.googleapis.com/tokeninfo";

/// Identity asserted by a verified provider token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
    /// Stable provider subject id
    pub subject: String,
    pub email: String,
    pub name: Option<String>,
    pub picture: Option<String>,
}

#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// Verify a provider ID token; `ServiceError::Rejected` for a bad token
    async fn verify(&self, id_token: &str) -> Result<VerifiedIdentity, ServiceError>;
}

#[derive(Debug, Deserialize)]
struct TokenInfo {
    sub: String,
    email: Option<String>,
    email_verified: Option<String>,
    name: Option<String>,
    picture: Option<String>,
    aud: Option<String>,
}

pub struct GoogleIdentityVerifier {
    http_client: reqwest::Client,
    client_id: Option<String>,
}

impl GoogleIdentityVerifier {
    pub fn new(client_id: Option<String>) -> Result<Self, ServiceError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ServiceError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            client_id,
        })
    }
}

/// Check the audience and extract the identity from a tokeninfo payload
fn identity_from(info: TokenInfo, client_id: Option<&str>) -> Result<VerifiedIdentity, ServiceError> {
    if let Some(expected) = client_id {
        if info.aud.as_deref() != Some(expected) {
            return Err(ServiceError::Rejected("Invalid Google token".to_string()));
        }
    }

    let email = info
        .email
        .filter(|_| info.email_verified.as_deref() != Some("false"))
        .ok_or_else(|| ServiceError::Rejected("Google account has no verified email".to_string()))?;

    Ok(VerifiedIdentity {
        subject: info.sub,
        email: email.to_lowercase(),
        name: info.name,
        picture: info.picture,
    })
}

#[async_trait]
impl IdentityVerifier for GoogleIdentityVerifier {
    async fn verify(&self, id_token: &str) -> Result<VerifiedIdentity, ServiceError> {
        let response = self
            .http_client
            .get(TOKENINFO_URL)
            .query(&[("id_token", id_token)])
            .send()
            .await
            .map_err(|e| ServiceError::Network(e.to_string()))?;

        let status = response.status();
        if status.is_client_error() {
            return Err(ServiceError::Rejected("Invalid Google token".to_string()));
        }
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ServiceError::Api(status.as_u16(), error_text));
        }

        let info: TokenInfo = response
            .json()
            .await
            .map_err(|e| ServiceError::Parse(e.to_string()))?;

        let identity = identity_from(info, self.client_id.as_deref())?;
        tracing::debug!(subject = %identity.subject, "Verified federated identity");
        Ok(identity)
    }
}
