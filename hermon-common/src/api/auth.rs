//! Session tokens and password hashing
//!
//! # Pure Functions
//!
//! No HTTP framework dependencies here. The service crate wraps these in
//! axum extractors and runs bcrypt on the blocking pool.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// bcrypt work factor for stored password hashes
pub const BCRYPT_COST: u32 = 10;

// ========================================
// Error Types
// ========================================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    /// Signature, structure or expiry check failed
    #[error("Invalid or expired token")]
    Invalid,

    /// Token could not be produced
    #[error("Token signing failed: {0}")]
    Signing(String),
}

#[derive(Debug, Error)]
#[error("Password hashing failed: {0}")]
pub struct PasswordError(#[from] bcrypt::BcryptError);

// ========================================
// Session Tokens
// ========================================

/// Claims carried by a session token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub user_id: String,
    pub email: String,
    /// Issued at (unix timestamp)
    pub iat: i64,
    /// Expiry (unix timestamp)
    pub exp: i64,
}

/// Sign a session token valid for `ttl` from now
pub fn issue_token(secret: &str, user_id: &str, email: &str, ttl: Duration) -> Result<String, TokenError> {
    issue_token_at(secret, user_id, email, chrono::Utc::now().timestamp(), ttl)
}

/// Sign a session token with an explicit issue time
pub fn issue_token_at(
    secret: &str,
    user_id: &str,
    email: &str,
    issued_at: i64,
    ttl: Duration,
) -> Result<String, TokenError> {
    let exp = i64::try_from(ttl.as_secs())
        .ok()
        .and_then(|secs| issued_at.checked_add(secs))
        .ok_or_else(|| TokenError::Signing(format!("Token lifetime out of range: {:?}", ttl)))?;

    let claims = Claims {
        user_id: user_id.to_string(),
        email: email.to_string(),
        iat: issued_at,
        exp,
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| TokenError::Signing(e.to_string()))
}

/// Verify signature and expiry, returning the claims
pub fn verify_token(secret: &str, token: &str) -> Result<Claims, TokenError> {
    let validation = Validation::new(Algorithm::HS256);

    decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map(|data| data.claims)
        .map_err(|_| TokenError::Invalid)
}

/// Random signing secret for development runs without a configured one
pub fn generate_secret() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(48)
        .map(char::from)
        .collect()
}

// ========================================
// Passwords
// ========================================

/// bcrypt-hash a password (CPU bound; call from a blocking context)
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    Ok(bcrypt::hash(password, BCRYPT_COST)?)
}

/// Compare a password with a stored bcrypt hash
///
/// A malformed stored hash is treated as a mismatch.
pub fn verify_password(password: &str, hash: &str) -> bool {
    bcrypt::verify(password, hash).unwrap_or(false)
}
