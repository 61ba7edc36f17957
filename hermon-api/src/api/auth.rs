//! Registration, login and caller profile endpoints
//!
//! Password hashing and verification run on the blocking pool. Login
//! failures share one generic message so callers cannot probe which
//! emails exist.

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use hermon_common::api::{hash_password, issue_token, verify_password};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use super::validate;
use crate::db::{activities, activity, users};
use crate::db::users::{NewUser, User};
use crate::error::{ApiError, ApiResult};
use crate::extractors::{ApiJson, AuthUser};
use crate::AppState;

const INVALID_CREDENTIALS: &str = "Invalid email or password";

/// Token plus the account it was issued for
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub success: bool,
    pub token: String,
    pub user: User,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_new_user: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub display_name: Option<String>,
    pub fcm_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    pub fcm_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleLoginRequest {
    #[serde(alias = "idToken")]
    pub google_id_token: Option<String>,
    pub fcm_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PasswordResetRequest {
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub display_name: Option<String>,
    #[serde(alias = "photoURL")]
    pub photo_url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FcmTokenRequest {
    pub fcm_token: Option<String>,
}

/// Generated avatar for accounts without a photo
pub fn default_avatar_url(name: &str) -> Option<String> {
    reqwest::Url::parse_with_params("https://ui-avatars.com/api/", &[("name", name), ("size", "200")])
        .ok()
        .map(String::from)
}

fn sign(state: &AppState, user: &User) -> ApiResult<String> {
    issue_token(&state.auth.jwt_secret, &user.id, &user.email, state.auth.token_ttl)
        .map_err(|e| ApiError::Internal(e.to_string()))
}

/// POST /auth/register
pub async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    let email = validate::normalize_email(&req.email)?;
    validate::password(&req.password)?;
    let display_name = match req.display_name.as_deref() {
        Some(name) => validate::text_in_range("Display name", name, 2, 50)?,
        None => email.split('@').next().unwrap_or_default().to_string(),
    };

    if users::find_by_email(&state.db, &email).await?.is_some() {
        return Err(ApiError::Conflict("User already exists with this email".to_string()));
    }

    let password = req.password;
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| ApiError::Internal(format!("Hashing task failed: {}", e)))?
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    let user = users::insert_user(
        &state.db,
        &NewUser {
            photo_url: default_avatar_url(&display_name),
            email,
            password_hash: Some(password_hash),
            auth_provider: "email".to_string(),
            provider_subject: None,
            display_name,
            fcm_token: req.fcm_token.filter(|t| !t.is_empty()),
        },
    )
    .await?;

    activity::create_empty(&state.db, &user.id).await?;
    info!(user_id = %user.id, "User registered");

    let token = sign(&state, &user)?;
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            success: true,
            token,
            user,
            is_new_user: None,
        }),
    ))
}

/// POST /auth/login
pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let invalid = || ApiError::Unauthorized(INVALID_CREDENTIALS.to_string());

    let email = validate::normalize_email(&req.email).map_err(|_| invalid())?;
    let user = users::find_by_email(&state.db, &email).await?.ok_or_else(invalid)?;
    let hash = user.password_hash.clone().ok_or_else(invalid)?;

    let password = req.password;
    let matches = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| ApiError::Internal(format!("Verification task failed: {}", e)))?;
    if !matches {
        return Err(invalid());
    }

    let fcm_token = req.fcm_token.filter(|t| !t.is_empty());
    users::record_login(&state.db, &user.id, fcm_token.as_deref()).await?;
    let user = users::find_by_id(&state.db, &user.id).await?.ok_or_else(invalid)?;

    let token = sign(&state, &user)?;
    Ok(Json(AuthResponse {
        success: true,
        token,
        user,
        is_new_user: None,
    }))
}

/// POST /auth/google, /auth/google-login
///
/// Creates the account on first sight of a provider subject.
pub async fn google_login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<GoogleLoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let id_token = validate::required("Google ID token", req.google_id_token.as_deref())?;
    let identity = state.identity.verify(&id_token).await?;
    let fcm_token = req.fcm_token.filter(|t| !t.is_empty());

    let (user, is_new) = match users::find_by_provider_subject(&state.db, &identity.subject).await? {
        Some(existing) => {
            users::record_login(&state.db, &existing.id, fcm_token.as_deref()).await?;
            let user = users::find_by_id(&state.db, &existing.id)
                .await?
                .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
            (user, false)
        }
        None => {
            let email = identity.email.trim().to_lowercase();
            let display_name = identity
                .name
                .clone()
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| email.split('@').next().unwrap_or_default().to_string());
            let photo_url = identity.picture.clone().or_else(|| default_avatar_url(&display_name));

            let user = users::insert_user(
                &state.db,
                &NewUser {
                    email,
                    password_hash: None,
                    auth_provider: "google".to_string(),
                    provider_subject: Some(identity.subject.clone()),
                    display_name,
                    photo_url,
                    fcm_token,
                },
            )
            .await?;
            activity::create_empty(&state.db, &user.id).await?;
            info!(user_id = %user.id, "User created from federated login");
            (user, true)
        }
    };

    let token = sign(&state, &user)?;
    Ok(Json(AuthResponse {
        success: true,
        token,
        user,
        is_new_user: Some(is_new),
    }))
}

/// POST /auth/password/reset
///
/// Only records the request; delivery belongs to the identity provider.
pub async fn request_password_reset(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<PasswordResetRequest>,
) -> ApiResult<Json<Value>> {
    let raw = validate::required("Email", req.email.as_deref())?;
    let email = validate::normalize_email(&raw)?;

    let mut event = activities::ActivityEvent::new(activities::PASSWORD_RESET_REQUESTED);
    event.email = Some(email);
    activities::record(&state.db, &event).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Password reset email sent successfully",
    })))
}

/// GET /auth/profile, /users/me
pub async fn get_profile(State(state): State<AppState>, caller: AuthUser) -> ApiResult<Json<Value>> {
    let user = users::find_by_id(&state.db, &caller.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(json!({ "success": true, "data": user })))
}

/// PUT /auth/profile, /users/me
pub async fn update_profile(
    State(state): State<AppState>,
    caller: AuthUser,
    ApiJson(req): ApiJson<UpdateProfileRequest>,
) -> ApiResult<Json<Value>> {
    if req.display_name.is_none() && req.photo_url.is_none() {
        return Err(ApiError::BadRequest("No fields to update".to_string()));
    }

    let display_name = req
        .display_name
        .as_deref()
        .map(|name| validate::text_in_range("Display name", name, 2, 50))
        .transpose()?;

    let user = users::update_profile(
        &state.db,
        &caller.user_id,
        display_name.as_deref(),
        req.photo_url.as_deref(),
    )
    .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Profile updated successfully",
        "data": user,
    })))
}

/// PUT /auth/fcm-token
pub async fn update_fcm_token(
    State(state): State<AppState>,
    caller: AuthUser,
    ApiJson(req): ApiJson<FcmTokenRequest>,
) -> ApiResult<Json<Value>> {
    let token = req
        .fcm_token
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("FCM token is required".to_string()))?;

    users::update_fcm_token(&state.db, &caller.user_id, &token).await?;

    Ok(Json(json!({
        "success": true,
        "message": "FCM token updated successfully",
    })))
}

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/google", post(google_login))
        .route("/auth/google-login", post(google_login))
        .route("/auth/password/reset", post(request_password_reset))
        .route("/auth/profile", get(get_profile).put(update_profile))
        .route("/auth/fcm-token", put(update_fcm_token))
}
