//! Request extractors for authentication and authorization
//!
//! - [`AuthUser`]: valid Bearer session token required (401 otherwise)
//! - [`MaybeAuthUser`]: token optional; an invalid token counts as anonymous
//! - [`AdminUser`]: authenticated and currently `admin` (403 otherwise)
//! - [`Authorized<P>`]: admin holding permission `P`
//! - [`ApiJson<T>`]: JSON body whose rejections use the API error format
//!
//! Role and permissions are re-read from the store on every admin check, so
//! a demotion takes effect immediately even though tokens stay valid.

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, FromRequestParts, Request},
    http::{header::AUTHORIZATION, request::Parts},
    Json,
};
use hermon_common::api::{
    policy::{evaluate, Capability, Decision, Permission, Principal},
    verify_token,
};
use serde::de::DeserializeOwned;
use std::marker::PhantomData;

use crate::db::users::{self, User};
use crate::error::ApiError;
use crate::AppState;

/// Authenticated caller identity from the session token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: String,
    pub email: String,
}

fn authenticate(parts: &Parts, state: &AppState) -> Result<AuthUser, ApiError> {
    let token = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::Unauthorized("No token provided".to_string()))?;

    let claims = verify_token(&state.auth.jwt_secret, token)
        .map_err(|_| ApiError::Unauthorized("Invalid or expired token".to_string()))?;

    Ok(AuthUser {
        user_id: claims.user_id,
        email: claims.email,
    })
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        authenticate(parts, state)
    }
}

/// Optional authentication
#[derive(Debug, Clone)]
pub struct MaybeAuthUser(pub Option<AuthUser>);

#[async_trait]
impl FromRequestParts<AppState> for MaybeAuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        Ok(MaybeAuthUser(authenticate(parts, state).ok()))
    }
}

/// Load the caller and run the policy for `capability`
async fn authorize(parts: &Parts, state: &AppState, capability: Capability) -> Result<User, ApiError> {
    let caller = authenticate(parts, state)?;

    let user = users::find_by_id(&state.db, &caller.user_id)
        .await?
        .ok_or_else(|| ApiError::Forbidden("Access denied. Admin privileges required.".to_string()))?;

    let principal = Principal {
        user_id: user.id.clone(),
        role: user.role,
        permissions: user.permissions.clone(),
    };

    match evaluate(&principal, &capability) {
        Decision::Allow => Ok(user),
        Decision::Deny(reason) => {
            tracing::debug!(user_id = %user.id, ?capability, "Authorization denied");
            Err(ApiError::Forbidden(reason))
        }
    }
}

/// Caller with the admin role
#[derive(Debug, Clone)]
pub struct AdminUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        authorize(parts, state, Capability::Admin).await.map(AdminUser)
    }
}

/// Marker for a permission required by [`Authorized`]
pub trait RequiredPermission: Send + Sync + 'static {
    const PERMISSION: Permission;
}

pub struct ManageUsers;
impl RequiredPermission for ManageUsers {
    const PERMISSION: Permission = Permission::ManageUsers;
}

pub struct ViewActivities;
impl RequiredPermission for ViewActivities {
    const PERMISSION: Permission = Permission::ViewActivities;
}

/// Admin caller holding permission `P`
pub struct Authorized<P: RequiredPermission> {
    pub user: User,
    _permission: PhantomData<P>,
}

#[async_trait]
impl<P: RequiredPermission> FromRequestParts<AppState> for Authorized<P> {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let user = authorize(parts, state, Capability::Permission(P::PERMISSION)).await?;
        Ok(Authorized {
            user,
            _permission: PhantomData,
        })
    }
}

/// JSON body extractor answering malformed input with a 400 in API format
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(json_rejection(rejection)),
        }
    }
}

fn json_rejection(rejection: JsonRejection) -> ApiError {
    match rejection {
        JsonRejection::JsonDataError(e) => ApiError::BadRequest(e.body_text()),
        JsonRejection::JsonSyntaxError(_) => ApiError::BadRequest("Malformed JSON body".to_string()),
        JsonRejection::MissingJsonContentType(_) => {
            ApiError::BadRequest("Expected Content-Type: application/json".to_string())
        }
        other => ApiError::BadRequest(other.body_text()),
    }
}
