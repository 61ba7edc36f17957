//! Shared authentication and authorization primitives
//!
//! Pure functions only. The service crate wraps these with axum extractors.

pub mod auth;
pub mod policy;

pub use auth::{
    generate_secret, hash_password, issue_token, verify_password, verify_token, Claims,
    PasswordError, TokenError,
};
pub use policy::{evaluate, Capability, Decision, Permission, Permissions, Principal, Role};
