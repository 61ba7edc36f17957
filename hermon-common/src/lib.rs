//! # Hermon Common Library
//!
//! Shared code for the Hermon Keerthanalu services:
//! - Database initialization and schema
//! - Session tokens, password hashing and the access policy
//! - Activity ledger transforms (liked / recently played)
//! - Configuration loading
//! - Error types

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod ledger;
pub mod time;

pub use error::{Error, Result};
