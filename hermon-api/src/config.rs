//! Service configuration
//!
//! Merges command-line arguments (with environment fallbacks) over the TOML
//! bootstrap file and compiled defaults.

use clap::Parser;
use hermon_common::api::generate_secret;
use hermon_common::config::{
    parse_duration, CloudinaryConfig, TomlConfig, DEFAULT_DATABASE_PATH, DEFAULT_HOST,
    DEFAULT_JWT_EXPIRES_IN, DEFAULT_PORT,
};
use hermon_common::{Error, Result};
use std::path::PathBuf;
use std::time::Duration;

/// Command-line arguments for hermon-api
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "hermon-api")]
#[command(about = "REST API for the Hermon Keerthanalu song app")]
#[command(version)]
pub struct Args {
    /// TOML configuration file
    #[arg(short, long, env = "HERMON_CONFIG")]
    pub config: Option<PathBuf>,

    /// Address to bind
    #[arg(long, env = "HERMON_HOST")]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "HERMON_PORT")]
    pub port: Option<u16>,

    /// SQLite database file
    #[arg(short, long, env = "HERMON_DATABASE")]
    pub database: Option<PathBuf>,

    /// Session token signing secret
    #[arg(long, env = "HERMON_JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: Option<String>,

    /// Session token lifetime, e.g. "7d"
    #[arg(long, env = "HERMON_JWT_EXPIRES_IN")]
    pub jwt_expires_in: Option<String>,

    /// OAuth client id expected as federated token audience
    #[arg(long, env = "HERMON_GOOGLE_CLIENT_ID")]
    pub google_client_id: Option<String>,

    /// YouTube Data API key
    #[arg(long, env = "HERMON_YOUTUBE_API_KEY", hide_env_values = true)]
    pub youtube_api_key: Option<String>,

    #[arg(long, env = "HERMON_CLOUDINARY_CLOUD_NAME")]
    pub cloudinary_cloud_name: Option<String>,

    #[arg(long, env = "HERMON_CLOUDINARY_API_KEY")]
    pub cloudinary_api_key: Option<String>,

    #[arg(long, env = "HERMON_CLOUDINARY_API_SECRET", hide_env_values = true)]
    pub cloudinary_api_secret: Option<String>,

    /// Allowed CORS origins (comma separated, "*" for any)
    #[arg(long, env = "HERMON_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Vec<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "HERMON_LOG_LEVEL")]
    pub log_level: Option<String>,
}

/// Fully resolved configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,
    pub database_path: PathBuf,
    pub jwt_secret: String,
    pub token_ttl: Duration,
    pub google_client_id: Option<String>,
    pub youtube_api_key: Option<String>,
    pub cloudinary: CloudinaryConfig,
    pub allowed_origins: Vec<String>,
    pub log_level: String,
    /// No secret was configured and a random one was generated
    pub jwt_secret_generated: bool,
}

impl ServiceConfig {
    /// Merge `args` over `toml`
    ///
    /// Without a configured JWT secret, a random one is generated when
    /// `allow_generated_secret` is set and the call fails otherwise. Runs
    /// before logging is up, so callers report `jwt_secret_generated`.
    pub fn resolve(args: &Args, toml: TomlConfig, allow_generated_secret: bool) -> Result<Self> {
        let configured = args.jwt_secret.clone().or(toml.auth.jwt_secret).filter(|s| !s.is_empty());
        let jwt_secret_generated = configured.is_none();
        let jwt_secret = match configured {
            Some(secret) => secret,
            None if allow_generated_secret => generate_secret(),
            None => {
                return Err(Error::Config(
                    "JWT secret is required (--jwt-secret, HERMON_JWT_SECRET or [auth].jwt_secret)".to_string(),
                ))
            }
        };

        let expires_in = args
            .jwt_expires_in
            .clone()
            .or(toml.auth.jwt_expires_in)
            .unwrap_or_else(|| DEFAULT_JWT_EXPIRES_IN.to_string());

        let mut cloudinary = toml.cloudinary;
        if args.cloudinary_cloud_name.is_some() {
            cloudinary.cloud_name = args.cloudinary_cloud_name.clone();
        }
        if args.cloudinary_api_key.is_some() {
            cloudinary.api_key = args.cloudinary_api_key.clone();
        }
        if args.cloudinary_api_secret.is_some() {
            cloudinary.api_secret = args.cloudinary_api_secret.clone();
        }

        let allowed_origins = if args.cors_origins.is_empty() {
            toml.cors.allowed_origins
        } else {
            args.cors_origins.clone()
        };

        Ok(Self {
            host: args
                .host
                .clone()
                .or(toml.server.host)
                .unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: args.port.or(toml.server.port).unwrap_or(DEFAULT_PORT),
            database_path: args
                .database
                .clone()
                .or(toml.database_path)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE_PATH)),
            jwt_secret,
            token_ttl: parse_duration(&expires_in)?,
            google_client_id: args.google_client_id.clone().or(toml.auth.google_client_id),
            youtube_api_key: args.youtube_api_key.clone().or(toml.youtube.api_key),
            cloudinary,
            allowed_origins,
            log_level: args.log_level.clone().unwrap_or(toml.logging.level),
            jwt_secret_generated,
        })
    }
}
