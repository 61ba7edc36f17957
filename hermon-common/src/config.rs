//! Bootstrap configuration loaded from TOML
//!
//! Settings sources, highest priority first:
//! 1. Command-line arguments (handled by the service binary via clap)
//! 2. Environment variables (clap `env` fallbacks)
//! 3. TOML configuration file
//! 4. Compiled defaults
//!
//! A missing TOML file is not an error; every field has a default.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Environment variable naming an explicit TOML file
pub const CONFIG_ENV_VAR: &str = "HERMON_CONFIG";

/// Top-level TOML document
#[derive(Debug, Clone, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub server: ServerSection,

    /// Path to SQLite database file (relative or absolute)
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    #[serde(default)]
    pub auth: AuthSection,

    #[serde(default)]
    pub youtube: YouTubeSection,

    #[serde(default)]
    pub cloudinary: CloudinaryConfig,

    #[serde(default)]
    pub cors: CorsSection,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ServerSection {
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AuthSection {
    /// HS256 signing secret for session tokens
    #[serde(default)]
    pub jwt_secret: Option<String>,

    /// Token lifetime such as "7d" or "12h"
    #[serde(default)]
    pub jwt_expires_in: Option<String>,

    /// OAuth client id; when set, federated tokens must carry it as audience
    #[serde(default)]
    pub google_client_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct YouTubeSection {
    #[serde(default)]
    pub api_key: Option<String>,
}

/// Media CDN credentials and upload folders
#[derive(Debug, Clone, Deserialize)]
pub struct CloudinaryConfig {
    #[serde(default)]
    pub cloud_name: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub api_secret: Option<String>,
    #[serde(default = "default_audio_folder")]
    pub audio_folder: String,
    #[serde(default = "default_image_folder")]
    pub image_folder: String,
}

impl Default for CloudinaryConfig {
    fn default() -> Self {
        Self {
            cloud_name: None,
            api_key: None,
            api_secret: None,
            audio_folder: default_audio_folder(),
            image_folder: default_image_folder(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct CorsSection {
    /// Allowed origins; empty or containing "*" means any origin
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_audio_folder() -> String {
    "hermon-keerthanalu/audio".to_string()
}

fn default_image_folder() -> String {
    "hermon-keerthanalu/images".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_DATABASE_PATH: &str = "./hermon.db";
pub const DEFAULT_JWT_EXPIRES_IN: &str = "7d";

impl TomlConfig {
    /// Parse a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Invalid TOML: {}", e)))
    }

    /// Load from an explicit path; the file must exist
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Load following the file resolution order, falling back to defaults
    ///
    /// An explicitly named file that is missing is an error; the implicit
    /// per-user file is optional.
    pub fn load(cli_path: Option<&Path>) -> Result<Self> {
        if let Some(path) = cli_path {
            return Self::load_from(path);
        }

        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            return Self::load_from(Path::new(&path));
        }

        match default_config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => {
                debug!("No configuration file found, using defaults");
                Ok(Self::default())
            }
        }
    }
}

/// Per-user configuration file location: ~/.config/hermon/hermon-api.toml
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("hermon").join("hermon-api.toml"))
}

/// Parse a duration such as "7d", "12h", "30m", "45s" or plain seconds
pub fn parse_duration(value: &str) -> Result<Duration> {
    let value = value.trim();
    if value.is_empty() {
        return Err(Error::Config("Empty duration".to_string()));
    }

    let (digits, multiplier) = match value.chars().last() {
        Some('s') => (&value[..value.len() - 1], 1),
        Some('m') => (&value[..value.len() - 1], 60),
        Some('h') => (&value[..value.len() - 1], 3600),
        Some('d') => (&value[..value.len() - 1], 86_400),
        _ => (value, 1),
    };

    let amount: u64 = digits
        .trim()
        .parse()
        .map_err(|_| Error::Config(format!("Invalid duration: {}", value)))?;

    if amount == 0 {
        return Err(Error::Config(format!("Duration must be positive: {}", value)));
    }

    let secs = amount
        .checked_mul(multiplier)
        .ok_or_else(|| Error::Config(format!("Duration too large: {}", value)))?;

    Ok(Duration::from_secs(secs))
}
