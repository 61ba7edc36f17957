//! hermon-api - REST backend for the Hermon Keerthanalu song app
//!
//! Configuration priority: command line, then `HERMON_*` environment
//! variables, then the TOML file, then compiled defaults.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use hermon_api::config::{Args, ServiceConfig};
use hermon_api::services::{
    CloudinaryClient, CounterQueue, GoogleIdentityVerifier, IdentityVerifier, MediaStorage,
    VideoCatalog, YouTubeClient,
};
use hermon_api::{build_router, AppState, AuthSettings};
use hermon_common::config::TomlConfig;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// How long to wait for queued counter updates after the server stops
const COUNTER_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let toml_config = TomlConfig::load(args.config.as_deref()).context("Failed to load configuration file")?;

    // Resolve first: the log filter depends on it
    let config = ServiceConfig::resolve(&args, toml_config, cfg!(debug_assertions))
        .context("Invalid configuration")?;

    let level = &config.log_level;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("hermon_api={level},hermon_common={level},tower_http={level}").into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting Hermon Keerthanalu API (hermon-api) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    if config.jwt_secret_generated {
        warn!("No JWT secret configured; using a random per-process secret (tokens will not survive restart)");
    }

    info!("Database path: {}", config.database_path.display());
    let pool = match hermon_common::db::init_database(&config.database_path).await {
        Ok(pool) => {
            info!("✓ Database ready");
            pool
        }
        Err(e) => {
            error!("Failed to open database: {}", e);
            return Err(e.into());
        }
    };

    let videos: Arc<dyn VideoCatalog> = Arc::new(
        YouTubeClient::new(config.youtube_api_key.clone()).context("Failed to create video catalog client")?,
    );
    if config.youtube_api_key.is_none() {
        warn!("No YouTube API key configured; video lookups will answer 503");
    }

    let media: Arc<dyn MediaStorage> =
        Arc::new(CloudinaryClient::new(&config.cloudinary).context("Failed to create media storage client")?);
    if config.cloudinary.api_secret.is_none() {
        warn!("Cloudinary credentials incomplete; uploads will answer 503");
    }

    let identity: Arc<dyn IdentityVerifier> = Arc::new(
        GoogleIdentityVerifier::new(config.google_client_id.clone())
            .context("Failed to create identity verifier")?,
    );

    let (counters, counter_task) = CounterQueue::start(pool.clone());

    let state = AppState {
        db: pool,
        auth: Arc::new(AuthSettings {
            jwt_secret: config.jwt_secret.clone(),
            token_ttl: config.token_ttl,
        }),
        videos,
        media,
        identity,
        counters,
    };

    let app = build_router(state, &config.allowed_origins);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("hermon-api listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // The router (and every queue sender) is gone; let pending counters land
    if tokio::time::timeout(COUNTER_DRAIN_TIMEOUT, counter_task).await.is_err() {
        warn!("Counter queue did not drain within {:?}", COUNTER_DRAIN_TIMEOUT);
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
