//! OptiControl server entry point.
//!
//! Loads configuration, opens the session store, and serves the router
//! until Ctrl-C.

use std::sync::Arc;

use anyhow::{Context, Result};
use opticontrol_config::{OptiConfig, Settings, StorageBackend, config_path};
use opticontrol_context::{FileSessionStore, MemorySessionStore, SessionStore};
use opticontrol_server::{AppState, build_router};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(env_filter)
        .init();
}

fn open_store(settings: &Settings) -> Result<Arc<dyn SessionStore>> {
    match settings.storage.backend {
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory session store; sessions are lost on restart");
            Ok(Arc::new(MemorySessionStore::new()))
        }
        StorageBackend::File => {
            let store = FileSessionStore::open(&settings.storage.data_dir).with_context(|| {
                format!(
                    "failed to open session store in {}",
                    settings.storage.data_dir.display()
                )
            })?;
            tracing::info!(path = %store.dir().display(), "Session store ready");
            Ok(Arc::new(store))
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let file_config = OptiConfig::load().context("failed to load configuration")?;
    match config_path() {
        Some(path) if file_config.is_some() => {
            tracing::info!(path = %path.display(), "Loaded configuration");
        }
        _ => tracing::info!("No config file found; using defaults and environment"),
    }
    let settings = file_config
        .unwrap_or_default()
        .resolve_from_env()
        .context("invalid configuration")?;

    let store = open_store(&settings)?;
    let state =
        AppState::from_settings(&settings, store).context("failed to build webhook client")?;
    let app = build_router(Arc::new(state));

    let listener = tokio::net::TcpListener::bind(settings.server.listen)
        .await
        .with_context(|| format!("failed to bind {}", settings.server.listen))?;
    tracing::info!(
        listen = %settings.server.listen,
        webhook_host = settings.webhook.url.host_str().unwrap_or_default(),
        production = settings.server.production,
        users = settings.users.len(),
        "OptiControl listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    Ok(())
}
