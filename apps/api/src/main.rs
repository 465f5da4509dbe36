//! Contractdesk API composition root.

#![forbid(unsafe_code)]

mod api_config;
mod api_router;
mod api_services;
mod dto;
mod error;
mod handlers;
mod middleware;
mod state;

use contractdesk_core::AppError;
use tracing::{info, warn};

use crate::api_config::{ActivityLogBackend, ApiConfig, init_tracing};
use crate::api_services::{build_api_runtime, connect, connect_and_migrate};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ApiConfig::load()?;

    let log_pool = match &config.activity_log_backend {
        ActivityLogBackend::Postgres { database_url } => {
            Some(connect_and_migrate(database_url).await?)
        }
        ActivityLogBackend::Memory => {
            warn!("activity log is kept in memory and will be lost on restart");
            None
        }
    };

    if config.migrate_only {
        info!(
            applied = log_pool.is_some(),
            "activity log migrations finished"
        );
        return Ok(());
    }

    let business_pool = connect(&config.database_url, "business datastore").await?;
    let runtime = build_api_runtime(&config, business_pool, log_pool)?;

    runtime.serve(&config, wait_for_shutdown_signal()).await
}

async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match (
            signal(SignalKind::terminate()),
            signal(SignalKind::interrupt()),
        ) {
            (Ok(mut terminate), Ok(mut interrupt)) => {
                tokio::select! {
                    _ = terminate.recv() => {}
                    _ = interrupt.recv() => {}
                }
            }
            _ => {
                warn!("failed to register unix signal handlers, falling back to ctrl-c");
                if let Err(error) = tokio::signal::ctrl_c().await {
                    warn!(error = %error, "failed to listen for ctrl-c");
                }
            }
        }
    }
    #[cfg(not(unix))]
    {
        if let Err(error) = tokio::signal::ctrl_c().await {
            warn!(error = %error, "failed to listen for ctrl-c");
        }
    }
}
