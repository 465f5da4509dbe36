use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use contractdesk_application::RetentionSweeper;
use contractdesk_core::AppError;
use tracing::info;

use crate::api_config::ApiConfig;
use crate::api_router;
use crate::state::AppState;

use super::ApiRuntime;

impl ApiRuntime {
    /// Starts the background tasks, serves until `shutdown` resolves, then
    /// stops the sweeper and drains the writer.
    ///
    /// Once the writer has started it is stopped on every exit path,
    /// including a sweeper or listener that fails to come up.
    pub async fn serve<F>(self, config: &ApiConfig, shutdown: F) -> Result<(), AppError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let ApiRuntime {
            state,
            mut writer,
            sweeper,
        } = self;

        writer.start()?;

        let served = serve_with_sweeper(config, state, &sweeper, shutdown).await;

        let sweeper_stopped = sweeper.stop(config.writer_drain_timeout).await;
        let report = writer.stop(config.writer_drain_timeout).await;
        info!(
            drained = report.drained,
            persisted = report.persisted,
            dropped = report.dropped,
            abandoned = report.abandoned,
            sweeper_stopped,
            "activity subsystem stopped"
        );

        served
    }
}

async fn serve_with_sweeper<F>(
    config: &ApiConfig,
    state: AppState,
    sweeper: &Arc<RetentionSweeper>,
    shutdown: F,
) -> Result<(), AppError>
where
    F: Future<Output = ()> + Send + 'static,
{
    sweeper.start()?;

    let app = api_router::build_router(state);
    let address = config.socket_address()?;
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .map_err(|error| AppError::Internal(format!("failed to bind listener: {error}")))?;

    info!(%address, "contractdesk-api listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await
    .map_err(|error| AppError::Internal(format!("api server error: {error}")))
}
