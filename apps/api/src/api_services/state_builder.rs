use std::sync::Arc;

use contractdesk_application::{
    ActivityEventRepository, ActivityLogRepository, ActivityLogWriter, ActivityQueryService,
    ActivityRecorder, RetentionSweeper, TracingWriterDiagnostics,
};
use contractdesk_core::AppError;
use contractdesk_infrastructure::{
    InMemoryActivityLogRepository, PostgresActivityLogRepository,
    PostgresContractRetentionRepository,
};
use sqlx::PgPool;

use crate::api_config::ApiConfig;
use crate::state::AppState;

/// Request state plus the background tasks the binary owns.
pub struct ApiRuntime {
    pub state: AppState,
    pub writer: ActivityLogWriter,
    pub sweeper: Arc<RetentionSweeper>,
}

pub fn build_api_runtime(
    config: &ApiConfig,
    business_pool: PgPool,
    log_pool: Option<PgPool>,
) -> Result<ApiRuntime, AppError> {
    let (event_repository, log_repository) = build_log_repositories(log_pool.as_ref());

    let writer = ActivityLogWriter::new(
        event_repository,
        Arc::new(TracingWriterDiagnostics),
        config.writer.clone(),
    )?;
    let sweeper = Arc::new(RetentionSweeper::new(
        log_repository.clone(),
        Arc::new(PostgresContractRetentionRepository::new(
            business_pool.clone(),
        )),
        config.sweeper.clone(),
    )?);

    let state = AppState {
        query_service: ActivityQueryService::new(log_repository),
        recorder: ActivityRecorder::new(writer.queue()),
        activity_queue: writer.queue(),
        retention_sweeper: sweeper.clone(),
        business_pool,
        log_pool,
        admin_api_token: Arc::from(config.admin_api_token.as_str()),
    };

    Ok(ApiRuntime {
        state,
        writer,
        sweeper,
    })
}

fn build_log_repositories(
    log_pool: Option<&PgPool>,
) -> (
    Arc<dyn ActivityEventRepository>,
    Arc<dyn ActivityLogRepository>,
) {
    match log_pool {
        Some(pool) => {
            let repository = Arc::new(PostgresActivityLogRepository::new(pool.clone()));
            (repository.clone(), repository)
        }
        None => {
            let repository = Arc::new(InMemoryActivityLogRepository::new());
            (repository.clone(), repository)
        }
    }
}
