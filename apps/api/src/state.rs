use std::sync::Arc;

use contractdesk_application::{
    ActivityQueryService, ActivityQueue, ActivityRecorder, RetentionSweeper,
};
use sqlx::PgPool;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub query_service: ActivityQueryService,
    pub recorder: ActivityRecorder,
    pub activity_queue: ActivityQueue,
    pub retention_sweeper: Arc<RetentionSweeper>,
    pub business_pool: PgPool,
    /// `None` when the activity log is kept in memory.
    pub log_pool: Option<PgPool>,
    pub admin_api_token: Arc<str>,
}
