use axum::Json;
use axum::extract::{Extension, State};
use chrono::Utc;
use contractdesk_application::RequestActivityContext;
use tracing::info;

use crate::dto::{RetentionStatisticsResponse, SweepReportResponse};
use crate::error::ApiResult;
use crate::handlers::activity::{admin_page, record_admin_view};
use crate::state::AppState;

pub async fn retention_statistics_handler(
    State(state): State<AppState>,
    Extension(context): Extension<RequestActivityContext>,
) -> ApiResult<Json<RetentionStatisticsResponse>> {
    let outcome = state.retention_sweeper.statistics_at(Utc::now()).await;
    record_admin_view(&state, &context, admin_page("Retention"), &outcome);

    Ok(Json(RetentionStatisticsResponse::from(outcome?)))
}

pub async fn run_retention_sweep_handler(
    State(state): State<AppState>,
    Extension(context): Extension<RequestActivityContext>,
) -> Json<SweepReportResponse> {
    let report = state.retention_sweeper.sweep().await;
    info!(
        actor_id = ?context.actor_id.map(|actor| actor.as_i64()),
        deleted_count = report.total_deleted(),
        partial = report.is_partial(),
        "on-demand retention sweep finished"
    );

    Json(SweepReportResponse::from(report))
}
