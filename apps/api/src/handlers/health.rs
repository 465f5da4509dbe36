use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;

use crate::dto::{HealthDependencyStatus, HealthResponse};
use crate::state::AppState;

mod checks;

use checks::{check_postgres, memory_store_status};

pub async fn health_handler(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let business_store = check_postgres(&state.business_pool).await;
    let log_store = match &state.log_pool {
        Some(pool) => check_postgres(pool).await,
        None => memory_store_status(),
    };

    let ready = is_healthy(&business_store) && is_healthy(&log_store);
    let http_status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        http_status,
        Json(HealthResponse {
            status: if ready { "ok" } else { "degraded" },
            ready,
            business_store,
            log_store,
            activity_writer: state.activity_queue.stats().into(),
        }),
    )
}

fn is_healthy(dependency: &HealthDependencyStatus) -> bool {
    matches!(dependency.status, "ok" | "memory")
}
