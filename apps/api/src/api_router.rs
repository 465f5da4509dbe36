use axum::Router;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::{handlers, middleware};

pub fn build_router(app_state: AppState) -> Router {
    let admin_routes = Router::new()
        .route(
            "/api/admin/activity",
            get(handlers::activity::list_activity_handler),
        )
        .route(
            "/api/admin/activity/summary",
            get(handlers::activity::activity_summary_handler),
        )
        .route(
            "/api/admin/activity/most-viewed",
            get(handlers::activity::most_viewed_handler),
        )
        .route(
            "/api/admin/activity/users/{actor_id}",
            get(handlers::activity::user_activity_feed_handler),
        )
        .route(
            "/api/admin/activity/{resource_type}/{resource_id}/history",
            get(handlers::activity::field_history_handler),
        )
        .route(
            "/api/admin/dashboard",
            get(handlers::activity::dashboard_handler),
        )
        .route(
            "/api/admin/retention",
            get(handlers::retention::retention_statistics_handler),
        )
        .route(
            "/api/admin/retention/sweep",
            post(handlers::retention::run_retention_sweep_handler),
        )
        .route_layer(from_fn_with_state(
            app_state.clone(),
            middleware::require_admin_token,
        ));

    Router::new()
        .route("/health", get(handlers::health::health_handler))
        .merge(admin_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
