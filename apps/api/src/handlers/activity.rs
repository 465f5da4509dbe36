use axum::Json;
use axum::extract::{Extension, Path, Query, State};
use chrono::{DateTime, Utc};
use contractdesk_application::{
    ActivityGroupBy, ActivityLogQuery, ActivitySummaryQuery, RequestActivityContext, ResourceRef,
};
use contractdesk_core::{ActorId, AppResult};
use contractdesk_domain::{ActivityAction, ResourceType};
use serde::Deserialize;

use crate::dto::{
    ActivityDashboardResponse, ActivityFeedItemResponse, ActivityLogEntryResponse,
    ActivitySummaryResponse, FieldHistoryEntryResponse, ViewedResourceResponse,
};
use crate::error::ApiResult;
use crate::state::AppState;

#[cfg(test)]
mod tests;

const DEFAULT_MOST_VIEWED_DAYS: u16 = 30;
const DEFAULT_MOST_VIEWED_LIMIT: usize = 10;
const DEFAULT_FEED_LIMIT: usize = 20;
const DEFAULT_HISTORY_LIMIT: usize = 50;

#[derive(Debug, Default, Deserialize)]
pub struct ActivityListQuery {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
    pub actor_id: Option<i64>,
    pub action: Option<String>,
    pub resource_type: Option<String>,
    pub occurred_after: Option<DateTime<Utc>>,
    pub occurred_before: Option<DateTime<Utc>>,
}

impl ActivityListQuery {
    fn into_log_query(self) -> AppResult<ActivityLogQuery> {
        let defaults = ActivityLogQuery::default();

        Ok(ActivityLogQuery {
            limit: self.limit.unwrap_or(defaults.limit),
            offset: self.offset.unwrap_or(defaults.offset),
            actor_id: self.actor_id.map(ActorId::new),
            action: self
                .action
                .as_deref()
                .map(str::parse::<ActivityAction>)
                .transpose()?,
            resource_type: self
                .resource_type
                .as_deref()
                .map(str::parse::<ResourceType>)
                .transpose()?,
            occurred_after: self.occurred_after,
            occurred_before: self.occurred_before,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct ActivitySummaryParams {
    pub group_by: String,
    pub actor_id: Option<i64>,
    pub occurred_after: Option<DateTime<Utc>>,
    pub occurred_before: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MostViewedParams {
    pub resource_type: Option<String>,
    pub days: Option<u16>,
    pub limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LimitParams {
    pub limit: Option<usize>,
}

pub async fn list_activity_handler(
    State(state): State<AppState>,
    Extension(context): Extension<RequestActivityContext>,
    Query(query): Query<ActivityListQuery>,
) -> ApiResult<Json<Vec<ActivityLogEntryResponse>>> {
    let outcome = match query.into_log_query() {
        Ok(query) => state.query_service.recent_activity(query).await,
        Err(error) => Err(error),
    };
    record_admin_view(&state, &context, admin_page("Activity log"), &outcome);

    Ok(Json(
        outcome?
            .into_iter()
            .map(ActivityLogEntryResponse::from)
            .collect(),
    ))
}

pub async fn activity_summary_handler(
    State(state): State<AppState>,
    Extension(context): Extension<RequestActivityContext>,
    Query(params): Query<ActivitySummaryParams>,
) -> ApiResult<Json<ActivitySummaryResponse>> {
    let outcome = match params.group_by.parse::<ActivityGroupBy>() {
        Ok(group_by) => state
            .query_service
            .activity_summary(ActivitySummaryQuery {
                group_by,
                actor_id: params.actor_id.map(ActorId::new),
                occurred_after: params.occurred_after,
                occurred_before: params.occurred_before,
            })
            .await
            .map(|counts| (group_by, counts)),
        Err(error) => Err(error),
    };
    record_admin_view(&state, &context, admin_page("Activity summary"), &outcome);

    let (group_by, counts) = outcome?;
    Ok(Json(ActivitySummaryResponse {
        group_by: group_by.as_str().to_owned(),
        counts,
    }))
}

pub async fn most_viewed_handler(
    State(state): State<AppState>,
    Extension(context): Extension<RequestActivityContext>,
    Query(params): Query<MostViewedParams>,
) -> ApiResult<Json<Vec<ViewedResourceResponse>>> {
    let resource_type = params
        .resource_type
        .as_deref()
        .map(str::parse::<ResourceType>)
        .transpose();
    let outcome = match resource_type {
        Ok(resource_type) => {
            state
                .query_service
                .most_viewed(
                    resource_type.unwrap_or(ResourceType::Contract),
                    params.days.unwrap_or(DEFAULT_MOST_VIEWED_DAYS),
                    params.limit.unwrap_or(DEFAULT_MOST_VIEWED_LIMIT),
                )
                .await
        }
        Err(error) => Err(error),
    };
    record_admin_view(&state, &context, admin_page("Most viewed"), &outcome);

    Ok(Json(
        outcome?
            .into_iter()
            .map(ViewedResourceResponse::from)
            .collect(),
    ))
}

pub async fn user_activity_feed_handler(
    State(state): State<AppState>,
    Extension(context): Extension<RequestActivityContext>,
    Path(actor_id): Path<i64>,
    Query(params): Query<LimitParams>,
) -> ApiResult<Json<Vec<ActivityFeedItemResponse>>> {
    let outcome = state
        .query_service
        .user_activity_feed(
            ActorId::new(actor_id),
            params.limit.unwrap_or(DEFAULT_FEED_LIMIT),
        )
        .await;
    record_admin_view(
        &state,
        &context,
        ResourceRef::new(ResourceType::User, actor_id).with_title("Activity feed"),
        &outcome,
    );

    Ok(Json(
        outcome?
            .into_iter()
            .map(ActivityFeedItemResponse::from)
            .collect(),
    ))
}

pub async fn field_history_handler(
    State(state): State<AppState>,
    Extension(context): Extension<RequestActivityContext>,
    Path((resource_type, resource_id)): Path<(String, i64)>,
    Query(params): Query<LimitParams>,
) -> ApiResult<Json<Vec<FieldHistoryEntryResponse>>> {
    let outcome = match resource_type.parse::<ResourceType>() {
        Ok(resource_type) => {
            state
                .query_service
                .field_history(
                    resource_type,
                    resource_id,
                    params.limit.unwrap_or(DEFAULT_HISTORY_LIMIT),
                )
                .await
        }
        Err(error) => Err(error),
    };
    record_admin_view(&state, &context, admin_page("Field history"), &outcome);

    Ok(Json(
        outcome?
            .into_iter()
            .map(FieldHistoryEntryResponse::from)
            .collect(),
    ))
}

pub async fn dashboard_handler(
    State(state): State<AppState>,
    Extension(context): Extension<RequestActivityContext>,
) -> ApiResult<Json<ActivityDashboardResponse>> {
    let outcome = state.query_service.dashboard_overview(Utc::now()).await;
    record_admin_view(&state, &context, admin_page("Admin dashboard"), &outcome);

    Ok(Json(ActivityDashboardResponse::from(outcome?)))
}

pub(crate) fn admin_page(title: &str) -> ResourceRef {
    ResourceRef::page(ResourceType::Other).with_title(title)
}

pub(crate) fn record_admin_view<T>(
    state: &AppState,
    context: &RequestActivityContext,
    resource: ResourceRef,
    outcome: &AppResult<T>,
) {
    state
        .recorder
        .record_outcome(context, ActivityAction::View, resource, outcome);
}
