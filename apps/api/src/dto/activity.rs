use std::collections::BTreeMap;

use serde::Serialize;
use ts_rs::TS;

use super::format_timestamp;

/// One recorded field change.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/field-change-response.ts"
)]
pub struct FieldChangeResponse {
    pub field_name: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
}

/// API representation of an activity log entry.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/activity-log-entry-response.ts"
)]
pub struct ActivityLogEntryResponse {
    pub entry_id: i64,
    pub actor_id: Option<i64>,
    pub action: String,
    pub resource_type: String,
    pub resource_id: Option<i64>,
    pub resource_title: Option<String>,
    pub field_changes: Vec<FieldChangeResponse>,
    pub success: bool,
    pub detail: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub occurred_at: String,
    pub recorded_at: String,
}

/// Grouped activity counts.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/activity-summary-response.ts"
)]
pub struct ActivitySummaryResponse {
    pub group_by: String,
    pub counts: BTreeMap<String, u64>,
}

/// View count for one resource.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/viewed-resource-response.ts"
)]
pub struct ViewedResourceResponse {
    pub resource_id: i64,
    pub resource_title: Option<String>,
    pub view_count: u64,
}

/// One line of a user's activity feed.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/activity-feed-item-response.ts"
)]
pub struct ActivityFeedItemResponse {
    pub entry_id: i64,
    pub message: String,
    pub action: String,
    pub resource_type: String,
    pub resource_id: Option<i64>,
    pub success: bool,
    pub occurred_at: String,
}

/// One change in a resource's field history.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/field-history-entry-response.ts"
)]
pub struct FieldHistoryEntryResponse {
    pub entry_id: i64,
    pub actor_id: Option<i64>,
    pub field_name: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub occurred_at: String,
}

/// Event count for one actor.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/actor-activity-response.ts"
)]
pub struct ActorActivityResponse {
    pub actor_id: i64,
    pub event_count: u64,
}

/// Admin dashboard aggregates.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/activity-dashboard-response.ts"
)]
pub struct ActivityDashboardResponse {
    pub events_last_7_days: BTreeMap<String, u64>,
    pub most_viewed_contracts: Vec<ViewedResourceResponse>,
    pub most_active_actors: Vec<ActorActivityResponse>,
}

impl From<contractdesk_application::ActivityLogEntry> for ActivityLogEntryResponse {
    fn from(value: contractdesk_application::ActivityLogEntry) -> Self {
        Self {
            entry_id: value.entry_id,
            actor_id: value.actor_id.map(|actor| actor.as_i64()),
            action: value.action.as_str().to_owned(),
            resource_type: value.resource_type.as_str().to_owned(),
            resource_id: value.resource_id,
            resource_title: value.resource_title,
            field_changes: value
                .field_changes
                .iter()
                .map(|change| FieldChangeResponse {
                    field_name: change.field_name().to_owned(),
                    old_value: change.old_value().map(str::to_owned),
                    new_value: change.new_value().map(str::to_owned),
                })
                .collect(),
            success: value.success,
            detail: value.detail,
            ip_address: value.ip_address,
            user_agent: value.user_agent,
            occurred_at: format_timestamp(value.occurred_at),
            recorded_at: format_timestamp(value.recorded_at),
        }
    }
}

impl From<contractdesk_application::ViewedResource> for ViewedResourceResponse {
    fn from(value: contractdesk_application::ViewedResource) -> Self {
        Self {
            resource_id: value.resource_id,
            resource_title: value.resource_title,
            view_count: value.view_count,
        }
    }
}

impl From<contractdesk_application::ActivityFeedItem> for ActivityFeedItemResponse {
    fn from(value: contractdesk_application::ActivityFeedItem) -> Self {
        Self {
            entry_id: value.entry_id,
            message: value.message,
            action: value.action.as_str().to_owned(),
            resource_type: value.resource_type.as_str().to_owned(),
            resource_id: value.resource_id,
            success: value.success,
            occurred_at: format_timestamp(value.occurred_at),
        }
    }
}

impl From<contractdesk_application::FieldHistoryEntry> for FieldHistoryEntryResponse {
    fn from(value: contractdesk_application::FieldHistoryEntry) -> Self {
        Self {
            entry_id: value.entry_id,
            actor_id: value.actor_id.map(|actor| actor.as_i64()),
            field_name: value.field_name,
            old_value: value.old_value,
            new_value: value.new_value,
            occurred_at: format_timestamp(value.occurred_at),
        }
    }
}

impl From<contractdesk_application::ActivityDashboard> for ActivityDashboardResponse {
    fn from(value: contractdesk_application::ActivityDashboard) -> Self {
        Self {
            events_last_7_days: value.events_last_7_days,
            most_viewed_contracts: value
                .most_viewed_contracts
                .into_iter()
                .map(ViewedResourceResponse::from)
                .collect(),
            most_active_actors: value
                .most_active_actors
                .into_iter()
                .map(|actor| ActorActivityResponse {
                    actor_id: actor.actor_id.as_i64(),
                    event_count: actor.event_count,
                })
                .collect(),
        }
    }
}
