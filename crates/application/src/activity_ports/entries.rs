use std::str::FromStr;

use chrono::{DateTime, Utc};
use contractdesk_core::{ActorId, AppError};
use contractdesk_domain::{ActivityAction, FieldChange, ResourceType};

/// Persisted activity log entry projection for administrative views.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityLogEntry {
    /// Identifier assigned by the log store.
    pub entry_id: i64,
    /// Acting user.
    pub actor_id: Option<ActorId>,
    /// Performed action.
    pub action: ActivityAction,
    /// Targeted resource kind.
    pub resource_type: ResourceType,
    /// Targeted resource identifier.
    pub resource_id: Option<i64>,
    /// Resource title captured with the event.
    pub resource_title: Option<String>,
    /// Ordered field changes for update events.
    pub field_changes: Vec<FieldChange>,
    /// Whether the action succeeded.
    pub success: bool,
    /// Optional detail message.
    pub detail: Option<String>,
    /// Client IP address.
    pub ip_address: Option<String>,
    /// Client user agent.
    pub user_agent: Option<String>,
    /// Producer-side event timestamp.
    pub occurred_at: DateTime<Utc>,
    /// Time the log store accepted the entry.
    pub recorded_at: DateTime<Utc>,
}

/// Query parameters for activity log listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityLogQuery {
    /// Maximum rows returned.
    pub limit: usize,
    /// Number of rows skipped for offset pagination.
    pub offset: usize,
    /// Optional actor filter.
    pub actor_id: Option<ActorId>,
    /// Optional action filter.
    pub action: Option<ActivityAction>,
    /// Optional resource type filter.
    pub resource_type: Option<ResourceType>,
    /// Inclusive lower bound on `occurred_at`.
    pub occurred_after: Option<DateTime<Utc>>,
    /// Exclusive upper bound on `occurred_at`.
    pub occurred_before: Option<DateTime<Utc>>,
}

impl Default for ActivityLogQuery {
    fn default() -> Self {
        Self {
            limit: 50,
            offset: 0,
            actor_id: None,
            action: None,
            resource_type: None,
            occurred_after: None,
            occurred_before: None,
        }
    }
}

/// Dimension used to bucket activity counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActivityGroupBy {
    /// One bucket per action.
    Action,
    /// One bucket per resource type.
    ResourceType,
    /// One bucket per UTC calendar day, keyed `YYYY-MM-DD`.
    Day,
    /// One bucket per actor, anonymous events keyed `anonymous`.
    Actor,
}

impl ActivityGroupBy {
    /// Bucket key used for events without an actor.
    pub const ANONYMOUS_ACTOR_KEY: &'static str = "anonymous";

    /// Returns a stable transport value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Action => "action",
            Self::ResourceType => "resource_type",
            Self::Day => "day",
            Self::Actor => "actor",
        }
    }
}

impl FromStr for ActivityGroupBy {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "action" => Ok(Self::Action),
            "resource_type" => Ok(Self::ResourceType),
            "day" => Ok(Self::Day),
            "actor" => Ok(Self::Actor),
            _ => Err(AppError::Validation(format!(
                "unknown activity grouping '{value}'"
            ))),
        }
    }
}

/// Query parameters for grouped activity counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivitySummaryQuery {
    /// Bucketing dimension.
    pub group_by: ActivityGroupBy,
    /// Optional actor filter.
    pub actor_id: Option<ActorId>,
    /// Inclusive lower bound on `occurred_at`.
    pub occurred_after: Option<DateTime<Utc>>,
    /// Exclusive upper bound on `occurred_at`.
    pub occurred_before: Option<DateTime<Utc>>,
}

impl ActivitySummaryQuery {
    /// Creates an unfiltered summary query.
    #[must_use]
    pub fn new(group_by: ActivityGroupBy) -> Self {
        Self {
            group_by,
            actor_id: None,
            occurred_after: None,
            occurred_before: None,
        }
    }
}

/// View count for one resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewedResource {
    /// Resource identifier.
    pub resource_id: i64,
    /// Most recent title seen for the resource.
    pub resource_title: Option<String>,
    /// Number of successful views.
    pub view_count: u64,
}

/// One field change in a resource's history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldHistoryEntry {
    /// Activity entry that recorded the change; it may already be purged.
    pub entry_id: i64,
    /// User who made the change.
    pub actor_id: Option<ActorId>,
    /// Changed field name.
    pub field_name: String,
    /// Value before the update.
    pub old_value: Option<String>,
    /// Value after the update.
    pub new_value: Option<String>,
    /// Time of the update.
    pub occurred_at: DateTime<Utc>,
}
