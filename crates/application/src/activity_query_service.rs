use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Days, Duration, NaiveTime, Utc};
use contractdesk_core::{ActorId, AppError, AppResult};
use contractdesk_domain::{ActivityAction, ResourceType, describe_activity};

use crate::activity_ports::{
    ActivityGroupBy, ActivityLogEntry, ActivityLogQuery, ActivityLogRepository,
    ActivitySummaryQuery, FieldHistoryEntry, ViewedResource,
};


const MAX_PAGE_SIZE: usize = 200;
const MAX_OFFSET: usize = 5_000;
const MAX_REPORT_SIZE: usize = 50;
const MAX_REPORT_DAYS: u16 = 365;
const DASHBOARD_TREND_DAYS: u64 = 7;
const DASHBOARD_RANKING_DAYS: i64 = 30;
const DASHBOARD_RANKING_SIZE: usize = 10;

/// One line of a user's activity feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityFeedItem {
    /// Source log entry.
    pub entry_id: i64,
    /// Human-readable description, such as `Updated contract 'Lease'`.
    pub message: String,
    /// Performed action.
    pub action: ActivityAction,
    /// Targeted resource kind.
    pub resource_type: ResourceType,
    /// Targeted resource identifier.
    pub resource_id: Option<i64>,
    /// Whether the action succeeded.
    pub success: bool,
    /// Time of the action.
    pub occurred_at: DateTime<Utc>,
}

/// Event count for one actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActorActivity {
    /// Acting user.
    pub actor_id: ActorId,
    /// Number of recorded events.
    pub event_count: u64,
}

/// Aggregates shown on the admin dashboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityDashboard {
    /// Event counts per UTC day for the last seven days, including empty days.
    pub events_last_7_days: BTreeMap<String, u64>,
    /// Most viewed contracts over the last 30 days.
    pub most_viewed_contracts: Vec<ViewedResource>,
    /// Users with the most events over the last 30 days.
    pub most_active_actors: Vec<ActorActivity>,
}

/// Read-only query surface over the activity log for admin views.
#[derive(Clone)]
pub struct ActivityQueryService {
    repository: Arc<dyn ActivityLogRepository>,
}

impl ActivityQueryService {
    /// Creates a new query service.
    #[must_use]
    pub fn new(repository: Arc<dyn ActivityLogRepository>) -> Self {
        Self { repository }
    }

    /// Lists recent entries, newest first.
    ///
    /// The page size is clamped to `1..=200` and the offset to `5000`.
    pub async fn recent_activity(
        &self,
        query: ActivityLogQuery,
    ) -> AppResult<Vec<ActivityLogEntry>> {
        validate_range(query.occurred_after, query.occurred_before)?;

        let query = ActivityLogQuery {
            limit: query.limit.clamp(1, MAX_PAGE_SIZE),
            offset: query.offset.min(MAX_OFFSET),
            ..query
        };

        self.repository.list_recent_entries(query).await
    }

    /// Counts entries per bucket of the requested dimension.
    pub async fn activity_summary(
        &self,
        query: ActivitySummaryQuery,
    ) -> AppResult<BTreeMap<String, u64>> {
        validate_range(query.occurred_after, query.occurred_before)?;
        self.repository.summarize_entries(query).await
    }

    /// Returns the most viewed resources of one type over the last `days` days.
    pub async fn most_viewed(
        &self,
        resource_type: ResourceType,
        days: u16,
        limit: usize,
    ) -> AppResult<Vec<ViewedResource>> {
        if days == 0 || days > MAX_REPORT_DAYS {
            return Err(AppError::Validation(format!(
                "days must be between 1 and {MAX_REPORT_DAYS}"
            )));
        }

        let since = Utc::now() - Duration::days(i64::from(days));
        self.repository
            .most_viewed_resources(resource_type, since, limit.clamp(1, MAX_REPORT_SIZE))
            .await
    }

    /// Returns one user's recent actions as readable feed lines.
    pub async fn user_activity_feed(
        &self,
        actor_id: ActorId,
        limit: usize,
    ) -> AppResult<Vec<ActivityFeedItem>> {
        let entries = self
            .repository
            .list_recent_entries(ActivityLogQuery {
                limit: limit.clamp(1, MAX_REPORT_SIZE),
                actor_id: Some(actor_id),
                ..ActivityLogQuery::default()
            })
            .await?;

        Ok(entries
            .into_iter()
            .map(|entry| ActivityFeedItem {
                entry_id: entry.entry_id,
                message: describe_activity(
                    entry.action,
                    entry.resource_type,
                    entry.resource_title.as_deref(),
                ),
                action: entry.action,
                resource_type: entry.resource_type,
                resource_id: entry.resource_id,
                success: entry.success,
                occurred_at: entry.occurred_at,
            })
            .collect())
    }

    /// Lists recorded field changes for one resource, newest first.
    pub async fn field_history(
        &self,
        resource_type: ResourceType,
        resource_id: i64,
        limit: usize,
    ) -> AppResult<Vec<FieldHistoryEntry>> {
        self.repository
            .list_field_history(resource_type, resource_id, limit.clamp(1, MAX_PAGE_SIZE))
            .await
    }

    /// Builds the admin dashboard aggregates relative to `now`.
    pub async fn dashboard_overview(&self, now: DateTime<Utc>) -> AppResult<ActivityDashboard> {
        let first_day = now
            .date_naive()
            .checked_sub_days(Days::new(DASHBOARD_TREND_DAYS - 1))
            .ok_or_else(|| AppError::Internal("dashboard trend start out of range".to_owned()))?;

        let mut events_last_7_days: BTreeMap<String, u64> = first_day
            .iter_days()
            .take(DASHBOARD_TREND_DAYS as usize)
            .map(|day| (day.format("%Y-%m-%d").to_string(), 0))
            .collect();

        let daily_counts = self
            .repository
            .summarize_entries(ActivitySummaryQuery {
                occurred_after: Some(first_day.and_time(NaiveTime::MIN).and_utc()),
                ..ActivitySummaryQuery::new(ActivityGroupBy::Day)
            })
            .await?;
        for (day, count) in daily_counts {
            if let Some(slot) = events_last_7_days.get_mut(&day) {
                *slot = count;
            }
        }

        let ranking_since = now - Duration::days(DASHBOARD_RANKING_DAYS);

        let most_viewed_contracts = self
            .repository
            .most_viewed_resources(ResourceType::Contract, ranking_since, DASHBOARD_RANKING_SIZE)
            .await?;

        let actor_counts = self
            .repository
            .summarize_entries(ActivitySummaryQuery {
                occurred_after: Some(ranking_since),
                ..ActivitySummaryQuery::new(ActivityGroupBy::Actor)
            })
            .await?;

        Ok(ActivityDashboard {
            events_last_7_days,
            most_viewed_contracts,
            most_active_actors: rank_actors(actor_counts),
        })
    }
}

fn validate_range(
    occurred_after: Option<DateTime<Utc>>,
    occurred_before: Option<DateTime<Utc>>,
) -> AppResult<()> {
    if let (Some(after), Some(before)) = (occurred_after, occurred_before)
        && after >= before
    {
        return Err(AppError::Validation(
            "occurred_after must be earlier than occurred_before".to_owned(),
        ));
    }

    Ok(())
}

fn rank_actors(counts: BTreeMap<String, u64>) -> Vec<ActorActivity> {
    let mut actors: Vec<ActorActivity> = counts
        .into_iter()
        .filter(|(key, _)| key != ActivityGroupBy::ANONYMOUS_ACTOR_KEY)
        .filter_map(|(key, event_count)| {
            ActorId::from_str(&key)
                .ok()
                .map(|actor_id| ActorActivity {
                    actor_id,
                    event_count,
                })
        })
        .collect();

    actors.sort_by(|left, right| {
        right
            .event_count
            .cmp(&left.event_count)
            .then(left.actor_id.cmp(&right.actor_id))
    });
    actors.truncate(DASHBOARD_RANKING_SIZE);
    actors
}
