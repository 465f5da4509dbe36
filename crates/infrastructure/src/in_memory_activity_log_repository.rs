use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use contractdesk_application::{
    ActivityEventRepository, ActivityGroupBy, ActivityLogEntry, ActivityLogQuery,
    ActivityLogRepository, ActivitySummaryQuery, FieldHistoryEntry, ViewedResource,
};
use contractdesk_core::{ActorId, AppResult};
use contractdesk_domain::{ActivityAction, ActivityEvent, ResourceType};
use tokio::sync::RwLock;

/// In-memory activity log store for local development and tests.
#[derive(Debug, Default)]
pub struct InMemoryActivityLogRepository {
    state: RwLock<InMemoryActivityLog>,
}

#[derive(Debug, Default)]
struct InMemoryActivityLog {
    last_entry_id: i64,
    entries: Vec<ActivityLogEntry>,
    field_history: Vec<StoredFieldChange>,
}

/// Field change kept apart from its entry so it outlives the entry's purge.
#[derive(Debug, Clone)]
struct StoredFieldChange {
    resource_type: ResourceType,
    resource_id: Option<i64>,
    change: FieldHistoryEntry,
}

impl InMemoryActivityLogRepository {
    /// Creates an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored entries.
    pub async fn len(&self) -> usize {
        self.state.read().await.entries.len()
    }

    /// Returns whether the store holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.state.read().await.entries.is_empty()
    }
}

#[async_trait]
impl ActivityEventRepository for InMemoryActivityLogRepository {
    async fn append_event(&self, event: &ActivityEvent) -> AppResult<i64> {
        let mut state = self.state.write().await;
        state.last_entry_id += 1;
        let entry_id = state.last_entry_id;
        let client_context = event.client_context();

        state
            .field_history
            .extend(event.field_changes().iter().map(|change| StoredFieldChange {
                resource_type: event.resource_type(),
                resource_id: event.resource_id(),
                change: FieldHistoryEntry {
                    entry_id,
                    actor_id: event.actor_id(),
                    field_name: change.field_name().to_owned(),
                    old_value: change.old_value().map(str::to_owned),
                    new_value: change.new_value().map(str::to_owned),
                    occurred_at: event.occurred_at(),
                },
            }));

        state.entries.push(ActivityLogEntry {
            entry_id,
            actor_id: event.actor_id(),
            action: event.action(),
            resource_type: event.resource_type(),
            resource_id: event.resource_id(),
            resource_title: event.resource_title().map(str::to_owned),
            field_changes: event.field_changes().to_vec(),
            success: event.success(),
            detail: event.detail().map(str::to_owned),
            ip_address: client_context
                .and_then(|client| client.ip_address())
                .map(str::to_owned),
            user_agent: client_context
                .and_then(|client| client.user_agent())
                .map(str::to_owned),
            occurred_at: event.occurred_at(),
            recorded_at: Utc::now(),
        });

        Ok(entry_id)
    }
}

#[async_trait]
impl ActivityLogRepository for InMemoryActivityLogRepository {
    async fn list_recent_entries(
        &self,
        query: ActivityLogQuery,
    ) -> AppResult<Vec<ActivityLogEntry>> {
        let state = self.state.read().await;

        let mut entries: Vec<&ActivityLogEntry> = state
            .entries
            .iter()
            .filter(|entry| query.actor_id.is_none_or(|actor| entry.actor_id == Some(actor)))
            .filter(|entry| query.action.is_none_or(|action| entry.action == action))
            .filter(|entry| {
                query
                    .resource_type
                    .is_none_or(|resource_type| entry.resource_type == resource_type)
            })
            .filter(|entry| within(entry.occurred_at, query.occurred_after, query.occurred_before))
            .collect();
        sort_newest_first(&mut entries);

        Ok(entries
            .into_iter()
            .skip(query.offset)
            .take(query.limit)
            .cloned()
            .collect())
    }

    async fn summarize_entries(
        &self,
        query: ActivitySummaryQuery,
    ) -> AppResult<BTreeMap<String, u64>> {
        let state = self.state.read().await;
        let mut summary = BTreeMap::new();

        for entry in state
            .entries
            .iter()
            .filter(|entry| query.actor_id.is_none_or(|actor| entry.actor_id == Some(actor)))
            .filter(|entry| within(entry.occurred_at, query.occurred_after, query.occurred_before))
        {
            *summary
                .entry(bucket_key(entry, query.group_by))
                .or_insert(0_u64) += 1;
        }

        Ok(summary)
    }

    async fn most_viewed_resources(
        &self,
        resource_type: ResourceType,
        since: DateTime<Utc>,
        limit: usize,
    ) -> AppResult<Vec<ViewedResource>> {
        let state = self.state.read().await;
        let mut viewed: HashMap<i64, (u64, Option<(DateTime<Utc>, String)>)> = HashMap::new();

        for entry in state.entries.iter().filter(|entry| {
            entry.action == ActivityAction::View
                && entry.success
                && entry.resource_type == resource_type
                && entry.occurred_at >= since
        }) {
            let Some(resource_id) = entry.resource_id else {
                continue;
            };

            let (count, latest_title) = viewed.entry(resource_id).or_default();
            *count += 1;
            if let Some(title) = &entry.resource_title
                && latest_title
                    .as_ref()
                    .is_none_or(|(seen_at, _)| entry.occurred_at >= *seen_at)
            {
                *latest_title = Some((entry.occurred_at, title.clone()));
            }
        }

        let mut ranked: Vec<ViewedResource> = viewed
            .into_iter()
            .map(|(resource_id, (view_count, latest_title))| ViewedResource {
                resource_id,
                resource_title: latest_title.map(|(_, title)| title),
                view_count,
            })
            .collect();
        ranked.sort_by(|left, right| {
            right
                .view_count
                .cmp(&left.view_count)
                .then(left.resource_id.cmp(&right.resource_id))
        });
        ranked.truncate(limit);

        Ok(ranked)
    }

    async fn list_field_history(
        &self,
        resource_type: ResourceType,
        resource_id: i64,
        limit: usize,
    ) -> AppResult<Vec<FieldHistoryEntry>> {
        let state = self.state.read().await;

        let mut history: Vec<&FieldHistoryEntry> = state
            .field_history
            .iter()
            .filter(|stored| {
                stored.resource_type == resource_type && stored.resource_id == Some(resource_id)
            })
            .map(|stored| &stored.change)
            .collect();
        // Stable, so changes of one entry keep their recorded order.
        history.sort_by(|left, right| {
            right
                .occurred_at
                .cmp(&left.occurred_at)
                .then(right.entry_id.cmp(&left.entry_id))
        });

        Ok(history.into_iter().take(limit).cloned().collect())
    }

    async fn count_entries_before(&self, cutoff: DateTime<Utc>) -> AppResult<u64> {
        let state = self.state.read().await;
        let expired = state
            .entries
            .iter()
            .filter(|entry| entry.occurred_at < cutoff)
            .count();

        Ok(u64::try_from(expired).unwrap_or(u64::MAX))
    }

    async fn purge_entries_before(
        &self,
        cutoff: DateTime<Utc>,
        batch_size: u32,
    ) -> AppResult<u64> {
        let mut state = self.state.write().await;

        let mut expired: Vec<(DateTime<Utc>, i64)> = state
            .entries
            .iter()
            .filter(|entry| entry.occurred_at < cutoff)
            .map(|entry| (entry.occurred_at, entry.entry_id))
            .collect();
        expired.sort_unstable();
        expired.truncate(usize::try_from(batch_size).unwrap_or(usize::MAX));

        let doomed: Vec<i64> = expired.into_iter().map(|(_, entry_id)| entry_id).collect();
        state
            .entries
            .retain(|entry| !doomed.contains(&entry.entry_id));

        Ok(u64::try_from(doomed.len()).unwrap_or(u64::MAX))
    }

    async fn count_field_changes_before(&self, cutoff: DateTime<Utc>) -> AppResult<u64> {
        let state = self.state.read().await;
        let expired = state
            .field_history
            .iter()
            .filter(|stored| stored.change.occurred_at < cutoff)
            .count();

        Ok(u64::try_from(expired).unwrap_or(u64::MAX))
    }

    async fn purge_field_changes_before(
        &self,
        cutoff: DateTime<Utc>,
        batch_size: u32,
    ) -> AppResult<u64> {
        let mut state = self.state.write().await;
        let mut remaining = usize::try_from(batch_size).unwrap_or(usize::MAX);
        let before = state.field_history.len();

        state.field_history.retain(|stored| {
            if remaining > 0 && stored.change.occurred_at < cutoff {
                remaining -= 1;
                false
            } else {
                true
            }
        });

        Ok(u64::try_from(before - state.field_history.len()).unwrap_or(u64::MAX))
    }
}

fn within(
    occurred_at: DateTime<Utc>,
    occurred_after: Option<DateTime<Utc>>,
    occurred_before: Option<DateTime<Utc>>,
) -> bool {
    occurred_after.is_none_or(|after| occurred_at >= after)
        && occurred_before.is_none_or(|before| occurred_at < before)
}

fn sort_newest_first(entries: &mut [&ActivityLogEntry]) {
    entries.sort_by(|left, right| {
        right
            .occurred_at
            .cmp(&left.occurred_at)
            .then(right.entry_id.cmp(&left.entry_id))
    });
}

fn bucket_key(entry: &ActivityLogEntry, group_by: ActivityGroupBy) -> String {
    match group_by {
        ActivityGroupBy::Action => entry.action.as_str().to_owned(),
        ActivityGroupBy::ResourceType => entry.resource_type.as_str().to_owned(),
        ActivityGroupBy::Day => entry.occurred_at.format("%Y-%m-%d").to_string(),
        ActivityGroupBy::Actor => entry.actor_id.map_or_else(
            || ActivityGroupBy::ANONYMOUS_ACTOR_KEY.to_owned(),
            |actor: ActorId| actor.to_string(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use contractdesk_application::{
        ActivityEventRepository, ActivityGroupBy, ActivityLogQuery, ActivityLogRepository,
        ActivitySummaryQuery,
    };
    use contractdesk_core::ActorId;
    use contractdesk_domain::{
        ActivityAction, ActivityEvent, ActivityEventInput, FieldChange, ResourceType,
    };

    use super::InMemoryActivityLogRepository;

    fn reference_now() -> DateTime<Utc> {
        match Utc.with_ymd_and_hms(2026, 10, 19, 8, 0, 0).single() {
            Some(now) => now,
            None => panic!("valid timestamp rejected"),
        }
    }

    fn event(
        actor_id: Option<i64>,
        action: ActivityAction,
        resource_id: i64,
        title: &str,
        occurred_at: DateTime<Utc>,
    ) -> ActivityEvent {
        let mut input = ActivityEventInput::new(action, ResourceType::Contract);
        input.actor_id = actor_id.map(ActorId::new);
        input.resource_id = Some(resource_id);
        input.resource_title = Some(title.to_owned());
        if action == ActivityAction::Update {
            input.field_changes = match FieldChange::new(
                "status",
                Some("draft".to_owned()),
                Some("active".to_owned()),
            ) {
                Ok(change) => vec![change],
                Err(error) => panic!("valid field change rejected: {error}"),
            };
        }

        match ActivityEvent::with_occurred_at(input, occurred_at) {
            Ok(event) => event,
            Err(error) => panic!("valid event rejected: {error}"),
        }
    }

    async fn seeded() -> InMemoryActivityLogRepository {
        let repository = InMemoryActivityLogRepository::new();
        let now = reference_now();
        let events = [
            event(Some(1), ActivityAction::View, 10, "Lease", now - Duration::days(40)),
            event(Some(1), ActivityAction::View, 10, "Lease v2", now - Duration::hours(5)),
            event(Some(2), ActivityAction::View, 10, "Lease v2", now - Duration::hours(3)),
            event(None, ActivityAction::View, 20, "NDA", now - Duration::hours(2)),
            event(Some(2), ActivityAction::Update, 20, "NDA", now - Duration::hours(1)),
        ];
        for event in &events {
            assert!(repository.append_event(event).await.is_ok());
        }
        repository
    }

    #[tokio::test]
    async fn listing_is_newest_first_and_filtered() {
        let repository = seeded().await;

        let listed = repository
            .list_recent_entries(ActivityLogQuery {
                action: Some(ActivityAction::View),
                limit: 2,
                ..ActivityLogQuery::default()
            })
            .await
            .unwrap_or_default();

        let ids: Vec<Option<i64>> = listed.iter().map(|entry| entry.resource_id).collect();
        assert_eq!(ids, vec![Some(20), Some(10)]);
        assert_eq!(listed[1].actor_id, Some(ActorId::new(2)));
    }

    #[tokio::test]
    async fn actor_summary_groups_anonymous_events() {
        let repository = seeded().await;

        let summary = repository
            .summarize_entries(ActivitySummaryQuery::new(ActivityGroupBy::Actor))
            .await
            .unwrap_or_default();

        assert_eq!(summary.get("1"), Some(&2));
        assert_eq!(summary.get("2"), Some(&2));
        assert_eq!(summary.get("anonymous"), Some(&1));
    }

    #[tokio::test]
    async fn most_viewed_uses_latest_title_within_window() {
        let repository = seeded().await;

        let viewed = repository
            .most_viewed_resources(
                ResourceType::Contract,
                reference_now() - Duration::days(30),
                10,
            )
            .await
            .unwrap_or_default();

        assert_eq!(viewed.len(), 2);
        assert_eq!(viewed[0].resource_id, 10);
        assert_eq!(viewed[0].view_count, 2);
        assert_eq!(viewed[0].resource_title.as_deref(), Some("Lease v2"));
    }

    #[tokio::test]
    async fn field_history_lists_update_changes() {
        let repository = seeded().await;

        let history = repository
            .list_field_history(ResourceType::Contract, 20, 10)
            .await
            .unwrap_or_default();

        assert_eq!(history.len(), 1);
        assert_eq!(history[0].field_name, "status");
        assert_eq!(history[0].new_value.as_deref(), Some("active"));
    }

    #[tokio::test]
    async fn purge_is_batched_and_exclusive_of_recent_entries() {
        let repository = seeded().await;
        let cutoff = reference_now() - Duration::days(30);

        assert_eq!(repository.count_entries_before(cutoff).await.unwrap_or(0), 1);
        assert_eq!(repository.purge_entries_before(cutoff, 10).await.unwrap_or(0), 1);
        assert_eq!(repository.purge_entries_before(cutoff, 10).await.unwrap_or(1), 0);
        assert_eq!(repository.len().await, 4);
    }

    #[tokio::test]
    async fn field_history_outlives_its_purged_entry() {
        let repository = InMemoryActivityLogRepository::new();
        let now = reference_now();
        let old_update =
            event(Some(3), ActivityAction::Update, 30, "SLA", now - Duration::days(45));
        let older_update =
            event(Some(3), ActivityAction::Update, 30, "SLA", now - Duration::days(95));
        assert!(repository.append_event(&old_update).await.is_ok());
        assert!(repository.append_event(&older_update).await.is_ok());

        let entry_cutoff = now - Duration::days(30);
        assert_eq!(repository.purge_entries_before(entry_cutoff, 10).await.unwrap_or(0), 2);
        assert!(repository.is_empty().await);

        let history = repository
            .list_field_history(ResourceType::Contract, 30, 10)
            .await
            .unwrap_or_default();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].occurred_at, now - Duration::days(45));

        let history_cutoff = now - Duration::days(90);
        assert_eq!(
            repository.count_field_changes_before(history_cutoff).await.unwrap_or(0),
            1
        );
        assert_eq!(
            repository.purge_field_changes_before(history_cutoff, 10).await.unwrap_or(0),
            1
        );

        let history = repository
            .list_field_history(ResourceType::Contract, 30, 10)
            .await
            .unwrap_or_default();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].occurred_at, now - Duration::days(45));
    }
}
