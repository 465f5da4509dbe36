use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::{Extension, Path, Query, State};
use chrono::{DateTime, Utc};
use contractdesk_application::{
    ActivityEventRepository, ActivityLogQuery, ActivityLogRepository, ActivityLogWriter,
    ActivityQueryService, ActivityRecorder, ActivityWriterConfig, PurgedRecord,
    RequestActivityContext, RetentionSweeper, RetentionSweeperConfig, SoftDeleteCounts,
    SoftDeleteRetentionRepository, TracingWriterDiagnostics,
};
use contractdesk_core::{ActorId, AppError, AppResult};
use contractdesk_domain::{
    ActivityAction, ActivityEvent, ActivityEventInput, ClientContext, ResourceType,
};
use contractdesk_infrastructure::InMemoryActivityLogRepository;
use sqlx::postgres::PgPoolOptions;

use crate::error::ApiError;
use crate::handlers::retention::retention_statistics_handler;
use crate::state::AppState;

use super::{
    ActivityListQuery, LimitParams, field_history_handler, list_activity_handler,
    user_activity_feed_handler,
};

const ADMIN_ID: i64 = 7;

struct FixedSoftDeleteRepository {
    counts: SoftDeleteCounts,
}

#[async_trait]
impl SoftDeleteRetentionRepository for FixedSoftDeleteRepository {
    async fn purge_soft_deleted_before(
        &self,
        _cutoff: DateTime<Utc>,
        _batch_size: u32,
    ) -> AppResult<Vec<PurgedRecord>> {
        Ok(Vec::new())
    }

    async fn count_soft_deleted(&self, _cutoff: DateTime<Utc>) -> AppResult<SoftDeleteCounts> {
        Ok(self.counts)
    }
}

struct UnavailableEventStore;

#[async_trait]
impl ActivityEventRepository for UnavailableEventStore {
    async fn append_event(&self, _event: &ActivityEvent) -> AppResult<i64> {
        Err(AppError::Unavailable("log store is down".to_owned()))
    }
}

struct Harness {
    state: AppState,
    writer: ActivityLogWriter,
    repository: Arc<InMemoryActivityLogRepository>,
}

impl Harness {
    async fn recorded_entries(&mut self) -> Vec<contractdesk_application::ActivityLogEntry> {
        let report = self.writer.stop(Duration::from_secs(2)).await;
        assert!(report.drained);

        self.repository
            .list_recent_entries(ActivityLogQuery::default())
            .await
            .unwrap_or_default()
    }
}

fn harness() -> Harness {
    let repository = Arc::new(InMemoryActivityLogRepository::new());
    harness_with_event_store(
        repository.clone(),
        repository,
        ActivityWriterConfig::default(),
    )
}

fn harness_with_event_store(
    event_store: Arc<dyn ActivityEventRepository>,
    repository: Arc<InMemoryActivityLogRepository>,
    writer_config: ActivityWriterConfig,
) -> Harness {
    let mut writer = match ActivityLogWriter::new(
        event_store,
        Arc::new(TracingWriterDiagnostics),
        writer_config,
    ) {
        Ok(writer) => writer,
        Err(error) => panic!("writer config rejected: {error}"),
    };
    if let Err(error) = writer.start() {
        panic!("writer failed to start: {error}");
    }

    let retention_sweeper = match RetentionSweeper::new(
        repository.clone(),
        Arc::new(FixedSoftDeleteRepository {
            counts: SoftDeleteCounts {
                ready_for_purge: 2,
                restorable: 5,
            },
        }),
        RetentionSweeperConfig::default(),
    ) {
        Ok(sweeper) => Arc::new(sweeper),
        Err(error) => panic!("default sweeper config rejected: {error}"),
    };

    let business_pool = match PgPoolOptions::new().connect_lazy("postgres://localhost/contractdesk")
    {
        Ok(pool) => pool,
        Err(error) => panic!("lazy pool construction failed: {error}"),
    };

    let state = AppState {
        query_service: ActivityQueryService::new(repository.clone()),
        recorder: ActivityRecorder::new(writer.queue()),
        activity_queue: writer.queue(),
        retention_sweeper,
        business_pool,
        log_pool: None,
        admin_api_token: Arc::from("0123456789abcdef0123456789abcdef"),
    };

    Harness {
        state,
        writer,
        repository,
    }
}

fn admin_context() -> RequestActivityContext {
    RequestActivityContext::for_actor(
        ActorId::new(ADMIN_ID),
        ClientContext::new(Some("192.0.2.1".to_owned()), Some("admin-cli".to_owned())),
    )
}

async fn seed_update(repository: &InMemoryActivityLogRepository, actor_id: i64, contract_id: i64) {
    let mut input = ActivityEventInput::new(ActivityAction::Update, ResourceType::Contract);
    input.actor_id = Some(ActorId::new(actor_id));
    input.resource_id = Some(contract_id);
    input.resource_title = Some("Master Services Agreement".to_owned());

    let event = match ActivityEvent::new(input) {
        Ok(event) => event,
        Err(error) => panic!("valid event rejected: {error}"),
    };
    assert!(repository.append_event(&event).await.is_ok());
}

#[tokio::test]
async fn listing_activity_records_an_admin_view() {
    let mut harness = harness();
    seed_update(&harness.repository, 3, 11).await;
    seed_update(&harness.repository, 4, 12).await;

    let response = list_activity_handler(
        State(harness.state.clone()),
        Extension(admin_context()),
        Query(ActivityListQuery::default()),
    )
    .await;

    let Ok(axum::Json(entries)) = response else {
        panic!("listing activity should succeed");
    };
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].resource_id, Some(12));

    let recorded = harness.recorded_entries().await;
    assert_eq!(recorded.len(), 3);
    assert_eq!(recorded[0].action, ActivityAction::View);
    assert_eq!(recorded[0].resource_type, ResourceType::Other);
    assert_eq!(recorded[0].resource_title.as_deref(), Some("Activity log"));
    assert_eq!(recorded[0].actor_id, Some(ActorId::new(ADMIN_ID)));
    assert_eq!(recorded[0].ip_address.as_deref(), Some("192.0.2.1"));
    assert!(recorded[0].success);
}

#[tokio::test]
async fn invalid_filters_are_rejected_and_recorded_as_failures() {
    let mut harness = harness();

    let response = list_activity_handler(
        State(harness.state.clone()),
        Extension(admin_context()),
        Query(ActivityListQuery {
            action: Some("approve".to_owned()),
            ..ActivityListQuery::default()
        }),
    )
    .await;
    assert!(matches!(response, Err(ApiError(AppError::Validation(_)))));

    let history = field_history_handler(
        State(harness.state.clone()),
        Extension(admin_context()),
        Path(("invoice".to_owned(), 1)),
        Query(LimitParams::default()),
    )
    .await;
    assert!(matches!(history, Err(ApiError(AppError::Validation(_)))));

    let recorded = harness.recorded_entries().await;
    assert_eq!(recorded.len(), 2);
    assert!(recorded.iter().all(|entry| !entry.success));
    assert!(
        recorded
            .iter()
            .all(|entry| entry.detail.as_deref().is_some_and(|detail| detail.contains("unknown")))
    );
}

#[tokio::test]
async fn user_feed_renders_messages_and_records_a_user_view() {
    let mut harness = harness();
    seed_update(&harness.repository, 3, 11).await;

    let response = user_activity_feed_handler(
        State(harness.state.clone()),
        Extension(admin_context()),
        Path(3),
        Query(LimitParams::default()),
    )
    .await;

    let Ok(axum::Json(feed)) = response else {
        panic!("feed should load");
    };
    assert_eq!(feed.len(), 1);
    assert_eq!(
        feed[0].message,
        "Updated contract 'Master Services Agreement'"
    );

    let recorded = harness.recorded_entries().await;
    assert_eq!(recorded[0].resource_type, ResourceType::User);
    assert_eq!(recorded[0].resource_id, Some(3));
}

#[tokio::test]
async fn retention_statistics_combine_both_stores() {
    let mut harness = harness();

    let response =
        retention_statistics_handler(State(harness.state.clone()), Extension(admin_context()))
            .await;

    let Ok(axum::Json(statistics)) = response else {
        panic!("statistics should load");
    };
    assert_eq!(statistics.window_days, 30);
    assert_eq!(statistics.activity_entries_ready, 0);
    assert_eq!(statistics.soft_deleted_ready, 2);
    assert_eq!(statistics.soft_deleted_restorable, 5);
    assert_eq!(statistics.field_history_window_days, 90);
    assert_eq!(statistics.field_changes_ready, 0);

    let recorded = harness.recorded_entries().await;
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].resource_title.as_deref(), Some("Retention"));
}

#[tokio::test]
async fn admin_requests_succeed_while_the_log_store_is_down() {
    let repository = Arc::new(InMemoryActivityLogRepository::new());
    seed_update(&repository, 3, 11).await;
    let mut harness = harness_with_event_store(
        Arc::new(UnavailableEventStore),
        repository,
        ActivityWriterConfig {
            max_attempts: 2,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(2),
            ..ActivityWriterConfig::default()
        },
    );

    let response = list_activity_handler(
        State(harness.state.clone()),
        Extension(admin_context()),
        Query(ActivityListQuery::default()),
    )
    .await;

    let Ok(axum::Json(entries)) = response else {
        panic!("listing activity should succeed without a log store");
    };
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].resource_id, Some(11));

    let report = harness.writer.stop(Duration::from_secs(2)).await;
    assert!(report.drained);
    assert_eq!(report.persisted, 0);
    assert_eq!(report.dropped, 1);
    assert_eq!(harness.repository.len().await, 1);
}
