use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use contractdesk_application::{
    ActivityEventRepository, ActivityGroupBy, ActivityLogEntry, ActivityLogQuery,
    ActivityLogRepository, ActivitySummaryQuery, FieldHistoryEntry, ViewedResource,
};
use contractdesk_core::{ActorId, AppError, AppResult};
use contractdesk_domain::{ActivityAction, ActivityEvent, FieldChange, ResourceType};

use crate::store_error::map_store_error;


/// PostgreSQL-backed activity log store.
#[derive(Clone)]
pub struct PostgresActivityLogRepository {
    pool: PgPool,
}

impl PostgresActivityLogRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn load_field_changes(
        &self,
        entry_ids: &[i64],
    ) -> AppResult<HashMap<i64, Vec<FieldChange>>> {
        if entry_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = sqlx::query_as::<_, FieldChangeRow>(
            r#"
            SELECT entry_id, field_name, old_value, new_value
            FROM activity_field_changes
            WHERE entry_id = ANY($1)
            ORDER BY entry_id, position
            "#,
        )
        .bind(entry_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| map_store_error("failed to load activity field changes", error))?;

        let mut changes: HashMap<i64, Vec<FieldChange>> = HashMap::new();
        for row in rows {
            changes
                .entry(row.entry_id)
                .or_default()
                .push(FieldChange::new(row.field_name, row.old_value, row.new_value)?);
        }

        Ok(changes)
    }
}

#[derive(Debug, FromRow)]
struct ActivityLogRow {
    id: i64,
    actor_id: Option<i64>,
    action: String,
    resource_type: String,
    resource_id: Option<i64>,
    resource_title: Option<String>,
    success: bool,
    detail: Option<String>,
    ip_address: Option<String>,
    user_agent: Option<String>,
    occurred_at: DateTime<Utc>,
    recorded_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct FieldChangeRow {
    entry_id: i64,
    field_name: String,
    old_value: Option<String>,
    new_value: Option<String>,
}

#[derive(Debug, FromRow)]
struct SummaryRow {
    bucket: String,
    total: i64,
}

#[derive(Debug, FromRow)]
struct ViewedResourceRow {
    resource_id: i64,
    resource_title: Option<String>,
    view_count: i64,
}

#[derive(Debug, FromRow)]
struct FieldHistoryRow {
    entry_id: i64,
    actor_id: Option<i64>,
    field_name: String,
    old_value: Option<String>,
    new_value: Option<String>,
    occurred_at: DateTime<Utc>,
}

#[async_trait]
impl ActivityEventRepository for PostgresActivityLogRepository {
    async fn append_event(&self, event: &ActivityEvent) -> AppResult<i64> {
        let mut transaction = self
            .pool
            .begin()
            .await
            .map_err(|error| map_store_error("failed to begin activity transaction", error))?;

        let entry_id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO activity_log_entries (
                actor_id,
                action,
                resource_type,
                resource_id,
                resource_title,
                success,
                detail,
                ip_address,
                user_agent,
                occurred_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id
            "#,
        )
        .bind(event.actor_id().map(|actor| actor.as_i64()))
        .bind(event.action().as_str())
        .bind(event.resource_type().as_str())
        .bind(event.resource_id())
        .bind(event.resource_title())
        .bind(event.success())
        .bind(event.detail())
        .bind(event.client_context().and_then(|client| client.ip_address()))
        .bind(event.client_context().and_then(|client| client.user_agent()))
        .bind(event.occurred_at())
        .fetch_one(&mut *transaction)
        .await
        .map_err(|error| map_store_error("failed to append activity event", error))?;

        for (position, change) in event.field_changes().iter().enumerate() {
            let position = i32::try_from(position).map_err(|error| {
                AppError::Validation(format!("too many field changes in one event: {error}"))
            })?;

            sqlx::query(
                r#"
                INSERT INTO activity_field_changes (
                    entry_id,
                    position,
                    actor_id,
                    resource_type,
                    resource_id,
                    field_name,
                    old_value,
                    new_value,
                    occurred_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                "#,
            )
            .bind(entry_id)
            .bind(position)
            .bind(event.actor_id().map(|actor| actor.as_i64()))
            .bind(event.resource_type().as_str())
            .bind(event.resource_id())
            .bind(change.field_name())
            .bind(change.old_value())
            .bind(change.new_value())
            .bind(event.occurred_at())
            .execute(&mut *transaction)
            .await
            .map_err(|error| map_store_error("failed to append activity field change", error))?;
        }

        transaction
            .commit()
            .await
            .map_err(|error| map_store_error("failed to commit activity event", error))?;

        Ok(entry_id)
    }
}

#[async_trait]
impl ActivityLogRepository for PostgresActivityLogRepository {
    async fn list_recent_entries(
        &self,
        query: ActivityLogQuery,
    ) -> AppResult<Vec<ActivityLogEntry>> {
        let rows = sqlx::query_as::<_, ActivityLogRow>(
            r#"
            SELECT
                id,
                actor_id,
                action,
                resource_type,
                resource_id,
                resource_title,
                success,
                detail,
                ip_address,
                user_agent,
                occurred_at,
                recorded_at
            FROM activity_log_entries
            WHERE ($1::BIGINT IS NULL OR actor_id = $1)
                AND ($2::TEXT IS NULL OR action = $2)
                AND ($3::TEXT IS NULL OR resource_type = $3)
                AND ($4::TIMESTAMPTZ IS NULL OR occurred_at >= $4)
                AND ($5::TIMESTAMPTZ IS NULL OR occurred_at < $5)
            ORDER BY occurred_at DESC, id DESC
            LIMIT $6
            OFFSET $7
            "#,
        )
        .bind(query.actor_id.map(|actor| actor.as_i64()))
        .bind(query.action.map(|action| action.as_str()))
        .bind(query.resource_type.map(|resource_type| resource_type.as_str()))
        .bind(query.occurred_after)
        .bind(query.occurred_before)
        .bind(to_sql_count(query.limit))
        .bind(to_sql_count(query.offset))
        .fetch_all(&self.pool)
        .await
        .map_err(|error| map_store_error("failed to list activity log entries", error))?;

        let entry_ids: Vec<i64> = rows.iter().map(|row| row.id).collect();
        let mut field_changes = self.load_field_changes(&entry_ids).await?;

        rows.into_iter()
            .map(|row| {
                let changes = field_changes.remove(&row.id).unwrap_or_default();
                entry_from_row(row, changes)
            })
            .collect()
    }

    async fn summarize_entries(
        &self,
        query: ActivitySummaryQuery,
    ) -> AppResult<BTreeMap<String, u64>> {
        let bucket_expression = match query.group_by {
            ActivityGroupBy::Action => "action",
            ActivityGroupBy::ResourceType => "resource_type",
            ActivityGroupBy::Day => "to_char(occurred_at AT TIME ZONE 'UTC', 'YYYY-MM-DD')",
            ActivityGroupBy::Actor => "COALESCE(actor_id::TEXT, 'anonymous')",
        };

        let sql = format!(
            r#"
            SELECT {bucket_expression} AS bucket, COUNT(*) AS total
            FROM activity_log_entries
            WHERE ($1::BIGINT IS NULL OR actor_id = $1)
                AND ($2::TIMESTAMPTZ IS NULL OR occurred_at >= $2)
                AND ($3::TIMESTAMPTZ IS NULL OR occurred_at < $3)
            GROUP BY bucket
            "#
        );

        let rows = sqlx::query_as::<_, SummaryRow>(sql.as_str())
            .bind(query.actor_id.map(|actor| actor.as_i64()))
            .bind(query.occurred_after)
            .bind(query.occurred_before)
            .fetch_all(&self.pool)
            .await
            .map_err(|error| map_store_error("failed to summarize activity log", error))?;

        Ok(rows
            .into_iter()
            .map(|row| (row.bucket, from_sql_count(row.total)))
            .collect())
    }

    async fn most_viewed_resources(
        &self,
        resource_type: ResourceType,
        since: DateTime<Utc>,
        limit: usize,
    ) -> AppResult<Vec<ViewedResource>> {
        let rows = sqlx::query_as::<_, ViewedResourceRow>(
            r#"
            SELECT
                resource_id,
                (ARRAY_AGG(resource_title ORDER BY occurred_at DESC)
                    FILTER (WHERE resource_title IS NOT NULL))[1] AS resource_title,
                COUNT(*) AS view_count
            FROM activity_log_entries
            WHERE action = 'view'
                AND success
                AND resource_type = $1
                AND resource_id IS NOT NULL
                AND occurred_at >= $2
            GROUP BY resource_id
            ORDER BY view_count DESC, resource_id ASC
            LIMIT $3
            "#,
        )
        .bind(resource_type.as_str())
        .bind(since)
        .bind(to_sql_count(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|error| map_store_error("failed to rank viewed resources", error))?;

        Ok(rows
            .into_iter()
            .map(|row| ViewedResource {
                resource_id: row.resource_id,
                resource_title: row.resource_title,
                view_count: from_sql_count(row.view_count),
            })
            .collect())
    }

    async fn list_field_history(
        &self,
        resource_type: ResourceType,
        resource_id: i64,
        limit: usize,
    ) -> AppResult<Vec<FieldHistoryEntry>> {
        let rows = sqlx::query_as::<_, FieldHistoryRow>(
            r#"
            SELECT
                entry_id,
                actor_id,
                field_name,
                old_value,
                new_value,
                occurred_at
            FROM activity_field_changes
            WHERE resource_type = $1
                AND resource_id = $2
            ORDER BY occurred_at DESC, entry_id DESC, position ASC
            LIMIT $3
            "#,
        )
        .bind(resource_type.as_str())
        .bind(resource_id)
        .bind(to_sql_count(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|error| map_store_error("failed to list field history", error))?;

        Ok(rows
            .into_iter()
            .map(|row| FieldHistoryEntry {
                entry_id: row.entry_id,
                actor_id: row.actor_id.map(ActorId::new),
                field_name: row.field_name,
                old_value: row.old_value,
                new_value: row.new_value,
                occurred_at: row.occurred_at,
            })
            .collect())
    }

    async fn count_entries_before(&self, cutoff: DateTime<Utc>) -> AppResult<u64> {
        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM activity_log_entries
            WHERE occurred_at < $1
            "#,
        )
        .bind(cutoff)
        .fetch_one(&self.pool)
        .await
        .map_err(|error| map_store_error("failed to count expired activity entries", error))?;

        Ok(from_sql_count(total))
    }

    async fn purge_entries_before(
        &self,
        cutoff: DateTime<Utc>,
        batch_size: u32,
    ) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM activity_log_entries
            WHERE id IN (
                SELECT id
                FROM activity_log_entries
                WHERE occurred_at < $1
                ORDER BY occurred_at, id
                LIMIT $2
            )
            "#,
        )
        .bind(cutoff)
        .bind(i64::from(batch_size))
        .execute(&self.pool)
        .await
        .map_err(|error| map_store_error("failed to purge activity log entries", error))?;

        Ok(result.rows_affected())
    }

    async fn count_field_changes_before(&self, cutoff: DateTime<Utc>) -> AppResult<u64> {
        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM activity_field_changes
            WHERE occurred_at < $1
            "#,
        )
        .bind(cutoff)
        .fetch_one(&self.pool)
        .await
        .map_err(|error| map_store_error("failed to count expired field changes", error))?;

        Ok(from_sql_count(total))
    }

    async fn purge_field_changes_before(
        &self,
        cutoff: DateTime<Utc>,
        batch_size: u32,
    ) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM activity_field_changes
            WHERE id IN (
                SELECT id
                FROM activity_field_changes
                WHERE occurred_at < $1
                ORDER BY occurred_at, id
                LIMIT $2
            )
            "#,
        )
        .bind(cutoff)
        .bind(i64::from(batch_size))
        .execute(&self.pool)
        .await
        .map_err(|error| map_store_error("failed to purge field changes", error))?;

        Ok(result.rows_affected())
    }
}

fn entry_from_row(
    row: ActivityLogRow,
    field_changes: Vec<FieldChange>,
) -> AppResult<ActivityLogEntry> {
    Ok(ActivityLogEntry {
        entry_id: row.id,
        actor_id: row.actor_id.map(ActorId::new),
        action: ActivityAction::from_str(row.action.as_str())?,
        resource_type: ResourceType::from_str(row.resource_type.as_str())?,
        resource_id: row.resource_id,
        resource_title: row.resource_title,
        field_changes,
        success: row.success,
        detail: row.detail,
        ip_address: row.ip_address,
        user_agent: row.user_agent,
        occurred_at: row.occurred_at,
        recorded_at: row.recorded_at,
    })
}

fn to_sql_count(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn from_sql_count(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}
