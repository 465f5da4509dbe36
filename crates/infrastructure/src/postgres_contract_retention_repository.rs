use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use contractdesk_application::{PurgedRecord, SoftDeleteCounts, SoftDeleteRetentionRepository};
use contractdesk_core::AppResult;

use crate::store_error::map_store_error;


/// PostgreSQL adapter purging soft-deleted contracts from the business datastore.
///
/// Each batch locks its rows with `SKIP LOCKED`, so rows a request is
/// currently restoring are left for a later sweep.
#[derive(Clone)]
pub struct PostgresContractRetentionRepository {
    pool: PgPool,
}

impl PostgresContractRetentionRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct ExpiredContractRow {
    id: i64,
    title: Option<String>,
    deleted_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct SoftDeleteCountRow {
    ready_for_purge: i64,
    restorable: i64,
}

#[async_trait]
impl SoftDeleteRetentionRepository for PostgresContractRetentionRepository {
    async fn purge_soft_deleted_before(
        &self,
        cutoff: DateTime<Utc>,
        batch_size: u32,
    ) -> AppResult<Vec<PurgedRecord>> {
        let mut transaction = self
            .pool
            .begin()
            .await
            .map_err(|error| map_store_error("failed to begin contract purge", error))?;

        let rows = sqlx::query_as::<_, ExpiredContractRow>(
            r#"
            SELECT id, title, deleted_at
            FROM contracts
            WHERE deleted_at IS NOT NULL
                AND deleted_at < $1
            ORDER BY deleted_at, id
            LIMIT $2
            FOR UPDATE SKIP LOCKED
            "#,
        )
        .bind(cutoff)
        .bind(i64::from(batch_size))
        .fetch_all(&mut *transaction)
        .await
        .map_err(|error| map_store_error("failed to select expired contracts", error))?;

        if rows.is_empty() {
            transaction
                .commit()
                .await
                .map_err(|error| map_store_error("failed to commit contract purge", error))?;
            return Ok(Vec::new());
        }

        let contract_ids: Vec<i64> = rows.iter().map(|row| row.id).collect();

        sqlx::query("DELETE FROM contract_status_history WHERE contract_id = ANY($1)")
            .bind(contract_ids.as_slice())
            .execute(&mut *transaction)
            .await
            .map_err(|error| map_store_error("failed to purge contract status history", error))?;

        sqlx::query("DELETE FROM contract_access_history WHERE contract_id = ANY($1)")
            .bind(contract_ids.as_slice())
            .execute(&mut *transaction)
            .await
            .map_err(|error| map_store_error("failed to purge contract access history", error))?;

        sqlx::query("DELETE FROM contracts WHERE id = ANY($1)")
            .bind(contract_ids.as_slice())
            .execute(&mut *transaction)
            .await
            .map_err(|error| map_store_error("failed to purge expired contracts", error))?;

        transaction
            .commit()
            .await
            .map_err(|error| map_store_error("failed to commit contract purge", error))?;

        Ok(rows
            .into_iter()
            .map(|row| PurgedRecord {
                record_id: row.id,
                title: row.title,
                deleted_at: row.deleted_at,
            })
            .collect())
    }

    async fn count_soft_deleted(&self, cutoff: DateTime<Utc>) -> AppResult<SoftDeleteCounts> {
        let row = sqlx::query_as::<_, SoftDeleteCountRow>(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE deleted_at < $1) AS ready_for_purge,
                COUNT(*) FILTER (WHERE deleted_at >= $1) AS restorable
            FROM contracts
            WHERE deleted_at IS NOT NULL
            "#,
        )
        .bind(cutoff)
        .fetch_one(&self.pool)
        .await
        .map_err(|error| map_store_error("failed to count soft-deleted contracts", error))?;

        Ok(SoftDeleteCounts {
            ready_for_purge: u64::try_from(row.ready_for_purge).unwrap_or(0),
            restorable: u64::try_from(row.restorable).unwrap_or(0),
        })
    }
}
