use sqlx::PgPool;

use crate::dto::HealthDependencyStatus;

pub(super) async fn check_postgres(pool: &PgPool) -> HealthDependencyStatus {
    let check = sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(pool)
        .await;

    match check {
        Ok(_) => HealthDependencyStatus {
            status: "ok",
            detail: None,
        },
        Err(error) => HealthDependencyStatus {
            status: "error",
            detail: Some(format!("postgres check failed: {error}")),
        },
    }
}

pub(super) fn memory_store_status() -> HealthDependencyStatus {
    HealthDependencyStatus {
        status: "memory",
        detail: Some("activity log is held in process memory".to_owned()),
    }
}
