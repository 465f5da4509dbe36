use contractdesk_core::AppError;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

pub async fn connect(database_url: &str, store: &str) -> Result<PgPool, AppError> {
    PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
        .map_err(|error| AppError::Unavailable(format!("failed to connect to {store}: {error}")))
}

/// Connects to the log store and applies its migrations.
pub async fn connect_and_migrate(database_url: &str) -> Result<PgPool, AppError> {
    let pool = connect(database_url, "log store").await?;

    sqlx::migrate!("../../crates/infrastructure/migrations")
        .run(&pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to run migrations: {error}")))?;

    Ok(pool)
}
