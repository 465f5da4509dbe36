//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod in_memory_activity_log_repository;
mod postgres_activity_log_repository;
mod postgres_contract_retention_repository;
mod store_error;

pub use in_memory_activity_log_repository::InMemoryActivityLogRepository;
pub use postgres_activity_log_repository::PostgresActivityLogRepository;
pub use postgres_contract_retention_repository::PostgresContractRetentionRepository;
