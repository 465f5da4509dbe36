mod database;
mod lifecycle;
mod state_builder;

pub use database::{connect, connect_and_migrate};
pub use state_builder::{ApiRuntime, build_api_runtime};
