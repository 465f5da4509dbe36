pub mod activity;
pub mod health;
pub mod retention;
