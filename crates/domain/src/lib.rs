//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod activity;
mod field_diff;
mod retention;

pub use activity::{
    ACTIVITY_DETAIL_MAX_LENGTH, ActivityAction, ActivityEvent, ActivityEventInput, ClientContext,
    FIELD_NAME_MAX_LENGTH, FieldChange, RESOURCE_TITLE_MAX_LENGTH, ResourceType,
    describe_activity,
};
pub use field_diff::{CONTRACT_TRACKED_FIELDS, diff_fields};
pub use retention::{DEFAULT_FIELD_HISTORY_RETENTION_DAYS, DEFAULT_RETENTION_DAYS, RetentionWindow};
