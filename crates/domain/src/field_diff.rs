use contractdesk_core::AppResult;
use serde_json::{Map, Value};

use crate::FieldChange;

/// Contract fields whose changes are kept in the field history.
pub const CONTRACT_TRACKED_FIELDS: &[&str] = &[
    "title",
    "description",
    "client_id",
    "contract_type",
    "status",
    "contract_value",
    "effective_date",
    "expiration_date",
    "renewal_date",
];

/// Compares two entity snapshots and returns changes for tracked fields.
///
/// Values are compared in their rendered form: strings verbatim, null and
/// missing keys as `None`, everything else as JSON text. Changes come back
/// in `tracked_fields` order.
pub fn diff_fields(
    prior: &Map<String, Value>,
    current: &Map<String, Value>,
    tracked_fields: &[&str],
) -> AppResult<Vec<FieldChange>> {
    let mut changes = Vec::new();

    for field_name in tracked_fields {
        let old_value = render_value(prior.get(*field_name));
        let new_value = render_value(current.get(*field_name));

        if old_value != new_value {
            changes.push(FieldChange::new(*field_name, old_value, new_value)?);
        }
    }

    Ok(changes)
}

fn render_value(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use serde_json::{Map, Value, json};

    use super::{CONTRACT_TRACKED_FIELDS, diff_fields};

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object snapshot, got {other}"),
        }
    }

    #[test]
    fn only_changed_tracked_fields_are_reported_in_order() {
        let prior = object(json!({
            "title": "Master Services Agreement",
            "status": "draft",
            "contract_value": 1200.5,
            "notes": "internal"
        }));
        let current = object(json!({
            "title": "Master Services Agreement",
            "status": "active",
            "contract_value": 1500,
            "notes": "changed but untracked"
        }));

        let changes = diff_fields(&prior, &current, CONTRACT_TRACKED_FIELDS).unwrap_or_default();

        let names: Vec<&str> = changes.iter().map(|change| change.field_name()).collect();
        assert_eq!(names, vec!["status", "contract_value"]);
        assert_eq!(changes[0].old_value(), Some("draft"));
        assert_eq!(changes[0].new_value(), Some("active"));
        assert_eq!(changes[1].old_value(), Some("1200.5"));
        assert_eq!(changes[1].new_value(), Some("1500"));
    }

    #[test]
    fn null_and_missing_values_compare_equal() {
        let prior = object(json!({ "renewal_date": null }));
        let current = object(json!({}));

        let changes = diff_fields(&prior, &current, CONTRACT_TRACKED_FIELDS);
        assert!(changes.is_ok_and(|changes| changes.is_empty()));
    }

    #[test]
    fn cleared_values_are_reported_as_none() {
        let prior = object(json!({ "expiration_date": "2026-12-31" }));
        let current = object(json!({ "expiration_date": null }));

        let changes = diff_fields(&prior, &current, CONTRACT_TRACKED_FIELDS).unwrap_or_default();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].old_value(), Some("2026-12-31"));
        assert_eq!(changes[0].new_value(), None);
    }

    proptest! {
        #[test]
        fn identical_snapshots_never_produce_changes(
            status in "[a-z]{0,12}",
            value in any::<i64>(),
        ) {
            let snapshot = object(json!({ "status": status, "contract_value": value }));
            let changes = diff_fields(&snapshot, &snapshot.clone(), CONTRACT_TRACKED_FIELDS);
            prop_assert!(changes.is_ok_and(|changes| changes.is_empty()));
        }
    }
}
