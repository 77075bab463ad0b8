//! Field-level comparison of page metadata snapshots.

use serde::Serialize;
use serde_json::{Map, Value};

/// Volatile or derived fields that never count as an edit.
pub const IGNORED_FIELDS: [&str; 4] = ["published_at", "updated_at", "author_id", "contributor_ids"];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldChange {
    pub field: String,
    pub before: Value,
    pub after: Value,
}

/// Fields whose values differ between `prev` and `next`, in `next`'s key order.
///
/// Arrays of equal length are treated as unchanged without looking at their
/// elements. Keys present on only one side compare against `null`.
pub fn metadata_differences(prev: &Value, next: &Value) -> Vec<FieldChange> {
    let empty = Map::new();
    let prev = prev.as_object().unwrap_or(&empty);
    let next = next.as_object().unwrap_or(&empty);

    let mut keys: Vec<&String> = next.keys().collect();
    keys.extend(prev.keys().filter(|key| !next.contains_key(key.as_str())));

    keys.into_iter()
        .filter(|key| !IGNORED_FIELDS.contains(&key.as_str()))
        .filter_map(|key| {
            let before = prev.get(key).unwrap_or(&Value::Null);
            let after = next.get(key).unwrap_or(&Value::Null);
            let unchanged = match (before, after) {
                (Value::Array(lhs), Value::Array(rhs)) => lhs.len() == rhs.len(),
                (lhs, rhs) => lhs == rhs,
            };
            (!unchanged).then(|| FieldChange {
                field: key.clone(),
                before: before.clone(),
                after: after.clone(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reports_changed_scalar_fields() {
        let prev = json!({ "title": "Old", "slug": "same", "published": false });
        let next = json!({ "title": "New", "slug": "same", "published": true });

        let changes = metadata_differences(&prev, &next);
        let fields: Vec<&str> = changes.iter().map(|c| c.field.as_str()).collect();
        assert_eq!(fields.len(), 2);
        assert!(fields.contains(&"title"));
        assert!(fields.contains(&"published"));
    }

    #[test]
    fn ignores_volatile_fields() {
        let prev = json!({ "updated_at": "2024-01-01T00:00:00Z", "author_id": "u1" });
        let next = json!({ "updated_at": "2024-06-01T00:00:00Z", "author_id": "u2" });
        assert!(metadata_differences(&prev, &next).is_empty());
    }

    #[test]
    fn equal_length_arrays_count_as_unchanged() {
        let prev = json!({ "tags": ["a", "b"] });
        let next = json!({ "tags": ["c", "d"] });
        assert!(metadata_differences(&prev, &next).is_empty());

        let grown = json!({ "tags": ["a", "b", "c"] });
        assert_eq!(metadata_differences(&prev, &grown).len(), 1);
    }

    #[test]
    fn missing_keys_compare_against_null() {
        let prev = json!({ "description": "text" });
        let next = json!({});
        let changes = metadata_differences(&prev, &next);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].after, Value::Null);
    }
}
