use serde::Serialize;
use serde_json::Value;

use super::document::{compare_values, Fields};

/// Write applied to a single top-level field by [`DocumentStore::update`].
///
/// [`DocumentStore::update`]: super::DocumentStore::update
#[derive(Debug, Clone, PartialEq)]
pub enum FieldWrite {
    Set(Value),
    Delete,
    /// Append each value not already present, keeping existing order.
    ArrayUnion(Vec<Value>),
}

pub type FieldWrites = Vec<(String, FieldWrite)>;

/// Caller intent for one field of a partial update.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FieldInstruction<T> {
    #[default]
    Unchanged,
    Set(T),
    Clear,
}

impl<T: Serialize> FieldInstruction<T> {
    pub fn into_write(self) -> Result<Option<FieldWrite>, serde_json::Error> {
        Ok(match self {
            FieldInstruction::Unchanged => None,
            FieldInstruction::Set(value) => Some(FieldWrite::Set(serde_json::to_value(value)?)),
            FieldInstruction::Clear => Some(FieldWrite::Delete),
        })
    }
}

/// Ordered-set merge: appends every addition not already in `existing`.
///
/// Returns the number of values appended. Duplicates inside `additions`
/// collapse onto their first occurrence.
pub fn merge_union(existing: &mut Vec<Value>, additions: impl IntoIterator<Item = Value>) -> usize {
    let before = existing.len();
    for value in additions {
        let present = existing
            .iter()
            .any(|current| compare_values(current, &value).is_eq());
        if !present {
            existing.push(value);
        }
    }
    existing.len() - before
}

/// Recursively merges `patch` into `target`; nested objects merge, all other
/// values overwrite.
pub fn deep_merge(target: &mut Fields, patch: Fields) {
    for (key, incoming) in patch {
        match (target.get_mut(&key), incoming) {
            (Some(Value::Object(current)), Value::Object(nested)) => deep_merge(current, nested),
            (_, incoming) => {
                target.insert(key, incoming);
            }
        }
    }
}

pub fn apply_writes(fields: &mut Fields, writes: FieldWrites) {
    for (field, write) in writes {
        match write {
            FieldWrite::Set(value) => {
                fields.insert(field, value);
            }
            FieldWrite::Delete => {
                fields.remove(&field);
            }
            FieldWrite::ArrayUnion(additions) => {
                let mut current = match fields.remove(&field) {
                    Some(Value::Array(items)) => items,
                    _ => Vec::new(),
                };
                merge_union(&mut current, additions);
                fields.insert(field, Value::Array(current));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn merge_union_skips_present_and_repeated_values() {
        let mut images = vec![json!("x")];
        let added = merge_union(&mut images, vec![json!("y"), json!("x"), json!("y")]);
        assert_eq!(added, 1);
        assert_eq!(images, vec![json!("x"), json!("y")]);
    }

    #[test]
    fn instructions_map_to_writes() {
        assert_eq!(FieldInstruction::<String>::Unchanged.into_write().unwrap(), None);
        assert_eq!(
            FieldInstruction::<String>::Clear.into_write().unwrap(),
            Some(FieldWrite::Delete)
        );
        assert_eq!(
            FieldInstruction::Set("4B").into_write().unwrap(),
            Some(FieldWrite::Set(json!("4B")))
        );
    }

    #[test]
    fn deep_merge_keeps_untouched_nested_keys() {
        let mut target = json!({ "asking_offer": { "rent": 2100, "term": 12 }, "title": "Loft" })
            .as_object()
            .cloned()
            .unwrap();
        let patch = json!({ "asking_offer": { "rent": 2250 } })
            .as_object()
            .cloned()
            .unwrap();

        deep_merge(&mut target, patch);

        assert_eq!(
            Value::Object(target),
            json!({ "asking_offer": { "rent": 2250, "term": 12 }, "title": "Loft" })
        );
    }

    #[test]
    fn array_union_on_missing_field_creates_array() {
        let mut fields = Fields::new();
        apply_writes(
            &mut fields,
            vec![(
                "broker_ids".to_string(),
                FieldWrite::ArrayUnion(vec![json!("b-2")]),
            )],
        );
        assert_eq!(fields.get("broker_ids"), Some(&json!(["b-2"])));
    }
}
