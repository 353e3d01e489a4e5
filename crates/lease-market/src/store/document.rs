use std::cmp::Ordering;

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::timestamp::Timestamp;
use super::StoreError;

/// Field map of a stored document, excluding its identifier.
pub type Fields = serde_json::Map<String, Value>;

/// Point-in-time snapshot of a single document.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub collection: String,
    pub id: String,
    pub fields: Fields,
}

impl Document {
    pub fn new(collection: impl Into<String>, id: impl Into<String>, fields: Fields) -> Self {
        Self {
            collection: collection.into(),
            id: id.into(),
            fields,
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Deserialize the snapshot with its identifier folded in as `id`.
    ///
    /// The document ID wins over any `id` field stored in the body.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, StoreError> {
        let mut body = self.fields.clone();
        body.insert("id".to_string(), Value::String(self.id.clone()));
        serde_json::from_value(Value::Object(body)).map_err(|source| StoreError::Decode {
            collection: self.collection.clone(),
            id: self.id.clone(),
            message: source.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Equals { field: String, value: Value },
    ArrayContains { field: String, value: Value },
}

impl Filter {
    pub fn matches(&self, fields: &Fields) -> bool {
        match self {
            Filter::Equals { field, value } => fields
                .get(field)
                .map(|candidate| compare_values(candidate, value) == Ordering::Equal)
                .unwrap_or(false),
            Filter::ArrayContains { field, value } => match fields.get(field) {
                Some(Value::Array(items)) => items
                    .iter()
                    .any(|item| compare_values(item, value) == Ordering::Equal),
                _ => false,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

/// Filtered, optionally ordered scan over one collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub collection: String,
    pub filters: Vec<Filter>,
    pub order_by: Option<OrderBy>,
    /// Inclusive lower bound on the ordering field; ignored without `order_by`.
    pub start_at: Option<Value>,
}

impl Query {
    pub fn collection(name: impl Into<String>) -> Self {
        Self {
            collection: name.into(),
            filters: Vec::new(),
            order_by: None,
            start_at: None,
        }
    }

    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Equals {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    pub fn where_array_contains(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::ArrayContains {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by = Some(OrderBy {
            field: field.into(),
            direction,
        });
        self
    }

    pub fn start_at(mut self, bound: impl Into<Value>) -> Self {
        self.start_at = Some(bound.into());
        self
    }

    pub fn matches(&self, fields: &Fields) -> bool {
        self.filters.iter().all(|filter| filter.matches(fields))
    }
}

/// Total order across JSON values used for equality filters, ordering and
/// `start_at` bounds.
///
/// Types rank null < bool < number < timestamp < string < array < object;
/// objects that parse as a [`Timestamp`] compare chronologically.
pub fn compare_values(left: &Value, right: &Value) -> Ordering {
    let (left_rank, right_rank) = (rank(left), rank(right));
    if left_rank != right_rank {
        return left_rank.cmp(&right_rank);
    }

    match (left, right) {
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        (Value::Number(a), Value::Number(b)) => {
            let a = a.as_f64().unwrap_or(f64::NAN);
            let b = b.as_f64().unwrap_or(f64::NAN);
            a.partial_cmp(&b).unwrap_or(Ordering::Equal)
        }
        (Value::String(a), Value::String(b)) => a.cmp(b),
        (Value::Array(a), Value::Array(b)) => {
            for (x, y) in a.iter().zip(b.iter()) {
                let ordering = compare_values(x, y);
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            a.len().cmp(&b.len())
        }
        (Value::Object(_), Value::Object(_)) => {
            match (Timestamp::from_value(left), Timestamp::from_value(right)) {
                (Ok(a), Ok(b)) => a.cmp(&b),
                _ => left.to_string().cmp(&right.to_string()),
            }
        }
        _ => Ordering::Equal,
    }
}

fn rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::Object(_) if Timestamp::from_value(value).is_ok() => 3,
        Value::String(_) => 4,
        Value::Array(_) => 5,
        Value::Object(_) => 6,
    }
}
