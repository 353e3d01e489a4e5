use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};

const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Canonical point in time as persisted by the document store.
///
/// Snapshots that travel through JSON can come back in several shapes
/// (`{seconds, nanoseconds}`, the `{_seconds, _nanoseconds}` wire form, or an
/// RFC 3339 string). [`Timestamp::from_value`] folds all of them into one
/// representation so writes never drift between encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Timestamp {
    pub seconds: i64,
    pub nanoseconds: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimestampError {
    #[error("nanoseconds must be within 0..1_000_000_000, got {0}")]
    NanosecondsOutOfRange(i64),
    #[error("timestamp is missing its `{0}` component")]
    MissingComponent(&'static str),
    #[error("unrecognized timestamp representation: {0}")]
    Malformed(String),
}

impl Timestamp {
    pub fn new(seconds: i64, nanoseconds: i64) -> Result<Self, TimestampError> {
        if !(0..NANOS_PER_SECOND).contains(&nanoseconds) {
            return Err(TimestampError::NanosecondsOutOfRange(nanoseconds));
        }
        Ok(Self {
            seconds,
            nanoseconds: nanoseconds as u32,
        })
    }

    pub fn from_datetime(at: DateTime<Utc>) -> Self {
        Self {
            seconds: at.timestamp(),
            nanoseconds: at.timestamp_subsec_nanos(),
        }
    }

    pub fn to_datetime(self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.seconds, self.nanoseconds).single()
    }

    pub fn to_value(self) -> Value {
        json!({ "seconds": self.seconds, "nanoseconds": self.nanoseconds })
    }

    /// Rebuild a timestamp from any of the representations a snapshot may carry.
    pub fn from_value(value: &Value) -> Result<Self, TimestampError> {
        match value {
            Value::Object(map) => {
                let seconds = component(map, &["seconds", "_seconds"])
                    .ok_or(TimestampError::MissingComponent("seconds"))?;
                let nanoseconds = component(map, &["nanoseconds", "_nanoseconds"]).unwrap_or(0);
                Self::new(seconds, nanoseconds)
            }
            Value::String(raw) => DateTime::parse_from_rfc3339(raw)
                .map(|parsed| Self::from_datetime(parsed.with_timezone(&Utc)))
                .map_err(|_| TimestampError::Malformed(raw.clone())),
            other => Err(TimestampError::Malformed(other.to_string())),
        }
    }
}

fn component(map: &serde_json::Map<String, Value>, keys: &[&str]) -> Option<i64> {
    keys.iter().find_map(|key| match map.get(*key)? {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().map(|float| float.trunc() as i64)),
        _ => None,
    })
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Value::deserialize(deserializer)?;
        Timestamp::from_value(&raw).map_err(serde::de::Error::custom)
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(value: DateTime<Utc>) -> Self {
        Self::from_datetime(value)
    }
}
