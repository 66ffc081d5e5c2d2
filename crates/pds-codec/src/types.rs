//! Type codec: rich leaves <-> address-space-safe strings.
//!
//! Calendar values are stored as ISO strings: dates as `YYYY-MM-DD`,
//! times as zero-padded `HH:MM:SS`, date-times as `YYYY-MM-DDTHH:MM:SS`
//! with a fractional part only when it is non-zero. Callers can register
//! per-kind overrides for domain-specific leaves without touching the codec.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use pds_model::{LeafKind, TemporalKind, Value};
use tracing::debug;

use crate::address::Address;

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIME_FORMAT: &str = "%H:%M:%S";
pub const DATE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

const TIME_INPUT_FORMATS: &[&str] = &["%H:%M:%S", "%H:%M:%S%.f", "%H:%M"];
const DATE_TIME_INPUT_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Formatter registered for one leaf kind.
pub type LeafFormatter = Box<dyn Fn(&Value) -> serde_json::Value + Send + Sync>;

/// How a stored leaf should be read back.
#[derive(Debug, Clone, PartialEq)]
pub struct LeafHint {
    pub kind: TemporalKind,
    /// Substituted when the stored value cannot be parsed.
    pub fallback: Option<Value>,
}

impl LeafHint {
    pub fn new(kind: TemporalKind) -> Self {
        Self {
            kind,
            fallback: None,
        }
    }

    #[must_use]
    pub fn with_fallback(mut self, fallback: Option<Value>) -> Self {
        self.fallback = fallback;
        self
    }
}

/// Converts rich leaves for storage and back.
#[derive(Default)]
pub struct TypeCodec {
    overrides: BTreeMap<LeafKind, LeafFormatter>,
}

impl fmt::Debug for TypeCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeCodec")
            .field("overrides", &self.overrides.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl TypeCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a formatter for `kind`. It replaces the built-in formatting
    /// for calendar kinds and the payload passthrough for custom leaves.
    #[must_use]
    pub fn with_override<F>(mut self, kind: LeafKind, formatter: F) -> Self
    where
        F: Fn(&Value) -> serde_json::Value + Send + Sync + 'static,
    {
        self.overrides.insert(kind, Box::new(formatter));
        self
    }

    /// Format one leaf. Values that are already storage-safe pass through.
    pub fn serialize(&self, value: &Value) -> Value {
        match value.rich_kind() {
            Some(_) => Value::from(self.storage_leaf(value)),
            None => value.clone(),
        }
    }

    /// Parse a stored leaf back into a calendar value.
    ///
    /// Returns `None` for unset and unparsable input; the caller decides
    /// which default to substitute.
    pub fn deserialize(&self, value: &Value, kind: TemporalKind) -> Option<Value> {
        let parsed = match (value, kind) {
            (Value::Null, _) => return None,
            (Value::Date(_), TemporalKind::Date)
            | (Value::Time(_), TemporalKind::Time)
            | (Value::DateTime(_), TemporalKind::DateTime) => Some(value.clone()),
            (Value::DateTime(stamp), TemporalKind::Date) => Some(Value::Date(stamp.date())),
            (Value::Text(text), kind) => parse_temporal(text.trim(), kind),
            _ => None,
        };
        if parsed.is_none() {
            debug!(
                kind = kind.label(),
                found = value.type_name(),
                "unparsable stored value"
            );
        }
        parsed
    }

    /// Apply [`serialize`](Self::serialize) to every leaf of `record`.
    pub fn normalize_for_storage(&self, record: &Value) -> serde_json::Value {
        match record {
            Value::Array(items) => serde_json::Value::Array(
                items
                    .iter()
                    .map(|item| self.normalize_for_storage(item))
                    .collect(),
            ),
            Value::Object(map) => serde_json::Value::Object(
                map.iter()
                    .map(|(key, value)| (key.clone(), self.normalize_for_storage(value)))
                    .collect(),
            ),
            leaf => self.storage_leaf(leaf),
        }
    }

    /// Inverse of [`normalize_for_storage`](Self::normalize_for_storage).
    ///
    /// `hints` is asked for every leaf address; leaves with a hint are parsed
    /// back into calendar values, falling back to the hint's default (or
    /// `Null`) when the stored text is unparsable.
    pub fn denormalize_from_storage<H>(&self, stored: &serde_json::Value, hints: H) -> Value
    where
        H: Fn(&Address) -> Option<LeafHint>,
    {
        let mut path = Vec::new();
        self.denormalize_at(stored, &mut path, &hints)
    }

    fn denormalize_at<H>(
        &self,
        stored: &serde_json::Value,
        path: &mut Vec<String>,
        hints: &H,
    ) -> Value
    where
        H: Fn(&Address) -> Option<LeafHint>,
    {
        match stored {
            serde_json::Value::Array(items) => Value::Array(
                items
                    .iter()
                    .enumerate()
                    .map(|(index, item)| {
                        path.push(index.to_string());
                        let value = self.denormalize_at(item, path, hints);
                        path.pop();
                        value
                    })
                    .collect(),
            ),
            serde_json::Value::Object(map) => Value::Object(
                map.iter()
                    .map(|(key, item)| {
                        path.push(key.clone());
                        let value = self.denormalize_at(item, path, hints);
                        path.pop();
                        (key.clone(), value)
                    })
                    .collect(),
            ),
            leaf => {
                let value = Value::from(leaf);
                let hint = Address::parse(&path.join("."))
                    .ok()
                    .and_then(|address| hints(&address));
                match hint {
                    Some(_) if value.is_null() => value,
                    Some(hint) => self
                        .deserialize(&value, hint.kind)
                        .or(hint.fallback)
                        .unwrap_or_default(),
                    None => value,
                }
            }
        }
    }

    fn storage_leaf(&self, value: &Value) -> serde_json::Value {
        if let Some(kind) = value.rich_kind()
            && let Some(formatter) = self.overrides.get(&kind)
        {
            return formatter(value);
        }
        match value {
            Value::Date(date) => date.format(DATE_FORMAT).to_string().into(),
            Value::Time(time) => time.format(TIME_FORMAT).to_string().into(),
            Value::DateTime(stamp) => stamp.format(DATE_TIME_FORMAT).to_string().into(),
            Value::Custom(leaf) => leaf.payload.clone(),
            other => other.to_json().unwrap_or_default(),
        }
    }
}

fn parse_temporal(text: &str, kind: TemporalKind) -> Option<Value> {
    if text.is_empty() {
        return None;
    }
    match kind {
        TemporalKind::Date => NaiveDate::parse_from_str(text, DATE_FORMAT)
            .ok()
            .or_else(|| parse_date_time(text).map(|stamp| stamp.date()))
            .map(Value::Date),
        TemporalKind::Time => TIME_INPUT_FORMATS
            .iter()
            .find_map(|format| NaiveTime::parse_from_str(text, format).ok())
            .map(Value::Time),
        TemporalKind::DateTime => parse_date_time(text).map(Value::DateTime),
    }
}

fn parse_date_time(text: &str) -> Option<NaiveDateTime> {
    DATE_TIME_INPUT_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .or_else(|| {
            DateTime::parse_from_rfc3339(text)
                .ok()
                .map(|stamp| stamp.naive_utc())
        })
}
