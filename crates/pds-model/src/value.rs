//! Record values.
//!
//! A [`Value`] is one node of a nested record. It is a superset of JSON:
//! besides plain scalars, objects and arrays it can carry calendar values
//! (date, time, date-time) and caller-defined leaf types. Rich leaves only
//! leave the tree through the type codec, which turns them into
//! address-space-safe strings.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::Number;

/// Object payload of a [`Value`].
pub type Map = BTreeMap<String, Value>;

/// A domain-specific leaf the core does not know how to format itself.
///
/// The `tag` selects the type codec override used when the leaf is
/// normalized for storage; without an override the payload is stored as-is.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomLeaf {
    pub tag: String,
    pub payload: serde_json::Value,
}

/// Node of a nested record.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(Number),
    Text(String),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(NaiveDateTime),
    Custom(CustomLeaf),
    Array(Vec<Value>),
    Object(Map),
}

/// Calendar kinds the type codec can parse back from storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TemporalKind {
    Date,
    Time,
    DateTime,
}

impl TemporalKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Date => "date",
            Self::Time => "time",
            Self::DateTime => "date-time",
        }
    }
}

/// Leaf kinds that need formatting before storage.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LeafKind {
    Temporal(TemporalKind),
    Custom(String),
}

impl Value {
    pub fn empty_object() -> Self {
        Value::Object(Map::new())
    }

    pub fn empty_array() -> Self {
        Value::Array(Vec::new())
    }

    pub fn text(value: impl Into<String>) -> Self {
        Value::Text(value.into())
    }

    /// True for everything that is not an array or object.
    pub fn is_leaf(&self) -> bool {
        !matches!(self, Value::Array(_) | Value::Object(_))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Kind of a leaf that the type codec must format, if any.
    pub fn rich_kind(&self) -> Option<LeafKind> {
        match self {
            Value::Date(_) => Some(LeafKind::Temporal(TemporalKind::Date)),
            Value::Time(_) => Some(LeafKind::Temporal(TemporalKind::Time)),
            Value::DateTime(_) => Some(LeafKind::Temporal(TemporalKind::DateTime)),
            Value::Custom(leaf) => Some(LeafKind::Custom(leaf.tag.clone())),
            _ => None,
        }
    }

    /// True when the tree contains nothing but JSON-representable nodes.
    pub fn is_json_safe(&self) -> bool {
        match self {
            Value::Array(items) => items.iter().all(Value::is_json_safe),
            Value::Object(map) => map.values().all(Value::is_json_safe),
            other => other.rich_kind().is_none(),
        }
    }

    /// True when a required field holding this value counts as unanswered.
    ///
    /// Whitespace-only text is blank, and so are empty arrays and objects.
    pub fn is_blank(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Text(text) => text.trim().is_empty(),
            Value::Array(items) => items.is_empty(),
            Value::Object(map) => map.is_empty(),
            _ => false,
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(flag) => *flag,
            Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
            Value::Text(text) => !text.trim().is_empty(),
            Value::Array(items) => !items.is_empty(),
            Value::Object(map) => !map.is_empty(),
            Value::Date(_) | Value::Time(_) | Value::DateTime(_) | Value::Custom(_) => true,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(flag) => Some(*flag),
            _ => None,
        }
    }

    /// Numeric reading of the value. Form inputs often arrive as text, so
    /// numeric-looking text is accepted too.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(number) => number.as_f64(),
            Value::Text(text) => text.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            _ => None,
        }
    }

    /// True when the value is a whole number (integer JSON number or
    /// integer-looking text).
    pub fn is_integral(&self) -> bool {
        match self {
            Value::Number(number) => number.is_i64() || number.is_u64(),
            Value::Text(text) => text.trim().parse::<i64>().is_ok(),
            _ => false,
        }
    }

    pub fn as_array(&self) -> Option<&Vec<Value>> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Map> {
        match self {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::Text(_) => "text",
            Value::Date(_) => "date",
            Value::Time(_) => "time",
            Value::DateTime(_) => "date-time",
            Value::Custom(_) => "custom",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }

    /// Comparison used by conditions: numbers compare by value regardless of
    /// their integer/float representation, everything else structurally.
    pub fn loosely_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Number(left), Value::Number(right)) => match (left.as_f64(), right.as_f64()) {
                (Some(l), Some(r)) => l == r,
                _ => left == right,
            },
            (Value::Array(left), Value::Array(right)) => {
                left.len() == right.len()
                    && left.iter().zip(right).all(|(l, r)| l.loosely_equals(r))
            }
            _ => self == other,
        }
    }

    /// Lossless conversion back to JSON. Returns `None` when the tree holds
    /// rich leaves; those must go through the type codec.
    pub fn to_json(&self) -> Option<serde_json::Value> {
        Some(match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(flag) => serde_json::Value::Bool(*flag),
            Value::Number(number) => serde_json::Value::Number(number.clone()),
            Value::Text(text) => serde_json::Value::String(text.clone()),
            Value::Array(items) => serde_json::Value::Array(
                items
                    .iter()
                    .map(Value::to_json)
                    .collect::<Option<Vec<_>>>()?,
            ),
            Value::Object(map) => {
                let mut object = serde_json::Map::new();
                for (key, value) in map {
                    object.insert(key.clone(), value.to_json()?);
                }
                serde_json::Value::Object(object)
            }
            Value::Date(_) | Value::Time(_) | Value::DateTime(_) | Value::Custom(_) => {
                return None;
            }
        })
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "(unset)"),
            Value::Bool(flag) => write!(f, "{flag}"),
            Value::Number(number) => write!(f, "{number}"),
            Value::Text(text) => write!(f, "{text}"),
            Value::Date(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            Value::Time(time) => write!(f, "{}", time.format("%H:%M:%S")),
            Value::DateTime(stamp) => write!(f, "{}", stamp.format("%Y-%m-%dT%H:%M:%S%.f")),
            Value::Custom(leaf) => write!(f, "{}:{}", leaf.tag, leaf.payload),
            Value::Array(items) => {
                let parts: Vec<String> = items.iter().map(ToString::to_string).collect();
                write!(f, "[{}]", parts.join(", "))
            }
            Value::Object(map) => write!(f, "{{{} fields}}", map.len()),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(flag) => Value::Bool(flag),
            serde_json::Value::Number(number) => Value::Number(number),
            serde_json::Value::String(text) => Value::Text(text),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(object) => Value::Object(
                object
                    .into_iter()
                    .map(|(key, value)| (key, Value::from(value)))
                    .collect(),
            ),
        }
    }
}

impl From<&serde_json::Value> for Value {
    fn from(value: &serde_json::Value) -> Self {
        Value::from(value.clone())
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Number(Number::from(value))
    }
}

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        Value::Number(Number::from(value))
    }
}

impl From<f64> for Value {
    /// Non-finite floats have no JSON form and become `Null`.
    fn from(value: f64) -> Self {
        Number::from_f64(value).map_or(Value::Null, Value::Number)
    }
}

impl From<NaiveDate> for Value {
    fn from(value: NaiveDate) -> Self {
        Value::Date(value)
    }
}

impl From<NaiveTime> for Value {
    fn from(value: NaiveTime) -> Self {
        Value::Time(value)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(value: NaiveDateTime) -> Self {
        Value::DateTime(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::Array(value)
    }
}

impl From<Map> for Value {
    fn from(value: Map) -> Self {
        Value::Object(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_conversion_is_lossless() {
        let source = json!({"a": [1, 2.5, "x", null, true], "b": {}, "c": []});
        let value = Value::from(source.clone());
        assert_eq!(value.to_json(), Some(source));
    }

    #[test]
    fn rich_leaves_have_no_plain_json_form() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        let value = Value::Array(vec![Value::Date(date)]);
        assert!(!value.is_json_safe());
        assert_eq!(value.to_json(), None);
    }

    #[test]
    fn blank_values() {
        assert!(Value::Null.is_blank());
        assert!(Value::text("   ").is_blank());
        assert!(Value::empty_array().is_blank());
        assert!(Value::empty_object().is_blank());
        assert!(!Value::Bool(false).is_blank());
        assert!(!Value::from(0_i64).is_blank());
    }

    #[test]
    fn numbers_compare_by_value() {
        assert!(Value::from(100_i64).loosely_equals(&Value::from(100.0)));
        assert!(!Value::from(100_i64).loosely_equals(&Value::text("100")));
    }

    #[test]
    fn numeric_text_is_readable_as_number() {
        assert_eq!(Value::text(" 30 ").as_f64(), Some(30.0));
        assert!(Value::text("30").is_integral());
        assert!(!Value::text("30.5").is_integral());
        assert_eq!(Value::text("abc").as_f64(), None);
    }
}
