//! Declarative field conditions.
//!
//! A condition names another field's address and a comparison. The address
//! is a template: when it contains [`LOT_PLACEHOLDER`] the placeholder is
//! replaced by the lot being evaluated, otherwise the address is absolute.

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// Placeholder substituted with the current lot index.
pub const LOT_PLACEHOLDER: &str = "{lot}";

/// Comparison applied to the referenced value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparator {
    Equals(serde_json::Value),
    NotEquals(serde_json::Value),
    In(Vec<serde_json::Value>),
    NotIn(Vec<serde_json::Value>),
    /// `true`: active when the value is truthy; `false`: when it is falsy.
    Truthy(bool),
}

/// `(address template, comparator)` pair gating a field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub address: String,
    #[serde(flatten)]
    pub comparator: Comparator,
}

impl Condition {
    pub fn new(address: impl Into<String>, comparator: Comparator) -> Self {
        Self {
            address: address.into(),
            comparator,
        }
    }

    pub fn equals(address: impl Into<String>, expected: serde_json::Value) -> Self {
        Self::new(address, Comparator::Equals(expected))
    }

    pub fn not_equals(address: impl Into<String>, expected: serde_json::Value) -> Self {
        Self::new(address, Comparator::NotEquals(expected))
    }

    pub fn not_in(address: impl Into<String>, excluded: Vec<serde_json::Value>) -> Self {
        Self::new(address, Comparator::NotIn(excluded))
    }

    pub fn truthy(address: impl Into<String>) -> Self {
        Self::new(address, Comparator::Truthy(true))
    }

    pub fn is_lot_relative(&self) -> bool {
        self.address.contains(LOT_PLACEHOLDER)
    }

    /// Concrete address for `lot`.
    pub fn resolve_address(&self, lot: usize) -> String {
        if self.is_lot_relative() {
            self.address.replace(LOT_PLACEHOLDER, &lot.to_string())
        } else {
            self.address.clone()
        }
    }

    /// Apply the comparator to the referenced value (`Null` when unset).
    ///
    /// A multi-select value (an array) matches `Equals`/`In` when any of its
    /// entries does.
    pub fn matches(&self, actual: &Value) -> bool {
        match &self.comparator {
            Comparator::Equals(expected) => matches_any(actual, std::slice::from_ref(expected)),
            Comparator::NotEquals(expected) => !matches_any(actual, std::slice::from_ref(expected)),
            Comparator::In(set) => matches_any(actual, set),
            Comparator::NotIn(set) => !matches_any(actual, set),
            Comparator::Truthy(wanted) => actual.is_truthy() == *wanted,
        }
    }
}

fn matches_any(actual: &Value, candidates: &[serde_json::Value]) -> bool {
    let candidates: Vec<Value> = candidates.iter().map(Value::from).collect();
    let hit = |value: &Value| candidates.iter().any(|c| c.loosely_equals(value));
    match actual {
        Value::Array(items) if !candidates.iter().any(|c| matches!(c, Value::Array(_))) => {
            items.iter().any(hit)
        }
        other => hit(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deserializes_flat_comparator() {
        let condition: Condition =
            serde_json::from_value(json!({"address": "a", "equals": true})).unwrap();
        assert_eq!(condition, Condition::equals("a", json!(true)));

        let condition: Condition =
            serde_json::from_value(json!({"address": "lots.{lot}.kind", "not_in": ["x", "y"]}))
                .unwrap();
        assert!(condition.is_lot_relative());
        assert_eq!(condition.resolve_address(3), "lots.3.kind");
    }

    #[test]
    fn unset_reference_never_equals() {
        let condition = Condition::equals("a", json!(true));
        assert!(!condition.matches(&Value::Null));
        assert!(condition.matches(&Value::Bool(true)));
        assert!(!condition.matches(&Value::Bool(false)));
    }

    #[test]
    fn not_in_treats_unset_as_outside_the_set() {
        let condition = Condition::not_in("kind", vec![json!("works")]);
        assert!(condition.matches(&Value::Null));
        assert!(!condition.matches(&Value::text("works")));
    }

    #[test]
    fn multi_select_matches_any_entry() {
        let condition = Condition::equals("criteria", json!("price"));
        let selected = Value::Array(vec![Value::text("quality"), Value::text("price")]);
        assert!(condition.matches(&selected));
    }

    #[test]
    fn truthiness() {
        let condition = Condition::truthy("flag");
        assert!(!condition.matches(&Value::Null));
        assert!(!condition.matches(&Value::text("")));
        assert!(condition.matches(&Value::text("yes")));
        let falsy = Condition::new("flag", Comparator::Truthy(false));
        assert!(falsy.matches(&Value::Null));
    }
}
