//! Conditional evaluator.
//!
//! Conditions are evaluated against a flat store snapshot every time they
//! are asked for. There is no cache: field dependencies are not tracked, so
//! a cached answer could go stale after an out-of-order edit.

use pds_codec::{Address, CodecError, FlatStore, decode_at};
use pds_model::Condition;

/// Whether a field gated by `condition` is active in `lot`.
///
/// A missing condition is always active. A referenced address that was never
/// written reads as `Null`. A reference that cannot be decoded (conflicting
/// shapes in the store, or a malformed address) is an error.
pub fn is_active(
    condition: Option<&Condition>,
    store: &FlatStore,
    lot: usize,
) -> Result<bool, CodecError> {
    let Some(condition) = condition else {
        return Ok(true);
    };
    let address = Address::parse(&condition.resolve_address(lot))?;
    let actual = decode_at(store, &address)?.unwrap_or_default();
    Ok(condition.matches(&actual))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pds_model::Value;
    use serde_json::json;

    fn store(pairs: &[(&str, Value)]) -> FlatStore {
        pairs
            .iter()
            .map(|(a, v)| (Address::parse(a).unwrap(), v.clone()))
            .collect()
    }

    #[test]
    fn absent_condition_is_active() {
        assert!(is_active(None, &FlatStore::new(), 0).unwrap());
    }

    #[test]
    fn lot_relative_references_follow_the_lot() {
        let condition = Condition::equals("lots.{lot}.orderType.hasValue", json!(true));
        let store = store(&[
            ("lots.0.orderType.hasValue", Value::Bool(false)),
            ("lots.1.orderType.hasValue", Value::Bool(true)),
        ]);
        assert!(!is_active(Some(&condition), &store, 0).unwrap());
        assert!(is_active(Some(&condition), &store, 1).unwrap());
        assert!(!is_active(Some(&condition), &store, 2).unwrap());
    }

    #[test]
    fn absolute_references_ignore_the_lot() {
        let condition = Condition::not_equals("procedure.kind", json!("negotiated"));
        let store = store(&[("procedure.kind", Value::from("open"))]);
        assert!(is_active(Some(&condition), &store, 0).unwrap());
        assert!(is_active(Some(&condition), &store, 5).unwrap());
    }

    #[test]
    fn indexed_multi_select_is_read_as_a_list() {
        let condition = Condition::equals("lots.{lot}.criteria", json!("price"));
        let store = store(&[
            ("lots.0.criteria.0", Value::from("quality")),
            ("lots.0.criteria.1", Value::from("price")),
        ]);
        assert!(is_active(Some(&condition), &store, 0).unwrap());
    }

    #[test]
    fn evaluation_does_not_touch_the_store() {
        let condition = Condition::truthy("flag");
        let store = store(&[("flag", Value::Bool(true))]);
        let before = store.clone();
        assert!(is_active(Some(&condition), &store, 0).unwrap());
        assert!(is_active(Some(&condition), &store, 0).unwrap());
        assert_eq!(store, before);
    }

    #[test]
    fn unwritten_references_read_as_unset() {
        let condition = Condition::truthy("flag");
        assert!(!is_active(Some(&condition), &FlatStore::new(), 0).unwrap());
    }

    #[test]
    fn conflicting_references_are_errors() {
        let condition = Condition::truthy("a");
        let store = store(&[("a.0", Value::from("x")), ("a.k", Value::from("y"))]);
        assert!(matches!(
            is_active(Some(&condition), &store, 0),
            Err(CodecError::StructuralConflict { .. })
        ));
    }
}
