//! Path codec: nested record <-> flat store.
//!
//! `encode` walks a record depth first. Object keys and array positions
//! each contribute one segment; leaves terminate the walk. Empty objects and
//! arrays are written as explicit markers at their own address so that an
//! intentionally empty sub-object survives a round trip.
//!
//! `decode` is the inverse. Each address is split into segments, and the
//! segment kind (index or key) decides whether an array or an object is
//! created on the way down. Addresses that imply different shapes at the
//! same path are a [`CodecError::StructuralConflict`].

use pds_model::Value;

use crate::address::{Address, Segment};
use crate::array::Node;
use crate::error::{CodecError, Result};
use crate::store::FlatStore;

/// Flatten a nested record. The record root must be an object.
pub fn encode(record: &Value) -> Result<FlatStore> {
    let Value::Object(map) = record else {
        return Err(CodecError::invalid(record.type_name(), "record root must be an object"));
    };
    let mut store = FlatStore::new();
    for (key, value) in map {
        let address = Address::key(key)?;
        encode_into(value, address, &mut store)?;
    }
    Ok(store)
}

fn encode_into(value: &Value, address: Address, store: &mut FlatStore) -> Result<()> {
    match value {
        Value::Object(map) if map.is_empty() => {
            store.set(address, Value::empty_object());
        }
        Value::Array(items) if items.is_empty() => {
            store.set(address, Value::empty_array());
        }
        Value::Object(map) => {
            for (key, child) in map {
                let child_address = address.child_key(key)?;
                encode_into(child, child_address, store)?;
            }
        }
        Value::Array(items) => {
            for (index, child) in items.iter().enumerate() {
                encode_into(child, address.child_index(index), store)?;
            }
        }
        leaf => {
            store.set(address, leaf.clone());
        }
    }
    Ok(())
}

/// Rebuild the nested record held by `store`.
///
/// Keys that were never written are absent from the result; an explicitly
/// stored `Null` decodes to an explicit null. Gapped array indices are
/// filled the way [`crate::array::reconstruct`] fills them.
pub fn decode(store: &FlatStore) -> Result<Value> {
    let mut root = Node::object();
    for (address, value) in store {
        let segments: Vec<Segment<'_>> = address.segments().collect();
        root.insert(&segments, value.clone(), address)?;
    }
    Ok(root.into_value())
}

/// Rebuild the value stored at `prefix`: the entry at `prefix` itself
/// merged with everything below it. Returns `None` when nothing is stored
/// there.
pub fn decode_at(store: &FlatStore, prefix: &Address) -> Result<Option<Value>> {
    let mut root = store
        .get(prefix.as_str())
        .map(|value| Node::expand(value.clone()));
    for (address, value) in store.entries_under(prefix) {
        let Some(rest) = address.strip_prefix(prefix) else {
            continue;
        };
        let segments: Vec<Segment<'_>> = rest.segments().collect();
        let node = root.get_or_insert_with(|| Node::container_for(segments[0]));
        node.insert(&segments, value.clone(), address)?;
    }
    Ok(root.map(Node::into_value))
}

/// Resolve `address` inside a nested record.
pub fn lookup<'a>(record: &'a Value, address: &Address) -> Option<&'a Value> {
    address
        .segments()
        .try_fold(record, |node, segment| match (node, segment) {
            (Value::Object(map), Segment::Key(key)) => map.get(key),
            (Value::Array(items), Segment::Index(index)) => items.get(index),
            _ => None,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(json: serde_json::Value) -> Value {
        Value::from(json)
    }

    #[test]
    fn encode_produces_indexed_addresses() {
        let store = encode(&record(json!({
            "buyer": {"name": "City"},
            "lots": [{"name": "A"}, {"name": "B", "tags": ["x", "y"]}]
        })))
        .unwrap();
        let addresses: Vec<&str> = store.addresses().map(Address::as_str).collect();
        assert_eq!(
            addresses,
            vec![
                "buyer.name",
                "lots.0.name",
                "lots.1.name",
                "lots.1.tags.0",
                "lots.1.tags.1",
            ]
        );
    }

    #[test]
    fn empty_containers_are_kept_as_markers() {
        let original = record(json!({"notes": {}, "items": [], "a": {"b": []}}));
        let store = encode(&original).unwrap();
        assert_eq!(store.get("notes"), Some(&Value::empty_object()));
        assert_eq!(store.get("a.b"), Some(&Value::empty_array()));
        assert_eq!(decode(&store).unwrap(), original);
    }

    #[test]
    fn explicit_null_survives_but_missing_stays_missing() {
        let original = record(json!({"a": null, "b": 1}));
        let decoded = decode(&encode(&original).unwrap()).unwrap();
        assert_eq!(decoded, original);
        assert!(decoded.as_object().unwrap().get("c").is_none());
    }

    #[test]
    fn conflicting_shapes_are_fatal() {
        let store: FlatStore = [
            (Address::parse("items.0").unwrap(), Value::from("a")),
            (Address::parse("items.name").unwrap(), Value::from("b")),
        ]
        .into_iter()
        .collect();
        assert!(matches!(
            decode(&store),
            Err(CodecError::StructuralConflict { .. })
        ));
    }

    #[test]
    fn leaf_below_leaf_is_a_conflict() {
        let store: FlatStore = [
            (Address::parse("a").unwrap(), Value::from("x")),
            (Address::parse("a.b").unwrap(), Value::from("y")),
        ]
        .into_iter()
        .collect();
        assert!(decode(&store).is_err());
    }

    #[test]
    fn index_like_keys_cannot_be_encoded() {
        let result = encode(&record(json!({"lots": {"3": "x"}})));
        assert!(matches!(result, Err(CodecError::InvalidAddress { .. })));
        assert!(encode(&record(json!(["x"]))).is_err());
    }

    #[test]
    fn multi_select_values_merge_with_indexed_entries() {
        let store: FlatStore = [(
            Address::parse("criteria").unwrap(),
            Value::Array(vec![Value::from("price"), Value::from("quality")]),
        )]
        .into_iter()
        .collect();
        assert_eq!(
            decode(&store).unwrap(),
            record(json!({"criteria": ["price", "quality"]}))
        );
    }

    #[test]
    fn decode_at_rebuilds_subtrees() {
        let store = encode(&record(json!({
            "buyer": {"name": "City", "ids": ["a", "b"]},
            "flag": true
        })))
        .unwrap();
        let buyer = decode_at(&store, &Address::parse("buyer").unwrap()).unwrap();
        assert_eq!(
            buyer,
            Some(record(json!({"name": "City", "ids": ["a", "b"]})))
        );
        let flag = decode_at(&store, &Address::parse("flag").unwrap()).unwrap();
        assert_eq!(flag, Some(Value::Bool(true)));
        assert_eq!(
            decode_at(&store, &Address::parse("none").unwrap()).unwrap(),
            None
        );
    }

    #[test]
    fn lookup_walks_objects_and_arrays() {
        let value = record(json!({"lots": [{"name": "A"}, {"name": "B"}]}));
        let found = lookup(&value, &Address::parse("lots.1.name").unwrap());
        assert_eq!(found, Some(&Value::from("B")));
        assert_eq!(
            lookup(&value, &Address::parse("lots.2.name").unwrap()),
            None
        );
        assert_eq!(lookup(&value, &Address::parse("lots.name").unwrap()), None);
    }
}
