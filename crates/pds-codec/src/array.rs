//! Array reconstruction from indexed addresses.
//!
//! Addresses are grouped one segment at a time into a tree whose array
//! nodes are keyed by numeric index, so `10` sorts after `9`. When the
//! tree is turned back into values every index in `0..=max` produces an
//! entry; an index that was never written becomes a placeholder instead of
//! being compacted away, because index position carries meaning (lot order,
//! client order).

use std::collections::BTreeMap;
use std::collections::btree_map::{Entry, VacantEntry};

use pds_model::{Map, Value};

use crate::address::{Address, Segment};
use crate::error::{CodecError, Result};
use crate::store::FlatStore;

/// Intermediate tree built while decoding.
#[derive(Debug)]
pub(crate) enum Node {
    Leaf(Value),
    Object(BTreeMap<String, Node>),
    Array(BTreeMap<usize, Node>),
}

impl Node {
    pub(crate) fn object() -> Self {
        Node::Object(BTreeMap::new())
    }

    pub(crate) fn array() -> Self {
        Node::Array(BTreeMap::new())
    }

    fn kind(&self) -> &'static str {
        match self {
            Node::Leaf(_) => "value",
            Node::Object(_) => "object",
            Node::Array(_) => "array",
        }
    }

    pub(crate) fn container_for(next: Segment<'_>) -> Self {
        match next {
            Segment::Key(_) => Node::object(),
            Segment::Index(_) => Node::array(),
        }
    }

    /// Stored containers (a multi-select list, an empty marker) are expanded
    /// so they merge with addresses that reach into them.
    pub(crate) fn expand(value: Value) -> Self {
        match value {
            Value::Object(map) => Node::Object(
                map.into_iter()
                    .map(|(key, value)| (key, Node::expand(value)))
                    .collect(),
            ),
            Value::Array(items) => Node::Array(
                items
                    .into_iter()
                    .enumerate()
                    .map(|(index, value)| (index, Node::expand(value)))
                    .collect(),
            ),
            leaf => Node::Leaf(leaf),
        }
    }

    /// Insert `value` at the relative path `segments`.
    pub(crate) fn insert(
        &mut self,
        segments: &[Segment<'_>],
        value: Value,
        address: &Address,
    ) -> Result<()> {
        let Some((last, parents)) = segments.split_last() else {
            return self.merge(Node::expand(value), address);
        };
        let mut node = self;
        for (position, segment) in parents.iter().enumerate() {
            let next = segments[position + 1];
            node = node.child(*segment, Node::container_for(next), address)?;
        }
        let incoming = Node::expand(value);
        match node.slot(*last, address)? {
            Slot::Vacant(slot) => {
                slot.insert(incoming);
                Ok(())
            }
            Slot::Occupied(existing) => existing.merge(incoming, address),
        }
    }

    /// Child at `segment`, created as `fresh` when absent.
    fn child(&mut self, segment: Segment<'_>, fresh: Node, address: &Address) -> Result<&mut Node> {
        let incoming = fresh.kind();
        let child = match self.slot(segment, address)? {
            Slot::Vacant(slot) => slot.insert(fresh),
            Slot::Occupied(existing) => existing,
        };
        if child.kind() != incoming {
            return Err(CodecError::conflict(address.as_str(), child.kind(), incoming));
        }
        Ok(child)
    }

    fn slot(&mut self, segment: Segment<'_>, address: &Address) -> Result<Slot<'_>> {
        let own_kind = self.kind();
        match (self, segment) {
            (Node::Object(map), Segment::Key(key)) => Ok(match map.entry(key.to_string()) {
                Entry::Vacant(entry) => Slot::Vacant(VacantSlot::Key(entry)),
                Entry::Occupied(entry) => Slot::Occupied(entry.into_mut()),
            }),
            (Node::Array(map), Segment::Index(index)) => Ok(match map.entry(index) {
                Entry::Vacant(entry) => Slot::Vacant(VacantSlot::Index(entry)),
                Entry::Occupied(entry) => Slot::Occupied(entry.into_mut()),
            }),
            (_, Segment::Key(_)) => Err(CodecError::conflict(address.as_str(), own_kind, "object")),
            (_, Segment::Index(_)) => {
                Err(CodecError::conflict(address.as_str(), own_kind, "array"))
            }
        }
    }

    pub(crate) fn merge(&mut self, incoming: Node, address: &Address) -> Result<()> {
        match (self, incoming) {
            (Node::Object(existing), Node::Object(children)) => {
                for (key, child) in children {
                    match existing.entry(key) {
                        Entry::Vacant(entry) => {
                            entry.insert(child);
                        }
                        Entry::Occupied(entry) => {
                            entry.into_mut().merge(child, address)?;
                        }
                    }
                }
                Ok(())
            }
            (Node::Array(existing), Node::Array(children)) => {
                for (index, child) in children {
                    match existing.entry(index) {
                        Entry::Vacant(entry) => {
                            entry.insert(child);
                        }
                        Entry::Occupied(entry) => {
                            entry.into_mut().merge(child, address)?;
                        }
                    }
                }
                Ok(())
            }
            (existing, incoming) => {
                Err(CodecError::conflict(address.as_str(), existing.kind(), incoming.kind()))
            }
        }
    }

    pub(crate) fn into_value(self) -> Value {
        match self {
            Node::Leaf(value) => value,
            Node::Object(children) => Value::Object(
                children
                    .into_iter()
                    .map(|(key, child)| (key, child.into_value()))
                    .collect::<Map>(),
            ),
            Node::Array(children) => Value::Array(fill_gaps(children)),
        }
    }
}

enum Slot<'a> {
    Vacant(VacantSlot<'a>),
    Occupied(&'a mut Node),
}

enum VacantSlot<'a> {
    Key(VacantEntry<'a, String, Node>),
    Index(VacantEntry<'a, usize, Node>),
}

impl<'a> VacantSlot<'a> {
    fn insert(self, node: Node) -> &'a mut Node {
        match self {
            VacantSlot::Key(entry) => entry.insert(node),
            VacantSlot::Index(entry) => entry.insert(node),
        }
    }
}

/// Materialize `0..=max` from a sparse index map.
///
/// Gaps in arrays of objects (or arrays) become `{}`; gaps in arrays of
/// plain values become `null`.
fn fill_gaps(mut children: BTreeMap<usize, Node>) -> Vec<Value> {
    let Some(&max) = children.keys().next_back() else {
        return Vec::new();
    };
    let has_containers = children
        .values()
        .any(|child| !matches!(child, Node::Leaf(_)));
    let placeholder = if has_containers {
        Value::empty_object()
    } else {
        Value::Null
    };
    (0..=max)
        .map(|index| {
            children
                .remove(&index)
                .map_or_else(|| placeholder.clone(), Node::into_value)
        })
        .collect()
}

/// Rebuild the array stored under `prefix` (`<prefix>.<index>.<rest>`).
///
/// Returns an empty vector when nothing is stored under `prefix`. A list
/// value or an empty-array marker stored at `prefix` itself takes part in
/// the reconstruction like any indexed entry.
pub fn reconstruct(store: &FlatStore, prefix: &Address) -> Result<Vec<Value>> {
    let mut root = Node::array();
    if let Some(value) = store.get(prefix.as_str()) {
        root.merge(Node::expand(value.clone()), prefix)?;
    }
    for (address, value) in store.entries_under(prefix) {
        let Some(rest) = address.strip_prefix(prefix) else {
            continue;
        };
        let segments: Vec<Segment<'_>> = rest.segments().collect();
        root.insert(&segments, value.clone(), address)?;
    }
    match root.into_value() {
        Value::Array(items) => Ok(items),
        _ => Ok(Vec::new()),
    }
}

/// Indices written directly under `prefix`, sorted numerically.
pub fn indices(store: &FlatStore, prefix: &Address) -> Vec<usize> {
    let mut found: Vec<usize> = store
        .entries_under(prefix)
        .filter_map(|(address, _)| address.strip_prefix(prefix))
        .filter_map(|rest| match rest.first() {
            Segment::Index(index) => Some(index),
            Segment::Key(_) => None,
        })
        .collect();
    found.sort_unstable();
    found.dedup();
    found
}

/// Number of entries reconstruction would produce: highest index plus one.
pub fn entry_count(store: &FlatStore, prefix: &Address) -> usize {
    let stored = store
        .get(prefix.as_str())
        .and_then(Value::as_array)
        .map_or(0, Vec::len);
    let indexed = indices(store, prefix).last().map_or(0, |max| max + 1);
    stored.max(indexed)
}
