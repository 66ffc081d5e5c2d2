//! The flat store: address to value mapping manipulated by the UI.

use std::collections::BTreeMap;
use std::ops::Bound;

use pds_model::Value;

use crate::address::Address;
use crate::error::Result;
use crate::path;

/// Flat key space of one record.
///
/// Values are leaves, lists of leaves written by multi-select widgets, or
/// the empty object/array markers produced by [`path::encode`]. Entries are
/// kept in address order so that iteration is deterministic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlatStore {
    entries: BTreeMap<Address, Value>,
}

impl FlatStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Encode a nested record.
    pub fn from_record(record: &Value) -> Result<Self> {
        path::encode(record)
    }

    /// Decode into a nested record.
    pub fn to_record(&self) -> Result<Value> {
        path::decode(self)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, address: &str) -> Option<&Value> {
        self.entries.get(address)
    }

    /// The value at `address`, or `Null` when it was never written.
    pub fn value(&self, address: &str) -> &Value {
        static UNSET: Value = Value::Null;
        self.entries.get(address).unwrap_or(&UNSET)
    }

    pub fn contains(&self, address: &str) -> bool {
        self.entries.contains_key(address)
    }

    /// Write a value, returning the previous one.
    pub fn set(&mut self, address: Address, value: impl Into<Value>) -> Option<Value> {
        self.entries.insert(address, value.into())
    }

    /// Parse `address` and write a value.
    pub fn set_path(&mut self, address: &str, value: impl Into<Value>) -> Result<Option<Value>> {
        let address = Address::parse(address)?;
        Ok(self.set(address, value))
    }

    pub fn remove(&mut self, address: &str) -> Option<Value> {
        self.entries.remove(address)
    }

    /// Entries strictly below `prefix`, in address order.
    pub fn entries_under<'a>(
        &'a self,
        prefix: &'a Address,
    ) -> impl Iterator<Item = (&'a Address, &'a Value)> + 'a {
        let start = format!("{prefix}.");
        self.entries
            .range::<str, _>((Bound::Included(start.as_str()), Bound::Unbounded))
            .take_while(move |(address, _)| address.as_str().starts_with(&start))
    }

    /// Remove `prefix` itself and everything below it. Returns the number of
    /// removed entries.
    pub fn remove_under(&mut self, prefix: &Address) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|address, _| !address.starts_with(prefix));
        before - self.entries.len()
    }

    /// Rebuild the store in one pass. `rewrite` maps each entry to its new
    /// address (or drops it by returning `None`); the new map replaces the
    /// old one only once every entry has been processed.
    pub fn rewrite<F>(&mut self, mut rewrite: F)
    where
        F: FnMut(Address, Value) -> Option<(Address, Value)>,
    {
        let entries = std::mem::take(&mut self.entries);
        self.entries = entries
            .into_iter()
            .filter_map(|(address, value)| rewrite(address, value))
            .collect();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Address, &Value)> {
        self.entries.iter()
    }

    pub fn addresses(&self) -> impl Iterator<Item = &Address> {
        self.entries.keys()
    }
}

impl FromIterator<(Address, Value)> for FlatStore {
    fn from_iter<I: IntoIterator<Item = (Address, Value)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a FlatStore {
    type Item = (&'a Address, &'a Value);
    type IntoIter = std::collections::btree_map::Iter<'a, Address, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
