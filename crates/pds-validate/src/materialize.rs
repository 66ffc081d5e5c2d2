//! Nested record with inactive fields removed.

use std::collections::BTreeSet;

use pds_codec::{Address, CodecError, FlatStore, array, path};
use pds_model::{FormSchema, Value};
use pds_session::{LotContext, lots_address};

use crate::walk::{FieldVisit, Scope, walk_fields};

/// Decode `store` into the record handed to storage and document
/// generation. Fields whose condition is not met (and everything below
/// them) are left out, per lot.
pub fn materialize(form: &FormSchema, store: &FlatStore) -> Result<Value, CodecError> {
    let lots = LotContext::from_form(form);
    let inactive = inactive_addresses(form, &lots, store)?;
    path::decode(&prune(store, &inactive))
}

/// Addresses of fields whose condition is not met, across all screens and
/// lots. An address that is active in any lot (a global field gated per
/// lot) is not included.
pub(crate) fn inactive_addresses(
    form: &FormSchema,
    lots: &LotContext,
    store: &FlatStore,
) -> Result<Vec<Address>, CodecError> {
    let lot_count = lot_count(store)?;
    let mut active = BTreeSet::new();
    let mut inactive = BTreeSet::new();
    for screen in &form.screens {
        let lot_range = if screen.lot_scoped {
            0..lot_count
        } else {
            0..1
        };
        for lot in lot_range {
            let scope = Scope::new(lots, screen, lot);
            walk_fields(&screen.fields, &scope, store, &mut |visit: FieldVisit<'_>| {
                if visit.active {
                    active.insert(visit.address);
                } else {
                    inactive.insert(visit.address);
                }
                Ok::<(), CodecError>(())
            })?;
        }
    }
    Ok(inactive.difference(&active).cloned().collect())
}

/// Copy of `store` without anything at or below `inactive`.
pub(crate) fn prune(store: &FlatStore, inactive: &[Address]) -> FlatStore {
    let mut pruned = store.clone();
    for address in inactive {
        pruned.remove_under(address);
    }
    pruned
}

/// Number of lots held by `store`; a record always has at least one.
pub(crate) fn lot_count(store: &FlatStore) -> Result<usize, CodecError> {
    Ok(array::entry_count(store, &lots_address()?).max(1))
}
