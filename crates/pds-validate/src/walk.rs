//! Traversal of a screen's fields over concrete addresses.

use pds_codec::{Address, CodecError, FlatStore, array};
use pds_model::{FieldKind, FieldSchema, Screen};
use pds_session::{LotContext, split_lot_address};

use crate::condition::is_active;

/// Where a screen's field paths are anchored.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Scope<'a> {
    lots: &'a LotContext,
    pub(crate) lot: usize,
    global: bool,
}

impl<'a> Scope<'a> {
    pub(crate) fn new(lots: &'a LotContext, screen: &Screen, lot: usize) -> Self {
        Self {
            lots,
            lot,
            global: !screen.lot_scoped,
        }
    }

    /// Address of a screen-level path.
    pub(crate) fn address(&self, path: &str) -> Result<Address, CodecError> {
        self.lots.address_for(path, self.lot, self.global)
    }
}

/// One field at one concrete address.
#[derive(Debug)]
pub(crate) struct FieldVisit<'a> {
    pub(crate) field: &'a FieldSchema,
    pub(crate) address: Address,
    pub(crate) active: bool,
}

impl FieldVisit<'_> {
    /// Lot-relative path, as shown to users.
    pub(crate) fn path(&self) -> String {
        display_path(&self.address)
    }

    pub(crate) fn label(&self) -> String {
        self.field.label.clone().unwrap_or_else(|| self.path())
    }
}

/// Address without its `lots.<index>` prefix.
pub(crate) fn display_path(address: &Address) -> String {
    match split_lot_address(address) {
        Some((_, Some(rest))) => rest.to_string(),
        _ => address.to_string(),
    }
}

/// Visit every field of `fields` in declaration order, parents before
/// children. Children of inactive fields are not visited; array children
/// are visited once per stored entry.
pub(crate) fn walk_fields<'a, E, F>(
    fields: &'a [FieldSchema],
    scope: &Scope<'_>,
    store: &FlatStore,
    visit: &mut F,
) -> Result<(), E>
where
    E: From<CodecError>,
    F: FnMut(FieldVisit<'a>) -> Result<(), E>,
{
    walk_level(fields, None, scope, store, visit)
}

fn walk_level<'a, E, F>(
    fields: &'a [FieldSchema],
    parent: Option<&Address>,
    scope: &Scope<'_>,
    store: &FlatStore,
    visit: &mut F,
) -> Result<(), E>
where
    E: From<CodecError>,
    F: FnMut(FieldVisit<'a>) -> Result<(), E>,
{
    for field in fields {
        let address = match parent {
            Some(parent) => parent.join(&field.path)?,
            None => scope.address(&field.path)?,
        };
        let active = is_active(field.condition.as_ref(), store, scope.lot)?;
        visit(FieldVisit {
            field,
            address: address.clone(),
            active,
        })?;
        if !active {
            continue;
        }
        match &field.kind {
            FieldKind::NestedObject { fields } => {
                walk_level(fields, Some(&address), scope, store, visit)?;
            }
            FieldKind::ArrayOfObject { fields, .. } => {
                for index in 0..array::entry_count(store, &address) {
                    let entry = address.child_index(index);
                    walk_level(fields, Some(&entry), scope, store, visit)?;
                }
            }
            FieldKind::Scalar { .. } | FieldKind::Choice { .. } => {}
        }
    }
    Ok(())
}
