//! Lot partitioning of the address space.
//!
//! Lot-scoped field paths live under `lots.<index>.`; configured global
//! paths (and everything below them) are stored at the record root.

use std::collections::BTreeSet;

use pds_codec::{Address, Result, Segment};
use pds_model::FormSchema;

/// Record key holding the lot list.
pub const LOTS_KEY: &str = "lots";

/// Member of each lot entry holding its display name.
pub const LOT_NAME_FIELD: &str = "name";

/// Maps field paths to addresses for a given lot.
#[derive(Debug, Clone, PartialEq)]
pub struct LotContext {
    global_fields: BTreeSet<String>,
    default_lot_name: String,
}

impl LotContext {
    pub fn new<I, S>(global_fields: I, default_lot_name: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            global_fields: global_fields.into_iter().map(Into::into).collect(),
            default_lot_name: default_lot_name.into(),
        }
    }

    pub fn from_form(form: &FormSchema) -> Self {
        Self::new(
            form.global_fields.iter().cloned(),
            form.default_lot_name.clone(),
        )
    }

    pub fn default_lot_name(&self) -> &str {
        &self.default_lot_name
    }

    /// True when `field_path` is a configured global field or lies below one.
    pub fn is_global(&self, field_path: &str) -> bool {
        self.global_fields.iter().any(|global| {
            field_path == global
                || field_path
                    .strip_prefix(global.as_str())
                    .is_some_and(|rest| rest.starts_with('.'))
        })
    }

    /// `lots.<lot>`
    pub fn lot_prefix(&self, lot: usize) -> Result<Address> {
        Ok(lots_address()?.child_index(lot))
    }

    /// Address of `field_path` for `lot`, or the bare path when the field is
    /// global or `force_global` is set.
    pub fn address_for(&self, field_path: &str, lot: usize, force_global: bool) -> Result<Address> {
        if force_global || self.is_global(field_path) {
            Address::parse(field_path)
        } else {
            self.lot_prefix(lot)?.join(field_path)
        }
    }

    /// Address of the display name of `lot`.
    pub fn name_address(&self, lot: usize) -> Result<Address> {
        self.lot_prefix(lot)?.child_key(LOT_NAME_FIELD)
    }
}

/// The `lots` address itself.
pub fn lots_address() -> Result<Address> {
    Address::key(LOTS_KEY)
}

/// Split `lots.<index>[.<rest>]` into the lot index and the lot-relative
/// remainder. Returns `None` for addresses outside the lot list.
pub fn split_lot_address(address: &Address) -> Option<(usize, Option<Address>)> {
    let mut segments = address.segments();
    if segments.next() != Some(Segment::Key(LOTS_KEY)) {
        return None;
    }
    let Some(Segment::Index(lot)) = segments.next() else {
        return None;
    };
    Some((lot, address.skip(2)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> LotContext {
        LotContext::new(["buyer", "procedure"], "General")
    }

    #[test]
    fn lot_scoped_paths_are_prefixed() {
        let address = context()
            .address_for("orderType.estimatedValue", 1, false)
            .unwrap();
        assert_eq!(address.as_str(), "lots.1.orderType.estimatedValue");
    }

    #[test]
    fn global_paths_bypass_prefixing() {
        let context = context();
        let at = |path: &str, global: bool| context.address_for(path, 3, global).unwrap();
        assert_eq!(at("buyer", false).as_str(), "buyer");
        assert_eq!(at("buyer.name", false).as_str(), "buyer.name");
        assert_eq!(at("buyerNotes", false).as_str(), "lots.3.buyerNotes");
        assert_eq!(at("notes", true).as_str(), "notes");
    }

    #[test]
    fn malformed_paths_are_rejected() {
        assert!(context().address_for("a..b", 0, false).is_err());
    }

    #[test]
    fn splits_lot_addresses() {
        let address = Address::parse("lots.12.orderType.kind").unwrap();
        let (lot, rest) = split_lot_address(&address).unwrap();
        assert_eq!(lot, 12);
        assert_eq!(rest.unwrap().as_str(), "orderType.kind");

        let (lot, rest) = split_lot_address(&Address::parse("lots.0").unwrap()).unwrap();
        assert_eq!((lot, rest), (0, None));
        assert!(split_lot_address(&Address::parse("lots.name").unwrap()).is_none());
        assert!(split_lot_address(&Address::parse("buyer.name").unwrap()).is_none());
    }
}
