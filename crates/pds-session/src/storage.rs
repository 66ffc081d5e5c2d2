//! Persistence boundary.
//!
//! Stored records are plain JSON with calendar values written as ISO
//! strings. On reload, the form configuration tells the type codec which
//! leaves are dates or times and which default to substitute when a stored
//! value no longer parses.

use std::collections::BTreeMap;

use pds_codec::{Address, LeafHint, TypeCodec};
use pds_model::{FormSchema, Value};

use crate::error::Result;
use crate::lot::split_lot_address;
use crate::session::FormSession;

/// Leaf hints for every calendar field of `form`, keyed by field template.
pub fn leaf_hints(form: &FormSchema) -> BTreeMap<String, LeafHint> {
    form.field_templates()
        .into_iter()
        .filter_map(|(template, entry)| {
            let kind = entry.field.temporal_kind()?;
            Some((
                template,
                LeafHint::new(kind).with_fallback(entry.field.default_value()),
            ))
        })
        .collect()
}

/// Field template an address belongs to, with the lot prefix removed.
pub fn field_template(address: &Address) -> String {
    match split_lot_address(address) {
        Some((_, Some(rest))) => rest.template(),
        _ => address.template(),
    }
}

/// Rebuild a typed record from its stored form.
pub fn denormalize_record(
    form: &FormSchema,
    codec: &TypeCodec,
    stored: &serde_json::Value,
) -> Value {
    let hints = leaf_hints(form);
    codec.denormalize_from_storage(stored, |address| {
        hints.get(&field_template(address)).cloned()
    })
}

impl FormSession {
    /// Session over a stored record.
    pub fn from_storage(
        form: &FormSchema,
        codec: &TypeCodec,
        stored: &serde_json::Value,
    ) -> Result<Self> {
        Self::from_record(form, &denormalize_record(form, codec, stored))
    }

    /// Record in its stored form.
    pub fn to_storage(&self, codec: &TypeCodec) -> Result<serde_json::Value> {
        Ok(codec.normalize_for_storage(&self.to_record()?))
    }
}
