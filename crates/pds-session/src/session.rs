//! Per-session form state.
//!
//! A [`FormSession`] owns one flat store together with the current lot and
//! current screen pointers. Nothing here is process-wide: every open form
//! gets its own session, and sessions share no mutable state.

use pds_codec::{Address, FlatStore, array, path};
use pds_model::{FormSchema, Value};
use tracing::debug;

use crate::error::{Result, SessionError};
use crate::lot::{LotContext, lots_address, split_lot_address};

/// Index and display name of one lot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LotSummary {
    pub index: usize,
    pub name: String,
}

/// Rendering context of one open form.
#[derive(Debug, Clone)]
pub struct FormSession {
    lots: LotContext,
    screens: Vec<String>,
    store: FlatStore,
    current_lot: usize,
    current_screen: usize,
}

impl FormSession {
    /// Empty session with the implicit default lot.
    pub fn new(form: &FormSchema) -> Result<Self> {
        Self::with_store(form, FlatStore::new())
    }

    /// Session over a previously stored record.
    pub fn from_record(form: &FormSchema, record: &Value) -> Result<Self> {
        Self::with_store(form, path::encode(record)?)
    }

    /// Session over an existing flat store.
    pub fn with_store(form: &FormSchema, store: FlatStore) -> Result<Self> {
        let mut session = Self {
            lots: LotContext::from_form(form),
            screens: form
                .screens
                .iter()
                .map(|screen| screen.id.clone())
                .collect(),
            store,
            current_lot: 0,
            current_screen: 0,
        };
        session.ensure_lot()?;
        Ok(session)
    }

    /// Synthesize the default lot when the store holds none.
    fn ensure_lot(&mut self) -> Result<()> {
        let lots = lots_address()?;
        if array::entry_count(&self.store, &lots) > 0 {
            return Ok(());
        }
        self.store.remove(lots.as_str());
        let name = self.lots.default_lot_name().to_string();
        self.store.set(self.lots.name_address(0)?, name);
        debug!("synthesized default lot");
        Ok(())
    }

    pub fn lot_context(&self) -> &LotContext {
        &self.lots
    }

    pub fn store(&self) -> &FlatStore {
        &self.store
    }

    pub fn into_store(self) -> FlatStore {
        self.store
    }

    /// Decode the flat store into the nested record.
    pub fn to_record(&self) -> Result<Value> {
        Ok(path::decode(&self.store)?)
    }

    /// Number of lots; never zero.
    pub fn lot_count(&self) -> usize {
        lots_address()
            .map(|lots| array::entry_count(&self.store, &lots))
            .unwrap_or_default()
            .max(1)
    }

    pub fn lots(&self) -> Vec<LotSummary> {
        (0..self.lot_count())
            .map(|index| LotSummary {
                index,
                name: self.lot_name(index),
            })
            .collect()
    }

    fn lot_name(&self, index: usize) -> String {
        self.lots
            .name_address(index)
            .ok()
            .and_then(|address| self.store.get(address.as_str()))
            .and_then(Value::as_str)
            .filter(|name| !name.trim().is_empty())
            .map_or_else(|| default_lot_label(index), str::to_string)
    }

    pub fn current_lot(&self) -> usize {
        self.current_lot
    }

    pub fn set_current_lot(&mut self, index: usize) -> Result<()> {
        self.check_lot(index)?;
        self.current_lot = index;
        Ok(())
    }

    fn check_lot(&self, index: usize) -> Result<()> {
        let count = self.lot_count();
        if index >= count {
            return Err(SessionError::LotOutOfRange { index, count });
        }
        Ok(())
    }

    /// Address of `field_path` for `lot` (the current lot when `None`).
    pub fn address_for(
        &self,
        field_path: &str,
        lot: Option<usize>,
        force_global: bool,
    ) -> Result<Address> {
        let lot = lot.unwrap_or(self.current_lot);
        Ok(self.lots.address_for(field_path, lot, force_global)?)
    }

    /// Value of `field_path` in the current lot; unset fields read as `Null`.
    pub fn get(&self, field_path: &str) -> Result<&Value> {
        let address = self.address_for(field_path, None, false)?;
        Ok(self.store.value(address.as_str()))
    }

    /// Write `field_path` in the current lot, returning the previous value.
    pub fn set(&mut self, field_path: &str, value: impl Into<Value>) -> Result<Option<Value>> {
        let address = self.address_for(field_path, None, false)?;
        Ok(self.store.set(address, value))
    }

    /// Write `field_path` in `lot`.
    pub fn set_in_lot(
        &mut self,
        field_path: &str,
        lot: usize,
        value: impl Into<Value>,
    ) -> Result<Option<Value>> {
        self.check_lot(lot)?;
        let address = self.address_for(field_path, Some(lot), false)?;
        Ok(self.store.set(address, value))
    }

    /// Clear `field_path` in the current lot.
    pub fn clear(&mut self, field_path: &str) -> Result<Option<Value>> {
        let address = self.address_for(field_path, None, false)?;
        Ok(self.store.remove(address.as_str()))
    }

    /// Append a lot and return its index.
    pub fn add_lot(&mut self, name: Option<&str>) -> Result<usize> {
        let index = self.lot_count();
        let name = name.map_or_else(|| default_lot_label(index), str::to_string);
        self.store.set(self.lots.name_address(index)?, name);
        debug!(lot = index, "added lot");
        Ok(index)
    }

    /// Remove lot `index` and shift every later lot down by one.
    ///
    /// The store is rebuilt in a single pass and swapped in at the end, so
    /// no intermediate numbering is ever observable.
    pub fn remove_lot(&mut self, index: usize) -> Result<()> {
        self.check_lot(index)?;
        let count = self.lot_count();
        if count == 1 {
            return Err(SessionError::LastLot);
        }
        let lots = lots_address()?;
        let mut renumbered = 0usize;
        self.store.rewrite(|address, value| match split_lot_address(&address) {
            Some((lot, _)) if lot == index => None,
            Some((lot, rest)) if lot > index => {
                let moved = lots.child_index(lot - 1);
                let moved = match rest {
                    Some(rest) => moved.join(rest.as_str()).unwrap_or(address),
                    None => moved,
                };
                renumbered += 1;
                Some((moved, value))
            }
            _ => Some((address, value)),
        });
        let remaining = count - 1;
        if self.current_lot > index || self.current_lot >= remaining {
            self.current_lot -= 1;
        }
        debug!(lot = index, renumbered, remaining, "removed lot");
        Ok(())
    }

    /// Id of the screen currently shown.
    pub fn current_screen(&self) -> Option<&str> {
        self.screens.get(self.current_screen).map(String::as_str)
    }

    /// Move to the screen with `id`. Returns `false` for unknown ids.
    pub fn go_to_screen(&mut self, id: &str) -> bool {
        match self.screens.iter().position(|screen| screen == id) {
            Some(position) => {
                self.current_screen = position;
                true
            }
            None => false,
        }
    }

    /// Advance one screen; stays on the last screen.
    pub fn next_screen(&mut self) -> Option<&str> {
        if self.current_screen + 1 < self.screens.len() {
            self.current_screen += 1;
        }
        self.current_screen()
    }

    /// Go back one screen; stays on the first screen.
    pub fn previous_screen(&mut self) -> Option<&str> {
        self.current_screen = self.current_screen.saturating_sub(1);
        self.current_screen()
    }
}

fn default_lot_label(index: usize) -> String {
    format!("Lot {}", index + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pds_model::Screen;

    fn form() -> FormSchema {
        FormSchema::new("test")
            .with_global_field("buyer")
            .with_screen(Screen::new("buyer").global())
            .with_screen(Screen::new("order"))
            .with_screen(Screen::new("award"))
    }

    #[test]
    fn fresh_session_has_one_default_lot() {
        let session = FormSession::new(&form()).unwrap();
        assert_eq!(session.lot_count(), 1);
        assert_eq!(
            session.lots(),
            vec![LotSummary {
                index: 0,
                name: "General".into()
            }]
        );
        assert_eq!(
            session.store().value("lots.0.name"),
            &Value::from("General")
        );
    }

    #[test]
    fn writes_follow_the_current_lot() {
        let mut session = FormSession::new(&form()).unwrap();
        let second = session.add_lot(None).unwrap();
        assert_eq!(second, 1);
        session.set_current_lot(second).unwrap();
        session.set("orderType.kind", "works").unwrap();
        session.set("buyer.name", "City").unwrap();
        assert_eq!(
            session.store().value("lots.1.orderType.kind"),
            &Value::from("works")
        );
        assert_eq!(session.store().value("buyer.name"), &Value::from("City"));
        assert_eq!(
            session.get("orderType.kind").unwrap(),
            &Value::from("works")
        );
        assert_eq!(session.lots()[1].name, "Lot 2");
    }

    #[test]
    fn out_of_range_lots_are_rejected() {
        let mut session = FormSession::new(&form()).unwrap();
        assert_eq!(
            session.set_current_lot(1),
            Err(SessionError::LotOutOfRange { index: 1, count: 1 })
        );
        assert_eq!(session.remove_lot(0), Err(SessionError::LastLot));
    }

    #[test]
    fn removing_the_current_last_lot_moves_the_pointer_back() {
        let mut session = FormSession::new(&form()).unwrap();
        session.add_lot(Some("B")).unwrap();
        session.set_current_lot(1).unwrap();
        session.remove_lot(1).unwrap();
        assert_eq!(session.current_lot(), 0);
        assert_eq!(session.lot_count(), 1);
    }

    #[test]
    fn screen_navigation_is_clamped() {
        let mut session = FormSession::new(&form()).unwrap();
        assert_eq!(session.current_screen(), Some("buyer"));
        assert_eq!(session.previous_screen(), Some("buyer"));
        assert_eq!(session.next_screen(), Some("order"));
        assert_eq!(session.next_screen(), Some("award"));
        assert_eq!(session.next_screen(), Some("award"));
        assert!(session.go_to_screen("order"));
        assert!(!session.go_to_screen("missing"));
        assert_eq!(session.current_screen(), Some("order"));
    }
}
