//! Lot context and per-session form state.
//!
//! Every record owns at least one lot. Lot-scoped fields are stored under
//! `lots.<index>.`, global fields at the record root. A [`FormSession`]
//! carries the current lot and screen pointers for one open form.

pub mod error;
pub mod lot;
pub mod session;
pub mod storage;

pub use error::{Result, SessionError};
pub use lot::{LOT_NAME_FIELD, LOTS_KEY, LotContext, lots_address, split_lot_address};
pub use session::{FormSession, LotSummary};
pub use storage::{denormalize_record, field_template, leaf_hints};
