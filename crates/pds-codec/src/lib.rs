//! Flat address space for form records.
//!
//! - [`address`] - address parsing; the only place address strings are split
//! - [`store`] - the flat store manipulated by the UI
//! - [`path`] - encode/decode between nested records and the flat store
//! - [`array`] - gap-tolerant reconstruction of indexed arrays
//! - [`types`] - calendar and custom leaf normalization for storage

pub mod address;
pub mod array;
pub mod error;
pub mod path;
pub mod store;
pub mod types;

pub use address::{Address, Segment};
pub use error::{CodecError, Result};
pub use path::{decode, decode_at, encode, lookup};
pub use store::FlatStore;
pub use types::{LeafFormatter, LeafHint, TypeCodec};
