//! Data model for procurement declaration forms.
//!
//! - [`value`] - rich record values (JSON plus calendar and custom leaves)
//! - [`schema`] - field metadata as a closed set of field kinds
//! - [`condition`] - declarative visibility/requiredness conditions
//! - [`rules`] - cross-field and registry rule declarations
//! - [`form`] - screens and the form configuration loaded from TOML/JSON

pub mod condition;
pub mod error;
pub mod form;
pub mod rules;
pub mod schema;
pub mod value;

pub use condition::{Comparator, Condition, LOT_PLACEHOLDER};
pub use error::{Result, SchemaError};
pub use form::{DEFAULT_LOT_NAME, FieldTemplate, FormSchema, Screen};
pub use rules::{CrossFieldRule, DEFAULT_SUM_TARGET, RegistryRule};
pub use schema::{FieldKind, FieldSchema, ScalarType};
pub use value::{CustomLeaf, LeafKind, Map, TemporalKind, Value};
