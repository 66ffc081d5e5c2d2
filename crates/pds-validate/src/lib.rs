//! Conditional evaluation and validation of procurement declarations.
//!
//! - [`condition`] - whether a field is active for a lot
//! - [`engine`] - the four-phase per-screen validator
//! - [`materialize`] - the nested record without inactive fields
//! - [`registry`] - classification registry contract and CSV registry
//! - [`issue`] / [`report`] - user-facing results

pub mod condition;
pub mod engine;
pub mod error;
pub mod issue;
pub mod materialize;
pub mod registry;
pub mod report;
mod walk;

pub use condition::is_active;
pub use engine::{SUM_EPSILON, Validator};
pub use error::{RegistryError, ValidationError};
pub use issue::{Issue, Phase};
pub use materialize::materialize;
pub use registry::{ClassificationRegistry, Restrictions, StaticRegistry};
pub use report::{ScreenResult, ValidationReport};
