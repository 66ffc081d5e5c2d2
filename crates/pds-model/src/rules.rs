//! Cross-field and registry rule declarations.
//!
//! Addresses in these rules are field paths; lot-scoped screens resolve them
//! against the lot under validation, the same way field paths are resolved.

use serde::{Deserialize, Serialize};

/// Target used by sum rules when none is configured.
pub const DEFAULT_SUM_TARGET: f64 = 100.0;

fn default_sum_target() -> f64 {
    DEFAULT_SUM_TARGET
}

fn default_category_key() -> String {
    "category".to_string()
}

fn default_sole_criterion() -> String {
    "price".to_string()
}

/// Comparison between two or more fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum CrossFieldRule {
    /// `end` must not be before `start`.
    DateOrder { start: String, end: String },
    /// The listed fields must add up to `target`.
    Sum {
        fields: Vec<String>,
        #[serde(default = "default_sum_target")]
        target: f64,
    },
    /// The `key` member of every entry of `array` must add up to `target`.
    ArraySum {
        array: String,
        key: String,
        #[serde(default = "default_sum_target")]
        target: f64,
    },
}

impl CrossFieldRule {
    pub fn label(&self) -> &'static str {
        match self {
            Self::DateOrder { .. } => "date order",
            Self::Sum { .. } => "sum",
            Self::ArraySum { .. } => "array sum",
        }
    }
}

/// Constraint driven by the classification registry.
///
/// Every code found at `codes` is looked up; its restrictions are checked
/// against the `category_key` member of the entries of the `criteria` array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryRule {
    pub codes: String,
    pub criteria: String,
    #[serde(default = "default_category_key")]
    pub category_key: String,
    /// Criterion category that may not be the only one when a code forbids
    /// a sole criterion.
    #[serde(default = "default_sole_criterion")]
    pub sole_criterion: String,
}

impl RegistryRule {
    pub fn new(codes: impl Into<String>, criteria: impl Into<String>) -> Self {
        Self {
            codes: codes.into(),
            criteria: criteria.into(),
            category_key: default_category_key(),
            sole_criterion: default_sole_criterion(),
        }
    }
}
