//! Validation issue types.
//!
//! Each variant carries only the data its message needs. Field references
//! are lot-relative concrete paths (`items.1.name`); the lot itself is
//! recorded on the enclosing [`ScreenResult`](crate::ScreenResult).

use std::fmt;

use serde::{Deserialize, Serialize};

/// Validation phase, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Phase {
    Required,
    Cardinality,
    CrossField,
    Registry,
}

impl Phase {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Required => "Required",
            Self::Cardinality => "Cardinality",
            Self::CrossField => "Cross-field",
            Self::Registry => "Registry",
        }
    }
}

/// One user-facing violation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Issue {
    // Requiredness
    /// An active required field has no value.
    RequiredMissing { field: String, label: String },

    // Cardinality
    /// An array has fewer entries than its minimum.
    TooFewEntries {
        field: String,
        label: String,
        min: usize,
        found: usize,
    },
    /// An array has more entries than its maximum.
    TooManyEntries {
        field: String,
        label: String,
        max: usize,
        found: usize,
    },

    // Cross-field
    /// A date operand cannot be read as a date.
    InvalidDate { field: String, value: String },
    /// A sum operand is not numeric.
    NotANumber { field: String, value: String },
    /// End date lies before start date.
    EndBeforeStart {
        start: String,
        end: String,
        start_value: String,
        end_value: String,
    },
    /// Listed fields do not add up to the target.
    SumMismatch {
        fields: Vec<String>,
        target: f64,
        actual: f64,
    },
    /// The `key` members of an array do not add up to the target.
    ArraySumMismatch {
        array: String,
        key: String,
        target: f64,
        actual: f64,
    },

    // Registry
    /// The code forbids ranking on a single criterion category.
    SoleCriterionForbidden { code: String, criterion: String },
    /// The code requires a criterion category that is not selected.
    MissingCriterionCategory { code: String, category: String },
}

impl Issue {
    pub fn phase(&self) -> Phase {
        match self {
            Issue::RequiredMissing { .. } => Phase::Required,
            Issue::TooFewEntries { .. } | Issue::TooManyEntries { .. } => Phase::Cardinality,
            Issue::InvalidDate { .. }
            | Issue::NotANumber { .. }
            | Issue::EndBeforeStart { .. }
            | Issue::SumMismatch { .. }
            | Issue::ArraySumMismatch { .. } => Phase::CrossField,
            Issue::SoleCriterionForbidden { .. } | Issue::MissingCriterionCategory { .. } => {
                Phase::Registry
            }
        }
    }

    /// Primary field the issue is attached to.
    pub fn field(&self) -> &str {
        match self {
            Issue::RequiredMissing { field, .. } => field,
            Issue::TooFewEntries { field, .. } => field,
            Issue::TooManyEntries { field, .. } => field,
            Issue::InvalidDate { field, .. } => field,
            Issue::NotANumber { field, .. } => field,
            Issue::EndBeforeStart { end, .. } => end,
            Issue::SumMismatch { fields, .. } => fields.first().map_or("", String::as_str),
            Issue::ArraySumMismatch { array, .. } => array,
            Issue::SoleCriterionForbidden { code, .. } => code,
            Issue::MissingCriterionCategory { code, .. } => code,
        }
    }

    /// Human-readable message.
    pub fn message(&self) -> String {
        match self {
            Issue::RequiredMissing { field, label } => {
                format!("{} is required", named(label, field))
            }
            Issue::TooFewEntries {
                field,
                label,
                min,
                found,
            } => format!(
                "{} needs at least {min} {} (found {found})",
                named(label, field),
                entries(*min)
            ),
            Issue::TooManyEntries {
                field,
                label,
                max,
                found,
            } => format!(
                "{} allows at most {max} {} (found {found})",
                named(label, field),
                entries(*max)
            ),
            Issue::InvalidDate { field, value } => {
                format!("{field} is not a valid date: '{value}'")
            }
            Issue::NotANumber { field, value } => format!("{field} is not a number: '{value}'"),
            Issue::EndBeforeStart {
                start,
                end,
                start_value,
                end_value,
            } => format!("{end} ({end_value}) is before {start} ({start_value})"),
            Issue::SumMismatch {
                fields,
                target,
                actual,
            } => format!(
                "{} must add up to {target} (found {actual})",
                fields.join(" + ")
            ),
            Issue::ArraySumMismatch {
                array,
                key,
                target,
                actual,
            } => format!("{key} across {array} must add up to {target} (found {actual})"),
            Issue::SoleCriterionForbidden { code, criterion } => format!(
                "Classification code {code} does not allow '{criterion}' as the only award criterion"
            ),
            Issue::MissingCriterionCategory { code, category } => format!(
                "Classification code {code} requires an award criterion of category '{category}'"
            ),
        }
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

fn named(label: &str, field: &str) -> String {
    if label == field {
        field.to_string()
    } else {
        format!("{label} ({field})")
    }
}

fn entries(count: usize) -> &'static str {
    if count == 1 { "entry" } else { "entries" }
}
