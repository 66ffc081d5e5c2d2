//! Field schema definitions.
//!
//! Every field a screen collects is described by a [`FieldSchema`]. The
//! shape of the field is a closed set of kinds ([`FieldKind`]) so that
//! every consumer handles all of them through exhaustive matching.

use serde::{Deserialize, Serialize};

use crate::condition::Condition;
use crate::value::{TemporalKind, Value};

/// Primitive type of a scalar field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarType {
    Text,
    Number,
    Integer,
    Boolean,
    Date,
    Time,
    DateTime,
}

impl ScalarType {
    /// Calendar kind for temporal scalars, used to restore typed leaves
    /// when a stored record is reloaded.
    pub fn temporal_kind(&self) -> Option<TemporalKind> {
        match self {
            Self::Date => Some(TemporalKind::Date),
            Self::Time => Some(TemporalKind::Time),
            Self::DateTime => Some(TemporalKind::DateTime),
            Self::Text | Self::Number | Self::Integer | Self::Boolean => None,
        }
    }
}

/// Shape of a field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldKind {
    /// A single primitive value.
    Scalar { scalar: ScalarType },
    /// One (or, with `multiple`, several) of a fixed list of options.
    Choice {
        options: Vec<String>,
        #[serde(default)]
        multiple: bool,
    },
    /// A repeatable group; each entry is an object with `fields`.
    ArrayOfObject {
        fields: Vec<FieldSchema>,
        #[serde(default)]
        min: Option<usize>,
        #[serde(default)]
        max: Option<usize>,
    },
    /// A fixed group of sub-fields stored under the field's path.
    NestedObject { fields: Vec<FieldSchema> },
}

impl FieldKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Scalar { .. } => "scalar",
            Self::Choice { .. } => "choice",
            Self::ArrayOfObject { .. } => "array",
            Self::NestedObject { .. } => "object",
        }
    }

    /// Sub-fields of container kinds.
    pub fn children(&self) -> &[FieldSchema] {
        match self {
            Self::ArrayOfObject { fields, .. } | Self::NestedObject { fields } => fields,
            Self::Scalar { .. } | Self::Choice { .. } => &[],
        }
    }
}

/// Static metadata of one field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSchema {
    /// Dotted path relative to the field's parent (the lot for lot-scoped
    /// fields, the record root for global ones).
    pub path: String,
    #[serde(default)]
    pub label: Option<String>,
    pub kind: FieldKind,
    #[serde(default)]
    pub required: bool,
    /// Value substituted when a stored value cannot be parsed back.
    #[serde(default)]
    pub default: Option<serde_json::Value>,
    /// Visibility/requiredness gate; absent means always active.
    #[serde(default)]
    pub condition: Option<Condition>,
}

impl FieldSchema {
    pub fn new(path: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            path: path.into(),
            label: None,
            kind,
            required: false,
            default: None,
            condition: None,
        }
    }

    pub fn scalar(path: impl Into<String>, scalar: ScalarType) -> Self {
        Self::new(path, FieldKind::Scalar { scalar })
    }

    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    #[must_use]
    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }

    #[must_use]
    pub fn with_default(mut self, default: serde_json::Value) -> Self {
        self.default = Some(default);
        self
    }

    /// Label for messages, falling back to the path.
    pub fn display_name(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.path)
    }

    pub fn default_value(&self) -> Option<Value> {
        self.default.as_ref().map(Value::from)
    }

    /// Calendar kind of the field, if it is a temporal scalar.
    pub fn temporal_kind(&self) -> Option<TemporalKind> {
        match &self.kind {
            FieldKind::Scalar { scalar } => scalar.temporal_kind(),
            _ => None,
        }
    }

    /// Cardinality bounds of array fields.
    pub fn bounds(&self) -> Option<(Option<usize>, Option<usize>)> {
        match &self.kind {
            FieldKind::ArrayOfObject { min, max, .. } => Some((*min, *max)),
            _ => None,
        }
    }
}
