//! Form configuration: ordered screens and the lot layout.
//!
//! A form is described entirely by configuration (TOML or JSON). The
//! configuration names the screens in display order, the fields each screen
//! collects, the cross-field and registry rules it enforces, and which
//! fields live outside the per-lot partition.

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SchemaError};
use crate::rules::{CrossFieldRule, RegistryRule};
use crate::schema::{FieldKind, FieldSchema};
use crate::value::TemporalKind;

/// Display name of the lot synthesized for records without explicit lots.
pub const DEFAULT_LOT_NAME: &str = "General";

fn default_lot_name() -> String {
    DEFAULT_LOT_NAME.to_string()
}

fn default_true() -> bool {
    true
}

/// One step of the form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Screen {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    /// Lot-scoped screens are validated once per lot.
    #[serde(default = "default_true")]
    pub lot_scoped: bool,
    #[serde(default)]
    pub fields: Vec<FieldSchema>,
    #[serde(default)]
    pub cross_field: Vec<CrossFieldRule>,
    #[serde(default)]
    pub registry: Vec<RegistryRule>,
}

impl Screen {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: None,
            lot_scoped: true,
            fields: Vec::new(),
            cross_field: Vec::new(),
            registry: Vec::new(),
        }
    }

    #[must_use]
    pub fn global(mut self) -> Self {
        self.lot_scoped = false;
        self
    }

    #[must_use]
    pub fn with_field(mut self, field: FieldSchema) -> Self {
        self.fields.push(field);
        self
    }

    #[must_use]
    pub fn with_cross_field(mut self, rule: CrossFieldRule) -> Self {
        self.cross_field.push(rule);
        self
    }

    #[must_use]
    pub fn with_registry(mut self, rule: RegistryRule) -> Self {
        self.registry.push(rule);
        self
    }

    pub fn display_name(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.id)
    }
}

/// A field together with the screen that declares it.
///
/// [`FormSchema::field_templates`] pairs it with the full path template.
/// Paths of fields nested in arrays omit the index segments: the template
/// of `name` inside the array `items` is `items.name`.
#[derive(Debug, Clone, Copy)]
pub struct FieldTemplate<'a> {
    pub screen: &'a Screen,
    pub field: &'a FieldSchema,
}

/// Complete form configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormSchema {
    pub name: String,
    #[serde(default = "default_lot_name")]
    pub default_lot_name: String,
    /// Field paths that are stored at the record root instead of per lot.
    #[serde(default)]
    pub global_fields: Vec<String>,
    #[serde(default)]
    pub screens: Vec<Screen>,
}

impl FormSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default_lot_name: default_lot_name(),
            global_fields: Vec::new(),
            screens: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_global_field(mut self, path: impl Into<String>) -> Self {
        self.global_fields.push(path.into());
        self
    }

    #[must_use]
    pub fn with_screen(mut self, screen: Screen) -> Self {
        self.screens.push(screen);
        self
    }

    /// Parse a TOML form configuration and check it.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let form: FormSchema = toml::from_str(content).map_err(|e| SchemaError::Parse {
            origin: "<toml>".to_string(),
            message: e.to_string(),
        })?;
        form.validate_definition()?;
        Ok(form)
    }

    /// Parse a JSON form configuration and check it.
    pub fn from_json_str(content: &str) -> Result<Self> {
        let form: FormSchema = serde_json::from_str(content).map_err(|e| SchemaError::Parse {
            origin: "<json>".to_string(),
            message: e.to_string(),
        })?;
        form.validate_definition()?;
        Ok(form)
    }

    /// Load a configuration file; `.json` files are read as JSON, anything
    /// else as TOML.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| SchemaError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let parsed = if is_json {
            Self::from_json_str(&content)
        } else {
            Self::from_toml_str(&content)
        };
        parsed.map_err(|error| match error {
            SchemaError::Parse { message, .. } => SchemaError::Parse {
                origin: path.display().to_string(),
                message,
            },
            other => other,
        })
    }

    pub fn screen(&self, id: &str) -> Option<&Screen> {
        self.screens.iter().find(|screen| screen.id == id)
    }

    pub fn screen_index(&self, id: &str) -> Option<usize> {
        self.screens.iter().position(|screen| screen.id == id)
    }

    pub fn global_field_set(&self) -> BTreeSet<String> {
        self.global_fields.iter().cloned().collect()
    }

    /// Every field of every screen with its full path template, in screen
    /// and declaration order.
    pub fn field_templates(&self) -> Vec<(String, FieldTemplate<'_>)> {
        let mut out = Vec::new();
        for screen in &self.screens {
            collect_templates(screen, &screen.fields, "", &mut out);
        }
        out
    }

    /// Calendar kind of the field whose template is `template`.
    pub fn temporal_kind_of(&self, template: &str) -> Option<TemporalKind> {
        self.field_templates()
            .into_iter()
            .find(|(path, _)| path == template)
            .and_then(|(_, entry)| entry.field.temporal_kind())
    }

    /// Check the configuration for declarations the engine cannot honor.
    pub fn validate_definition(&self) -> Result<()> {
        let mut seen = BTreeSet::new();
        for screen in &self.screens {
            if !seen.insert(screen.id.as_str()) {
                return Err(SchemaError::DuplicateScreen {
                    id: screen.id.clone(),
                });
            }
            check_fields(screen, &screen.fields)?;
            for rule in &screen.cross_field {
                check_cross_field(screen, rule)?;
            }
            for rule in &screen.registry {
                if !is_well_formed_path(&rule.codes) || !is_well_formed_path(&rule.criteria) {
                    return Err(SchemaError::InvalidField {
                        screen: screen.id.clone(),
                        field: rule.codes.clone(),
                        reason: "registry rule needs both a codes and a criteria path".into(),
                    });
                }
            }
        }
        Ok(())
    }
}

fn collect_templates<'a>(
    screen: &'a Screen,
    fields: &'a [FieldSchema],
    prefix: &str,
    out: &mut Vec<(String, FieldTemplate<'a>)>,
) {
    for field in fields {
        let template = if prefix.is_empty() {
            field.path.clone()
        } else {
            format!("{prefix}.{}", field.path)
        };
        out.push((template.clone(), FieldTemplate { screen, field }));
        collect_templates(screen, field.kind.children(), &template, out);
    }
}

/// Paths are dot-separated and may not contain empty segments.
fn is_well_formed_path(path: &str) -> bool {
    !path.is_empty() && path.split('.').all(|segment| !segment.trim().is_empty())
}

fn check_fields(screen: &Screen, fields: &[FieldSchema]) -> Result<()> {
    for field in fields {
        let invalid = |reason: &str| SchemaError::InvalidField {
            screen: screen.id.clone(),
            field: field.path.clone(),
            reason: reason.to_string(),
        };
        if !is_well_formed_path(&field.path) {
            return Err(invalid("path must be a dotted name without empty segments"));
        }
        if let Some(condition) = &field.condition
            && !is_well_formed_path(&condition.address)
        {
            return Err(invalid("condition address is not a valid path"));
        }
        match &field.kind {
            FieldKind::ArrayOfObject { min, max, fields } => {
                if let (Some(min), Some(max)) = (min, max)
                    && min > max
                {
                    return Err(invalid("array minimum is greater than its maximum"));
                }
                check_fields(screen, fields)?;
            }
            FieldKind::NestedObject { fields } => check_fields(screen, fields)?,
            FieldKind::Choice { options, .. } if options.is_empty() => {
                return Err(invalid("choice field has no options"));
            }
            FieldKind::Choice { .. } | FieldKind::Scalar { .. } => {}
        }
    }
    Ok(())
}

fn check_cross_field(screen: &Screen, rule: &CrossFieldRule) -> Result<()> {
    let invalid = |field: &str, reason: &str| SchemaError::InvalidField {
        screen: screen.id.clone(),
        field: field.to_string(),
        reason: reason.to_string(),
    };
    match rule {
        CrossFieldRule::DateOrder { start, end } => {
            for path in [start, end] {
                if !is_well_formed_path(path) {
                    return Err(invalid(path, "date order operand is not a valid path"));
                }
            }
        }
        CrossFieldRule::Sum { fields, .. } => {
            if fields.len() < 2 {
                return Err(invalid(
                    fields.first().map_or("", String::as_str),
                    "sum rule needs at least two fields",
                ));
            }
            if let Some(path) = fields.iter().find(|path| !is_well_formed_path(path)) {
                return Err(invalid(path, "sum operand is not a valid path"));
            }
        }
        CrossFieldRule::ArraySum { array, key, .. } => {
            if !is_well_formed_path(array) || key.trim().is_empty() {
                return Err(invalid(array, "array sum needs an array path and a key"));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::Condition;
    use crate::schema::ScalarType;

    #[test]
    fn duplicate_screens_are_rejected() {
        let form = FormSchema::new("f")
            .with_screen(Screen::new("a"))
            .with_screen(Screen::new("a"));
        assert!(matches!(
            form.validate_definition(),
            Err(SchemaError::DuplicateScreen { id }) if id == "a"
        ));
    }

    #[test]
    fn inverted_bounds_are_rejected() {
        let field = FieldSchema::new(
            "items",
            FieldKind::ArrayOfObject {
                fields: vec![],
                min: Some(3),
                max: Some(1),
            },
        );
        let form = FormSchema::new("f").with_screen(Screen::new("a").with_field(field));
        assert!(matches!(
            form.validate_definition(),
            Err(SchemaError::InvalidField { .. })
        ));
    }

    #[test]
    fn malformed_condition_addresses_are_rejected() {
        for address in ["", "lots..hasValue", "lots.{lot}."] {
            let field = FieldSchema::scalar("value", ScalarType::Number)
                .with_condition(Condition::truthy(address));
            let form = FormSchema::new("f").with_screen(Screen::new("a").with_field(field));
            assert!(
                matches!(
                    form.validate_definition(),
                    Err(SchemaError::InvalidField { reason, .. })
                        if reason == "condition address is not a valid path"
                ),
                "{address}"
            );
        }
        let field = FieldSchema::scalar("value", ScalarType::Number)
            .with_condition(Condition::truthy("lots.{lot}.hasValue"));
        let form = FormSchema::new("f").with_screen(Screen::new("a").with_field(field));
        assert!(form.validate_definition().is_ok());
    }

    #[test]
    fn templates_join_nested_paths() {
        let item = FieldSchema::scalar("date", ScalarType::Date);
        let field = FieldSchema::new(
            "orderType.items",
            FieldKind::ArrayOfObject {
                fields: vec![item],
                min: None,
                max: None,
            },
        );
        let form = FormSchema::new("f").with_screen(Screen::new("a").with_field(field));
        let paths: Vec<String> = form.field_templates().into_iter().map(|(p, _)| p).collect();
        assert_eq!(paths, vec!["orderType.items", "orderType.items.date"]);
        assert_eq!(
            form.temporal_kind_of("orderType.items.date"),
            Some(TemporalKind::Date)
        );
    }
}
