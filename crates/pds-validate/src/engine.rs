//! Layered validation engine.
//!
//! Each screen is validated in four phases: requiredness, array
//! cardinality, cross-field comparisons and registry restrictions. All
//! phases always run; issues are emitted in phase order and, within a phase,
//! in declaration order. Results are recomputed from scratch on every call.

use std::collections::BTreeSet;

use pds_codec::{Address, FlatStore, TypeCodec, decode_at, lookup};
use pds_model::{CrossFieldRule, FormSchema, RegistryRule, Screen, TemporalKind, Value};
use pds_session::{FormSession, LotContext};
use tracing::{debug, debug_span, info_span, warn};

use crate::error::ValidationError;
use crate::issue::Issue;
use crate::materialize::{inactive_addresses, lot_count, materialize, prune};
use crate::registry::ClassificationRegistry;
use crate::report::{ScreenResult, ValidationReport};
use crate::walk::{FieldVisit, Scope, walk_fields};

/// Tolerance for sums with fractional operands.
pub const SUM_EPSILON: f64 = 1e-6;

type Result<T> = std::result::Result<T, ValidationError>;

/// Validates records against one form configuration.
pub struct Validator<'a> {
    form: &'a FormSchema,
    lots: LotContext,
    registry: Option<&'a dyn ClassificationRegistry>,
    codec: TypeCodec,
}

impl<'a> Validator<'a> {
    pub fn new(form: &'a FormSchema) -> Self {
        Self {
            form,
            lots: LotContext::from_form(form),
            registry: None,
            codec: TypeCodec::new(),
        }
    }

    /// Check registry rules against `registry`. Without one, registry rules
    /// impose nothing.
    #[must_use]
    pub fn with_registry(mut self, registry: &'a dyn ClassificationRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Codec used to read date operands.
    #[must_use]
    pub fn with_codec(mut self, codec: TypeCodec) -> Self {
        self.codec = codec;
        self
    }

    pub fn form(&self) -> &FormSchema {
        self.form
    }

    /// Validate one screen.
    ///
    /// `lot` selects the lot for lot-scoped screens (the first lot when
    /// `None`) and is ignored for global screens.
    pub fn validate_screen(
        &self,
        screen_id: &str,
        record: &Value,
        store: &FlatStore,
        lot: Option<usize>,
    ) -> Result<ScreenResult> {
        let screen = self
            .form
            .screen(screen_id)
            .ok_or_else(|| ValidationError::UnknownScreen {
                id: screen_id.to_string(),
            })?;
        let visibility = self.visibility(store)?;
        let reader = Reader {
            record,
            store,
            visibility: &visibility,
        };
        self.check_screen(screen, &reader, lot)
    }

    /// Validate every screen; lot-scoped screens once per lot.
    pub fn validate_all(&self, record: &Value, store: &FlatStore) -> Result<ValidationReport> {
        let lot_count = lot_count(store)?;
        let span = info_span!(
            "validate_all",
            screens = self.form.screens.len(),
            lots = lot_count
        );
        let _guard = span.enter();

        let visibility = self.visibility(store)?;
        let reader = Reader {
            record,
            store,
            visibility: &visibility,
        };
        let mut report = ValidationReport::new();
        for screen in &self.form.screens {
            if screen.lot_scoped {
                for lot in 0..lot_count {
                    report.push(self.check_screen(screen, &reader, Some(lot))?);
                }
            } else {
                report.push(self.check_screen(screen, &reader, None)?);
            }
        }
        debug!(issues = report.issue_count(), "validation finished");
        Ok(report)
    }

    /// Validate the session's current screen for its current lot.
    pub fn validate_current(&self, session: &FormSession) -> Result<ScreenResult> {
        let screen_id = session
            .current_screen()
            .ok_or_else(|| ValidationError::UnknownScreen { id: String::new() })?;
        let record = materialize(self.form, session.store())?;
        self.validate_screen(
            screen_id,
            &record,
            session.store(),
            Some(session.current_lot()),
        )
    }

    /// Validate a whole session.
    pub fn validate_session(&self, session: &FormSession) -> Result<ValidationReport> {
        let record = materialize(self.form, session.store())?;
        self.validate_all(&record, session.store())
    }

    fn visibility(&self, store: &FlatStore) -> Result<Visibility> {
        let inactive = inactive_addresses(self.form, &self.lots, store)?;
        Ok(Visibility::new(inactive, store))
    }

    fn check_screen(
        &self,
        screen: &Screen,
        reader: &Reader<'_>,
        lot: Option<usize>,
    ) -> Result<ScreenResult> {
        let lot = if screen.lot_scoped {
            let lot = lot.unwrap_or(0);
            let count = lot_count(reader.store)?;
            if lot >= count {
                return Err(ValidationError::LotOutOfRange { lot, count });
            }
            Some(lot)
        } else {
            None
        };
        let span = debug_span!("validate_screen", screen = %screen.id, lot = ?lot);
        let _guard = span.enter();

        let scope = Scope::new(&self.lots, screen, lot.unwrap_or(0));
        let mut result = ScreenResult::new(&screen.id, lot);

        self.check_required(screen, &scope, reader, &mut result.issues)?;
        self.check_cardinality(screen, &scope, reader, &mut result.issues)?;
        self.check_cross_field(screen, &scope, reader, &mut result.issues)?;
        self.check_registry(screen, &scope, reader, &mut result.issues)?;

        debug!(issues = result.issues.len(), "screen validated");
        Ok(result)
    }

    fn check_required(
        &self,
        screen: &Screen,
        scope: &Scope<'_>,
        reader: &Reader<'_>,
        issues: &mut Vec<Issue>,
    ) -> Result<()> {
        walk_fields(&screen.fields, scope, reader.store, &mut |visit: FieldVisit<'_>| {
            if visit.active && visit.field.required && reader.read(&visit.address)?.is_blank() {
                issues.push(Issue::RequiredMissing {
                    field: visit.path(),
                    label: visit.label(),
                });
            }
            Ok::<(), ValidationError>(())
        })
    }

    fn check_cardinality(
        &self,
        screen: &Screen,
        scope: &Scope<'_>,
        reader: &Reader<'_>,
        issues: &mut Vec<Issue>,
    ) -> Result<()> {
        walk_fields(&screen.fields, scope, reader.store, &mut |visit: FieldVisit<'_>| {
            let Some((min, max)) = visit.field.bounds() else {
                return Ok(());
            };
            if !visit.active {
                return Ok(());
            }
            let found = match reader.read(&visit.address)? {
                Value::Array(items) => items.len(),
                _ => 0,
            };
            if let Some(min) = min
                && found < min
            {
                issues.push(Issue::TooFewEntries {
                    field: visit.path(),
                    label: visit.label(),
                    min,
                    found,
                });
            }
            if let Some(max) = max
                && found > max
            {
                issues.push(Issue::TooManyEntries {
                    field: visit.path(),
                    label: visit.label(),
                    max,
                    found,
                });
            }
            Ok::<(), ValidationError>(())
        })
    }

    fn check_cross_field(
        &self,
        screen: &Screen,
        scope: &Scope<'_>,
        reader: &Reader<'_>,
        issues: &mut Vec<Issue>,
    ) -> Result<()> {
        for rule in &screen.cross_field {
            match rule {
                CrossFieldRule::DateOrder { start, end } => {
                    self.check_date_order(scope, reader, start, end, issues)?;
                }
                CrossFieldRule::Sum { fields, target } => {
                    check_sum(scope, reader, fields, *target, issues)?;
                }
                CrossFieldRule::ArraySum { array, key, target } => {
                    check_array_sum(scope, reader, array, key, *target, issues)?;
                }
            }
        }
        Ok(())
    }

    /// Missing operands are left to the requiredness phase.
    fn check_date_order(
        &self,
        scope: &Scope<'_>,
        reader: &Reader<'_>,
        start: &str,
        end: &str,
        issues: &mut Vec<Issue>,
    ) -> Result<()> {
        let start_value = reader.read(&scope.address(start)?)?;
        let end_value = reader.read(&scope.address(end)?)?;
        if start_value.is_blank() || end_value.is_blank() {
            return Ok(());
        }
        let start_date = self.codec.deserialize(&start_value, TemporalKind::Date);
        let end_date = self.codec.deserialize(&end_value, TemporalKind::Date);
        match (start_date, end_date) {
            (Some(Value::Date(from)), Some(Value::Date(to))) => {
                if to < from {
                    issues.push(Issue::EndBeforeStart {
                        start: start.to_string(),
                        end: end.to_string(),
                        start_value: start_value.to_string(),
                        end_value: end_value.to_string(),
                    });
                }
            }
            (from, to) => {
                if from.is_none() {
                    issues.push(Issue::InvalidDate {
                        field: start.to_string(),
                        value: start_value.to_string(),
                    });
                }
                if to.is_none() {
                    issues.push(Issue::InvalidDate {
                        field: end.to_string(),
                        value: end_value.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    fn check_registry(
        &self,
        screen: &Screen,
        scope: &Scope<'_>,
        reader: &Reader<'_>,
        issues: &mut Vec<Issue>,
    ) -> Result<()> {
        let Some(registry) = self.registry else {
            return Ok(());
        };
        for rule in &screen.registry {
            let codes = selected_codes(&reader.read(&scope.address(&rule.codes)?)?);
            if codes.is_empty() {
                continue;
            }
            let categories =
                criterion_categories(&reader.read(&scope.address(&rule.criteria)?)?, rule);
            for code in codes {
                let restrictions = match registry.lookup_restrictions(&code) {
                    Ok(Some(restrictions)) => restrictions,
                    Ok(None) => continue,
                    Err(error) => {
                        warn!(
                            code = %code,
                            %error,
                            "classification registry lookup failed, treating code as unrestricted"
                        );
                        continue;
                    }
                };
                if restrictions.forbids_sole_criterion
                    && !categories.is_empty()
                    && categories
                        .iter()
                        .all(|category| *category == rule.sole_criterion)
                {
                    issues.push(Issue::SoleCriterionForbidden {
                        code: code.clone(),
                        criterion: rule.sole_criterion.clone(),
                    });
                }
                for category in &restrictions.requires_criterion_categories {
                    if !categories.contains(category) {
                        issues.push(Issue::MissingCriterionCategory {
                            code: code.clone(),
                            category: category.clone(),
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

/// Fields hidden by an unmet condition.
struct Visibility {
    inactive: Vec<Address>,
    /// The store without hidden entries.
    visible: FlatStore,
}

impl Visibility {
    fn new(inactive: Vec<Address>, store: &FlatStore) -> Self {
        let visible = prune(store, &inactive);
        Self { inactive, visible }
    }

    /// `address` is a hidden field or lies below one.
    fn hides(&self, address: &Address) -> bool {
        self.inactive
            .iter()
            .any(|hidden| address.starts_with(hidden))
    }

    /// Some hidden field lies below `address`.
    fn hides_below(&self, address: &Address) -> bool {
        self.inactive
            .iter()
            .any(|hidden| hidden.starts_with(address))
    }
}

/// Reads field values: the nested record wins, the flat store fills in.
/// Hidden fields read as unset.
///
/// The store is always decoded at the requested address so that a
/// structural conflict there aborts validation even when the record
/// carries a value or the field is hidden.
struct Reader<'r> {
    record: &'r Value,
    store: &'r FlatStore,
    visibility: &'r Visibility,
}

impl Reader<'_> {
    fn read(&self, address: &Address) -> Result<Value> {
        let stored = decode_at(self.store, address)?;
        if self.visibility.hides(address) {
            return Ok(Value::Null);
        }
        if self.visibility.hides_below(address) {
            let visible = decode_at(&self.visibility.visible, address)?;
            return Ok(visible.unwrap_or_default());
        }
        Ok(lookup(self.record, address)
            .cloned()
            .or(stored)
            .unwrap_or_default())
    }
}

/// Numeric operand, or `None` for blank values. Non-numeric values are
/// reported and yield `Err(())`.
fn numeric_operand(
    field: String,
    value: &Value,
    issues: &mut Vec<Issue>,
) -> Option<std::result::Result<f64, ()>> {
    if value.is_blank() {
        return None;
    }
    match value.as_f64() {
        Some(number) => Some(Ok(number)),
        None => {
            issues.push(Issue::NotANumber {
                field,
                value: value.to_string(),
            });
            Some(Err(()))
        }
    }
}

/// Zero tolerance when every operand is integral, [`SUM_EPSILON`] otherwise.
fn sum_matches(operands: &[f64], target: f64) -> bool {
    let total: f64 = operands.iter().sum();
    if operands.iter().all(|operand| operand.fract() == 0.0) {
        total == target
    } else {
        (total - target).abs() <= SUM_EPSILON
    }
}

fn check_sum(
    scope: &Scope<'_>,
    reader: &Reader<'_>,
    fields: &[String],
    target: f64,
    issues: &mut Vec<Issue>,
) -> Result<()> {
    let mut operands = Vec::new();
    let mut numeric = true;
    for path in fields {
        let value = reader.read(&scope.address(path)?)?;
        match numeric_operand(path.clone(), &value, issues) {
            Some(Ok(number)) => operands.push(number),
            Some(Err(())) => numeric = false,
            None => {}
        }
    }
    if !numeric || operands.is_empty() || sum_matches(&operands, target) {
        return Ok(());
    }
    issues.push(Issue::SumMismatch {
        fields: fields.to_vec(),
        target,
        actual: operands.iter().sum(),
    });
    Ok(())
}

fn check_array_sum(
    scope: &Scope<'_>,
    reader: &Reader<'_>,
    array: &str,
    key: &str,
    target: f64,
    issues: &mut Vec<Issue>,
) -> Result<()> {
    let Value::Array(entries) = reader.read(&scope.address(array)?)? else {
        return Ok(());
    };
    let mut operands = Vec::new();
    let mut numeric = true;
    for (index, entry) in entries.iter().enumerate() {
        let Some(value) = entry.as_object().and_then(|members| members.get(key)) else {
            continue;
        };
        match numeric_operand(format!("{array}.{index}.{key}"), value, issues) {
            Some(Ok(number)) => operands.push(number),
            Some(Err(())) => numeric = false,
            None => {}
        }
    }
    if !numeric || operands.is_empty() || sum_matches(&operands, target) {
        return Ok(());
    }
    issues.push(Issue::ArraySumMismatch {
        array: array.to_string(),
        key: key.to_string(),
        target,
        actual: operands.iter().sum(),
    });
    Ok(())
}

/// Classification codes held by a single value or a multi-select list,
/// deduplicated in selection order.
fn selected_codes(value: &Value) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let candidates: Vec<&Value> = match value {
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    };
    candidates
        .into_iter()
        .filter_map(|candidate| match candidate {
            Value::Text(text) => Some(text.trim().to_string()),
            Value::Number(number) => Some(number.to_string()),
            _ => None,
        })
        .filter(|code| !code.is_empty() && seen.insert(code.clone()))
        .collect()
}

/// Categories of the selected award criteria. Entries are either objects
/// carrying the category under the rule's key, or bare category names.
fn criterion_categories(value: &Value, rule: &RegistryRule) -> BTreeSet<String> {
    let entries: Vec<&Value> = match value {
        Value::Array(items) => items.iter().collect(),
        Value::Null => Vec::new(),
        other => vec![other],
    };
    entries
        .into_iter()
        .filter_map(|entry| match entry {
            Value::Object(members) => members.get(&rule.category_key).and_then(Value::as_str),
            other => other.as_str(),
        })
        .map(str::trim)
        .filter(|category| !category.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integral_sums_use_exact_comparison() {
        assert!(sum_matches(&[30.0, 30.0, 40.0], 100.0));
        assert!(!sum_matches(&[30.0, 30.0, 30.0], 100.0));
    }

    #[test]
    fn fractional_sums_use_a_tolerance() {
        assert!(sum_matches(&[33.3, 33.3, 33.4], 100.0));
        assert!(sum_matches(&[0.1, 0.2], 0.3));
        assert!(!sum_matches(&[33.3, 33.3, 33.3], 100.0));
    }

    #[test]
    fn codes_are_deduplicated_in_order() {
        let value = Value::Array(vec![
            Value::text("45000000"),
            Value::text(" 79000000 "),
            Value::text("45000000"),
            Value::Null,
        ]);
        assert_eq!(selected_codes(&value), vec!["45000000", "79000000"]);
        assert_eq!(selected_codes(&Value::text("")), Vec::<String>::new());
    }
}
