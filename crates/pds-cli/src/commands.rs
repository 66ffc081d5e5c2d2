use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tracing::{info, info_span, trace};

use pds_codec::{FlatStore, TypeCodec};
use pds_model::FormSchema;
use pds_session::{FormSession, LotSummary};
use pds_validate::{StaticRegistry, ValidationReport, Validator};

use crate::logging::redact_value;

/// Inputs of one `validate` run.
#[derive(Debug, Clone, Default)]
pub struct ValidateOptions {
    pub form: PathBuf,
    pub record: PathBuf,
    /// CSV classification registry.
    pub registry: Option<PathBuf>,
    /// Validate only this screen.
    pub screen: Option<String>,
    /// Lot used together with `screen`.
    pub lot: Option<usize>,
}

/// Read and check a form configuration.
pub fn load_form(path: &Path) -> Result<FormSchema> {
    FormSchema::load(path)
        .with_context(|| format!("load form configuration {}", path.display()))
}

/// Open a stored record (JSON) as a session.
pub fn load_session(form: &FormSchema, codec: &TypeCodec, path: &Path) -> Result<FormSession> {
    let content =
        fs::read_to_string(path).with_context(|| format!("read record {}", path.display()))?;
    let stored: serde_json::Value = serde_json::from_str(&content)
        .with_context(|| format!("parse record {}", path.display()))?;
    FormSession::from_storage(form, codec, &stored)
        .with_context(|| format!("open record {}", path.display()))
}

pub fn run_validate(options: &ValidateOptions) -> Result<ValidationReport> {
    let span = info_span!("validate", record = %options.record.display());
    let _guard = span.enter();

    let form = load_form(&options.form)?;
    let codec = TypeCodec::new();
    let mut session = load_session(&form, &codec, &options.record)?;
    let registry = options
        .registry
        .as_deref()
        .map(|path| {
            StaticRegistry::load(path)
                .with_context(|| format!("load classification registry {}", path.display()))
        })
        .transpose()?;
    if let Some(registry) = &registry {
        info!(codes = registry.len(), "classification registry loaded");
    }

    let mut validator = Validator::new(&form);
    if let Some(registry) = &registry {
        validator = validator.with_registry(registry);
    }

    let report = match &options.screen {
        Some(screen) => {
            if !session.go_to_screen(screen) {
                bail!("unknown screen '{screen}'");
            }
            if let Some(lot) = options.lot {
                session.set_current_lot(lot)?;
            }
            let mut report = ValidationReport::new();
            report.push(validator.validate_current(&session)?);
            report
        }
        None => validator.validate_session(&session)?,
    };
    info!(
        lots = session.lot_count(),
        issues = report.issue_count(),
        "record validated"
    );
    Ok(report)
}

/// Flat store of a record, with calendar values restored from the form.
pub fn run_flatten(form_path: &Path, record_path: &Path) -> Result<FlatStore> {
    let form = load_form(form_path)?;
    let session = load_session(&form, &TypeCodec::new(), record_path)?;
    let store = session.into_store();
    for (address, value) in &store {
        trace!(
            address = %address,
            value = redact_value(&value.to_string()),
            "flattened entry"
        );
    }
    Ok(store)
}

pub fn run_lots(form_path: &Path, record_path: &Path) -> Result<Vec<LotSummary>> {
    let form = load_form(form_path)?;
    let session = load_session(&form, &TypeCodec::new(), record_path)?;
    Ok(session.lots())
}
