//! Classification registry contract and a CSV-backed registry.
//!
//! The registry answers one question: which award-criterion restrictions a
//! classification code imposes. Lookups are synchronous; a remote registry
//! is expected to be resolved or pre-fetched by its client before
//! validation starts.

use std::collections::HashMap;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::RegistryError;

/// Restrictions a classification code places on the award criteria.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Restrictions {
    /// The sole-criterion category may not be the only category selected.
    pub forbids_sole_criterion: bool,
    /// Criterion categories that must be present.
    pub requires_criterion_categories: Vec<String>,
}

impl Restrictions {
    pub fn is_empty(&self) -> bool {
        !self.forbids_sole_criterion && self.requires_criterion_categories.is_empty()
    }
}

/// Source of classification code restrictions.
///
/// `Ok(None)` means the code is known to impose nothing (or is unknown);
/// `Err` means the registry could not answer. The validator treats both the
/// same way, but logs the error.
pub trait ClassificationRegistry {
    fn lookup_restrictions(&self, code: &str) -> Result<Option<Restrictions>, RegistryError>;
}

/// In-memory registry.
#[derive(Debug, Clone, Default)]
pub struct StaticRegistry {
    codes: HashMap<String, Restrictions>,
}

impl StaticRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, code: impl Into<String>, restrictions: Restrictions) {
        self.codes.insert(code.into(), restrictions);
    }

    #[must_use]
    pub fn with(mut self, code: impl Into<String>, restrictions: Restrictions) -> Self {
        self.insert(code, restrictions);
        self
    }

    pub fn get(&self, code: &str) -> Option<&Restrictions> {
        self.codes.get(code)
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Load a registry from a CSV file with the columns `code`,
    /// `forbids_sole_criterion` and `required_categories` (categories
    /// separated by `;`).
    pub fn load(path: &Path) -> Result<Self, RegistryError> {
        let load_error = |source| RegistryError::Load {
            path: path.to_path_buf(),
            source,
        };
        let reader = csv::Reader::from_path(path).map_err(load_error)?;
        Self::from_csv(reader).map_err(|error| match error {
            CsvError::Csv(source) => load_error(source),
            CsvError::MissingColumn(column) => RegistryError::MissingColumn {
                path: path.to_path_buf(),
                column,
            },
        })
    }

    /// Read a registry from CSV text.
    pub fn from_reader<R: io::Read>(reader: R) -> Result<Self, RegistryError> {
        Self::from_csv(csv::Reader::from_reader(reader)).map_err(|error| match error {
            CsvError::Csv(source) => RegistryError::Load {
                path: "<reader>".into(),
                source,
            },
            CsvError::MissingColumn(column) => RegistryError::MissingColumn {
                path: "<reader>".into(),
                column,
            },
        })
    }

    fn from_csv<R: io::Read>(mut reader: csv::Reader<R>) -> Result<Self, CsvError> {
        let headers = reader.headers()?.clone();
        let code_idx = find_column(&headers, "code")?;
        let sole_idx = find_column(&headers, "forbids_sole_criterion")?;
        let required_idx = find_column(&headers, "required_categories")?;

        let mut registry = Self::new();
        for result in reader.records() {
            let record = result?;

            let code = record.get(code_idx).unwrap_or("").trim();
            if code.is_empty() {
                continue;
            }

            let restrictions = Restrictions {
                forbids_sole_criterion: parse_flag(record.get(sole_idx).unwrap_or("")),
                requires_criterion_categories: record
                    .get(required_idx)
                    .unwrap_or("")
                    .split(';')
                    .map(str::trim)
                    .filter(|category| !category.is_empty())
                    .map(str::to_string)
                    .collect(),
            };
            registry.insert(code, restrictions);
        }
        Ok(registry)
    }
}

impl ClassificationRegistry for StaticRegistry {
    fn lookup_restrictions(&self, code: &str) -> Result<Option<Restrictions>, RegistryError> {
        Ok(self.get(code).cloned())
    }
}

enum CsvError {
    Csv(csv::Error),
    MissingColumn(String),
}

impl From<csv::Error> for CsvError {
    fn from(error: csv::Error) -> Self {
        Self::Csv(error)
    }
}

fn find_column(headers: &csv::StringRecord, name: &str) -> Result<usize, CsvError> {
    headers
        .iter()
        .position(|header| header.trim().eq_ignore_ascii_case(name))
        .ok_or_else(|| CsvError::MissingColumn(name.to_string()))
}

fn parse_flag(raw: &str) -> bool {
    matches!(
        raw.trim().to_lowercase().as_str(),
        "true" | "yes" | "y" | "1"
    )
}
