//! Validation results.

use serde::{Deserialize, Serialize};

use crate::issue::Issue;

/// Outcome of validating one screen for one lot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenResult {
    pub screen_id: String,
    /// `None` for screens that are not lot-scoped.
    pub lot: Option<usize>,
    pub issues: Vec<Issue>,
}

impl ScreenResult {
    pub fn new(screen_id: impl Into<String>, lot: Option<usize>) -> Self {
        Self {
            screen_id: screen_id.into(),
            lot,
            issues: Vec::new(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }

    /// Issue messages in emission order.
    pub fn messages(&self) -> Vec<String> {
        self.issues.iter().map(Issue::message).collect()
    }
}

/// Results of a full validation pass, in screen order and then lot order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub results: Vec<ScreenResult>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, result: ScreenResult) {
        self.results.push(result);
    }

    /// Result for `(screen_id, lot)`.
    pub fn get(&self, screen_id: &str, lot: Option<usize>) -> Option<&ScreenResult> {
        self.results
            .iter()
            .find(|result| result.screen_id == screen_id && result.lot == lot)
    }

    pub fn is_valid(&self) -> bool {
        self.results.iter().all(ScreenResult::is_valid)
    }

    pub fn issue_count(&self) -> usize {
        self.results.iter().map(|result| result.issues.len()).sum()
    }

    /// Results that carry at least one issue.
    pub fn failing(&self) -> impl Iterator<Item = &ScreenResult> {
        self.results.iter().filter(|result| !result.is_valid())
    }

    /// Every message, prefixed with its screen and lot.
    pub fn messages(&self) -> Vec<String> {
        self.results
            .iter()
            .flat_map(|result| {
                let scope = match result.lot {
                    Some(lot) => format!("{} [lot {lot}]", result.screen_id),
                    None => result.screen_id.clone(),
                };
                result
                    .issues
                    .iter()
                    .map(move |issue| format!("{scope}: {}", issue.message()))
            })
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ScreenResult> {
        self.results.iter()
    }
}
