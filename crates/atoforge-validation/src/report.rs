//! Validation report aggregation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use atoforge_utils::error::remediation_suggestions;

/// Severity of a validation check.
///
/// Only failed `Error` checks block generation; `Warning` and `Info` are
/// advisory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckSeverity {
    Error,
    Warning,
    Info,
}

/// Result of one independent pre-flight check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationCheck {
    pub name: String,
    pub passed: bool,
    pub severity: CheckSeverity,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ValidationCheck {
    /// A passing check.
    #[must_use]
    pub fn pass(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed: true,
            severity: CheckSeverity::Info,
            message: message.into(),
            details: None,
        }
    }

    /// A failing check with the given severity.
    #[must_use]
    pub fn fail(
        name: impl Into<String>,
        severity: CheckSeverity,
        message: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            passed: false,
            severity,
            message: message.into(),
            details: None,
        }
    }

    /// Attach structured details.
    #[must_use]
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// Aggregated outcome of all checks for one request.
///
/// Request-scoped; never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub emitted_at: DateTime<Utc>,
    /// False if and only if at least one check failed with error severity.
    pub valid: bool,
    pub checks: Vec<ValidationCheck>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub suggestions: Vec<String>,
}

impl ValidationReport {
    /// Aggregate individual checks into a report.
    ///
    /// Checks are sorted by name for stable output. Suggestions are derived
    /// from which check names failed, plus category heuristics on the
    /// failure messages.
    #[must_use]
    pub fn aggregate(mut checks: Vec<ValidationCheck>) -> Self {
        checks.sort_by(|a, b| a.name.cmp(&b.name));

        let errors: Vec<String> = checks
            .iter()
            .filter(|c| !c.passed && c.severity == CheckSeverity::Error)
            .map(|c| c.message.clone())
            .collect();
        let warnings: Vec<String> = checks
            .iter()
            .filter(|c| !c.passed && c.severity == CheckSeverity::Warning)
            .map(|c| c.message.clone())
            .collect();

        let mut suggestions = Vec::new();
        for check in checks.iter().filter(|c| !c.passed) {
            if let Some(suggestion) = suggestion_for_check(&check.name) {
                if !suggestions.iter().any(|s| s == suggestion) {
                    suggestions.push(suggestion.to_string());
                }
            }
        }
        for suggestion in remediation_suggestions(
            checks
                .iter()
                .filter(|c| !c.passed)
                .map(|c| c.message.as_str()),
        ) {
            if !suggestions.contains(&suggestion) {
                suggestions.push(suggestion);
            }
        }

        Self {
            emitted_at: Utc::now(),
            valid: errors.is_empty(),
            checks,
            errors,
            warnings,
            suggestions,
        }
    }
}

/// Name-keyed suggestion heuristics.
fn suggestion_for_check(name: &str) -> Option<&'static str> {
    match name {
        "resource_headroom" => {
            Some("Generate documents in smaller batches to reduce resource pressure")
        }
        "narrative_completeness" => {
            Some("Generate control narratives first, then re-run document generation")
        }
        "control_coverage" => {
            Some("Document control implementations before generating the package")
        }
        "batch_size" => Some("Split the control set across multiple generation jobs"),
        "template_availability" => {
            Some("Supply template ids for the requested types or disable templates")
        }
        _ => None,
    }
}
