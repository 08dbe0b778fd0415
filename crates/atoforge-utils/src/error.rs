//! Error taxonomy for the generation core.
//!
//! `AtoForgeError` is the library-level error type; per-concern sub-enums
//! are defined here and re-exported by their owning crates. Recoverable
//! per-item failures (a single narrative, one checklist's model content)
//! never surface through these types — handlers degrade and continue. Only
//! job-aborting conditions propagate.

use thiserror::Error;

/// Library-level error type.
///
/// # Error categories
///
/// | Category | Description |
/// |----------|-------------|
/// | `Store` | Persistence facade failures |
/// | `Router` | Model-router transport/availability failures |
/// | `Generation` | Job-aborting generation failures |
/// | `Fallback` | Template and default paths both failed |
#[derive(Error, Debug)]
pub enum AtoForgeError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("model router error: {0}")]
    Router(#[from] RouterError),

    #[error("generation error: {0}")]
    Generation(#[from] GenerationError),

    #[error("fallback error: {0}")]
    Fallback(#[from] FallbackError),
}

/// Persistence facade errors.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },

    #[error("storage unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("write failed for {kind}: {reason}")]
    WriteFailed { kind: &'static str, reason: String },
}

/// Model-router errors.
#[derive(Error, Debug)]
pub enum RouterError {
    #[error("model request timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("model router unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("model returned malformed JSON: {reason}")]
    MalformedJson { reason: String },

    #[error("model request failed: {reason}")]
    RequestFailed { reason: String },
}

/// Job-aborting generation failures.
///
/// Per-document build failures that have a defined fallback value do not use
/// this type; they are recorded on the failed step and the job continues.
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("system {system_id} not found")]
    SystemNotFound { system_id: String },

    #[error("job {job_id} not found")]
    JobNotFound { job_id: String },

    #[error("data collection failed fetching {source_name}: {reason}")]
    DataCollection {
        source_name: &'static str,
        reason: String,
    },

    #[error("pre-flight validation failed: {reasons}")]
    ValidationFailed { reasons: String },

    #[error("generation of {document_type} failed: {reason}")]
    DocumentFailed {
        document_type: String,
        reason: String,
    },

    #[error("job state write failed: {0}")]
    StateWrite(#[source] StoreError),

    #[error("persisting {kind} failed: {source}")]
    PersistFailed {
        kind: &'static str,
        #[source]
        source: StoreError,
    },
}

/// Fallback-chain errors.
#[derive(Error, Debug)]
pub enum FallbackError {
    /// Both the template and default paths failed. The message concatenates
    /// both underlying causes so a single diagnostic reaches the caller.
    #[error("Template error: {template_error}, Fallback error: {fallback_error}")]
    Exhausted {
        template_error: String,
        fallback_error: String,
    },

    /// The default path failed and templates were never attempted.
    #[error("{document_type} generation failed: {reason}")]
    DefaultFailed {
        document_type: String,
        reason: String,
    },

    #[error("no builder registered for document type {document_type}")]
    NoBuilder { document_type: String },
}

/// Coarse failure categories string-matched from error text.
///
/// Used only to derive human-readable remediation suggestions; never to
/// trigger automatic retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCategory {
    Timeout,
    Memory,
    Connection,
    Template,
    Narrative,
    Other,
}

impl FailureCategory {
    /// Classify an error message by substring matching.
    #[must_use]
    pub fn classify(message: &str) -> Self {
        let lower = message.to_lowercase();
        if lower.contains("timeout") || lower.contains("timed out") {
            Self::Timeout
        } else if lower.contains("memory") || lower.contains("oom") {
            Self::Memory
        } else if lower.contains("connection")
            || lower.contains("connect")
            || lower.contains("unavailable")
            || lower.contains("network")
        {
            Self::Connection
        } else if lower.contains("template") {
            Self::Template
        } else if lower.contains("narrative") {
            Self::Narrative
        } else {
            Self::Other
        }
    }

    /// Remediation suggestion for this category, if one exists.
    #[must_use]
    pub const fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::Timeout => {
                Some("Increase the model call timeout or split the request into smaller batches")
            }
            Self::Memory => Some("Free host memory or generate fewer document types per job"),
            Self::Connection => {
                Some("Verify storage and model-router connectivity before retrying")
            }
            Self::Template => {
                Some("Check the referenced template id, or disable templates to use default generation")
            }
            Self::Narrative => {
                Some("Generate control narratives first, then re-run document generation")
            }
            Self::Other => None,
        }
    }
}

/// Derive deduplicated remediation suggestions from a set of error messages.
#[must_use]
pub fn remediation_suggestions<'a>(messages: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut suggestions: Vec<String> = Vec::new();
    for message in messages {
        if let Some(suggestion) = FailureCategory::classify(message).suggestion() {
            if !suggestions.iter().any(|s| s == suggestion) {
                suggestions.push(suggestion.to_string());
            }
        }
    }
    suggestions
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_exhausted_message_contains_both_causes() {
        let err = FallbackError::Exhausted {
            template_error: "template tmpl-1 missing".to_string(),
            fallback_error: "model request failed: 503".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("Template error:"));
        assert!(message.contains("Fallback error:"));
        assert!(message.contains("template tmpl-1 missing"));
        assert!(message.contains("model request failed: 503"));
    }

    #[test]
    fn classify_matches_known_categories() {
        assert_eq!(
            FailureCategory::classify("request timed out after 30s"),
            FailureCategory::Timeout
        );
        assert_eq!(
            FailureCategory::classify("out of memory"),
            FailureCategory::Memory
        );
        assert_eq!(
            FailureCategory::classify("Connection refused"),
            FailureCategory::Connection
        );
        assert_eq!(
            FailureCategory::classify("template not found"),
            FailureCategory::Template
        );
        assert_eq!(
            FailureCategory::classify("narrative generation failed"),
            FailureCategory::Narrative
        );
        assert_eq!(
            FailureCategory::classify("something else"),
            FailureCategory::Other
        );
    }

    #[test]
    fn suggestions_are_deduplicated() {
        let suggestions = remediation_suggestions([
            "request timed out",
            "another timeout happened",
            "connection refused",
        ]);
        assert_eq!(suggestions.len(), 2);
    }

    #[test]
    fn other_category_yields_no_suggestion() {
        assert!(remediation_suggestions(["weird failure"]).is_empty());
    }
}
