//! Collaborator contracts for external content builders.
//!
//! The core never formats document content itself; per-document-type
//! builders and the narrative builder live outside the core and are reached
//! through these traits. The core relies only on their success/failure
//! contract.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use atoforge_utils::context::GenerationContext;
use atoforge_utils::entities::{EvidenceRecord, Finding, SecurityControl, SystemRecord};
use atoforge_utils::error::GenerationError;
use atoforge_utils::types::{DocumentType, GenerationRequest};

/// Parameters handed to a document builder for one build attempt.
pub struct BuildParams<'a> {
    pub document_type: DocumentType,
    pub request: &'a GenerationRequest,
    pub context: &'a GenerationContext,
    /// `Some` selects the template path with the given template id; `None`
    /// selects default generation.
    pub template_id: Option<&'a str>,
}

/// Document content produced by a builder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltDocument {
    pub title: String,
    pub content: String,
}

/// Template metadata reported by template-path builds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateInfo {
    pub template_id: String,
    #[serde(default)]
    pub template_name: Option<String>,
}

/// Outcome of one build attempt.
///
/// `success: false` is an explicit, recoverable build failure; an `Err`
/// from [`DocumentBuilder::generate`] is treated identically by the
/// fallback coordinator.
#[derive(Debug, Clone)]
pub struct BuildOutcome {
    pub success: bool,
    pub document: Option<BuiltDocument>,
    pub errors: Vec<String>,
    pub template_info: Option<TemplateInfo>,
}

impl BuildOutcome {
    /// A successful outcome carrying a document.
    #[must_use]
    pub fn ok(document: BuiltDocument) -> Self {
        Self {
            success: true,
            document: Some(document),
            errors: Vec::new(),
            template_info: None,
        }
    }

    /// A failed outcome with one or more error messages.
    #[must_use]
    pub fn failed(errors: Vec<String>) -> Self {
        Self {
            success: false,
            document: None,
            errors,
            template_info: None,
        }
    }

    /// Attach template metadata.
    #[must_use]
    pub fn with_template_info(mut self, info: TemplateInfo) -> Self {
        self.template_info = Some(info);
        self
    }

    /// Combined error text, for diagnostics.
    #[must_use]
    pub fn error_text(&self) -> String {
        if self.errors.is_empty() {
            "build reported failure without detail".to_string()
        } else {
            self.errors.join("; ")
        }
    }
}

/// Per-document-type builder service.
#[async_trait]
pub trait DocumentBuilder: Send + Sync {
    /// Run one build attempt.
    ///
    /// # Errors
    ///
    /// `Err` is equivalent to `success: false` from the coordinator's point
    /// of view; builders may use whichever fits their failure.
    async fn generate(&self, params: BuildParams<'_>) -> Result<BuildOutcome, GenerationError>;
}

/// Context handed to the narrative builder for one control.
pub struct NarrativeContext<'a> {
    pub system: &'a SystemRecord,
    pub control: &'a SecurityControl,
    pub evidence: &'a [EvidenceRecord],
    pub findings: &'a [Finding],
}

/// A generated control narrative with provenance detail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedNarrative {
    pub narrative: String,
    /// Builder confidence in `[0, 1]`.
    pub confidence: f32,
    /// Evidence/source identifiers the narrative drew on.
    pub sources: Vec<String>,
    /// Structured details extracted while generating.
    #[serde(default)]
    pub extracted_details: HashMap<String, serde_json::Value>,
}

/// Narrative builder service, invoked once per control in the bulk loop.
#[async_trait]
pub trait NarrativeBuilder: Send + Sync {
    /// Generate a context-aware implementation narrative for one control.
    ///
    /// # Errors
    ///
    /// A failure here affects only the one control; the bulk loop logs it
    /// and continues.
    async fn generate_context_aware_narrative(
        &self,
        context: NarrativeContext<'_>,
    ) -> Result<GeneratedNarrative, GenerationError>;
}
