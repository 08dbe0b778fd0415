use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use strum::{Display, EnumIter, EnumString};

use crate::entities::{ArtifactRecord, Checklist, Document, PoamItem};

/// Document types that can be requested in a generation job.
///
/// Each requested type contributes exactly one step to the job's step plan.
/// The serialized form is the snake_case wire name used in requests, step
/// names, and persisted documents.
///
/// # Example
///
/// ```rust
/// use atoforge_utils::types::DocumentType;
///
/// assert_eq!(DocumentType::Ssp.as_str(), "ssp");
/// assert_eq!(DocumentType::StigChecklist.step_name(), "generate_stig_checklist");
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DocumentType {
    /// System Security Plan.
    Ssp,
    /// STIG compliance checklist, one per distinct STIG id.
    StigChecklist,
    /// JSIG compliance checklist, one per distinct STIG id.
    JsigChecklist,
    /// Security Assessment Report package.
    SarPackage,
    /// Plan of Action & Milestones report derived from findings.
    PoamReport,
    /// Per-control implementation narratives.
    ControlNarratives,
    /// Standalone Security Assessment Report.
    ///
    /// Persisted under the `sar_package` document type with a
    /// `document_sub_type` marker; the request-level distinction is kept.
    Sar,
    /// Complete ATO package (all constituent documents).
    CompleteAtoPackage,
    /// Security Control Traceability Matrix spreadsheet.
    SctmExcel,
    /// Risk Assessment Report.
    Rar,
    /// Ports, Protocols, and Services worksheet.
    PpsWorksheet,
}

impl DocumentType {
    /// Canonical snake_case wire name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Ssp => "ssp",
            Self::StigChecklist => "stig_checklist",
            Self::JsigChecklist => "jsig_checklist",
            Self::SarPackage => "sar_package",
            Self::PoamReport => "poam_report",
            Self::ControlNarratives => "control_narratives",
            Self::Sar => "sar",
            Self::CompleteAtoPackage => "complete_ato_package",
            Self::SctmExcel => "sctm_excel",
            Self::Rar => "rar",
            Self::PpsWorksheet => "pps_worksheet",
        }
    }

    /// Step name used in the job's step plan for this document type.
    #[must_use]
    pub fn step_name(&self) -> String {
        format!("generate_{}", self.as_str())
    }

    /// Human-readable label for display in progress output.
    #[must_use]
    pub const fn display_label(&self) -> &'static str {
        match self {
            Self::Ssp => "System Security Plan",
            Self::StigChecklist => "STIG Checklist",
            Self::JsigChecklist => "JSIG Checklist",
            Self::SarPackage => "Security Assessment Report Package",
            Self::PoamReport => "POA&M Report",
            Self::ControlNarratives => "Control Narratives",
            Self::Sar => "Security Assessment Report",
            Self::CompleteAtoPackage => "Complete ATO Package",
            Self::SctmExcel => "Security Control Traceability Matrix",
            Self::Rar => "Risk Assessment Report",
            Self::PpsWorksheet => "PPS Worksheet",
        }
    }

    /// Document types with internal section structure.
    ///
    /// Section-structured types get evenly spaced per-section sub-steps in
    /// streamed progress output.
    #[must_use]
    pub fn sections(&self) -> &'static [&'static str] {
        match self {
            Self::Ssp | Self::CompleteAtoPackage => &[
                "System Identification",
                "System Environment",
                "Control Implementation",
                "Roles and Responsibilities",
                "Contingency and Continuity",
            ],
            Self::Rar => &["Threat Assessment", "Vulnerability Analysis", "Risk Determination"],
            _ => &[],
        }
    }

    /// Whether the persisted document is stored under a different type tag.
    ///
    /// `sar` shares the `sar_package` storage tag; the distinction survives
    /// only as a sub-type marker.
    #[must_use]
    pub const fn storage_type(&self) -> DocumentType {
        match self {
            Self::Sar => Self::SarPackage,
            other => *other,
        }
    }

    /// Sub-type marker recorded on persisted documents, where applicable.
    #[must_use]
    pub const fn storage_sub_type(&self) -> Option<&'static str> {
        match self {
            Self::Sar => Some("report"),
            Self::SarPackage => Some("package"),
            _ => None,
        }
    }
}

/// Lifecycle status of a generation job.
///
/// ```text
/// pending -> running -> completed | failed
/// ```
///
/// Terminal statuses are never left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    /// Whether this status is terminal (no further transitions allowed).
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Lifecycle status of a single step within a job.
///
/// Step statuses are monotonic: a step never moves backward from a terminal
/// status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StepStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl StepStatus {
    /// Whether this status is terminal.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Template-related options supplied with a generation request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemplateOptions {
    /// Classification banner for generated documents (e.g., "UNCLASSIFIED").
    pub classification: Option<String>,
    /// Owning organization name.
    pub organization: Option<String>,
    /// Authorized officials named in the package.
    #[serde(default)]
    pub authorized_officials: Vec<String>,
    /// Free-form fields substituted into templates.
    #[serde(default)]
    pub custom_fields: HashMap<String, serde_json::Value>,
    /// Explicit template ids per document type.
    #[serde(default)]
    pub template_ids: HashMap<DocumentType, String>,
}

/// A request to generate one or more compliance documents for a system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Target system id. Must exist in the store or the request is rejected.
    pub system_id: String,
    /// Requested document types, in execution order. Duplicates are dropped
    /// when the step plan is built.
    pub document_types: Vec<DocumentType>,
    /// Whether to include evidence records in generated content.
    #[serde(default)]
    pub include_evidence: bool,
    /// Whether to include artifact records in generated content.
    #[serde(default)]
    pub include_artifacts: bool,
    /// Opt in to the template-first generation path.
    #[serde(default)]
    pub use_templates: bool,
    /// Template options; only consulted when `use_templates` is set.
    #[serde(default)]
    pub template_options: Option<TemplateOptions>,
}

impl GenerationRequest {
    /// Create a request for a single document type with defaults.
    #[must_use]
    pub fn new(system_id: impl Into<String>, document_types: Vec<DocumentType>) -> Self {
        Self {
            system_id: system_id.into(),
            document_types,
            include_evidence: false,
            include_artifacts: false,
            use_templates: false,
            template_options: None,
        }
    }

    /// Resolve the template id for a document type, if one was supplied.
    #[must_use]
    pub fn template_id_for(&self, document_type: DocumentType) -> Option<&str> {
        self.template_options
            .as_ref()
            .and_then(|opts| opts.template_ids.get(&document_type))
            .map(String::as_str)
    }
}

/// One named step in a job's fixed step plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationStep {
    /// Step name (`collect_data` or `generate_<document_type>`).
    pub name: String,
    /// Current status. Monotonic; terminal statuses are never left.
    pub status: StepStatus,
    /// When the step entered `running`.
    pub started_at: Option<DateTime<Utc>>,
    /// When the step reached a terminal status.
    pub ended_at: Option<DateTime<Utc>>,
    /// Optional free-form detail (e.g., counts of produced artifacts).
    pub detail: Option<String>,
    /// Error message for failed steps.
    pub error: Option<String>,
}

impl GenerationStep {
    /// Create a pending step with the given name.
    #[must_use]
    pub fn pending(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: StepStatus::Pending,
            started_at: None,
            ended_at: None,
            detail: None,
            error: None,
        }
    }
}

/// Name of the fixed leading data-collection step present in every job.
pub const COLLECT_DATA_STEP: &str = "collect_data";

/// Persisted record of a generation job.
///
/// Created when a request is accepted, mutated only by the orchestrator
/// during execution, and immutable once status reaches a terminal state.
/// A snapshot is handed to the store on every state change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationJob {
    /// Server-assigned job id.
    pub id: String,
    /// Owning system id.
    pub system_id: String,
    /// Requested document types in step order (deduplicated).
    pub document_types: Vec<DocumentType>,
    /// Job status.
    pub status: JobStatus,
    /// Aggregate progress, 0-100. Equals 100 exactly when completed.
    pub progress: u8,
    /// Display label of the first currently-running step, if any.
    pub current_step: Option<String>,
    /// Top-level error for jobs that failed before all steps finished.
    pub error: Option<String>,
    /// Step states, snapshotted with the job on every change.
    pub steps: Vec<GenerationStep>,
    /// When the job was accepted.
    pub started_at: DateTime<Utc>,
    /// When the job reached a terminal status.
    pub ended_at: Option<DateTime<Utc>>,
}

/// Status payload returned to callers polling a job.
///
/// Served from the live in-memory record while the job is active, or
/// reconstructed from the persisted job row afterwards; the two forms are
/// indistinguishable to callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStatusView {
    pub job_id: String,
    pub status: JobStatus,
    pub progress: u8,
    pub current_step: Option<String>,
    pub steps: Vec<GenerationStep>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
}

impl From<&GenerationJob> for JobStatusView {
    fn from(job: &GenerationJob) -> Self {
        Self {
            job_id: job.id.clone(),
            status: job.status,
            progress: job.progress,
            current_step: job.current_step.clone(),
            steps: job.steps.clone(),
            error: job.error.clone(),
            started_at: job.started_at,
            ended_at: job.ended_at,
        }
    }
}

/// Summary counters recomputed from current system data when a result is
/// assembled. A live view, not a completion-time snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationSummary {
    pub total_controls: usize,
    pub implemented_controls: usize,
    pub findings: usize,
    pub critical_findings: usize,
    pub evidence: usize,
    pub artifacts: usize,
}

/// Aggregated result of a completed job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResult {
    pub job_id: String,
    pub documents: Vec<Document>,
    pub artifacts: Vec<ArtifactRecord>,
    pub checklists: Vec<Checklist>,
    pub poam_items: Vec<PoamItem>,
    pub summary: GenerationSummary,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_type_wire_names_round_trip() {
        use strum::IntoEnumIterator;
        for doc_type in DocumentType::iter() {
            let parsed: DocumentType = doc_type.as_str().parse().unwrap();
            assert_eq!(parsed, doc_type);
            let json = serde_json::to_string(&doc_type).unwrap();
            assert_eq!(json, format!("\"{}\"", doc_type.as_str()));
        }
    }

    #[test]
    fn sar_storage_collapses_to_sar_package() {
        assert_eq!(DocumentType::Sar.storage_type(), DocumentType::SarPackage);
        assert_eq!(DocumentType::Sar.storage_sub_type(), Some("report"));
        assert_eq!(DocumentType::SarPackage.storage_sub_type(), Some("package"));
        assert_eq!(DocumentType::Rar.storage_type(), DocumentType::Rar);
    }

    #[test]
    fn terminal_statuses() {
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
        assert!(StepStatus::Failed.is_terminal());
        assert!(!StepStatus::Pending.is_terminal());
    }

    #[test]
    fn template_id_resolution() {
        let mut request = GenerationRequest::new("sys-1", vec![DocumentType::Ssp]);
        assert!(request.template_id_for(DocumentType::Ssp).is_none());

        let mut opts = TemplateOptions::default();
        opts.template_ids
            .insert(DocumentType::Ssp, "tmpl-42".to_string());
        request.template_options = Some(opts);
        assert_eq!(request.template_id_for(DocumentType::Ssp), Some("tmpl-42"));
        assert!(request.template_id_for(DocumentType::Rar).is_none());
    }

    #[test]
    fn section_structured_types() {
        assert!(!DocumentType::Ssp.sections().is_empty());
        assert!(DocumentType::PoamReport.sections().is_empty());
    }
}
