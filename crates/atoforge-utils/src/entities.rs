//! Compliance entities exchanged with the persistence facade.
//!
//! These are the rows the core reads (systems, controls, rules, findings,
//! evidence, artifacts) and writes (documents, checklists, POA&M items).
//! The store owns their durability; the core only relies on their shape.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::types::DocumentType;

/// A registered IT system, the subject of every generation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Defined system owner; required for SSP generation.
    #[serde(default)]
    pub owner: Option<String>,
    /// Owning organization name; required for SSP generation.
    #[serde(default)]
    pub organization: Option<String>,
    #[serde(default)]
    pub classification: Option<String>,
}

/// Implementation status of a security control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ImplementationStatus {
    Implemented,
    PartiallyImplemented,
    Planned,
    NotImplemented,
}

/// A per-system security control implementation row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityControl {
    pub id: String,
    pub system_id: String,
    /// NIST control identifier, e.g. `AC-2`.
    pub control_id: String,
    pub title: String,
    pub implementation_status: ImplementationStatus,
    /// Implementation narrative, when one has been generated or authored.
    #[serde(default)]
    pub narrative: Option<String>,
}

/// Severity of a finding.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FindingSeverity {
    Critical,
    High,
    Medium,
    Low,
    Informational,
}

/// An assessment finding against a system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub id: String,
    pub system_id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub severity: FindingSeverity,
    /// Related control, when the finding traces to one.
    #[serde(default)]
    pub control_id: Option<String>,
}

/// A collected evidence record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceRecord {
    pub id: String,
    pub system_id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub collected_at: DateTime<Utc>,
}

/// A supporting artifact attached to a system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactRecord {
    pub id: String,
    pub system_id: String,
    pub name: String,
    #[serde(default)]
    pub kind: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Catalog flavor of a configuration rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RuleType {
    Stig,
    Jsig,
}

impl RuleType {
    /// The checklist document type produced from rules of this flavor.
    #[must_use]
    pub const fn checklist_document_type(&self) -> DocumentType {
        match self {
            Self::Stig => DocumentType::StigChecklist,
            Self::Jsig => DocumentType::JsigChecklist,
        }
    }
}

/// STIG category severity (CAT I is most severe).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RuleSeverity {
    CatI,
    CatII,
    CatIII,
}

/// A discrete STIG/JSIG configuration rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StigRule {
    pub id: String,
    pub rule_type: RuleType,
    /// Benchmark the rule belongs to, e.g. `RHEL-9-STIG`. Checklists are
    /// grouped by this id.
    pub stig_id: String,
    /// Rule identifier within the benchmark, e.g. `SV-257777r925318_rule`.
    pub rule_id: String,
    pub title: String,
    pub severity: RuleSeverity,
    #[serde(default)]
    pub check_text: Option<String>,
    #[serde(default)]
    pub fix_text: Option<String>,
}

/// A persisted generated document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub system_id: String,
    /// Job that produced the document, when generated by the core.
    #[serde(default)]
    pub job_id: Option<String>,
    /// Persisted type tag. `sar` documents are stored as `sar_package`.
    pub document_type: DocumentType,
    /// Distinguishes `sar` from `sar_package` under the shared type tag.
    #[serde(default)]
    pub document_sub_type: Option<String>,
    pub title: String,
    pub content: String,
    /// `template_generated` or `ai_generated`.
    #[serde(default)]
    pub provenance: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Metadata block carried by every generated checklist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChecklistMetadata {
    pub stig_id: String,
    pub system_name: String,
    pub rule_count: usize,
    pub generated_at: DateTime<Utc>,
    /// Set when model-backed content generation failed and the checklist was
    /// assembled from rule data alone.
    #[serde(default)]
    pub degraded: bool,
}

/// A single rule entry in a generated checklist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChecklistFinding {
    pub rule_id: String,
    pub title: String,
    pub severity: RuleSeverity,
    /// Checklist status, e.g. `Open` or `NotAFinding`.
    pub status: String,
    #[serde(default)]
    pub comments: Option<String>,
}

/// Structured content of a generated checklist.
///
/// Always well-formed: even when the model call fails, the checklist carries
/// metadata, one `Open` finding per input rule, and non-empty
/// recommendations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChecklistContent {
    pub checklist_metadata: ChecklistMetadata,
    pub findings: Vec<ChecklistFinding>,
    pub recommendations: Vec<String>,
}

/// A persisted checklist, one per distinct `stig_id` among the input rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checklist {
    pub id: String,
    pub system_id: String,
    #[serde(default)]
    pub job_id: Option<String>,
    pub checklist_type: RuleType,
    pub stig_id: String,
    pub content: ChecklistContent,
    pub created_at: DateTime<Utc>,
}

/// A remediation tracking item derived from one finding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoamItem {
    pub id: String,
    pub system_id: String,
    #[serde(default)]
    pub job_id: Option<String>,
    pub finding_id: String,
    pub weakness: String,
    pub severity: FindingSeverity,
    pub status: String,
    pub scheduled_completion: DateTime<Utc>,
    pub milestones: Vec<String>,
    pub created_at: DateTime<Utc>,
}
