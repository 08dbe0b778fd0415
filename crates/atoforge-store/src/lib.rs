//! Persistence facade for atoforge.
//!
//! The generation core treats persistence as a CRUD store behind the
//! [`ComplianceStore`] trait: systems, controls, STIG rules, findings,
//! evidence, artifacts on the read side; documents, checklists, POA&M items,
//! and job rows on the write side. Implementations own durability and
//! consistency; the core only relies on the success/failure contract.
//!
//! [`MemoryStore`] is a complete in-memory implementation used by tests and
//! by embedders that bring their own durability elsewhere.

mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;

pub use atoforge_utils::error::StoreError;
use atoforge_utils::entities::{
    ArtifactRecord, Checklist, Document, EvidenceRecord, Finding, PoamItem, SecurityControl,
    StigRule, SystemRecord,
};
use atoforge_utils::types::GenerationJob;

/// CRUD contract consumed by the generation core.
///
/// All methods are fallible: a failing fetch during data collection fails
/// the collect-data step, and a failing job write aborts the job. Reads
/// return owned snapshots; the core never holds references into the store.
#[async_trait]
pub trait ComplianceStore: Send + Sync {
    /// Fetch a system by id. `Ok(None)` means the system does not exist.
    async fn get_system(&self, system_id: &str) -> Result<Option<SystemRecord>, StoreError>;

    /// All control implementation rows for a system.
    async fn list_controls(&self, system_id: &str) -> Result<Vec<SecurityControl>, StoreError>;

    /// All STIG/JSIG rules applicable to a system.
    async fn list_stig_rules(&self, system_id: &str) -> Result<Vec<StigRule>, StoreError>;

    /// All findings recorded against a system.
    async fn list_findings(&self, system_id: &str) -> Result<Vec<Finding>, StoreError>;

    /// All evidence records for a system.
    async fn list_evidence(&self, system_id: &str) -> Result<Vec<EvidenceRecord>, StoreError>;

    /// All artifacts attached to a system.
    async fn list_artifacts(&self, system_id: &str) -> Result<Vec<ArtifactRecord>, StoreError>;

    /// Persist a generated document.
    async fn insert_document(&self, document: Document) -> Result<(), StoreError>;

    /// Documents produced by a job.
    async fn list_documents_for_job(&self, job_id: &str) -> Result<Vec<Document>, StoreError>;

    /// Persist a generated checklist.
    async fn insert_checklist(&self, checklist: Checklist) -> Result<(), StoreError>;

    /// Checklists produced by a job.
    async fn list_checklists_for_job(&self, job_id: &str) -> Result<Vec<Checklist>, StoreError>;

    /// Persist a POA&M item.
    async fn insert_poam_item(&self, item: PoamItem) -> Result<(), StoreError>;

    /// POA&M items produced by a job.
    async fn list_poam_items_for_job(&self, job_id: &str) -> Result<Vec<PoamItem>, StoreError>;

    /// Persist a job snapshot, replacing any previous snapshot for the id.
    ///
    /// Called on every job state change; the persisted row is the durable
    /// source of truth once the job leaves the active registry.
    async fn upsert_job(&self, job: GenerationJob) -> Result<(), StoreError>;

    /// Fetch a persisted job row.
    async fn get_job(&self, job_id: &str) -> Result<Option<GenerationJob>, StoreError>;

    /// Cheap connectivity probe used by pre-flight validation.
    async fn ping(&self) -> Result<(), StoreError>;
}
