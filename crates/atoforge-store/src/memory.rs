//! In-memory [`ComplianceStore`] implementation.

use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use atoforge_utils::entities::{
    ArtifactRecord, Checklist, Document, EvidenceRecord, Finding, PoamItem, SecurityControl,
    StigRule, SystemRecord,
};
use atoforge_utils::error::StoreError;
use atoforge_utils::types::GenerationJob;

use crate::ComplianceStore;

#[derive(Default)]
struct Inner {
    systems: HashMap<String, SystemRecord>,
    controls: Vec<SecurityControl>,
    stig_rules: Vec<StigRule>,
    findings: Vec<Finding>,
    evidence: Vec<EvidenceRecord>,
    artifacts: Vec<ArtifactRecord>,
    documents: Vec<Document>,
    checklists: Vec<Checklist>,
    poam_items: Vec<PoamItem>,
    jobs: HashMap<String, GenerationJob>,
}

/// A map-backed store with no durability.
///
/// Used by tests and by embedders that do not need persistence across
/// restarts. The `offline` toggle makes every operation fail with
/// `StoreError::Unavailable`, which tests use to exercise connectivity
/// checks and fatal write paths.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
    offline: AtomicBool,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggle simulated unavailability. While offline, every operation
    /// (including `ping`) returns `StoreError::Unavailable`.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check_online(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable {
                reason: "store is offline".to_string(),
            });
        }
        Ok(())
    }

    /// Seed a system record.
    pub fn put_system(&self, system: SystemRecord) {
        self.inner
            .write()
            .expect("store lock poisoned")
            .systems
            .insert(system.id.clone(), system);
    }

    /// Seed control rows.
    pub fn put_controls(&self, controls: Vec<SecurityControl>) {
        self.inner
            .write()
            .expect("store lock poisoned")
            .controls
            .extend(controls);
    }

    /// Seed STIG/JSIG rules.
    pub fn put_stig_rules(&self, rules: Vec<StigRule>) {
        self.inner
            .write()
            .expect("store lock poisoned")
            .stig_rules
            .extend(rules);
    }

    /// Seed findings.
    pub fn put_findings(&self, findings: Vec<Finding>) {
        self.inner
            .write()
            .expect("store lock poisoned")
            .findings
            .extend(findings);
    }

    /// Seed evidence records.
    pub fn put_evidence(&self, evidence: Vec<EvidenceRecord>) {
        self.inner
            .write()
            .expect("store lock poisoned")
            .evidence
            .extend(evidence);
    }

    /// Seed artifact records.
    pub fn put_artifacts(&self, artifacts: Vec<ArtifactRecord>) {
        self.inner
            .write()
            .expect("store lock poisoned")
            .artifacts
            .extend(artifacts);
    }
}

#[async_trait]
impl ComplianceStore for MemoryStore {
    async fn get_system(&self, system_id: &str) -> Result<Option<SystemRecord>, StoreError> {
        self.check_online()?;
        let inner = self.inner.read().expect("store lock poisoned");
        Ok(inner.systems.get(system_id).cloned())
    }

    async fn list_controls(&self, system_id: &str) -> Result<Vec<SecurityControl>, StoreError> {
        self.check_online()?;
        let inner = self.inner.read().expect("store lock poisoned");
        Ok(inner
            .controls
            .iter()
            .filter(|c| c.system_id == system_id)
            .cloned()
            .collect())
    }

    async fn list_stig_rules(&self, system_id: &str) -> Result<Vec<StigRule>, StoreError> {
        self.check_online()?;
        let inner = self.inner.read().expect("store lock poisoned");
        let _ = system_id; // rules are catalog-wide in the in-memory store
        Ok(inner.stig_rules.clone())
    }

    async fn list_findings(&self, system_id: &str) -> Result<Vec<Finding>, StoreError> {
        self.check_online()?;
        let inner = self.inner.read().expect("store lock poisoned");
        Ok(inner
            .findings
            .iter()
            .filter(|f| f.system_id == system_id)
            .cloned()
            .collect())
    }

    async fn list_evidence(&self, system_id: &str) -> Result<Vec<EvidenceRecord>, StoreError> {
        self.check_online()?;
        let inner = self.inner.read().expect("store lock poisoned");
        Ok(inner
            .evidence
            .iter()
            .filter(|e| e.system_id == system_id)
            .cloned()
            .collect())
    }

    async fn list_artifacts(&self, system_id: &str) -> Result<Vec<ArtifactRecord>, StoreError> {
        self.check_online()?;
        let inner = self.inner.read().expect("store lock poisoned");
        Ok(inner
            .artifacts
            .iter()
            .filter(|a| a.system_id == system_id)
            .cloned()
            .collect())
    }

    async fn insert_document(&self, document: Document) -> Result<(), StoreError> {
        self.check_online().map_err(|_| StoreError::WriteFailed {
            kind: "document",
            reason: "store is offline".to_string(),
        })?;
        self.inner
            .write()
            .expect("store lock poisoned")
            .documents
            .push(document);
        Ok(())
    }

    async fn list_documents_for_job(&self, job_id: &str) -> Result<Vec<Document>, StoreError> {
        self.check_online()?;
        let inner = self.inner.read().expect("store lock poisoned");
        Ok(inner
            .documents
            .iter()
            .filter(|d| d.job_id.as_deref() == Some(job_id))
            .cloned()
            .collect())
    }

    async fn insert_checklist(&self, checklist: Checklist) -> Result<(), StoreError> {
        self.check_online().map_err(|_| StoreError::WriteFailed {
            kind: "checklist",
            reason: "store is offline".to_string(),
        })?;
        self.inner
            .write()
            .expect("store lock poisoned")
            .checklists
            .push(checklist);
        Ok(())
    }

    async fn list_checklists_for_job(&self, job_id: &str) -> Result<Vec<Checklist>, StoreError> {
        self.check_online()?;
        let inner = self.inner.read().expect("store lock poisoned");
        Ok(inner
            .checklists
            .iter()
            .filter(|c| c.job_id.as_deref() == Some(job_id))
            .cloned()
            .collect())
    }

    async fn insert_poam_item(&self, item: PoamItem) -> Result<(), StoreError> {
        self.check_online().map_err(|_| StoreError::WriteFailed {
            kind: "poam_item",
            reason: "store is offline".to_string(),
        })?;
        self.inner
            .write()
            .expect("store lock poisoned")
            .poam_items
            .push(item);
        Ok(())
    }

    async fn list_poam_items_for_job(&self, job_id: &str) -> Result<Vec<PoamItem>, StoreError> {
        self.check_online()?;
        let inner = self.inner.read().expect("store lock poisoned");
        Ok(inner
            .poam_items
            .iter()
            .filter(|p| p.job_id.as_deref() == Some(job_id))
            .cloned()
            .collect())
    }

    async fn upsert_job(&self, job: GenerationJob) -> Result<(), StoreError> {
        self.check_online().map_err(|_| StoreError::WriteFailed {
            kind: "job",
            reason: "store is offline".to_string(),
        })?;
        self.inner
            .write()
            .expect("store lock poisoned")
            .jobs
            .insert(job.id.clone(), job);
        Ok(())
    }

    async fn get_job(&self, job_id: &str) -> Result<Option<GenerationJob>, StoreError> {
        self.check_online()?;
        let inner = self.inner.read().expect("store lock poisoned");
        Ok(inner.jobs.get(job_id).cloned())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.check_online()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn system(id: &str) -> SystemRecord {
        SystemRecord {
            id: id.to_string(),
            name: format!("System {id}"),
            description: None,
            owner: Some("ISSO".to_string()),
            organization: Some("Test Org".to_string()),
            classification: None,
        }
    }

    #[tokio::test]
    async fn get_system_round_trip() {
        let store = MemoryStore::new();
        store.put_system(system("sys-1"));

        let fetched = store.get_system("sys-1").await.unwrap();
        assert_eq!(fetched.unwrap().name, "System sys-1");
        assert!(store.get_system("sys-2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn offline_store_fails_reads_and_writes() {
        let store = MemoryStore::new();
        store.put_system(system("sys-1"));
        store.set_offline(true);

        assert!(matches!(
            store.ping().await,
            Err(StoreError::Unavailable { .. })
        ));
        assert!(store.get_system("sys-1").await.is_err());

        let job = GenerationJob {
            id: "job-1".to_string(),
            system_id: "sys-1".to_string(),
            document_types: vec![],
            status: atoforge_utils::types::JobStatus::Pending,
            progress: 0,
            current_step: None,
            error: None,
            steps: vec![],
            started_at: Utc::now(),
            ended_at: None,
        };
        assert!(matches!(
            store.upsert_job(job).await,
            Err(StoreError::WriteFailed { kind: "job", .. })
        ));

        store.set_offline(false);
        assert!(store.ping().await.is_ok());
    }

    #[tokio::test]
    async fn job_documents_are_scoped_by_job_id() {
        let store = MemoryStore::new();
        for (doc_id, job_id) in [("d1", "job-1"), ("d2", "job-1"), ("d3", "job-2")] {
            store
                .insert_document(Document {
                    id: doc_id.to_string(),
                    system_id: "sys-1".to_string(),
                    job_id: Some(job_id.to_string()),
                    document_type: atoforge_utils::types::DocumentType::Ssp,
                    document_sub_type: None,
                    title: "SSP".to_string(),
                    content: String::new(),
                    provenance: None,
                    created_at: Utc::now(),
                })
                .await
                .unwrap();
        }

        let docs = store.list_documents_for_job("job-1").await.unwrap();
        assert_eq!(docs.len(), 2);
    }
}
