//! Pre-flight validation for generation requests.
//!
//! Runs independent checks concurrently and aggregates them into a
//! pass/fail report with remediation suggestions. Reports are
//! request-scoped: they are never persisted. The engine has no dependency
//! on the orchestrator; callers run it (or skip it) before starting a job.

mod checks;
mod report;

pub use report::{CheckSeverity, ValidationCheck, ValidationReport};

use std::sync::Arc;

use atoforge_router::ModelRouter;
use atoforge_store::ComplianceStore;
use atoforge_utils::types::{DocumentType, GenerationRequest};

/// Fixed thresholds for the host resource headroom check and batch sizing.
#[derive(Debug, Clone)]
pub struct ResourceThresholds {
    /// Minimum free memory, in MB, below which generation is blocked.
    pub min_free_memory_mb: u64,
    /// Maximum one-minute load average per core.
    pub max_load_per_core: f64,
    /// Controls above this count trigger a batch-size warning.
    pub max_controls_per_batch: usize,
}

impl Default for ResourceThresholds {
    fn default() -> Self {
        Self {
            min_free_memory_mb: 512,
            max_load_per_core: 0.9,
            max_controls_per_batch: 200,
        }
    }
}

/// Runs pre-flight checks for a generation request.
pub struct ValidationEngine {
    store: Arc<dyn ComplianceStore>,
    router: Arc<dyn ModelRouter>,
    thresholds: ResourceThresholds,
}

impl ValidationEngine {
    /// Create an engine with default thresholds.
    #[must_use]
    pub fn new(store: Arc<dyn ComplianceStore>, router: Arc<dyn ModelRouter>) -> Self {
        Self::with_thresholds(store, router, ResourceThresholds::default())
    }

    /// Create an engine with explicit thresholds.
    #[must_use]
    pub fn with_thresholds(
        store: Arc<dyn ComplianceStore>,
        router: Arc<dyn ModelRouter>,
        thresholds: ResourceThresholds,
    ) -> Self {
        Self {
            store,
            router,
            thresholds,
        }
    }

    /// Run all checks for the request and aggregate the report.
    ///
    /// Checks are independent and run concurrently. The report is valid
    /// when no error-severity check failed; warnings and info never block.
    pub async fn validate_request(&self, request: &GenerationRequest) -> ValidationReport {
        let mut checks = Vec::new();

        let (system_checks, control_checks, resource_check, connectivity, integrity) = tokio::join!(
            checks::system_checks(self.store.as_ref(), request),
            checks::control_checks(self.store.as_ref(), request, &self.thresholds),
            checks::resource_headroom(&self.thresholds),
            checks::connectivity_checks(self.store.as_ref(), self.router.as_ref()),
            checks::data_integrity(self.store.as_ref(), request),
        );
        checks.extend(system_checks);
        checks.extend(control_checks);
        checks.push(resource_check);
        checks.extend(connectivity);
        checks.extend(integrity);

        if request.use_templates {
            checks.push(checks::template_availability(request));
        }

        // One readiness check per requested document type.
        let mut seen = Vec::new();
        for &doc_type in &request.document_types {
            if seen.contains(&doc_type) {
                continue;
            }
            seen.push(doc_type);
            if let Some(check) =
                checks::document_readiness(self.store.as_ref(), request, doc_type).await
            {
                checks.push(check);
            }
        }

        ValidationReport::aggregate(checks)
    }

    /// Document types that get a per-type readiness check.
    #[must_use]
    pub fn checked_document_types() -> &'static [DocumentType] {
        &[
            DocumentType::Ssp,
            DocumentType::StigChecklist,
            DocumentType::JsigChecklist,
            DocumentType::PoamReport,
        ]
    }
}
