//! atoforge: compliance-document generation core.
//!
//! A job-lifecycle engine for producing regulatory artifacts (System
//! Security Plans, assessment reports, STIG/JSIG checklists, POA&M items)
//! for a registered IT system. The crate orchestrates a variable set of
//! document-producing steps with per-step and aggregate progress, runs
//! pre-flight validation before committing resources, applies a
//! template-then-default generation strategy, and streams progress events
//! to callers while tolerating partial failures.
//!
//! The language-model client, the persistence layer, and the per-document
//! content builders are external collaborators reached through traits:
//! [`ModelRouter`], [`ComplianceStore`], [`DocumentBuilder`], and
//! [`NarrativeBuilder`].
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use atoforge::{
//!     BuilderRegistry, DocumentType, FallbackCoordinator, GenerationOrchestrator,
//!     GenerationRequest, MemoryStore, ScriptedRouter,
//! };
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(MemoryStore::new());
//! let router = Arc::new(ScriptedRouter::new());
//! let coordinator = Arc::new(FallbackCoordinator::new(BuilderRegistry::new()));
//!
//! let orchestrator = GenerationOrchestrator::new(store, router, coordinator);
//! let job_id = orchestrator
//!     .start(GenerationRequest::new("sys-1", vec![DocumentType::PoamReport]))
//!     .await?;
//! let status = orchestrator.get_status(&job_id).await?;
//! # let _ = status;
//! # Ok(())
//! # }
//! ```

pub use atoforge_utils::context::GenerationContext;
pub use atoforge_utils::entities::{
    ArtifactRecord, Checklist, ChecklistContent, ChecklistFinding, ChecklistMetadata, Document,
    EvidenceRecord, Finding, FindingSeverity, ImplementationStatus, PoamItem, RuleSeverity,
    RuleType, SecurityControl, StigRule, SystemRecord,
};
pub use atoforge_utils::error::{
    AtoForgeError, FailureCategory, FallbackError, GenerationError, RouterError, StoreError,
};
pub use atoforge_utils::logging::init_tracing;
pub use atoforge_utils::mapping;
pub use atoforge_utils::types::{
    COLLECT_DATA_STEP, DocumentType, GenerationJob, GenerationRequest, GenerationResult,
    GenerationStep, GenerationSummary, JobStatus, JobStatusView, StepStatus, TemplateOptions,
};

pub use atoforge_store::{ComplianceStore, MemoryStore};

pub use atoforge_router::{ChatMessage, GenerateOptions, ModelRouter, Role};
#[doc(hidden)]
pub use atoforge_router::ScriptedRouter;

pub use atoforge_validation::{
    CheckSeverity, ResourceThresholds, ValidationCheck, ValidationEngine, ValidationReport,
};

pub use atoforge_fallback::{
    BuildOutcome, BuildParams, BuilderRegistry, BuiltDocument, DocumentBuilder, DocumentResult,
    FallbackCoordinator, GeneratedNarrative, NarrativeBuilder, NarrativeContext, Provenance,
    TemplateInfo,
};

pub use atoforge_engine::{
    DEFAULT_MODEL_CALL_TIMEOUT, GenerationOrchestrator, JobEvent, MIN_MODEL_CALL_TIMEOUT,
    OrchestratorConfig, StepTracker,
};

pub use atoforge_stream::{GenerationStream, ProgressEvent, ProgressStreamer};
