//! Job lifecycle orchestration.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tokio::sync::{RwLock, mpsc};
use tracing::{Instrument, error, warn};
use uuid::Uuid;

use atoforge_fallback::{FallbackCoordinator, NarrativeBuilder};
use atoforge_router::ModelRouter;
use atoforge_store::ComplianceStore;
use atoforge_utils::context::GenerationContext;
use atoforge_utils::entities::{Checklist, Document, RuleType};
use atoforge_utils::error::{AtoForgeError, GenerationError, StoreError};
use atoforge_utils::logging;
use atoforge_utils::types::{
    COLLECT_DATA_STEP, DocumentType, GenerationJob, GenerationRequest, GenerationResult,
    GenerationSummary, JobStatus, JobStatusView,
};

use crate::checklist::generate_checklist_content;
use crate::config::OrchestratorConfig;
use crate::events::JobEvent;
use crate::narratives::{generate_control_narratives, render_narratives_document};
use crate::poam::build_poam_items;
use crate::tracker::StepTracker;

/// Outcome of one document step. Recorded on the step; only fatal
/// conditions propagate as `GenerationError`.
enum StepOutcome {
    Completed(Option<String>),
    Failed(String),
}

/// Owns the active-job registry and drives job execution.
///
/// Jobs execute as detached tasks; `start` returns the job id immediately.
/// While a job is active its live record lives in the registry; once it
/// reaches a terminal status the record is removed and the persisted job
/// row becomes the source of truth for status queries.
#[derive(Clone)]
pub struct GenerationOrchestrator {
    store: Arc<dyn ComplianceStore>,
    router: Arc<dyn ModelRouter>,
    coordinator: Arc<FallbackCoordinator>,
    narrative_builder: Option<Arc<dyn NarrativeBuilder>>,
    config: OrchestratorConfig,
    registry: Arc<RwLock<HashMap<String, GenerationJob>>>,
}

impl GenerationOrchestrator {
    /// Create an orchestrator with default configuration.
    #[must_use]
    pub fn new(
        store: Arc<dyn ComplianceStore>,
        router: Arc<dyn ModelRouter>,
        coordinator: Arc<FallbackCoordinator>,
    ) -> Self {
        Self {
            store,
            router,
            coordinator,
            narrative_builder: None,
            config: OrchestratorConfig::default(),
            registry: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Replace the configuration.
    #[must_use]
    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    /// Attach the narrative builder used by the `control_narratives` step.
    #[must_use]
    pub fn with_narrative_builder(mut self, builder: Arc<dyn NarrativeBuilder>) -> Self {
        self.narrative_builder = Some(builder);
        self
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Number of jobs currently in the active registry.
    pub async fn active_job_count(&self) -> usize {
        self.registry.read().await.len()
    }

    /// Accept a request and launch detached execution.
    ///
    /// The target system must exist; otherwise no job is created. The
    /// returned job id is immediately queryable via [`Self::get_status`].
    ///
    /// # Errors
    ///
    /// `SystemNotFound` when the system id is unknown, store errors when
    /// the lookup or the initial job write fails.
    pub async fn start(&self, request: GenerationRequest) -> Result<String, AtoForgeError> {
        self.start_observed(request, None).await
    }

    /// [`Self::start`] with a step-event subscription for progress
    /// streaming. Event delivery is best-effort; a full or closed channel
    /// never stalls execution.
    pub async fn start_observed(
        &self,
        request: GenerationRequest,
        events: Option<mpsc::Sender<JobEvent>>,
    ) -> Result<String, AtoForgeError> {
        if self.store.get_system(&request.system_id).await?.is_none() {
            return Err(GenerationError::SystemNotFound {
                system_id: request.system_id.clone(),
            }
            .into());
        }

        let job_id = Uuid::new_v4().to_string();
        let plan = StepTracker::document_plan(&request.document_types);
        let tracker = StepTracker::new(&plan);
        let job = GenerationJob {
            id: job_id.clone(),
            system_id: request.system_id.clone(),
            document_types: plan.clone(),
            status: JobStatus::Pending,
            progress: 0,
            current_step: None,
            error: None,
            steps: tracker.snapshot(),
            started_at: Utc::now(),
            ended_at: None,
        };
        self.store
            .upsert_job(job.clone())
            .await
            .map_err(GenerationError::StateWrite)?;
        self.registry.write().await.insert(job_id.clone(), job);
        logging::log_job_start(&job_id, &request.system_id, plan.len() + 1);

        let this = self.clone();
        let spawned_id = job_id.clone();
        tokio::spawn(async move {
            this.execute(spawned_id, request, plan, events).await;
        });

        Ok(job_id)
    }

    /// Current status: the live record while the job is active, otherwise
    /// the persisted row. `None` for unknown job ids.
    ///
    /// # Errors
    ///
    /// Store errors from the persisted-row lookup.
    pub async fn get_status(&self, job_id: &str) -> Result<Option<JobStatusView>, StoreError> {
        if let Some(job) = self.registry.read().await.get(job_id) {
            return Ok(Some(JobStatusView::from(job)));
        }
        Ok(self.store.get_job(job_id).await?.map(|job| JobStatusView::from(&job)))
    }

    /// Aggregated result for a completed job; `None` unless the job exists
    /// and completed. Summary counters are recomputed from current system
    /// data, so the result is a live view over the persisted children.
    ///
    /// # Errors
    ///
    /// Store errors from any of the aggregation fetches.
    pub async fn get_result(&self, job_id: &str) -> Result<Option<GenerationResult>, StoreError> {
        let job = if let Some(job) = self.registry.read().await.get(job_id).cloned() {
            job
        } else {
            match self.store.get_job(job_id).await? {
                Some(job) => job,
                None => return Ok(None),
            }
        };
        if job.status != JobStatus::Completed {
            return Ok(None);
        }

        let (documents, checklists, poam_items, controls, findings, evidence, artifacts) = tokio::try_join!(
            self.store.list_documents_for_job(job_id),
            self.store.list_checklists_for_job(job_id),
            self.store.list_poam_items_for_job(job_id),
            self.store.list_controls(&job.system_id),
            self.store.list_findings(&job.system_id),
            self.store.list_evidence(&job.system_id),
            self.store.list_artifacts(&job.system_id),
        )?;

        let summary = GenerationSummary {
            total_controls: controls.len(),
            implemented_controls: controls
                .iter()
                .filter(|c| {
                    c.implementation_status
                        == atoforge_utils::entities::ImplementationStatus::Implemented
                })
                .count(),
            findings: findings.len(),
            critical_findings: findings
                .iter()
                .filter(|f| f.severity == atoforge_utils::entities::FindingSeverity::Critical)
                .count(),
            evidence: evidence.len(),
            artifacts: artifacts.len(),
        };

        Ok(Some(GenerationResult {
            job_id: job.id,
            documents,
            artifacts,
            checklists,
            poam_items,
            summary,
        }))
    }

    async fn execute(
        &self,
        job_id: String,
        request: GenerationRequest,
        plan: Vec<DocumentType>,
        events: Option<mpsc::Sender<JobEvent>>,
    ) {
        let span = logging::job_span(&job_id, &request.system_id);
        let started = Instant::now();
        let outcome = self
            .run_steps(&job_id, &request, &plan, events.as_ref())
            .instrument(span)
            .await;

        match outcome {
            Ok(()) => {
                emit(events.as_ref(), JobEvent::JobCompleted { job_id: job_id.clone() });
                logging::log_job_complete(&job_id, started.elapsed().as_millis());
            }
            Err(fatal) => {
                let message = fatal.to_string();
                emit(
                    events.as_ref(),
                    JobEvent::JobFailed {
                        job_id: job_id.clone(),
                        error: message.clone(),
                    },
                );
                logging::log_job_failed(&job_id, &message, started.elapsed().as_millis());
                if let Err(persist_error) = self
                    .update_job(&job_id, None, |job| {
                        job.status = JobStatus::Failed;
                        job.error = Some(message.clone());
                        job.current_step = None;
                        job.ended_at = Some(Utc::now());
                    })
                    .await
                {
                    error!(
                        job_id = %job_id,
                        error = %persist_error,
                        "Failed to persist terminal job state"
                    );
                }
            }
        }

        self.registry.write().await.remove(&job_id);
    }

    async fn run_steps(
        &self,
        job_id: &str,
        request: &GenerationRequest,
        plan: &[DocumentType],
        events: Option<&mpsc::Sender<JobEvent>>,
    ) -> Result<(), GenerationError> {
        let mut tracker = StepTracker::new(plan);
        self.update_job(job_id, Some(&tracker), |job| {
            job.status = JobStatus::Running;
        })
        .await?;

        tracker.mark_running(COLLECT_DATA_STEP);
        emit(events, JobEvent::StepStarted { name: COLLECT_DATA_STEP.to_string() });
        self.update_job(job_id, Some(&tracker), |_| {}).await?;

        let context = match self.collect_data(&request.system_id).await {
            Ok(context) => {
                let detail = format!(
                    "{} controls, {} rules, {} findings",
                    context.controls.len(),
                    context.stig_rules.len(),
                    context.findings.len()
                );
                tracker.mark_completed(COLLECT_DATA_STEP, Some(detail.clone()));
                emit(
                    events,
                    JobEvent::StepCompleted {
                        name: COLLECT_DATA_STEP.to_string(),
                        detail: Some(detail),
                    },
                );
                self.update_job(job_id, Some(&tracker), |_| {}).await?;
                context
            }
            Err(error) => {
                tracker.mark_failed(COLLECT_DATA_STEP, error.to_string());
                emit(
                    events,
                    JobEvent::StepFailed {
                        name: COLLECT_DATA_STEP.to_string(),
                        error: error.to_string(),
                    },
                );
                self.update_job(job_id, Some(&tracker), |_| {}).await?;
                return Err(error);
            }
        };

        for &doc_type in plan {
            let step_name = doc_type.step_name();
            tracker.mark_running(&step_name);
            emit(events, JobEvent::StepStarted { name: step_name.clone() });
            self.update_job(job_id, Some(&tracker), |_| {}).await?;

            match self
                .run_document_step(job_id, request, &context, doc_type)
                .await?
            {
                StepOutcome::Completed(detail) => {
                    tracker.mark_completed(&step_name, detail.clone());
                    emit(events, JobEvent::StepCompleted { name: step_name.clone(), detail });
                }
                StepOutcome::Failed(step_error) => {
                    warn!(
                        job_id = %job_id,
                        step = %step_name,
                        error = %step_error,
                        "Generation step failed"
                    );
                    tracker.mark_failed(&step_name, step_error.clone());
                    emit(
                        events,
                        JobEvent::StepFailed {
                            name: step_name.clone(),
                            error: step_error.clone(),
                        },
                    );
                    if self.config.abort_on_step_failure {
                        self.update_job(job_id, Some(&tracker), |_| {}).await?;
                        return Err(GenerationError::DocumentFailed {
                            document_type: doc_type.as_str().to_string(),
                            reason: step_error,
                        });
                    }
                }
            }
            self.update_job(job_id, Some(&tracker), |_| {}).await?;
        }

        self.update_job(job_id, Some(&tracker), |job| {
            job.status = JobStatus::Completed;
            job.progress = 100;
            job.current_step = None;
            job.ended_at = Some(Utc::now());
        })
        .await?;
        Ok(())
    }

    /// Fan out the six data fetches and fail fast on the first error.
    async fn collect_data(&self, system_id: &str) -> Result<GenerationContext, GenerationError> {
        let fetch = |source_name: &'static str| {
            move |e: StoreError| GenerationError::DataCollection {
                source_name,
                reason: e.to_string(),
            }
        };

        let (system, controls, stig_rules, findings, evidence, artifacts) = tokio::try_join!(
            async { self.store.get_system(system_id).await.map_err(fetch("system")) },
            async { self.store.list_controls(system_id).await.map_err(fetch("controls")) },
            async { self.store.list_stig_rules(system_id).await.map_err(fetch("stig_rules")) },
            async { self.store.list_findings(system_id).await.map_err(fetch("findings")) },
            async { self.store.list_evidence(system_id).await.map_err(fetch("evidence")) },
            async { self.store.list_artifacts(system_id).await.map_err(fetch("artifacts")) },
        )?;

        let system = system.ok_or_else(|| GenerationError::SystemNotFound {
            system_id: system_id.to_string(),
        })?;
        Ok(GenerationContext::new(
            system, controls, stig_rules, findings, evidence, artifacts,
        ))
    }

    async fn run_document_step(
        &self,
        job_id: &str,
        request: &GenerationRequest,
        context: &GenerationContext,
        doc_type: DocumentType,
    ) -> Result<StepOutcome, GenerationError> {
        match doc_type {
            DocumentType::StigChecklist => {
                self.generate_checklists(job_id, context, RuleType::Stig).await
            }
            DocumentType::JsigChecklist => {
                self.generate_checklists(job_id, context, RuleType::Jsig).await
            }
            DocumentType::PoamReport => self.generate_poam(job_id, context).await,
            DocumentType::ControlNarratives => self.generate_narratives(job_id, context).await,
            other => self.generate_document(job_id, request, context, other).await,
        }
    }

    /// One checklist per distinct `stig_id` among rules of the flavor.
    /// Content generation never fails; checklist writes are fatal.
    async fn generate_checklists(
        &self,
        job_id: &str,
        context: &GenerationContext,
        rule_type: RuleType,
    ) -> Result<StepOutcome, GenerationError> {
        let groups = context.rules_by_stig_id(rule_type);
        let opts = self.config.generate_options();
        let mut persisted = 0usize;

        for (stig_id, rules) in &groups {
            let content = generate_checklist_content(
                self.router.as_ref(),
                &opts,
                &context.system.name,
                stig_id,
                rules,
            )
            .await;
            let checklist = Checklist {
                id: Uuid::new_v4().to_string(),
                system_id: context.system.id.clone(),
                job_id: Some(job_id.to_string()),
                checklist_type: rule_type,
                stig_id: stig_id.clone(),
                content,
                created_at: Utc::now(),
            };
            self.store
                .insert_checklist(checklist)
                .await
                .map_err(|source| GenerationError::PersistFailed {
                    kind: "checklist",
                    source,
                })?;
            persisted += 1;
        }

        Ok(StepOutcome::Completed(Some(format!(
            "{persisted} {rule_type} checklists"
        ))))
    }

    /// One POA&M item per finding; zero findings persists nothing.
    async fn generate_poam(
        &self,
        job_id: &str,
        context: &GenerationContext,
    ) -> Result<StepOutcome, GenerationError> {
        let items = build_poam_items(&context.system.id, job_id, &context.findings);
        let count = items.len();
        for item in items {
            self.store
                .insert_poam_item(item)
                .await
                .map_err(|source| GenerationError::PersistFailed {
                    kind: "poam_item",
                    source,
                })?;
        }
        Ok(StepOutcome::Completed(Some(format!("{count} POA&M items"))))
    }

    /// Bulk per-control narrative loop, aggregated into one document.
    async fn generate_narratives(
        &self,
        job_id: &str,
        context: &GenerationContext,
    ) -> Result<StepOutcome, GenerationError> {
        let Some(builder) = &self.narrative_builder else {
            return Ok(StepOutcome::Failed(
                "no narrative builder configured".to_string(),
            ));
        };

        let batch = generate_control_narratives(builder.as_ref(), context).await;
        if batch.narratives.is_empty() && !context.controls.is_empty() {
            return Ok(StepOutcome::Failed(format!(
                "narrative generation failed for all {} controls",
                context.controls.len()
            )));
        }

        let document = Document {
            id: Uuid::new_v4().to_string(),
            system_id: context.system.id.clone(),
            job_id: Some(job_id.to_string()),
            document_type: DocumentType::ControlNarratives,
            document_sub_type: None,
            title: format!("Control Narratives: {}", context.system.name),
            content: render_narratives_document(&context.system.name, &batch),
            provenance: Some("ai_generated".to_string()),
            created_at: Utc::now(),
        };
        self.store
            .insert_document(document)
            .await
            .map_err(|source| GenerationError::PersistFailed {
                kind: "document",
                source,
            })?;
        Ok(StepOutcome::Completed(Some(batch.detail())))
    }

    /// Builder-backed document types, via the fallback coordinator.
    async fn generate_document(
        &self,
        job_id: &str,
        request: &GenerationRequest,
        context: &GenerationContext,
        doc_type: DocumentType,
    ) -> Result<StepOutcome, GenerationError> {
        match self
            .coordinator
            .generate_with_fallback(doc_type, request, context)
            .await
        {
            Ok(result) => {
                let document = Document {
                    id: Uuid::new_v4().to_string(),
                    system_id: context.system.id.clone(),
                    job_id: Some(job_id.to_string()),
                    document_type: doc_type.storage_type(),
                    document_sub_type: doc_type.storage_sub_type().map(String::from),
                    title: result.document.title,
                    content: result.document.content,
                    provenance: Some(result.provenance.as_str().to_string()),
                    created_at: Utc::now(),
                };
                self.store
                    .insert_document(document)
                    .await
                    .map_err(|source| GenerationError::PersistFailed {
                        kind: "document",
                        source,
                    })?;
                Ok(StepOutcome::Completed(None))
            }
            Err(fallback_error) => Ok(StepOutcome::Failed(fallback_error.to_string())),
        }
    }

    /// Sync the registry record from the tracker, apply extra mutations,
    /// and persist the snapshot.
    async fn update_job(
        &self,
        job_id: &str,
        tracker: Option<&StepTracker>,
        apply: impl FnOnce(&mut GenerationJob),
    ) -> Result<(), GenerationError> {
        let snapshot = {
            let mut registry = self.registry.write().await;
            let job = registry
                .get_mut(job_id)
                .ok_or_else(|| GenerationError::JobNotFound {
                    job_id: job_id.to_string(),
                })?;
            if let Some(tracker) = tracker {
                job.steps = tracker.snapshot();
                job.progress = tracker.progress();
                job.current_step = tracker.current_step();
            }
            apply(job);
            job.clone()
        };
        self.store
            .upsert_job(snapshot)
            .await
            .map_err(GenerationError::StateWrite)
    }
}

fn emit(events: Option<&mpsc::Sender<JobEvent>>, event: JobEvent) {
    if let Some(sender) = events {
        // Best-effort: drop on a full or closed channel.
        let _ = sender.try_send(event);
    }
}
