//! Progress streaming over job execution.
//!
//! [`ProgressStreamer`] wraps one job's execution with a timed event
//! sequence for UI consumption: validation, data collection, evenly spaced
//! section sub-steps for section-structured document types, assembly,
//! finalize, complete. Step events raised by the orchestrator are forwarded
//! onto the same per-job channel so subscribers see a unified stream.
//!
//! Cancellation is advisory: it removes the stream handle and emits exactly
//! one `cancelled` event, but an in-flight model call downstream is not
//! aborted.

mod events;

pub use events::ProgressEvent;

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use tokio::sync::{RwLock, mpsc};
use tracing::debug;

use atoforge_engine::{GenerationOrchestrator, JobEvent, StepTracker};
use atoforge_utils::error::{AtoForgeError, GenerationError};
use atoforge_utils::types::{COLLECT_DATA_STEP, DocumentType, GenerationRequest};
use atoforge_validation::ValidationEngine;

/// Ephemeral per-job stream returned to the subscriber.
#[derive(Debug)]
pub struct GenerationStream {
    pub job_id: String,
    pub started: Instant,
    pub events: mpsc::Receiver<ProgressEvent>,
}

struct StreamHandle {
    sender: mpsc::Sender<ProgressEvent>,
    cancelled: Arc<AtomicBool>,
    started: Instant,
}

/// Streams one job's progress and tracks active stream handles.
pub struct ProgressStreamer {
    orchestrator: GenerationOrchestrator,
    validation: Option<Arc<ValidationEngine>>,
    streams: Arc<RwLock<HashMap<String, StreamHandle>>>,
}

impl ProgressStreamer {
    /// A streamer over the given orchestrator, without pre-flight
    /// validation.
    #[must_use]
    pub fn new(orchestrator: GenerationOrchestrator) -> Self {
        Self {
            orchestrator,
            validation: None,
            streams: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Run pre-flight validation before starting each streamed job. A
    /// report with error-severity failures blocks the job.
    #[must_use]
    pub fn with_validation(mut self, engine: Arc<ValidationEngine>) -> Self {
        self.validation = Some(engine);
        self
    }

    /// Number of live stream handles.
    pub async fn active_stream_count(&self) -> usize {
        self.streams.read().await.len()
    }

    /// Start a job and stream its progress.
    ///
    /// # Errors
    ///
    /// `ValidationFailed` when pre-flight validation blocks the request;
    /// otherwise whatever [`GenerationOrchestrator::start`] reports. No job
    /// is started on error.
    pub async fn stream_generation(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationStream, AtoForgeError> {
        let started = Instant::now();
        let capacity = self.orchestrator.config().progress_channel_capacity;
        let (tx, rx) = mpsc::channel(capacity);

        if let Some(engine) = &self.validation {
            let _ = tx.try_send(progress(
                "validation",
                2,
                started,
                "Running pre-flight validation",
            ));
            let report = engine.validate_request(&request).await;
            if !report.valid {
                return Err(GenerationError::ValidationFailed {
                    reasons: report.errors.join("; "),
                }
                .into());
            }
            let _ = tx.try_send(progress(
                "validation",
                5,
                started,
                format!("Validation passed with {} warnings", report.warnings.len()),
            ));
        } else {
            let _ = tx.try_send(progress("validation", 2, started, "Pre-flight validation skipped"));
        }

        let plan = StepTracker::document_plan(&request.document_types);
        let (job_tx, job_rx) = mpsc::channel(capacity);
        let job_id = self
            .orchestrator
            .start_observed(request, Some(job_tx))
            .await?;

        let cancelled = Arc::new(AtomicBool::new(false));
        self.streams.write().await.insert(
            job_id.clone(),
            StreamHandle {
                sender: tx.clone(),
                cancelled: cancelled.clone(),
                started,
            },
        );

        let forwarder = Forwarder {
            job_id: job_id.clone(),
            plan,
            started,
            cancelled,
            sender: tx,
            streams: self.streams.clone(),
        };
        tokio::spawn(forwarder.run(job_rx));

        Ok(GenerationStream {
            job_id,
            started,
            events: rx,
        })
    }

    /// Advisory cancellation: remove the stream handle and emit exactly one
    /// `cancelled` event. Returns false when the job has no live stream
    /// (already finished or already cancelled). The underlying job and any
    /// in-flight model call are not aborted.
    pub async fn cancel_generation(&self, job_id: &str) -> bool {
        let Some(handle) = self.streams.write().await.remove(job_id) else {
            return false;
        };
        handle.cancelled.store(true, Ordering::SeqCst);
        debug!(job_id = %job_id, "Generation stream cancelled");
        let _ = handle.sender.try_send(ProgressEvent::Cancelled {
            job_id: job_id.to_string(),
            elapsed_ms: handle.started.elapsed().as_millis() as u64,
        });
        true
    }
}

/// Translates orchestrator step events into the streamed event sequence.
struct Forwarder {
    job_id: String,
    plan: Vec<DocumentType>,
    started: Instant,
    cancelled: Arc<AtomicBool>,
    sender: mpsc::Sender<ProgressEvent>,
    streams: Arc<RwLock<HashMap<String, StreamHandle>>>,
}

impl Forwarder {
    async fn run(self, mut job_events: mpsc::Receiver<JobEvent>) {
        while let Some(event) = job_events.recv().await {
            if self.cancelled.load(Ordering::SeqCst) {
                break;
            }
            let done = match event {
                JobEvent::StepStarted { name } => {
                    let percent = self.step_percent(&name, false);
                    self.send(progress(
                        stage_of(&name),
                        percent,
                        self.started,
                        format!("Starting {}", label_of(&name)),
                    ))
                    .await
                    .is_err()
                }
                JobEvent::StepCompleted { name, detail } => {
                    self.emit_sections(&name).await;
                    let percent = self.step_percent(&name, true);
                    let message = match detail {
                        Some(detail) => format!("{} finished: {detail}", label_of(&name)),
                        None => format!("{} finished", label_of(&name)),
                    };
                    self.send(progress(stage_of(&name), percent, self.started, message))
                        .await
                        .is_err()
                }
                JobEvent::StepFailed { name, error } => {
                    let percent = self.step_percent(&name, true);
                    self.send(progress(
                        stage_of(&name),
                        percent,
                        self.started,
                        format!("{} failed: {error}", label_of(&name)),
                    ))
                    .await
                    .is_err()
                }
                JobEvent::JobCompleted { job_id } => {
                    let _ = self
                        .send(progress("assembly", 92, self.started, "Assembling results"))
                        .await;
                    let _ = self
                        .send(progress("finalize", 97, self.started, "Finalizing job"))
                        .await;
                    let _ = self
                        .send(ProgressEvent::Complete {
                            job_id,
                            elapsed_ms: self.started.elapsed().as_millis() as u64,
                        })
                        .await;
                    true
                }
                JobEvent::JobFailed { job_id, error } => {
                    let _ = self
                        .send(ProgressEvent::Error {
                            job_id,
                            elapsed_ms: self.started.elapsed().as_millis() as u64,
                            message: error,
                        })
                        .await;
                    true
                }
            };
            if done {
                break;
            }
        }
        self.streams.write().await.remove(&self.job_id);
    }

    async fn send(&self, event: ProgressEvent) -> Result<(), ()> {
        if self.cancelled.load(Ordering::SeqCst) {
            return Err(());
        }
        self.sender.send(event).await.map_err(|_| ())
    }

    /// Evenly spaced sub-steps within the step's percent range, for
    /// document types with internal section structure.
    async fn emit_sections(&self, step_name: &str) {
        let Some(doc_type) = doc_type_of(step_name) else {
            return;
        };
        let sections = doc_type.sections();
        if sections.is_empty() {
            return;
        }
        let start = f64::from(self.step_percent(step_name, false));
        let end = f64::from(self.step_percent(step_name, true));
        for (index, section) in sections.iter().enumerate() {
            let fraction = (index + 1) as f64 / (sections.len() + 1) as f64;
            let percent = (start + (end - start) * fraction).round() as u8;
            let _ = self
                .send(progress(
                    doc_type.as_str(),
                    percent,
                    self.started,
                    (*section).to_string(),
                ))
                .await;
        }
    }

    /// Steps span the 10..=90 percent range in plan order.
    fn step_percent(&self, step_name: &str, end: bool) -> u8 {
        let total = self.plan.len() + 1;
        let index = if step_name == COLLECT_DATA_STEP {
            0
        } else {
            doc_type_of(step_name)
                .and_then(|doc_type| self.plan.iter().position(|&d| d == doc_type))
                .map_or(0, |i| i + 1)
        };
        let position = if end { index + 1 } else { index } as f64 / total as f64;
        (10.0 + 80.0 * position).round() as u8
    }
}

fn doc_type_of(step_name: &str) -> Option<DocumentType> {
    step_name
        .strip_prefix("generate_")
        .and_then(|suffix| suffix.parse::<DocumentType>().ok())
}

fn stage_of(step_name: &str) -> &str {
    if step_name == COLLECT_DATA_STEP {
        "data_collection"
    } else {
        step_name.strip_prefix("generate_").unwrap_or(step_name)
    }
}

fn label_of(step_name: &str) -> String {
    if step_name == COLLECT_DATA_STEP {
        return "data collection".to_string();
    }
    doc_type_of(step_name).map_or_else(
        || step_name.to_string(),
        |doc_type| doc_type.display_label().to_string(),
    )
}

fn progress(
    stage: impl Into<String>,
    percent: u8,
    started: Instant,
    message: impl Into<String>,
) -> ProgressEvent {
    ProgressEvent::Progress {
        stage: stage.into(),
        percent,
        elapsed_ms: started.elapsed().as_millis() as u64,
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use atoforge_fallback::{
        BuildOutcome, BuildParams, BuilderRegistry, BuiltDocument, DocumentBuilder,
        FallbackCoordinator,
    };
    use atoforge_router::ScriptedRouter;
    use atoforge_store::MemoryStore;
    use atoforge_utils::entities::{
        Finding, FindingSeverity, ImplementationStatus, SecurityControl, SystemRecord,
    };
    use std::time::Duration;

    struct SlowBuilder {
        delay: Duration,
    }

    #[async_trait]
    impl DocumentBuilder for SlowBuilder {
        async fn generate(
            &self,
            params: BuildParams<'_>,
        ) -> Result<BuildOutcome, atoforge_utils::error::GenerationError> {
            tokio::time::sleep(self.delay).await;
            Ok(BuildOutcome::ok(BuiltDocument {
                title: params.document_type.display_label().to_string(),
                content: "content".to_string(),
            }))
        }
    }

    fn seeded_store() -> Arc<MemoryStore> {
        let store = MemoryStore::new();
        store.put_system(SystemRecord {
            id: "sys-1".to_string(),
            name: "Payroll".to_string(),
            description: Some("Payroll".to_string()),
            owner: Some("ISSO".to_string()),
            organization: Some("Finance".to_string()),
            classification: None,
        });
        store.put_controls(vec![SecurityControl {
            id: "c-1".to_string(),
            system_id: "sys-1".to_string(),
            control_id: "AC-2".to_string(),
            title: "Account Management".to_string(),
            implementation_status: ImplementationStatus::Implemented,
            narrative: Some("narrative".to_string()),
        }]);
        store.put_findings(vec![Finding {
            id: "f-1".to_string(),
            system_id: "sys-1".to_string(),
            title: "Weak TLS".to_string(),
            description: None,
            severity: FindingSeverity::High,
            control_id: None,
        }]);
        Arc::new(store)
    }

    fn streamer(store: Arc<MemoryStore>, delay: Duration) -> ProgressStreamer {
        let mut registry = BuilderRegistry::new();
        registry.register(DocumentType::Ssp, Arc::new(SlowBuilder { delay }));
        let orchestrator = GenerationOrchestrator::new(
            store,
            Arc::new(ScriptedRouter::new()),
            Arc::new(FallbackCoordinator::new(registry)),
        );
        ProgressStreamer::new(orchestrator)
    }

    async fn drain(mut stream: GenerationStream) -> Vec<ProgressEvent> {
        let mut events = Vec::new();
        while let Some(event) = stream.events.recv().await {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn stream_emits_staged_sequence_through_complete() {
        let streamer = streamer(seeded_store(), Duration::from_millis(1));
        let stream = streamer
            .stream_generation(GenerationRequest::new(
                "sys-1",
                vec![DocumentType::Ssp, DocumentType::PoamReport],
            ))
            .await
            .unwrap();

        let events = drain(stream).await;

        assert!(matches!(
            &events[0],
            ProgressEvent::Progress { stage, .. } if stage == "validation"
        ));
        assert!(events.iter().any(
            |e| matches!(e, ProgressEvent::Progress { stage, .. } if stage == "data_collection")
        ));
        // Five evenly spaced SSP section sub-steps.
        let ssp_sections = events
            .iter()
            .filter(|e| {
                matches!(e, ProgressEvent::Progress { stage, message, .. }
                    if stage == "ssp" && DocumentType::Ssp.sections().contains(&message.as_str()))
            })
            .count();
        assert_eq!(ssp_sections, DocumentType::Ssp.sections().len());
        assert!(events.iter().any(
            |e| matches!(e, ProgressEvent::Progress { stage, .. } if stage == "assembly")
        ));
        assert!(events.iter().any(
            |e| matches!(e, ProgressEvent::Progress { stage, .. } if stage == "finalize")
        ));
        assert!(matches!(events.last(), Some(ProgressEvent::Complete { .. })));

        // Elapsed time is monotonic across the whole stream.
        let mut last = 0;
        for event in &events {
            assert!(event.elapsed_ms() >= last);
            last = event.elapsed_ms();
        }

        assert_eq!(streamer.active_stream_count().await, 0);
    }

    #[tokio::test]
    async fn cancel_emits_exactly_one_cancelled_event_and_second_is_noop() {
        let streamer = streamer(seeded_store(), Duration::from_millis(300));
        let stream = streamer
            .stream_generation(GenerationRequest::new("sys-1", vec![DocumentType::Ssp]))
            .await
            .unwrap();
        let job_id = stream.job_id.clone();

        assert_eq!(streamer.active_stream_count().await, 1);
        assert!(streamer.cancel_generation(&job_id).await);
        assert!(!streamer.cancel_generation(&job_id).await);
        assert_eq!(streamer.active_stream_count().await, 0);

        let events = drain(stream).await;
        let cancelled = events
            .iter()
            .filter(|e| matches!(e, ProgressEvent::Cancelled { .. }))
            .count();
        assert_eq!(cancelled, 1);
        assert!(!events.iter().any(|e| matches!(e, ProgressEvent::Complete { .. })));
    }

    #[tokio::test]
    async fn validation_failure_blocks_the_stream() {
        let store = seeded_store();
        let router = Arc::new(ScriptedRouter::new());
        let orchestrator = GenerationOrchestrator::new(
            store.clone(),
            router.clone(),
            Arc::new(FallbackCoordinator::new(BuilderRegistry::new())),
        );
        let streamer = ProgressStreamer::new(orchestrator)
            .with_validation(Arc::new(ValidationEngine::new(store, router)));

        let error = streamer
            .stream_generation(GenerationRequest::new("ghost", vec![DocumentType::Ssp]))
            .await
            .unwrap_err();
        assert!(error.to_string().contains("pre-flight validation failed"));
        assert_eq!(streamer.active_stream_count().await, 0);
    }
}
