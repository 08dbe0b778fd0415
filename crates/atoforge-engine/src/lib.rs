//! Generation orchestration core.
//!
//! [`GenerationOrchestrator`] owns the active-job registry, builds the step
//! plan from the requested document types, runs detached execution, and
//! answers status/result queries. [`StepTracker`] is the pure step
//! bookkeeping underneath it. Bulk per-entity generation (checklists,
//! control narratives, POA&M items) lives here too; external content
//! builders stay behind the fallback coordinator's contracts.

mod checklist;
mod config;
mod events;
mod narratives;
mod orchestrator;
mod poam;
mod tracker;

pub use checklist::generate_checklist_content;
pub use config::{DEFAULT_MODEL_CALL_TIMEOUT, MIN_MODEL_CALL_TIMEOUT, OrchestratorConfig};
pub use events::JobEvent;
pub use narratives::{ControlNarrative, NarrativeBatch};
pub use orchestrator::GenerationOrchestrator;
pub use tracker::StepTracker;
