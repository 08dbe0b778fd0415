//! Step-level events forwarded to progress subscribers.

use serde::{Deserialize, Serialize};

/// Events the orchestrator emits while executing a job.
///
/// Delivery is best-effort over a bounded channel; the orchestrator never
/// blocks on a slow subscriber and execution is unaffected by drops.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum JobEvent {
    StepStarted {
        name: String,
    },
    StepCompleted {
        name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        detail: Option<String>,
    },
    StepFailed {
        name: String,
        error: String,
    },
    JobCompleted {
        job_id: String,
    },
    JobFailed {
        job_id: String,
        error: String,
    },
}
