//! Progress event vocabulary.

use serde::{Deserialize, Serialize};

/// Events delivered on a per-job stream.
///
/// `elapsed_ms` is measured from stream creation and is monotonically
/// non-decreasing across the events of one stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProgressEvent {
    Progress {
        stage: String,
        percent: u8,
        elapsed_ms: u64,
        message: String,
    },
    Complete {
        job_id: String,
        elapsed_ms: u64,
    },
    Error {
        job_id: String,
        elapsed_ms: u64,
        message: String,
    },
    Cancelled {
        job_id: String,
        elapsed_ms: u64,
    },
}

impl ProgressEvent {
    /// The elapsed-time field, regardless of variant.
    #[must_use]
    pub fn elapsed_ms(&self) -> u64 {
        match self {
            Self::Progress { elapsed_ms, .. }
            | Self::Complete { elapsed_ms, .. }
            | Self::Error { elapsed_ms, .. }
            | Self::Cancelled { elapsed_ms, .. } => *elapsed_ms,
        }
    }
}
