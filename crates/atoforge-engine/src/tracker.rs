//! Per-job step bookkeeping.

use chrono::Utc;

use atoforge_utils::types::{COLLECT_DATA_STEP, DocumentType, GenerationStep, StepStatus};

/// Ordered step states for one job.
///
/// The step sequence is fixed at creation (the leading collect-data step
/// plus one step per requested document type) and only statuses change
/// afterwards. Transitions are monotonic: a step that reached a terminal
/// status ignores further updates, so duplicate completion calls from
/// concurrent paths are harmless no-ops.
#[derive(Debug, Clone)]
pub struct StepTracker {
    steps: Vec<GenerationStep>,
}

impl StepTracker {
    /// Build the step plan for the given (already deduplicated) types.
    #[must_use]
    pub fn new(document_types: &[DocumentType]) -> Self {
        let mut steps = Vec::with_capacity(document_types.len() + 1);
        steps.push(GenerationStep::pending(COLLECT_DATA_STEP));
        for doc_type in document_types {
            steps.push(GenerationStep::pending(doc_type.step_name()));
        }
        Self { steps }
    }

    /// Deduplicate requested types preserving first-occurrence order.
    #[must_use]
    pub fn document_plan(document_types: &[DocumentType]) -> Vec<DocumentType> {
        let mut plan = Vec::with_capacity(document_types.len());
        for &doc_type in document_types {
            if !plan.contains(&doc_type) {
                plan.push(doc_type);
            }
        }
        plan
    }

    /// Mark a step running. No-op for unknown or already-terminal steps.
    pub fn mark_running(&mut self, name: &str) {
        self.transition(name, StepStatus::Running, None, None);
    }

    /// Mark a step completed with optional detail.
    pub fn mark_completed(&mut self, name: &str, detail: Option<String>) {
        self.transition(name, StepStatus::Completed, detail, None);
    }

    /// Mark a step failed with an error message.
    pub fn mark_failed(&mut self, name: &str, error: impl Into<String>) {
        self.transition(name, StepStatus::Failed, None, Some(error.into()));
    }

    fn transition(
        &mut self,
        name: &str,
        status: StepStatus,
        detail: Option<String>,
        error: Option<String>,
    ) {
        let Some(step) = self.steps.iter_mut().find(|s| s.name == name) else {
            return;
        };
        if step.status.is_terminal() {
            return;
        }
        match status {
            StepStatus::Running => {
                step.started_at.get_or_insert_with(Utc::now);
            }
            StepStatus::Completed | StepStatus::Failed => {
                step.started_at.get_or_insert_with(Utc::now);
                step.ended_at = Some(Utc::now());
            }
            StepStatus::Pending => return,
        }
        step.status = status;
        if detail.is_some() {
            step.detail = detail;
        }
        if error.is_some() {
            step.error = error;
        }
    }

    /// Aggregate progress: `round(100 * finished_steps / total_steps)`.
    ///
    /// Failed steps count as finished so a fully-executed job always reads
    /// 100 even when individual steps failed.
    #[must_use]
    pub fn progress(&self) -> u8 {
        if self.steps.is_empty() {
            return 0;
        }
        let finished = self.steps.iter().filter(|s| s.status.is_terminal()).count();
        (finished as f64 / self.steps.len() as f64 * 100.0).round() as u8
    }

    /// Display label of the first currently-running step.
    #[must_use]
    pub fn current_step(&self) -> Option<String> {
        self.steps
            .iter()
            .find(|s| s.status == StepStatus::Running)
            .map(|s| display_label(&s.name))
    }

    /// The step states in plan order.
    #[must_use]
    pub fn steps(&self) -> &[GenerationStep] {
        &self.steps
    }

    /// Owned snapshot of the step states.
    #[must_use]
    pub fn snapshot(&self) -> Vec<GenerationStep> {
        self.steps.clone()
    }

    /// Whether every step reached a terminal status.
    #[must_use]
    pub fn all_terminal(&self) -> bool {
        self.steps.iter().all(|s| s.status.is_terminal())
    }

    /// Whether any step failed.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.steps.iter().any(|s| s.status == StepStatus::Failed)
    }
}

fn display_label(step_name: &str) -> String {
    if step_name == COLLECT_DATA_STEP {
        return "Collecting system data".to_string();
    }
    step_name
        .strip_prefix("generate_")
        .and_then(|suffix| suffix.parse::<DocumentType>().ok())
        .map_or_else(
            || step_name.to_string(),
            |doc_type| format!("Generating {}", doc_type.display_label()),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn plan_has_collect_data_first_and_dedups() {
        let plan = StepTracker::document_plan(&[
            DocumentType::Ssp,
            DocumentType::PoamReport,
            DocumentType::Ssp,
        ]);
        assert_eq!(plan, vec![DocumentType::Ssp, DocumentType::PoamReport]);

        let tracker = StepTracker::new(&plan);
        let names: Vec<&str> = tracker.steps().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec![COLLECT_DATA_STEP, "generate_ssp", "generate_poam_report"]);
    }

    #[test]
    fn terminal_steps_ignore_further_transitions() {
        let mut tracker = StepTracker::new(&[DocumentType::Ssp]);
        tracker.mark_running("generate_ssp");
        tracker.mark_completed("generate_ssp", Some("1 document".to_string()));

        tracker.mark_failed("generate_ssp", "late failure");
        tracker.mark_running("generate_ssp");

        let step = &tracker.steps()[1];
        assert_eq!(step.status, StepStatus::Completed);
        assert_eq!(step.detail.as_deref(), Some("1 document"));
        assert!(step.error.is_none());
    }

    #[test]
    fn progress_counts_failed_steps_as_finished() {
        let mut tracker = StepTracker::new(&[DocumentType::Ssp, DocumentType::Rar, DocumentType::PoamReport]);
        assert_eq!(tracker.progress(), 0);

        tracker.mark_completed(COLLECT_DATA_STEP, None);
        assert_eq!(tracker.progress(), 25);

        tracker.mark_failed("generate_ssp", "builder error");
        assert_eq!(tracker.progress(), 50);

        tracker.mark_completed("generate_rar", None);
        tracker.mark_completed("generate_poam_report", None);
        assert_eq!(tracker.progress(), 100);
        assert!(tracker.all_terminal());
        assert!(tracker.has_failures());
    }

    #[test]
    fn current_step_is_first_running_with_display_label() {
        let mut tracker = StepTracker::new(&[DocumentType::Ssp]);
        assert!(tracker.current_step().is_none());

        tracker.mark_running(COLLECT_DATA_STEP);
        assert_eq!(tracker.current_step().as_deref(), Some("Collecting system data"));

        tracker.mark_completed(COLLECT_DATA_STEP, None);
        tracker.mark_running("generate_ssp");
        assert_eq!(
            tracker.current_step().as_deref(),
            Some("Generating System Security Plan")
        );
    }

    #[test]
    fn unknown_step_is_ignored() {
        let mut tracker = StepTracker::new(&[DocumentType::Ssp]);
        tracker.mark_running("generate_rar");
        assert!(tracker.current_step().is_none());
    }

    proptest! {
        // Progress never decreases under any transition sequence.
        #[test]
        fn progress_is_monotonic(ops in proptest::collection::vec((0usize..3, 0usize..4), 0..40)) {
            let types = [
                DocumentType::Ssp,
                DocumentType::StigChecklist,
                DocumentType::PoamReport,
            ];
            let mut tracker = StepTracker::new(&types);
            let names: Vec<String> =
                tracker.steps().iter().map(|s| s.name.clone()).collect();
            let mut last = tracker.progress();
            for (op, idx) in ops {
                let name = &names[idx % names.len()];
                match op {
                    0 => tracker.mark_running(name),
                    1 => tracker.mark_completed(name, None),
                    _ => tracker.mark_failed(name, "boom"),
                }
                let progress = tracker.progress();
                prop_assert!(progress >= last);
                prop_assert!(progress <= 100);
                last = progress;
            }
        }
    }
}
