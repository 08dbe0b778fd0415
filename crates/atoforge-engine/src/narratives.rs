//! Bulk per-control narrative generation.
//!
//! One narrative per control, continue-on-error: a single control's failure
//! is logged and skipped so one bad control never blocks the rest. This is
//! the opposite of the per-step fail policy, on purpose.

use tracing::warn;

use atoforge_fallback::{GeneratedNarrative, NarrativeBuilder, NarrativeContext};
use atoforge_utils::context::GenerationContext;

/// A successfully generated narrative for one control.
#[derive(Debug, Clone)]
pub struct ControlNarrative {
    pub control_id: String,
    pub title: String,
    pub narrative: GeneratedNarrative,
}

/// Outcome of the bulk narrative loop.
#[derive(Debug, Clone, Default)]
pub struct NarrativeBatch {
    pub narratives: Vec<ControlNarrative>,
    /// `(control_id, error)` for controls whose generation failed.
    pub failed: Vec<(String, String)>,
}

impl NarrativeBatch {
    /// One-line summary for step detail.
    #[must_use]
    pub fn detail(&self) -> String {
        format!(
            "{} narratives generated, {} failed",
            self.narratives.len(),
            self.failed.len()
        )
    }
}

/// Run the narrative builder once per control.
pub(crate) async fn generate_control_narratives(
    builder: &dyn NarrativeBuilder,
    context: &GenerationContext,
) -> NarrativeBatch {
    let mut batch = NarrativeBatch::default();
    for control in &context.controls {
        let narrative_context = NarrativeContext {
            system: &context.system,
            control,
            evidence: &context.evidence,
            findings: &context.findings,
        };
        match builder
            .generate_context_aware_narrative(narrative_context)
            .await
        {
            Ok(narrative) => batch.narratives.push(ControlNarrative {
                control_id: control.control_id.clone(),
                title: control.title.clone(),
                narrative,
            }),
            Err(error) => {
                warn!(
                    control_id = %control.control_id,
                    error = %error,
                    "Narrative generation failed for control, continuing"
                );
                batch.failed.push((control.control_id.clone(), error.to_string()));
            }
        }
    }
    batch
}

/// Render the batch into one aggregated narratives document.
pub(crate) fn render_narratives_document(system_name: &str, batch: &NarrativeBatch) -> String {
    let mut out = format!("# Control Implementation Narratives: {system_name}\n");
    for entry in &batch.narratives {
        out.push_str(&format!(
            "\n## {} - {}\n\n{}\n",
            entry.control_id, entry.title, entry.narrative.narrative
        ));
        if !entry.narrative.sources.is_empty() {
            out.push_str(&format!("\nSources: {}\n", entry.narrative.sources.join(", ")));
        }
    }
    if !batch.failed.is_empty() {
        out.push_str("\n## Not generated\n\n");
        for (control_id, error) in &batch.failed {
            out.push_str(&format!("- {control_id}: {error}\n"));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use atoforge_utils::entities::{ImplementationStatus, SecurityControl, SystemRecord};
    use atoforge_utils::error::GenerationError;
    use std::collections::HashMap;

    struct FlakyBuilder {
        fail_for: &'static str,
    }

    #[async_trait]
    impl NarrativeBuilder for FlakyBuilder {
        async fn generate_context_aware_narrative(
            &self,
            context: NarrativeContext<'_>,
        ) -> Result<GeneratedNarrative, GenerationError> {
            if context.control.control_id == self.fail_for {
                return Err(GenerationError::DocumentFailed {
                    document_type: "control_narratives".to_string(),
                    reason: "model refused".to_string(),
                });
            }
            Ok(GeneratedNarrative {
                narrative: format!("{} is implemented.", context.control.control_id),
                confidence: 0.8,
                sources: vec!["scan-1".to_string()],
                extracted_details: HashMap::new(),
            })
        }
    }

    fn context_with_controls(ids: &[&str]) -> GenerationContext {
        let controls = ids
            .iter()
            .map(|id| SecurityControl {
                id: format!("row-{id}"),
                system_id: "sys-1".to_string(),
                control_id: (*id).to_string(),
                title: format!("Control {id}"),
                implementation_status: ImplementationStatus::Implemented,
                narrative: None,
            })
            .collect();
        GenerationContext::new(
            SystemRecord {
                id: "sys-1".to_string(),
                name: "Payroll".to_string(),
                description: None,
                owner: None,
                organization: None,
                classification: None,
            },
            controls,
            vec![],
            vec![],
            vec![],
            vec![],
        )
    }

    #[tokio::test]
    async fn one_failed_control_does_not_stop_the_loop() {
        let builder = FlakyBuilder { fail_for: "AC-3" };
        let context = context_with_controls(&["AC-2", "AC-3", "AC-4"]);

        let batch = generate_control_narratives(&builder, &context).await;

        assert_eq!(batch.narratives.len(), 2);
        assert_eq!(batch.failed.len(), 1);
        assert_eq!(batch.failed[0].0, "AC-3");
        assert_eq!(batch.detail(), "2 narratives generated, 1 failed");
    }

    #[tokio::test]
    async fn rendered_document_lists_failures() {
        let builder = FlakyBuilder { fail_for: "AC-3" };
        let context = context_with_controls(&["AC-2", "AC-3"]);
        let batch = generate_control_narratives(&builder, &context).await;

        let content = render_narratives_document("Payroll", &batch);
        assert!(content.contains("## AC-2"));
        assert!(content.contains("Not generated"));
        assert!(content.contains("AC-3: "));
    }
}
