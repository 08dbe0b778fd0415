//! Template-then-default fallback coordination.
//!
//! [`FallbackCoordinator`] wraps one "preferred then default" generation
//! attempt per document type. When the caller opted into templates and a
//! template id is resolvable from the request, the template path runs
//! first; any failure there is logged and the default path retried
//! transparently. Callers never see the template attempt unless both paths
//! fail, in which case a single combined diagnostic is raised.

mod contract;

pub use contract::{
    BuildOutcome, BuildParams, BuiltDocument, DocumentBuilder, GeneratedNarrative,
    NarrativeBuilder, NarrativeContext, TemplateInfo,
};

pub use atoforge_utils::error::FallbackError;

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use atoforge_utils::context::GenerationContext;
use atoforge_utils::types::{DocumentType, GenerationRequest};

/// How a successful document was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    TemplateGenerated,
    AiGenerated,
}

impl Provenance {
    /// Canonical wire name recorded on persisted documents.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::TemplateGenerated => "template_generated",
            Self::AiGenerated => "ai_generated",
        }
    }
}

/// A document produced by the coordinator, with provenance.
#[derive(Debug, Clone)]
pub struct DocumentResult {
    pub document: BuiltDocument,
    pub provenance: Provenance,
    pub template_info: Option<TemplateInfo>,
}

/// Registry of per-document-type builder services.
#[derive(Default, Clone)]
pub struct BuilderRegistry {
    builders: HashMap<DocumentType, Arc<dyn DocumentBuilder>>,
}

impl BuilderRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a builder for a document type, replacing any previous one.
    pub fn register(&mut self, document_type: DocumentType, builder: Arc<dyn DocumentBuilder>) {
        self.builders.insert(document_type, builder);
    }

    /// Look up the builder for a document type.
    #[must_use]
    pub fn get(&self, document_type: DocumentType) -> Option<&Arc<dyn DocumentBuilder>> {
        self.builders.get(&document_type)
    }

    /// Whether a builder is registered for the type.
    #[must_use]
    pub fn has(&self, document_type: DocumentType) -> bool {
        self.builders.contains_key(&document_type)
    }
}

/// Coordinates the template-then-default generation attempt for one
/// document type.
pub struct FallbackCoordinator {
    registry: BuilderRegistry,
}

impl FallbackCoordinator {
    /// Create a coordinator over a builder registry.
    #[must_use]
    pub fn new(registry: BuilderRegistry) -> Self {
        Self { registry }
    }

    /// The underlying registry.
    #[must_use]
    pub fn registry(&self) -> &BuilderRegistry {
        &self.registry
    }

    /// Generate one document, preferring the template path when requested
    /// and resolvable, with transparent default-path retry.
    ///
    /// # Errors
    ///
    /// Returns [`FallbackError::NoBuilder`] when the type has no registered
    /// builder, [`FallbackError::Exhausted`] when both paths failed, and a
    /// default-path error when templates were never attempted.
    pub async fn generate_with_fallback(
        &self,
        document_type: DocumentType,
        request: &GenerationRequest,
        context: &GenerationContext,
    ) -> Result<DocumentResult, FallbackError> {
        let builder = self
            .registry
            .get(document_type)
            .ok_or_else(|| FallbackError::NoBuilder {
                document_type: document_type.as_str().to_string(),
            })?;

        let template_id = if request.use_templates {
            request.template_id_for(document_type)
        } else {
            None
        };

        let template_error = if let Some(template_id) = template_id {
            let params = BuildParams {
                document_type,
                request,
                context,
                template_id: Some(template_id),
            };
            match builder.generate(params).await {
                Ok(outcome) if outcome.success => {
                    if let Some(document) = outcome.document {
                        return Ok(DocumentResult {
                            document,
                            provenance: Provenance::TemplateGenerated,
                            template_info: outcome.template_info,
                        });
                    }
                    // Success without a document is a builder contract
                    // violation; treat it as a template failure.
                    Some("builder reported success without a document".to_string())
                }
                Ok(outcome) => Some(outcome.error_text()),
                Err(error) => Some(error.to_string()),
            }
        } else {
            None
        };

        if let Some(cause) = &template_error {
            warn!(
                document_type = document_type.as_str(),
                cause = %cause,
                "Template generation failed, retrying with default generation"
            );
        }

        let params = BuildParams {
            document_type,
            request,
            context,
            template_id: None,
        };
        let default_error = match builder.generate(params).await {
            Ok(outcome) if outcome.success => {
                if let Some(document) = outcome.document {
                    return Ok(DocumentResult {
                        document,
                        provenance: Provenance::AiGenerated,
                        template_info: None,
                    });
                }
                "builder reported success without a document".to_string()
            }
            Ok(outcome) => outcome.error_text(),
            Err(error) => error.to_string(),
        };

        match template_error {
            Some(template_error) => Err(FallbackError::Exhausted {
                template_error,
                fallback_error: default_error,
            }),
            None => Err(FallbackError::DefaultFailed {
                document_type: document_type.as_str().to_string(),
                reason: default_error,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use atoforge_utils::entities::SystemRecord;
    use atoforge_utils::error::GenerationError;
    use atoforge_utils::types::TemplateOptions;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ScriptedBuilder {
        template_fails: bool,
        default_fails: bool,
        calls: AtomicUsize,
    }

    impl ScriptedBuilder {
        fn new(template_fails: bool, default_fails: bool) -> Self {
            Self {
                template_fails,
                default_fails,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl DocumentBuilder for ScriptedBuilder {
        async fn generate(
            &self,
            params: BuildParams<'_>,
        ) -> Result<BuildOutcome, GenerationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let is_template = params.template_id.is_some();
            let fails = if is_template {
                self.template_fails
            } else {
                self.default_fails
            };
            if fails {
                Ok(BuildOutcome::failed(vec![format!(
                    "{} build failed",
                    if is_template { "template" } else { "default" }
                )]))
            } else {
                let mut outcome = BuildOutcome::ok(BuiltDocument {
                    title: "SSP".to_string(),
                    content: "content".to_string(),
                });
                if is_template {
                    outcome = outcome.with_template_info(TemplateInfo {
                        template_id: params.template_id.unwrap().to_string(),
                        template_name: None,
                    });
                }
                Ok(outcome)
            }
        }
    }

    fn context() -> GenerationContext {
        GenerationContext::new(
            SystemRecord {
                id: "sys-1".to_string(),
                name: "Test System".to_string(),
                description: None,
                owner: None,
                organization: None,
                classification: None,
            },
            vec![],
            vec![],
            vec![],
            vec![],
            vec![],
        )
    }

    fn templated_request() -> GenerationRequest {
        let mut request = GenerationRequest::new("sys-1", vec![DocumentType::Ssp]);
        request.use_templates = true;
        let mut opts = TemplateOptions::default();
        opts.template_ids
            .insert(DocumentType::Ssp, "tmpl-1".to_string());
        request.template_options = Some(opts);
        request
    }

    fn coordinator(builder: ScriptedBuilder) -> FallbackCoordinator {
        let mut registry = BuilderRegistry::new();
        registry.register(DocumentType::Ssp, Arc::new(builder));
        FallbackCoordinator::new(registry)
    }

    #[tokio::test]
    async fn template_success_reports_template_provenance() {
        let coordinator = coordinator(ScriptedBuilder::new(false, false));
        let result = coordinator
            .generate_with_fallback(DocumentType::Ssp, &templated_request(), &context())
            .await
            .unwrap();
        assert_eq!(result.provenance, Provenance::TemplateGenerated);
        assert_eq!(result.template_info.unwrap().template_id, "tmpl-1");
    }

    #[tokio::test]
    async fn template_failure_falls_back_transparently() {
        let coordinator = coordinator(ScriptedBuilder::new(true, false));
        let result = coordinator
            .generate_with_fallback(DocumentType::Ssp, &templated_request(), &context())
            .await
            .unwrap();
        assert_eq!(result.provenance, Provenance::AiGenerated);
        assert!(result.template_info.is_none());
    }

    #[tokio::test]
    async fn both_paths_failing_combines_causes() {
        let coordinator = coordinator(ScriptedBuilder::new(true, true));
        let error = coordinator
            .generate_with_fallback(DocumentType::Ssp, &templated_request(), &context())
            .await
            .unwrap_err();
        let message = error.to_string();
        assert!(message.contains("Template error:"));
        assert!(message.contains("Fallback error:"));
    }

    #[tokio::test]
    async fn templates_not_requested_skips_template_path() {
        let builder = ScriptedBuilder::new(true, false);
        let coordinator = coordinator(builder);
        let request = GenerationRequest::new("sys-1", vec![DocumentType::Ssp]);
        let result = coordinator
            .generate_with_fallback(DocumentType::Ssp, &request, &context())
            .await
            .unwrap();
        assert_eq!(result.provenance, Provenance::AiGenerated);
    }

    #[tokio::test]
    async fn missing_builder_is_an_error() {
        let coordinator = FallbackCoordinator::new(BuilderRegistry::new());
        let request = GenerationRequest::new("sys-1", vec![DocumentType::Rar]);
        assert!(matches!(
            coordinator
                .generate_with_fallback(DocumentType::Rar, &request, &context())
                .await,
            Err(FallbackError::NoBuilder { .. })
        ));
    }
}
