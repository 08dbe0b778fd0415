//! Individual pre-flight checks.
//!
//! Each function produces self-contained [`ValidationCheck`] records; no
//! check consults another's outcome. Aggregation and severity semantics
//! live in the report module.

use serde_json::json;
use sysinfo::System;
use tracing::debug;

use atoforge_router::ModelRouter;
use atoforge_store::ComplianceStore;
use atoforge_utils::entities::{ImplementationStatus, RuleType};
use atoforge_utils::types::{DocumentType, GenerationRequest};

use crate::report::{CheckSeverity, ValidationCheck};
use crate::ResourceThresholds;

/// System existence and completeness.
pub(crate) async fn system_checks(
    store: &dyn ComplianceStore,
    request: &GenerationRequest,
) -> Vec<ValidationCheck> {
    let system = match store.get_system(&request.system_id).await {
        Ok(system) => system,
        Err(error) => {
            return vec![ValidationCheck::fail(
                "system_exists",
                CheckSeverity::Error,
                format!("Could not look up system {}: {error}", request.system_id),
            )];
        }
    };

    let Some(system) = system else {
        return vec![ValidationCheck::fail(
            "system_exists",
            CheckSeverity::Error,
            format!("System {} does not exist", request.system_id),
        )];
    };

    let mut checks = vec![ValidationCheck::pass(
        "system_exists",
        format!("System {} ({}) found", system.id, system.name),
    )];

    let mut missing = Vec::new();
    if system.description.as_deref().unwrap_or("").is_empty() {
        missing.push("description");
    }
    if system.owner.as_deref().unwrap_or("").is_empty() {
        missing.push("owner");
    }
    if system.organization.as_deref().unwrap_or("").is_empty() {
        missing.push("organization");
    }
    if missing.is_empty() {
        checks.push(ValidationCheck::pass(
            "system_completeness",
            "System profile is complete",
        ));
    } else {
        checks.push(
            ValidationCheck::fail(
                "system_completeness",
                CheckSeverity::Warning,
                format!("System profile is missing: {}", missing.join(", ")),
            )
            .with_details(json!({ "missing_fields": missing })),
        );
    }

    checks
}

/// Control presence, narrative coverage, and batch sizing.
pub(crate) async fn control_checks(
    store: &dyn ComplianceStore,
    request: &GenerationRequest,
    thresholds: &ResourceThresholds,
) -> Vec<ValidationCheck> {
    let controls = match store.list_controls(&request.system_id).await {
        Ok(controls) => controls,
        Err(error) => {
            return vec![ValidationCheck::fail(
                "control_coverage",
                CheckSeverity::Error,
                format!("Could not list controls: {error}"),
            )];
        }
    };

    if controls.is_empty() {
        return vec![ValidationCheck::fail(
            "control_coverage",
            CheckSeverity::Error,
            format!(
                "System {} has no security controls; nothing to generate from",
                request.system_id
            ),
        )];
    }

    let mut checks = Vec::new();

    let implemented = controls
        .iter()
        .filter(|c| {
            matches!(
                c.implementation_status,
                ImplementationStatus::Implemented | ImplementationStatus::PartiallyImplemented
            )
        })
        .count();
    let coverage = implemented as f64 / controls.len() as f64;
    if coverage < 0.2 {
        checks.push(
            ValidationCheck::fail(
                "control_coverage",
                CheckSeverity::Warning,
                format!(
                    "Only {implemented} of {} controls are implemented or partially implemented",
                    controls.len()
                ),
            )
            .with_details(json!({
                "total": controls.len(),
                "implemented": implemented,
            })),
        );
    } else {
        checks.push(ValidationCheck::pass(
            "control_coverage",
            format!(
                "{implemented} of {} controls implemented or partially implemented",
                controls.len()
            ),
        ));
    }

    let without_narrative = controls
        .iter()
        .filter(|c| c.narrative.as_deref().unwrap_or("").is_empty())
        .count();
    if without_narrative * 2 > controls.len() {
        checks.push(ValidationCheck::fail(
            "narrative_completeness",
            CheckSeverity::Warning,
            format!(
                "{without_narrative} of {} controls have no implementation narrative",
                controls.len()
            ),
        ));
    } else {
        checks.push(ValidationCheck::pass(
            "narrative_completeness",
            "Narrative coverage is sufficient",
        ));
    }

    if controls.len() > thresholds.max_controls_per_batch {
        checks.push(ValidationCheck::fail(
            "batch_size",
            CheckSeverity::Warning,
            format!(
                "{} controls exceeds the recommended batch size of {}",
                controls.len(),
                thresholds.max_controls_per_batch
            ),
        ));
    } else {
        checks.push(ValidationCheck::pass(
            "batch_size",
            format!("{} controls within batch limits", controls.len()),
        ));
    }

    checks
}

/// Host memory and load headroom.
pub(crate) async fn resource_headroom(thresholds: &ResourceThresholds) -> ValidationCheck {
    let mut sys = System::new();
    sys.refresh_memory();
    sys.refresh_cpu_all();

    let free_mb = sys.available_memory() / (1024 * 1024);
    let cores = sys.cpus().len().max(1);
    let load_per_core = System::load_average().one / cores as f64;
    debug!(free_mb, cores, load_per_core, "Resource headroom sampled");

    let details = json!({
        "free_memory_mb": free_mb,
        "load_per_core": load_per_core,
        "cores": cores,
    });

    if free_mb < thresholds.min_free_memory_mb {
        ValidationCheck::fail(
            "resource_headroom",
            CheckSeverity::Error,
            format!(
                "Free memory {free_mb} MB is below the {} MB minimum",
                thresholds.min_free_memory_mb
            ),
        )
        .with_details(details)
    } else if load_per_core > thresholds.max_load_per_core {
        ValidationCheck::fail(
            "resource_headroom",
            CheckSeverity::Error,
            format!(
                "Load average {load_per_core:.2} per core exceeds the {:.2} limit",
                thresholds.max_load_per_core
            ),
        )
        .with_details(details)
    } else {
        ValidationCheck::pass(
            "resource_headroom",
            format!("{free_mb} MB free, load {load_per_core:.2} per core"),
        )
        .with_details(details)
    }
}

/// Storage and model-router reachability.
pub(crate) async fn connectivity_checks(
    store: &dyn ComplianceStore,
    router: &dyn ModelRouter,
) -> Vec<ValidationCheck> {
    let mut checks = Vec::new();

    match store.ping().await {
        Ok(()) => checks.push(ValidationCheck::pass(
            "store_connectivity",
            "Storage reachable",
        )),
        Err(error) => checks.push(ValidationCheck::fail(
            "store_connectivity",
            CheckSeverity::Error,
            format!("Storage connection failed: {error}"),
        )),
    }

    if router.is_available().await {
        checks.push(ValidationCheck::pass(
            "model_router_connectivity",
            "Model router reachable",
        ));
    } else {
        checks.push(ValidationCheck::fail(
            "model_router_connectivity",
            CheckSeverity::Error,
            "Model router connection failed or router unavailable",
        ));
    }

    checks
}

/// Referential soundness of the control rows.
pub(crate) async fn data_integrity(
    store: &dyn ComplianceStore,
    request: &GenerationRequest,
) -> Vec<ValidationCheck> {
    let controls = match store.list_controls(&request.system_id).await {
        Ok(controls) => controls,
        // The control check already reports the store failure.
        Err(_) => return Vec::new(),
    };

    let mut checks = Vec::new();

    let mut seen = std::collections::HashSet::new();
    let mut duplicates = Vec::new();
    for control in &controls {
        if !seen.insert(control.control_id.as_str()) && !duplicates.contains(&control.control_id) {
            duplicates.push(control.control_id.clone());
        }
    }
    if duplicates.is_empty() {
        checks.push(ValidationCheck::pass(
            "duplicate_controls",
            "No duplicate control rows",
        ));
    } else {
        checks.push(
            ValidationCheck::fail(
                "duplicate_controls",
                CheckSeverity::Warning,
                format!("Duplicate control rows: {}", duplicates.join(", ")),
            )
            .with_details(json!({ "control_ids": duplicates })),
        );
    }

    let malformed = controls
        .iter()
        .filter(|c| c.control_id.trim().is_empty() || c.title.trim().is_empty())
        .count();
    if malformed == 0 {
        checks.push(ValidationCheck::pass(
            "control_integrity",
            "All control rows are well-formed",
        ));
    } else {
        checks.push(ValidationCheck::fail(
            "control_integrity",
            CheckSeverity::Warning,
            format!("{malformed} control rows have an empty id or title"),
        ));
    }

    checks
}

/// Template ids must be supplied for every requested type when templates
/// were opted into.
pub(crate) fn template_availability(request: &GenerationRequest) -> ValidationCheck {
    let missing: Vec<&str> = request
        .document_types
        .iter()
        .filter(|doc_type| request.template_id_for(**doc_type).is_none())
        .map(|doc_type| doc_type.as_str())
        .collect();

    if missing.is_empty() {
        ValidationCheck::pass(
            "template_availability",
            "Template ids supplied for all requested types",
        )
    } else {
        ValidationCheck::fail(
            "template_availability",
            CheckSeverity::Warning,
            format!(
                "Templates requested but no template id supplied for: {}",
                missing.join(", ")
            ),
        )
    }
}

/// Per-document-type readiness. Returns `None` for types with no specific
/// precondition.
pub(crate) async fn document_readiness(
    store: &dyn ComplianceStore,
    request: &GenerationRequest,
    doc_type: DocumentType,
) -> Option<ValidationCheck> {
    match doc_type {
        DocumentType::Ssp => Some(ssp_readiness(store, request).await),
        DocumentType::StigChecklist => {
            Some(checklist_readiness(store, request, RuleType::Stig).await)
        }
        DocumentType::JsigChecklist => {
            Some(checklist_readiness(store, request, RuleType::Jsig).await)
        }
        DocumentType::PoamReport => Some(poam_readiness(store, request).await),
        _ => None,
    }
}

async fn ssp_readiness(store: &dyn ComplianceStore, request: &GenerationRequest) -> ValidationCheck {
    let system = match store.get_system(&request.system_id).await {
        Ok(Some(system)) => system,
        // Existence failures are reported by the system check.
        Ok(None) | Err(_) => return ValidationCheck::pass("ssp_readiness", "Skipped"),
    };

    let organization = request
        .template_options
        .as_ref()
        .and_then(|opts| opts.organization.clone())
        .or_else(|| system.organization.clone())
        .filter(|s| !s.is_empty());

    let mut missing = Vec::new();
    if organization.is_none() {
        missing.push("organization");
    }
    if system.owner.as_deref().unwrap_or("").is_empty() {
        missing.push("system owner");
    }

    if missing.is_empty() {
        ValidationCheck::pass("ssp_readiness", "SSP prerequisites present")
    } else {
        ValidationCheck::fail(
            "ssp_readiness",
            CheckSeverity::Error,
            format!("SSP generation requires: {}", missing.join(", ")),
        )
    }
}

async fn checklist_readiness(
    store: &dyn ComplianceStore,
    request: &GenerationRequest,
    rule_type: RuleType,
) -> ValidationCheck {
    let name = match rule_type {
        RuleType::Stig => "stig_checklist_readiness",
        RuleType::Jsig => "jsig_checklist_readiness",
    };

    let rules = match store.list_stig_rules(&request.system_id).await {
        Ok(rules) => rules,
        Err(error) => {
            return ValidationCheck::fail(
                name,
                CheckSeverity::Error,
                format!("Could not list {rule_type} rules: {error}"),
            );
        }
    };

    let count = rules.iter().filter(|r| r.rule_type == rule_type).count();
    if count == 0 {
        ValidationCheck::fail(
            name,
            CheckSeverity::Error,
            format!("No {rule_type} rules associated with system {}", request.system_id),
        )
    } else {
        ValidationCheck::pass(name, format!("{count} {rule_type} rules available"))
    }
}

async fn poam_readiness(
    store: &dyn ComplianceStore,
    request: &GenerationRequest,
) -> ValidationCheck {
    let findings = match store.list_findings(&request.system_id).await {
        Ok(findings) => findings,
        Err(error) => {
            return ValidationCheck::fail(
                "poam_readiness",
                CheckSeverity::Error,
                format!("Could not list findings: {error}"),
            );
        }
    };

    // Zero findings is not an error: an empty POA&M is a legitimate (if
    // suspicious) outcome, so the request stays valid.
    if findings.is_empty() {
        ValidationCheck::fail(
            "poam_readiness",
            CheckSeverity::Warning,
            format!(
                "System {} has no findings; the POA&M report would be empty",
                request.system_id
            ),
        )
    } else {
        ValidationCheck::pass(
            "poam_readiness",
            format!("{} findings available", findings.len()),
        )
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use atoforge_router::ScriptedRouter;
    use atoforge_store::MemoryStore;
    use atoforge_utils::entities::{
        Finding, FindingSeverity, ImplementationStatus, RuleSeverity, SecurityControl, StigRule,
        SystemRecord,
    };
    use atoforge_utils::types::{DocumentType, GenerationRequest, TemplateOptions};

    use crate::{CheckSeverity, ValidationEngine};

    fn seeded_store() -> MemoryStore {
        let store = store_without_findings();
        store.put_findings(vec![Finding {
            id: "f-1".to_string(),
            system_id: "sys-1".to_string(),
            title: "Weak TLS configuration".to_string(),
            description: None,
            severity: FindingSeverity::High,
            control_id: Some("SC-8".to_string()),
        }]);
        store
    }

    fn store_without_findings() -> MemoryStore {
        let store = MemoryStore::new();
        store.put_system(SystemRecord {
            id: "sys-1".to_string(),
            name: "Payroll".to_string(),
            description: Some("Payroll processing".to_string()),
            owner: Some("J. Moreno".to_string()),
            organization: Some("Finance Directorate".to_string()),
            classification: Some("UNCLASSIFIED".to_string()),
        });
        store.put_controls(vec![
            SecurityControl {
                id: "c-1".to_string(),
                system_id: "sys-1".to_string(),
                control_id: "AC-2".to_string(),
                title: "Account Management".to_string(),
                implementation_status: ImplementationStatus::Implemented,
                narrative: Some("Accounts are provisioned via the IdP.".to_string()),
            },
            SecurityControl {
                id: "c-2".to_string(),
                system_id: "sys-1".to_string(),
                control_id: "AU-2".to_string(),
                title: "Audit Events".to_string(),
                implementation_status: ImplementationStatus::Implemented,
                narrative: Some("Auditd forwards to the SIEM.".to_string()),
            },
        ]);
        store.put_stig_rules(vec![StigRule {
            id: "r-1".to_string(),
            rule_type: atoforge_utils::entities::RuleType::Stig,
            stig_id: "RHEL-9-STIG".to_string(),
            rule_id: "SV-257777r925318_rule".to_string(),
            title: "Verify file permissions".to_string(),
            severity: RuleSeverity::CatII,
            check_text: None,
            fix_text: None,
        }]);
        store
    }

    fn engine(store: MemoryStore) -> ValidationEngine {
        ValidationEngine::new(Arc::new(store), Arc::new(ScriptedRouter::new()))
    }

    #[tokio::test]
    async fn valid_request_passes_all_error_checks() {
        let engine = engine(seeded_store());
        let request = GenerationRequest::new(
            "sys-1",
            vec![DocumentType::Ssp, DocumentType::StigChecklist],
        );
        let report = engine.validate_request(&request).await;
        assert!(report.valid, "errors: {:?}", report.errors);
    }

    #[tokio::test]
    async fn missing_system_is_an_error() {
        let engine = engine(seeded_store());
        let request = GenerationRequest::new("missing", vec![DocumentType::Ssp]);
        let report = engine.validate_request(&request).await;
        assert!(!report.valid);
        assert!(report.errors.iter().any(|e| e.contains("does not exist")));
    }

    #[tokio::test]
    async fn system_without_controls_is_an_error() {
        let store = MemoryStore::new();
        store.put_system(SystemRecord {
            id: "sys-2".to_string(),
            name: "Empty".to_string(),
            description: None,
            owner: Some("Owner".to_string()),
            organization: Some("Org".to_string()),
            classification: None,
        });
        let engine = engine(store);
        let request = GenerationRequest::new("sys-2", vec![DocumentType::SctmExcel]);
        let report = engine.validate_request(&request).await;
        assert!(!report.valid);
        assert!(
            report
                .errors
                .iter()
                .any(|e| e.contains("no security controls"))
        );
    }

    #[tokio::test]
    async fn zero_findings_poam_is_valid_with_warning() {
        let engine = engine(store_without_findings());
        let request = GenerationRequest::new("sys-1", vec![DocumentType::PoamReport]);
        let report = engine.validate_request(&request).await;
        assert!(report.valid);
        assert!(
            report
                .warnings
                .iter()
                .any(|w| w.contains("POA&M report would be empty"))
        );
    }

    #[tokio::test]
    async fn unavailable_router_is_an_error() {
        let router = ScriptedRouter::new();
        router.set_unavailable(true);
        let engine = ValidationEngine::new(Arc::new(seeded_store()), Arc::new(router));
        let request = GenerationRequest::new("sys-1", vec![DocumentType::SctmExcel]);
        let report = engine.validate_request(&request).await;
        assert!(!report.valid);
        assert!(
            report
                .errors
                .iter()
                .any(|e| e.contains("Model router connection failed"))
        );
        assert!(
            report
                .suggestions
                .iter()
                .any(|s| s.contains("connectivity"))
        );
    }

    #[tokio::test]
    async fn offline_store_is_an_error() {
        let store = seeded_store();
        store.set_offline(true);
        let engine = engine(store);
        let request = GenerationRequest::new("sys-1", vec![DocumentType::SctmExcel]);
        let report = engine.validate_request(&request).await;
        assert!(!report.valid);
        assert!(
            report
                .errors
                .iter()
                .any(|e| e.contains("Storage connection failed"))
        );
    }

    #[tokio::test]
    async fn jsig_checklist_without_jsig_rules_is_an_error() {
        let engine = engine(seeded_store());
        let request = GenerationRequest::new("sys-1", vec![DocumentType::JsigChecklist]);
        let report = engine.validate_request(&request).await;
        assert!(!report.valid);
        assert!(report.errors.iter().any(|e| e.contains("No jsig rules")));
    }

    #[tokio::test]
    async fn templates_without_ids_warn() {
        let engine = engine(seeded_store());
        let mut request = GenerationRequest::new("sys-1", vec![DocumentType::SctmExcel]);
        request.use_templates = true;
        request.template_options = Some(TemplateOptions::default());
        let report = engine.validate_request(&request).await;
        assert!(report.valid);
        assert!(
            report
                .warnings
                .iter()
                .any(|w| w.contains("no template id supplied"))
        );
    }

    #[tokio::test]
    async fn missing_ssp_prerequisites_are_an_error() {
        let store = seeded_store();
        store.put_system(SystemRecord {
            id: "sys-1".to_string(),
            name: "Payroll".to_string(),
            description: Some("Payroll processing".to_string()),
            owner: None,
            organization: None,
            classification: None,
        });
        let engine = engine(store);
        let request = GenerationRequest::new("sys-1", vec![DocumentType::Ssp]);
        let report = engine.validate_request(&request).await;
        assert!(!report.valid);
        assert!(
            report
                .errors
                .iter()
                .any(|e| e.contains("SSP generation requires"))
        );
    }

    #[tokio::test]
    async fn template_organization_satisfies_ssp_prerequisite() {
        let store = seeded_store();
        store.put_system(SystemRecord {
            id: "sys-1".to_string(),
            name: "Payroll".to_string(),
            description: Some("Payroll processing".to_string()),
            owner: Some("J. Moreno".to_string()),
            organization: None,
            classification: None,
        });
        let engine = engine(store);
        let mut request = GenerationRequest::new("sys-1", vec![DocumentType::Ssp]);
        let mut opts = TemplateOptions::default();
        opts.organization = Some("Finance Directorate".to_string());
        request.template_options = Some(opts);
        let report = engine.validate_request(&request).await;
        assert!(report.valid, "errors: {:?}", report.errors);
    }

    #[tokio::test]
    async fn duplicate_controls_warn() {
        let store = seeded_store();
        store.put_controls(vec![
            SecurityControl {
                id: "c-1".to_string(),
                system_id: "sys-1".to_string(),
                control_id: "AC-2".to_string(),
                title: "Account Management".to_string(),
                implementation_status: ImplementationStatus::Implemented,
                narrative: Some("n".to_string()),
            },
            SecurityControl {
                id: "c-2".to_string(),
                system_id: "sys-1".to_string(),
                control_id: "AC-2".to_string(),
                title: "Account Management (duplicate)".to_string(),
                implementation_status: ImplementationStatus::Implemented,
                narrative: Some("n".to_string()),
            },
        ]);
        let engine = engine(store);
        let request = GenerationRequest::new("sys-1", vec![DocumentType::SctmExcel]);
        let report = engine.validate_request(&request).await;
        assert!(
            report
                .warnings
                .iter()
                .any(|w| w.contains("Duplicate control rows"))
        );
        let check = report
            .checks
            .iter()
            .find(|c| c.name == "duplicate_controls")
            .unwrap();
        assert_eq!(check.severity, CheckSeverity::Warning);
    }
}
