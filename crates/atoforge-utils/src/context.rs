//! Per-job generation context.
//!
//! Built once after the collect-data step from the parallel fetches, then
//! passed by reference to every generation handler. Replaces the
//! loosely-typed data bag the steps would otherwise share.

use std::collections::BTreeMap;
use std::collections::HashMap;

use crate::entities::{
    ArtifactRecord, EvidenceRecord, Finding, FindingSeverity, ImplementationStatus,
    SecurityControl, StigRule, SystemRecord,
};
use crate::entities::RuleType;
use crate::mapping;
use crate::types::GenerationSummary;

/// Everything the generation handlers need, fetched up front.
#[derive(Debug, Clone)]
pub struct GenerationContext {
    pub system: SystemRecord,
    pub controls: Vec<SecurityControl>,
    pub stig_rules: Vec<StigRule>,
    pub findings: Vec<Finding>,
    pub evidence: Vec<EvidenceRecord>,
    pub artifacts: Vec<ArtifactRecord>,
    /// The static NIST to STIG mapping table.
    pub control_mapping: &'static HashMap<&'static str, &'static [&'static str]>,
}

impl GenerationContext {
    /// Assemble a context from fetched data.
    #[must_use]
    pub fn new(
        system: SystemRecord,
        controls: Vec<SecurityControl>,
        stig_rules: Vec<StigRule>,
        findings: Vec<Finding>,
        evidence: Vec<EvidenceRecord>,
        artifacts: Vec<ArtifactRecord>,
    ) -> Self {
        Self {
            system,
            controls,
            stig_rules,
            findings,
            evidence,
            artifacts,
            control_mapping: mapping::table(),
        }
    }

    /// Rules of the given catalog flavor.
    pub fn rules_of_type(&self, rule_type: RuleType) -> impl Iterator<Item = &StigRule> {
        self.stig_rules
            .iter()
            .filter(move |rule| rule.rule_type == rule_type)
    }

    /// Rules of a flavor grouped by `stig_id`, in deterministic order.
    ///
    /// One checklist is generated per group.
    #[must_use]
    pub fn rules_by_stig_id(&self, rule_type: RuleType) -> BTreeMap<String, Vec<&StigRule>> {
        let mut groups: BTreeMap<String, Vec<&StigRule>> = BTreeMap::new();
        for rule in self.rules_of_type(rule_type) {
            groups.entry(rule.stig_id.clone()).or_default().push(rule);
        }
        groups
    }

    /// Summary counters computed from the context's current data.
    #[must_use]
    pub fn summary(&self) -> GenerationSummary {
        GenerationSummary {
            total_controls: self.controls.len(),
            implemented_controls: self
                .controls
                .iter()
                .filter(|c| c.implementation_status == ImplementationStatus::Implemented)
                .count(),
            findings: self.findings.len(),
            critical_findings: self
                .findings
                .iter()
                .filter(|f| f.severity == FindingSeverity::Critical)
                .count(),
            evidence: self.evidence.len(),
            artifacts: self.artifacts.len(),
        }
    }
}
