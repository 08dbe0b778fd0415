//! POA&M item assembly.

use chrono::{Duration, Utc};
use uuid::Uuid;

use atoforge_utils::entities::{Finding, FindingSeverity, PoamItem};

/// Build one POA&M item per finding.
///
/// Remediation windows and milestones are derived from severity. Zero
/// findings is a legitimate outcome that produces no items.
pub(crate) fn build_poam_items(system_id: &str, job_id: &str, findings: &[Finding]) -> Vec<PoamItem> {
    let now = Utc::now();
    findings
        .iter()
        .map(|finding| PoamItem {
            id: Uuid::new_v4().to_string(),
            system_id: system_id.to_string(),
            job_id: Some(job_id.to_string()),
            finding_id: finding.id.clone(),
            weakness: finding.title.clone(),
            severity: finding.severity,
            status: "Open".to_string(),
            scheduled_completion: now + remediation_window(finding.severity),
            milestones: milestones_for(finding.severity),
            created_at: now,
        })
        .collect()
}

fn remediation_window(severity: FindingSeverity) -> Duration {
    match severity {
        FindingSeverity::Critical => Duration::days(30),
        FindingSeverity::High => Duration::days(90),
        FindingSeverity::Medium => Duration::days(180),
        FindingSeverity::Low | FindingSeverity::Informational => Duration::days(365),
    }
}

fn milestones_for(severity: FindingSeverity) -> Vec<String> {
    match severity {
        FindingSeverity::Critical => vec![
            "Identify remediation owner within 5 days".to_string(),
            "Apply fix or compensating control within 30 days".to_string(),
        ],
        FindingSeverity::High => vec![
            "Develop remediation plan within 30 days".to_string(),
            "Complete remediation within 90 days".to_string(),
        ],
        _ => vec![
            "Assess impact and schedule remediation".to_string(),
            "Verify closure at the next assessment cycle".to_string(),
        ],
    }
}
