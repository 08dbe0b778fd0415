//! STIG/JSIG checklist content assembly.
//!
//! Checklist content is always well-formed: when the model call fails, the
//! checklist is assembled from rule data alone and marked degraded. Router
//! errors never propagate out of this module.

use chrono::Utc;
use serde_json::Value;
use tracing::warn;

use atoforge_router::{ChatMessage, GenerateOptions, ModelRouter};
use atoforge_utils::entities::{
    ChecklistContent, ChecklistFinding, ChecklistMetadata, StigRule,
};

/// Generate the content for one checklist (one `stig_id` group of rules).
///
/// The model is asked for remediation recommendations and per-rule
/// commentary. Every finding starts as `Open` regardless; assessors close
/// them out of band. On any router failure the checklist degrades to rule
/// data plus canned recommendations.
pub async fn generate_checklist_content(
    router: &dyn ModelRouter,
    opts: &GenerateOptions,
    system_name: &str,
    stig_id: &str,
    rules: &[&StigRule],
) -> ChecklistContent {
    let (recommendations, comments, degraded) =
        match router.generate_json(&checklist_prompt(system_name, stig_id, rules), opts).await {
            Ok(value) => {
                let recommendations = parse_recommendations(&value);
                let comments = value.get("comments").cloned();
                (recommendations, comments, false)
            }
            Err(error) => {
                warn!(
                    stig_id = %stig_id,
                    error = %error,
                    "Checklist content generation failed, assembling degraded checklist"
                );
                (Vec::new(), None, true)
            }
        };

    let recommendations = if recommendations.is_empty() {
        default_recommendations(stig_id)
    } else {
        recommendations
    };

    let findings = rules
        .iter()
        .map(|rule| ChecklistFinding {
            rule_id: rule.rule_id.clone(),
            title: rule.title.clone(),
            severity: rule.severity,
            status: "Open".to_string(),
            comments: comments
                .as_ref()
                .and_then(|c| c.get(&rule.rule_id))
                .and_then(Value::as_str)
                .map(String::from),
        })
        .collect();

    ChecklistContent {
        checklist_metadata: ChecklistMetadata {
            stig_id: stig_id.to_string(),
            system_name: system_name.to_string(),
            rule_count: rules.len(),
            generated_at: Utc::now(),
            degraded,
        },
        findings,
        recommendations,
    }
}

fn checklist_prompt(system_name: &str, stig_id: &str, rules: &[&StigRule]) -> Vec<ChatMessage> {
    let rule_lines: Vec<String> = rules
        .iter()
        .map(|rule| format!("- {} ({}): {}", rule.rule_id, rule.severity, rule.title))
        .collect();
    vec![
        ChatMessage::system(
            "You assist with DoD compliance checklists. Respond with a JSON object \
             containing a \"recommendations\" array of strings and an optional \
             \"comments\" object keyed by rule id.",
        ),
        ChatMessage::user(format!(
            "System: {system_name}\nBenchmark: {stig_id}\nRules:\n{}",
            rule_lines.join("\n")
        )),
    ]
}

fn parse_recommendations(value: &Value) -> Vec<String> {
    value
        .get("recommendations")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}

fn default_recommendations(stig_id: &str) -> Vec<String> {
    vec![
        format!("Review all open {stig_id} findings with the system administrator"),
        "Apply vendor fix text for CAT I findings before the next assessment".to_string(),
        "Document deviations with an approved risk acceptance".to_string(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use atoforge_router::ScriptedRouter;
    use atoforge_utils::entities::{RuleSeverity, RuleType};
    use atoforge_utils::error::RouterError;
    use serde_json::json;

    fn rule(id: &str) -> StigRule {
        StigRule {
            id: id.to_string(),
            rule_type: RuleType::Stig,
            stig_id: "RHEL-9-STIG".to_string(),
            rule_id: format!("SV-{id}_rule"),
            title: format!("Rule {id}"),
            severity: RuleSeverity::CatII,
            check_text: None,
            fix_text: None,
        }
    }

    #[tokio::test]
    async fn router_failure_yields_degraded_but_well_formed_content() {
        let router = ScriptedRouter::new();
        router.push_error(RouterError::Timeout { seconds: 5 });
        let rules = [rule("1"), rule("2"), rule("3")];
        let refs: Vec<&StigRule> = rules.iter().collect();

        let content = generate_checklist_content(
            &router,
            &GenerateOptions::default(),
            "Payroll",
            "RHEL-9-STIG",
            &refs,
        )
        .await;

        assert!(content.checklist_metadata.degraded);
        assert_eq!(content.checklist_metadata.rule_count, 3);
        assert_eq!(content.findings.len(), 3);
        assert!(content.findings.iter().all(|f| f.status == "Open"));
        assert!(!content.recommendations.is_empty());
    }

    #[tokio::test]
    async fn model_recommendations_and_comments_are_used() {
        let router = ScriptedRouter::new();
        router.push_json(json!({
            "recommendations": ["Patch the kernel"],
            "comments": { "SV-1_rule": "Mitigated by network segmentation" }
        }));
        let rules = [rule("1")];
        let refs: Vec<&StigRule> = rules.iter().collect();

        let content = generate_checklist_content(
            &router,
            &GenerateOptions::default(),
            "Payroll",
            "RHEL-9-STIG",
            &refs,
        )
        .await;

        assert!(!content.checklist_metadata.degraded);
        assert_eq!(content.recommendations, vec!["Patch the kernel"]);
        assert_eq!(
            content.findings[0].comments.as_deref(),
            Some("Mitigated by network segmentation")
        );
        assert_eq!(content.findings[0].status, "Open");
    }

    #[tokio::test]
    async fn empty_model_output_falls_back_to_default_recommendations() {
        let router = ScriptedRouter::new();
        router.push_json(json!({}));
        let rules = [rule("1")];
        let refs: Vec<&StigRule> = rules.iter().collect();

        let content = generate_checklist_content(
            &router,
            &GenerateOptions::default(),
            "Payroll",
            "RHEL-9-STIG",
            &refs,
        )
        .await;

        assert!(!content.checklist_metadata.degraded);
        assert!(!content.recommendations.is_empty());
    }
}
