//! Static NIST control to STIG rule-family mapping table.
//!
//! Fetched alongside system data during the collect-data step. The table is
//! compiled in; it changes only with catalog revisions, not per deployment.

use once_cell::sync::Lazy;
use std::collections::HashMap;

/// NIST 800-53 control families mapped to the STIG rule-title keywords that
/// commonly implement them. Keys are control identifiers (`AC-2`), values
/// are keyword groups used to relate rules back to controls.
static NIST_STIG_MAP: Lazy<HashMap<&'static str, &'static [&'static str]>> = Lazy::new(|| {
    let mut map: HashMap<&'static str, &'static [&'static str]> = HashMap::new();
    map.insert("AC-2", &["account", "user management", "access enforcement"]);
    map.insert("AC-3", &["access enforcement", "permission", "dac"]);
    map.insert("AC-7", &["logon attempts", "lockout"]);
    map.insert("AC-11", &["session lock", "screen lock"]);
    map.insert("AU-2", &["audit", "event logging"]);
    map.insert("AU-9", &["audit protection", "log permissions"]);
    map.insert("CM-6", &["configuration settings", "baseline"]);
    map.insert("CM-7", &["least functionality", "disable service"]);
    map.insert("IA-2", &["multifactor", "identification", "authentication"]);
    map.insert("IA-5", &["password", "authenticator", "pki"]);
    map.insert("SC-8", &["transmission", "tls", "encryption in transit"]);
    map.insert("SC-28", &["at rest", "disk encryption"]);
    map.insert("SI-2", &["flaw remediation", "patch", "update"]);
    map.insert("SI-4", &["monitoring", "intrusion detection"]);
    map
});

/// The full mapping table.
#[must_use]
pub fn table() -> &'static HashMap<&'static str, &'static [&'static str]> {
    &NIST_STIG_MAP
}

/// Rule-title keywords associated with a control, or an empty slice for
/// controls without a mapping.
#[must_use]
pub fn keywords_for_control(control_id: &str) -> &'static [&'static str] {
    NIST_STIG_MAP.get(control_id).copied().unwrap_or(&[])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_control_has_keywords() {
        assert!(!keywords_for_control("AC-2").is_empty());
    }

    #[test]
    fn unknown_control_yields_empty_slice() {
        assert!(keywords_for_control("XX-99").is_empty());
    }

    #[test]
    fn table_is_nonempty() {
        assert!(table().len() >= 10);
    }
}
