//! Policy schema definitions for flowsift.
//!
//! A policy defines which rule checks run against a batch of unit graphs,
//! with what parameters and severities, and carries per-rule settings such
//! as the AES key-size thresholds. Threshold choices live here, as data,
//! rather than in the engine.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::rules::{self, AesKeySizeConfig, AesKeySizeRule, Rule, Severity};

/// Embedded starter templates, also used by `flowsift init`.
pub const DEFAULT_TEMPLATE: &str = include_str!("templates/default.yaml");
pub const AUDIT_TEMPLATE: &str = include_str!("templates/audit.yaml");

static DEFAULT_POLICY: Lazy<Policy> = Lazy::new(|| {
    serde_yaml::from_str(DEFAULT_TEMPLATE).expect("embedded default policy template is valid")
});

/// Top-level policy definition.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Policy {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Glob patterns for unit paths to exclude from evaluation
    /// (e.g. "**/testdata/**").
    #[serde(default)]
    pub excluded_paths: Vec<String>,
    /// Rule invocations to run against every unit.
    #[serde(default)]
    pub checks: Vec<CheckSpec>,
    /// Per-rule settings.
    #[serde(default)]
    pub rules: RuleSettings,
    /// Findings to drop after evaluation.
    #[serde(default)]
    pub suppressions: Vec<Suppression>,
}

impl Policy {
    /// Parse a policy from a YAML file.
    pub fn parse_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let policy: Policy = serde_yaml::from_str(&content)?;
        Ok(policy)
    }

    /// The embedded default policy (insecure-key check at error severity).
    pub fn default_template() -> Self {
        DEFAULT_POLICY.clone()
    }

    /// Check if a unit path should be excluded based on excluded_paths
    /// patterns. Uses globset, which supports `**` for recursive matching.
    pub fn is_path_excluded(&self, path: &Path) -> bool {
        if self.excluded_paths.is_empty() {
            return false;
        }

        let path_str = path.to_string_lossy();

        for pattern in &self.excluded_paths {
            if let Ok(glob) = globset::Glob::new(pattern) {
                let matcher = glob.compile_matcher();
                if matcher.is_match(&*path_str) {
                    return true;
                }
            }
        }
        false
    }

    /// Instantiate the rule for a check, applying this policy's settings.
    pub fn instantiate(&self, rule_id: &str) -> Option<Box<dyn Rule>> {
        if rule_id == rules::AES_KEY_SIZE {
            return Some(Box::new(AesKeySizeRule::new(self.rules.aes_key_size.clone())));
        }
        rules::get_rule(rule_id)
    }

    /// Check if a finding matches one of the suppressions.
    pub fn is_suppressed(&self, finding: &crate::rules::Finding) -> bool {
        for s in &self.suppressions {
            if let Some(rule) = &s.rule {
                if rule != &finding.rule {
                    continue;
                }
            }
            if let Ok(re) = regex::Regex::new(&s.pattern) {
                if re.is_match(&finding.path)
                    || finding
                        .enclosing
                        .as_deref()
                        .map(|e| re.is_match(e))
                        .unwrap_or(false)
                {
                    return true;
                }
            }
        }
        false
    }
}

/// One rule invocation: id, positional parameters, optional severity
/// override.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CheckSpec {
    pub rule: String,
    #[serde(default)]
    pub params: Vec<String>,
    #[serde(default)]
    pub severity: Option<String>,
}

impl CheckSpec {
    /// The severity override, parsed; None when unset.
    pub fn severity_override(&self) -> Option<Severity> {
        self.severity.as_deref().and_then(|s| s.parse().ok())
    }
}

/// Per-rule configuration blocks.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct RuleSettings {
    #[serde(default)]
    pub aes_key_size: AesKeySizeConfig,
}

/// A suppression: drop findings whose path or enclosing declaration matches
/// the regex, optionally limited to one rule.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Suppression {
    /// Rule id this applies to; all rules when unset.
    #[serde(default)]
    pub rule: Option<String>,
    pub pattern: String,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Validate a policy for correctness.
pub fn validate(policy: &Policy) -> anyhow::Result<()> {
    // Every check must name a known rule.
    for check in &policy.checks {
        if policy.instantiate(&check.rule).is_none() {
            anyhow::bail!("check references unknown rule {:?}", check.rule);
        }
        if let Some(sev) = &check.severity {
            sev.parse::<Severity>()
                .map_err(|e| anyhow::anyhow!("check for rule {:?}: {}", check.rule, e))?;
        }
    }

    // Validate suppression regexes compile.
    for s in &policy.suppressions {
        regex::Regex::new(&s.pattern)
            .map_err(|e| anyhow::anyhow!("invalid suppression pattern {:?}: {}", s.pattern, e))?;
    }

    // Validate excluded_paths glob patterns compile.
    for pattern in &policy.excluded_paths {
        globset::Glob::new(pattern)
            .map_err(|e| anyhow::anyhow!("invalid excluded_paths pattern {:?}: {}", pattern, e))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::Finding;

    #[test]
    fn test_parse_policy() {
        let yaml = r#"
version: "1"
name: "Crypto Policy"
checks:
  - rule: aes_key_size
    params: ["Insecure"]
    severity: error
rules:
  aes_key_size:
    insecure_sizes: [16, 8]
"#;
        let policy: Policy = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(policy.name, "Crypto Policy");
        assert_eq!(policy.checks.len(), 1);
        assert_eq!(policy.checks[0].params, vec!["Insecure"]);
        assert_eq!(policy.rules.aes_key_size.insecure_sizes, vec![16, 8]);
        // Unset fields fall back to rule defaults.
        assert_eq!(policy.rules.aes_key_size.secure_sizes, vec![24, 32]);
    }

    #[test]
    fn test_default_template_parses_and_validates() {
        let policy = Policy::default_template();
        assert!(!policy.checks.is_empty());
        validate(&policy).unwrap();

        let audit: Policy = serde_yaml::from_str(AUDIT_TEMPLATE).unwrap();
        validate(&audit).unwrap();
        assert_eq!(audit.checks.len(), 2);
    }

    #[test]
    fn test_validate_rejects_unknown_rule() {
        let yaml = r#"
checks:
  - rule: no_such_rule
"#;
        let policy: Policy = serde_yaml::from_str(yaml).unwrap();
        assert!(validate(&policy).is_err());
    }

    #[test]
    fn test_validate_rejects_bad_patterns() {
        let bad_suppression: Policy = serde_yaml::from_str(
            r#"
suppressions:
  - pattern: "["
"#,
        )
        .unwrap();
        assert!(validate(&bad_suppression).is_err());

        let bad_glob: Policy = serde_yaml::from_str(
            r#"
excluded_paths:
  - "a{"
"#,
        )
        .unwrap();
        assert!(validate(&bad_glob).is_err());
    }

    #[test]
    fn test_path_exclusion() {
        let policy: Policy = serde_yaml::from_str(
            r#"
excluded_paths:
  - "**/testdata/**"
"#,
        )
        .unwrap();
        assert!(policy.is_path_excluded(Path::new("pkg/testdata/unit.json")));
        assert!(!policy.is_path_excluded(Path::new("pkg/src/unit.json")));
    }

    #[test]
    fn test_suppression_matching() {
        let policy: Policy = serde_yaml::from_str(
            r#"
suppressions:
  - rule: aes_key_size
    pattern: "Legacy"
    reason: "grandfathered"
"#,
        )
        .unwrap();
        let finding = |path: &str, rule: &str| Finding {
            rule: rule.to_string(),
            severity: Severity::Error,
            message: String::new(),
            path: path.to_string(),
            line: 1,
            column: 1,
            enclosing: None,
        };
        assert!(policy.is_suppressed(&finding("LegacyCrypto.cs", "aes_key_size")));
        assert!(!policy.is_suppressed(&finding("Crypto.cs", "aes_key_size")));
        assert!(!policy.is_suppressed(&finding("LegacyCrypto.cs", "other_rule")));
    }

    #[test]
    fn test_instantiate_applies_settings() {
        let yaml = r#"
rules:
  aes_key_size:
    sink_members: ["DoFinal", "ProcessBlock"]
"#;
        let policy: Policy = serde_yaml::from_str(yaml).unwrap();
        let rule = policy.instantiate("aes_key_size").unwrap();
        assert_eq!(rule.id(), "aes_key_size");
    }
}
