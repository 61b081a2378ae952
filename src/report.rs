//! Output formatting for flowsift results.
//!
//! Supports two output formats:
//! - Pretty: colored terminal output for human readability
//! - JSON: structured output for programmatic consumption

use colored::*;
use serde::{Deserialize, Serialize};

use crate::rules::{Finding, RunResult, Severity};

// =============================================================================
// JSON Format
// =============================================================================

/// Top-level JSON report structure. The schema is stable; hosts parse it.
#[derive(Serialize, Deserialize)]
pub struct JsonReport {
    pub version: String,
    pub path: String,
    pub policy: String,
    pub passed: bool,
    pub units_scanned: usize,
    pub findings: Vec<JsonFinding>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suppressed: Vec<JsonFinding>,
    pub suppressed_count: usize,
}

/// JSON finding structure.
#[derive(Serialize, Deserialize)]
pub struct JsonFinding {
    pub rule: String,
    pub severity: String,
    pub path: String,
    pub line: usize,
    pub column: usize,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enclosing: Option<String>,
}

fn finding_to_json(f: &Finding) -> JsonFinding {
    JsonFinding {
        rule: f.rule.clone(),
        severity: f.severity.to_string(),
        path: f.path.clone(),
        line: f.line,
        column: f.column,
        message: f.message.clone(),
        enclosing: f.enclosing.clone(),
    }
}

/// Build the JSON report for a run.
pub fn build_json(path: &str, policy_path: &str, result: &RunResult) -> JsonReport {
    JsonReport {
        version: env!("CARGO_PKG_VERSION").to_string(),
        path: path.to_string(),
        policy: policy_path.to_string(),
        passed: !result.has_errors(),
        units_scanned: result.scanned,
        findings: result.findings.iter().map(finding_to_json).collect(),
        suppressed: result.suppressed.iter().map(finding_to_json).collect(),
        suppressed_count: result.suppressed.len(),
    }
}

/// Write results in JSON format.
pub fn write_json(path: &str, policy_path: &str, result: &RunResult) -> anyhow::Result<()> {
    let report = build_json(path, policy_path, result);
    let json = serde_json::to_string_pretty(&report)?;
    println!("{}", json);
    Ok(())
}

// =============================================================================
// Pretty Format
// =============================================================================

/// Write results in pretty (human-readable) format.
pub fn write_pretty(path: &str, policy_path: &str, result: &RunResult, show_suppressed: bool) {
    // Header
    println!();
    print!("  ");
    print!("{}", "flowsift".cyan().bold());
    println!(" v{}", env!("CARGO_PKG_VERSION"));
    println!();

    print!("  {}", "Scanning: ".dimmed());
    println!("{}", path);
    print!("  {}", "Policy:   ".dimmed());
    println!("{}", policy_path);
    println!();

    // Result summary
    if result.has_errors() {
        print!("  {}", "✗ FAIL".red());
    } else {
        print!("  {}", "✓ PASS".green());
    }
    print!(
        "  {} finding{} in {} unit{}",
        result.findings.len(),
        plural(result.findings.len()),
        result.scanned,
        plural(result.scanned),
    );
    if result.suppressed_count() > 0 {
        print!(
            "  {}",
            format!("({} suppressed)", result.suppressed_count()).dimmed()
        );
    }
    println!();
    println!();

    if !result.findings.is_empty() {
        write_findings(&result.findings);
        println!();
    }

    if show_suppressed && !result.suppressed.is_empty() {
        println!("  {} ({}):", "Suppressed".bold(), result.suppressed.len());
        println!();
        write_findings(&result.suppressed);
        println!();
    }
}

fn plural(n: usize) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}

fn write_findings(findings: &[Finding]) {
    for f in findings {
        write_severity_tag(&f.severity);
        print!("   ");
        print!("{:<16}", f.rule.dimmed());
        print!("{}", f.path.blue());
        if f.line > 0 {
            print!("{}", format!(":{}:{}", f.line, f.column).dimmed());
        }
        if let Some(enclosing) = &f.enclosing {
            print!("  {}", format!("in {}", enclosing).dimmed());
        }
        println!();

        // Message on next line, indented
        println!("            {}", f.message);
        println!();
    }
}

fn write_severity_tag(severity: &Severity) {
    match severity {
        Severity::Error => print!("    {} ", "ERROR".red()),
        Severity::Warning => print!("    {} ", "WARN ".yellow()),
        Severity::Info => print!("    {} ", "INFO ".blue()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_result() -> RunResult {
        RunResult {
            findings: vec![Finding {
                rule: "aes_key_size".to_string(),
                severity: Severity::Error,
                message: "DoFinal finalizes a block cipher keyed at an insecure key size (AES-128)"
                    .to_string(),
                path: "Crypto.cs".to_string(),
                line: 5,
                column: 1,
                enclosing: Some("Encrypt".to_string()),
            }],
            suppressed: vec![],
            scanned: 1,
        }
    }

    #[test]
    fn test_json_report_fields() {
        let report = build_json("graphs/", "flowsift.yaml", &sample_result());
        assert!(!report.version.is_empty());
        assert!(!report.passed);
        assert_eq!(report.units_scanned, 1);
        assert_eq!(report.findings.len(), 1);
        assert_eq!(report.findings[0].severity, "error");
        assert_eq!(report.findings[0].line, 5);
    }

    #[test]
    fn test_json_field_names_are_stable() {
        let report = build_json("graphs/", "flowsift.yaml", &sample_result());
        let json = serde_json::to_string(&report).unwrap();

        for field in [
            "\"version\"",
            "\"path\"",
            "\"policy\"",
            "\"passed\"",
            "\"units_scanned\"",
            "\"findings\"",
            "\"suppressed_count\"",
            "\"rule\"",
            "\"severity\"",
            "\"line\"",
            "\"column\"",
            "\"message\"",
            "\"enclosing\"",
        ] {
            assert!(json.contains(field), "missing field {}", field);
        }
    }

    #[test]
    fn test_json_roundtrip() {
        let report = build_json("graphs/", "flowsift.yaml", &sample_result());
        let json = serde_json::to_string_pretty(&report).unwrap();
        let parsed: JsonReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.findings.len(), report.findings.len());
        assert_eq!(parsed.passed, report.passed);
    }
}
