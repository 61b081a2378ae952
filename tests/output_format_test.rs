//! Tests for the JSON output format.
//!
//! The JSON report schema is consumed programmatically by host drivers, so
//! its field names and shapes are pinned here.

use std::path::PathBuf;

use flowsift::graph::CompilationUnit;
use flowsift::report::{build_json, JsonReport};
use flowsift::rules::{AesKeySizeRule, Evaluator, RunResult};

fn testdata_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("testdata")
}

/// Evaluate the insecure fixture and build its JSON report.
fn run_and_get_json() -> JsonReport {
    flowsift::init();

    let unit = CompilationUnit::from_json_file(testdata_path().join("cbc_aes128.json"))
        .expect("fixture should load");
    let evaluator = Evaluator::new(unit);
    let rule = AesKeySizeRule::default();

    let mut result = RunResult::new();
    result.scanned = 1;
    result.findings = evaluator
        .findings(&rule, &["Insecure".to_string()])
        .expect("evaluation should succeed");

    build_json("testdata", "testdata/test-policy.yaml", &result)
}

#[test]
fn test_json_report_structure() {
    let report = run_and_get_json();

    assert!(!report.version.is_empty(), "version should not be empty");
    assert_eq!(report.path, "testdata");
    assert_eq!(report.policy, "testdata/test-policy.yaml");
    assert_eq!(report.units_scanned, 1);
    assert!(!report.passed, "error findings should fail the run");
}

#[test]
fn test_json_findings_format() {
    let report = run_and_get_json();

    assert_eq!(report.findings.len(), 1);
    for f in &report.findings {
        assert_eq!(f.rule, "aes_key_size");
        assert!(
            f.severity == "error" || f.severity == "warning" || f.severity == "info",
            "severity should be error/warning/info, got {}",
            f.severity
        );
        assert!(!f.path.is_empty(), "path should not be empty");
        assert!(f.line > 0, "line should be positive");
        assert!(!f.message.is_empty(), "message should not be empty");
    }
}

#[test]
fn test_json_serialization_roundtrip() {
    let report = run_and_get_json();

    let json = serde_json::to_string_pretty(&report).expect("should serialize to JSON");
    let parsed: JsonReport = serde_json::from_str(&json).expect("should deserialize from JSON");

    assert_eq!(parsed.findings.len(), report.findings.len());
    assert_eq!(parsed.passed, report.passed);
    assert_eq!(parsed.units_scanned, report.units_scanned);
}

#[test]
fn test_json_field_names_are_stable() {
    let report = run_and_get_json();
    let json = serde_json::to_string(&report).expect("should serialize");

    assert!(json.contains("\"version\""), "should have 'version' field");
    assert!(json.contains("\"path\""), "should have 'path' field");
    assert!(json.contains("\"policy\""), "should have 'policy' field");
    assert!(json.contains("\"passed\""), "should have 'passed' field");
    assert!(
        json.contains("\"units_scanned\""),
        "should have 'units_scanned' field"
    );
    assert!(json.contains("\"findings\""), "should have 'findings' field");
    assert!(
        json.contains("\"suppressed_count\""),
        "should have 'suppressed_count' field"
    );

    // Finding fields
    assert!(json.contains("\"rule\""), "findings should have 'rule' field");
    assert!(
        json.contains("\"severity\""),
        "findings should have 'severity' field"
    );
    assert!(json.contains("\"line\""), "findings should have 'line' field");
    assert!(
        json.contains("\"column\""),
        "findings should have 'column' field"
    );
    assert!(
        json.contains("\"message\""),
        "findings should have 'message' field"
    );
}

#[test]
fn test_json_empty_run_passes() {
    let result = RunResult::new();
    let report = build_json("graphs", "flowsift.yaml", &result);
    assert!(report.passed);
    assert!(report.findings.is_empty());
    assert_eq!(report.suppressed_count, 0);

    // Empty suppressed list is omitted from the serialized form.
    let json = serde_json::to_string(&report).unwrap();
    assert!(!json.contains("\"suppressed\":["));
}
