//! Core types for rule findings.

use serde::{Deserialize, Serialize};

/// Severity levels for findings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "error" => Ok(Severity::Error),
            "warning" => Ok(Severity::Warning),
            "info" => Ok(Severity::Info),
            _ => Err(format!("unknown severity: {}", s)),
        }
    }
}

/// A single reported sink site.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    /// Id of the rule that produced this finding.
    pub rule: String,
    pub severity: Severity,
    pub message: String,
    /// Source path of the unit the sink lives in.
    pub path: String,
    pub line: usize,
    pub column: usize,
    /// Name of the nearest enclosing declaration, when there is one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enclosing: Option<String>,
}

impl Finding {
    /// A stable key for deduplication and suppression matching.
    pub fn key(&self) -> String {
        format!("{}|{}|{}:{}", self.rule, self.path, self.line, self.column)
    }
}

/// Aggregate result of running a policy's checks over a batch of units.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunResult {
    pub findings: Vec<Finding>,
    /// Findings dropped by policy suppressions.
    #[serde(default)]
    pub suppressed: Vec<Finding>,
    /// Number of units evaluated.
    pub scanned: usize,
}

impl RunResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge another result into this one.
    pub fn merge(&mut self, other: RunResult) {
        self.findings.extend(other.findings);
        self.suppressed.extend(other.suppressed);
        self.scanned += other.scanned;
    }

    pub fn add_finding(&mut self, finding: Finding) {
        self.findings.push(finding);
    }

    /// Check if there are any error-severity findings.
    pub fn has_errors(&self) -> bool {
        self.findings.iter().any(|f| f.severity == Severity::Error)
    }

    pub fn suppressed_count(&self) -> usize {
        self.suppressed.len()
    }
}
