//! Command-line interface for flowsift.

use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::graph::CompilationUnit;
use crate::policy::{self, CheckSpec, Policy};
use crate::report;
use crate::rules::{self, Evaluator, RunResult};

/// Exit codes.
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILED: i32 = 1;
pub const EXIT_ERROR: i32 = 2;

/// Default policy file names to search for.
const DEFAULT_POLICY_NAMES: &[&str] = &["flowsift.yaml", ".flowsift.yaml"];

/// Structural code query engine - run detection rules against program graphs.
///
/// Flowsift evaluates security detection rules against serialized program
/// graphs produced by an external front-end. Rules are set-algebra queries
/// over a typed element graph plus an abstract-value analysis; the shipped
/// rule pack flags block ciphers keyed at flagged AES key sizes.
#[derive(Parser)]
#[command(name = "flowsift")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run policy checks against unit graphs
    #[command(visible_alias = "run")]
    Query(QueryArgs),
    /// List registered rules
    Rules,
    /// Create a new flowsift policy from a template
    Init(InitArgs),
}

/// Arguments for the query command.
#[derive(Parser)]
pub struct QueryArgs {
    /// Path to a unit graph JSON file, or a directory of them
    pub path: PathBuf,

    /// Path to policy YAML file (default: auto-discover)
    #[arg(short, long)]
    pub policy: Option<PathBuf>,

    /// Output format: pretty or json
    #[arg(short, long, default_value = "pretty")]
    pub format: String,

    /// Run a single rule instead of the policy's checks
    #[arg(short, long)]
    pub rule: Option<String>,

    /// Positional parameters for --rule (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub params: Vec<String>,

    /// Show suppressed findings in output
    #[arg(long)]
    pub show_suppressed: bool,
}

/// Arguments for the init command.
#[derive(Parser)]
pub struct InitArgs {
    /// Output file path
    #[arg(short, long, default_value = "flowsift.yaml")]
    pub output: PathBuf,

    /// Template to use
    #[arg(short, long, default_value = "default")]
    pub template: String,

    /// List available templates
    #[arg(short, long)]
    pub list: bool,
}

/// Available policy templates.
struct Template {
    name: &'static str,
    description: &'static str,
    content: &'static str,
}

/// All available templates.
static TEMPLATES: &[Template] = &[
    Template {
        name: "default",
        description: "Flag block ciphers finalized with an insecure AES key size",
        content: policy::DEFAULT_TEMPLATE,
    },
    Template {
        name: "audit",
        description: "Inventory both secure and insecure AES key usage",
        content: policy::AUDIT_TEMPLATE,
    },
];

/// Discover a policy file in the current directory.
fn discover_policy() -> Option<PathBuf> {
    DEFAULT_POLICY_NAMES
        .iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
}

/// Collect unit graph files under a directory.
fn collect_units(root: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            let name = e.file_name().to_string_lossy();
            // Skip hidden directories
            !(e.file_type().is_dir() && name.starts_with('.'))
        })
    {
        let entry = entry?;
        if entry.file_type().is_file() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                files.push(path.to_path_buf());
            }
        }
    }

    Ok(files)
}

/// Evaluate one unit graph against the policy's checks.
fn evaluate_unit(path: &Path, policy: &Policy, checks: &[CheckSpec]) -> anyhow::Result<RunResult> {
    let unit = CompilationUnit::from_json_file(path)?;
    let evaluator = Evaluator::new(unit);

    let mut result = RunResult::new();
    result.scanned = 1;

    for check in checks {
        let Some(rule) = policy.instantiate(&check.rule) else {
            // Unknown rule in an ad-hoc invocation; validation catches the
            // policy-file case before we get here.
            anyhow::bail!("unknown rule {:?}", check.rule);
        };
        let mut findings = evaluator.findings(rule.as_ref(), &check.params)?;
        if let Some(severity) = check.severity_override() {
            for f in &mut findings {
                f.severity = severity;
            }
        }
        result.findings.extend(findings);
    }

    Ok(result)
}

/// Run the query command.
pub fn run_query(args: &QueryArgs) -> anyhow::Result<i32> {
    crate::init();

    // Validate format
    if args.format != "pretty" && args.format != "json" {
        eprintln!(
            "Error: invalid format {:?}, must be 'pretty' or 'json'",
            args.format
        );
        return Ok(EXIT_ERROR);
    }

    // Resolve the policy: an explicit path, a discovered file, or - for
    // ad-hoc --rule runs only - the embedded default.
    let (policy, policy_path_str) = match &args.policy {
        Some(p) => (Policy::parse_file(p)?, p.to_string_lossy().to_string()),
        None => match discover_policy() {
            Some(p) => (Policy::parse_file(&p)?, p.to_string_lossy().to_string()),
            None if args.rule.is_some() => {
                (Policy::default_template(), "<builtin>".to_string())
            }
            None => {
                eprintln!(
                    "Error: no policy file found (looked for {})",
                    DEFAULT_POLICY_NAMES.join(", ")
                );
                eprintln!("Run 'flowsift init' to create one, or pass --rule for an ad-hoc run");
                return Ok(EXIT_ERROR);
            }
        },
    };

    if let Err(e) = policy::validate(&policy) {
        eprintln!("Error: invalid policy: {}", e);
        return Ok(EXIT_ERROR);
    }

    // An ad-hoc rule replaces the policy's check list.
    let checks: Vec<CheckSpec> = match &args.rule {
        Some(rule) => vec![CheckSpec {
            rule: rule.clone(),
            params: args.params.clone(),
            severity: None,
        }],
        None => policy.checks.clone(),
    };
    if checks.is_empty() {
        eprintln!("Warning: policy has no checks");
    }
    for check in &checks {
        if policy.instantiate(&check.rule).is_none() {
            eprintln!("Error: unknown rule {:?}", check.rule);
            eprintln!("Run 'flowsift rules' to list registered rules");
            return Ok(EXIT_ERROR);
        }
    }

    // Collect unit graphs
    let metadata = match std::fs::metadata(&args.path) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("Error: cannot access path {:?}: {}", args.path, e);
            return Ok(EXIT_ERROR);
        }
    };

    let units: Vec<PathBuf> = if metadata.is_dir() {
        collect_units(&args.path)?
            .into_iter()
            .filter(|p| !policy.is_path_excluded(p))
            .collect()
    } else {
        vec![args.path.clone()]
    };

    if units.is_empty() {
        eprintln!("Warning: no unit graphs to evaluate");
        return Ok(EXIT_SUCCESS);
    }

    // Evaluate units in parallel. Each unit gets its own evaluator; nothing
    // is shared mutably, so ordering of completion does not matter and the
    // collected Vec preserves input order for deterministic output.
    let progress = if args.format == "pretty" && units.len() > 1 {
        let bar = ProgressBar::new(units.len() as u64);
        bar.set_style(
            ProgressStyle::with_template("  evaluating {pos}/{len} {bar:30}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        Some(bar)
    } else {
        None
    };

    let unit_results: Vec<anyhow::Result<RunResult>> = units
        .par_iter()
        .map(|path| {
            let result = evaluate_unit(path, &policy, &checks);
            if let Some(bar) = &progress {
                bar.inc(1);
            }
            result
        })
        .collect();

    if let Some(bar) = progress {
        bar.finish_and_clear();
    }

    let mut result = RunResult::new();
    for (path, unit_result) in units.iter().zip(unit_results) {
        match unit_result {
            Ok(r) => result.merge(r),
            Err(e) => {
                // A broken graph file is skipped, not fatal to the batch.
                eprintln!("Warning: skipping {}: {}", path.display(), e);
            }
        }
    }

    // Apply suppressions
    if !policy.suppressions.is_empty() {
        let (suppressed, active): (Vec<_>, Vec<_>) = result
            .findings
            .into_iter()
            .partition(|f| policy.is_suppressed(f));
        result.findings = active;
        result.suppressed = suppressed;
    }

    // Output results
    let path_str = args.path.to_string_lossy().to_string();
    match args.format.as_str() {
        "json" => report::write_json(&path_str, &policy_path_str, &result)?,
        _ => report::write_pretty(&path_str, &policy_path_str, &result, args.show_suppressed),
    }

    if result.has_errors() {
        Ok(EXIT_FAILED)
    } else {
        Ok(EXIT_SUCCESS)
    }
}

/// Run the rules command.
pub fn run_rules() -> anyhow::Result<i32> {
    crate::init();

    println!("Registered rules:");
    println!();
    for id in rules::registered_rules() {
        let description = rules::get_rule(&id)
            .map(|r| r.description().to_string())
            .unwrap_or_default();
        println!("  {:<20} {}", id, description);
    }
    println!();
    println!("Usage:");
    println!("  flowsift query <path> --rule <id> --params Insecure");

    Ok(EXIT_SUCCESS)
}

/// Run the init command.
pub fn run_init(args: &InitArgs) -> anyhow::Result<i32> {
    // List mode
    if args.list {
        return list_templates();
    }

    // Find template
    let template = match TEMPLATES.iter().find(|t| t.name == args.template) {
        Some(t) => t,
        None => {
            eprintln!("Error: unknown template {:?}", args.template);
            eprintln!("Run 'flowsift init --list' to see available templates");
            return Ok(EXIT_ERROR);
        }
    };

    // Check if output already exists
    if args.output.exists() {
        eprintln!("Error: file already exists: {}", args.output.display());
        eprintln!("Remove it or use --output to specify a different path");
        return Ok(EXIT_ERROR);
    }

    // Create output directory if needed
    if let Some(parent) = args.output.parent() {
        if !parent.as_os_str().is_empty() && parent != Path::new(".") {
            if let Err(e) = std::fs::create_dir_all(parent) {
                eprintln!("Error: failed to create directory: {}", e);
                return Ok(EXIT_ERROR);
            }
        }
    }

    // Write policy file
    if let Err(e) = std::fs::write(&args.output, template.content) {
        eprintln!("Error: failed to write policy: {}", e);
        return Ok(EXIT_ERROR);
    }

    println!(
        "Created {} from template '{}'",
        args.output.display(),
        template.name
    );
    println!();
    println!("Next steps:");
    println!("  1. Edit {} to customize the checks", args.output.display());
    println!(
        "  2. Run: flowsift query <graphs> --policy {}",
        args.output.display()
    );

    Ok(EXIT_SUCCESS)
}

/// List available templates.
fn list_templates() -> anyhow::Result<i32> {
    println!("Available templates:");
    println!();

    for template in TEMPLATES {
        let name = if template.name == "default" {
            format!("{} (default)", template.name)
        } else {
            template.name.to_string()
        };
        println!("  {:<20} {}", name, template.description);
    }

    println!();
    println!("Usage:");
    println!("  flowsift init --template <name>");

    Ok(EXIT_SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_collect_units_finds_json_only() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a.json"), "{}").unwrap();
        fs::write(temp.path().join("b.txt"), "").unwrap();
        fs::create_dir(temp.path().join(".hidden")).unwrap();
        fs::write(temp.path().join(".hidden").join("c.json"), "{}").unwrap();

        let units = collect_units(temp.path()).unwrap();
        assert_eq!(units.len(), 1);
        assert!(units[0].ends_with("a.json"));
    }

    #[test]
    fn test_collect_units_is_sorted() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("b.json"), "{}").unwrap();
        fs::write(temp.path().join("a.json"), "{}").unwrap();

        let units = collect_units(temp.path()).unwrap();
        let names: Vec<_> = units
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.json", "b.json"]);
    }
}
