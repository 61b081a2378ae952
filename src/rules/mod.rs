//! Detection rules and the registry that hosts them.
//!
//! A rule is a pure function from query parameters to an element set,
//! composed entirely from the relational operators in `crate::query`. Rules
//! are first-class values behind the `Rule` trait and a global factory
//! registry, so a rule pack is just more registrants sharing one engine.

mod aes_key_size;
mod evaluator;
mod types;

pub use aes_key_size::{AesKeySizeConfig, AesKeySizeRule, RULE_ID as AES_KEY_SIZE};
pub use evaluator::Evaluator;
pub use types::{Finding, RunResult, Severity};

use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::EngineError;
use crate::graph::{CompilationUnit, NodeId};
use crate::query::{ElementSet, QueryContext};

/// A detection rule.
///
/// `evaluate` must be deterministic for a fixed unit/store/parameters, and
/// must treat configuration problems (wrong parameter arity or value) as an
/// empty result, never an error - a misconfigured rule degrades to "no
/// findings" rather than aborting a batch run.
pub trait Rule: Send + Sync {
    /// Stable rule id, used in policy files and reports.
    fn id(&self) -> &str;

    /// One-line description of what the rule detects.
    fn description(&self) -> &str;

    /// Default severity for findings; a policy check may override it.
    fn severity(&self) -> Severity;

    /// Run the rule, returning the sink sites it flags.
    fn evaluate(
        &self,
        cx: &QueryContext<'_>,
        params: &[String],
    ) -> Result<ElementSet, EngineError>;

    /// Message for one matched sink node.
    fn describe_match(&self, _unit: &CompilationUnit, _id: NodeId, _params: &[String]) -> String {
        self.description().to_string()
    }
}

/// Factory function type for creating rule instances.
pub type RuleFactory = fn() -> Box<dyn Rule>;

lazy_static::lazy_static! {
    /// Global rule registry mapping rule ids to factories.
    static ref REGISTRY: RwLock<HashMap<String, RuleFactory>> = RwLock::new(HashMap::new());
}

/// Register a rule factory under its id.
pub fn register(id: &str, factory: RuleFactory) {
    let mut registry = REGISTRY.write().unwrap();
    registry.insert(id.to_string(), factory);
}

/// Instantiate the rule registered under `id`, if any.
pub fn get_rule(id: &str) -> Option<Box<dyn Rule>> {
    let registry = REGISTRY.read().unwrap();
    registry.get(id).map(|factory| factory())
}

/// Whether a rule id is registered.
pub fn is_registered(id: &str) -> bool {
    let registry = REGISTRY.read().unwrap();
    registry.contains_key(id)
}

/// All registered rule ids, sorted.
pub fn registered_rules() -> Vec<String> {
    let registry = REGISTRY.read().unwrap();
    let mut ids: Vec<String> = registry.keys().cloned().collect();
    ids.sort();
    ids
}

/// Register the builtin rule pack. Call once at startup.
pub fn register_builtin() {
    register(aes_key_size::RULE_ID, || {
        Box::new(AesKeySizeRule::default())
    });
}
