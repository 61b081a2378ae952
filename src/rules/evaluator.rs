//! Rule evaluation against one compilation unit.

use crate::absint::AbstractValueStore;
use crate::error::EngineError;
use crate::graph::CompilationUnit;
use crate::query::{CancellationToken, ElementSet, QueryContext};
use crate::rules::{self, Finding, Rule};

/// Owns one unit and its computed abstract value store, and runs rules
/// against them.
///
/// The store is computed in `new`, before any query can run; evaluation
/// itself is read-only, so one evaluator can serve any number of rules,
/// concurrently, with no shared mutable state.
pub struct Evaluator {
    unit: CompilationUnit,
    store: AbstractValueStore,
    cancel: CancellationToken,
}

impl Evaluator {
    /// Build an evaluator, computing the abstract value store.
    pub fn new(unit: CompilationUnit) -> Self {
        Self::with_cancellation(unit, CancellationToken::new())
    }

    /// Build an evaluator wired to a host-owned cancellation token.
    pub fn with_cancellation(unit: CompilationUnit, cancel: CancellationToken) -> Self {
        let store = AbstractValueStore::compute(&unit);
        Self { unit, store, cancel }
    }

    pub fn unit(&self) -> &CompilationUnit {
        &self.unit
    }

    /// A query context over this evaluator's unit and store.
    pub fn context(&self) -> QueryContext<'_> {
        QueryContext::new(&self.unit, &self.store, self.cancel.clone())
    }

    /// Run a registered rule by id.
    pub fn evaluate(&self, rule_id: &str, params: &[String]) -> Result<ElementSet, EngineError> {
        let rule =
            rules::get_rule(rule_id).ok_or_else(|| EngineError::UnknownRule(rule_id.to_string()))?;
        self.evaluate_rule(rule.as_ref(), params)
    }

    /// Run a rule value directly (e.g. one built from policy config).
    pub fn evaluate_rule(
        &self,
        rule: &dyn Rule,
        params: &[String],
    ) -> Result<ElementSet, EngineError> {
        rule.evaluate(&self.context(), params)
    }

    /// Run a rule and project its sink set into renderable findings.
    pub fn findings(&self, rule: &dyn Rule, params: &[String]) -> Result<Vec<Finding>, EngineError> {
        let sinks = self.evaluate_rule(rule, params)?;
        Ok(sinks
            .iter()
            .map(|id| {
                let node = self.unit.node(id);
                let span = node.map(|n| n.span).unwrap_or_default();
                Finding {
                    rule: rule.id().to_string(),
                    severity: rule.severity(),
                    message: rule.describe_match(&self.unit, id, params),
                    path: self.unit.path.clone(),
                    line: span.start_line,
                    column: span.start_col,
                    enclosing: self.unit.enclosing_declaration(id).map(str::to_string),
                }
            })
            .collect())
    }

    /// Run a registered rule by id and project findings.
    pub fn findings_by_id(
        &self,
        rule_id: &str,
        params: &[String],
    ) -> Result<Vec<Finding>, EngineError> {
        let rule =
            rules::get_rule(rule_id).ok_or_else(|| EngineError::UnknownRule(rule_id.to_string()))?;
        self.findings(rule.as_ref(), params)
    }
}
