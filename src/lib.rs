//! Flowsift - structural code query engine.
//!
//! Flowsift evaluates detection rules against program graphs: typed element
//! arenas produced by an external front-end, enriched with an abstract-value
//! analysis for integer expressions. Rules are pure set-algebra queries over
//! relational operators (ancestor lookup, reference resolution, member-access
//! matching, flow joins); the shipped rule pack flags block ciphers keyed at
//! flagged AES key sizes.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌───────────────┐     ┌────────────────┐
//! │ Unit graphs     │────▶│ Program Graph │────▶│ AbstractValue  │
//! │ (front-end JSON)│     │ (graph)       │     │ Store (absint) │
//! └─────────────────┘     └───────────────┘     └────────────────┘
//!                                 │                      │
//!                                 ▼                      ▼
//!                         ┌───────────────┐     ┌────────────────┐
//!                         │ QueryContext  │◀────│ Rules +        │
//!                         │ (query)       │     │ Evaluator      │
//!                         └───────────────┘     └────────────────┘
//! ```
//!
//! - `graph`: immutable program-element arena with parent and def-use edges
//! - `absint`: interval abstract values, computed once per unit
//! - `query`: element sets and the relational operators rules compose
//! - `rules`: the rule trait, registry, evaluator, and shipped rules
//! - `policy`: YAML policy schema (checks, thresholds, suppressions)
//! - `report`: output formatting (pretty, JSON)
//!
//! Everything after graph construction is read-only, so any number of rules
//! and units evaluate concurrently with no shared mutable state.
//!
//! # Adding a New Rule
//!
//! Implement the `rules::Rule` trait and register a factory with
//! `rules::register`. See `rules/aes_key_size.rs` for the reference rule.

pub mod absint;
pub mod cli;
pub mod error;
pub mod graph;
pub mod policy;
pub mod query;
pub mod report;
pub mod rules;

pub use absint::{AbstractValue, AbstractValueStore};
pub use error::{EngineError, GraphError};
pub use graph::{CompilationUnit, GraphBuilder, GraphNode, NodeId, NodeKind, NodeTag};
pub use policy::Policy;
pub use query::{CancellationToken, ElementSet, QueryContext};
pub use rules::{Evaluator, Finding, Rule, RunResult, Severity};

/// Initialize all subsystems.
///
/// Call this once at startup.
pub fn init() {
    // Register the builtin rule pack
    rules::register_builtin();
}
