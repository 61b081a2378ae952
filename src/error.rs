//! Error types for the query engine.
//!
//! Two classes of failure exist:
//! - `GraphError`: a serialized unit graph is structurally broken (bad edge
//!   indices, parent cycles). Raised at load time, before any query runs.
//! - `EngineError`: a failure during rule evaluation. Configuration problems
//!   (bad parameters, unknown node names) never surface here - rules degrade
//!   to empty results for those. What does surface is cancellation and
//!   engine-internal invariant violations, which indicate a bug rather than
//!   an analysis outcome.

use thiserror::Error;

use crate::graph::NodeId;

/// Structural problems in a compilation unit graph.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("node {0} has id {1}, expected arena index")]
    MisnumberedNode(usize, u32),
    #[error("node {from} references out-of-bounds node {to}")]
    DanglingEdge { from: NodeId, to: NodeId },
    #[error("parent chain starting at node {0} is cyclic")]
    ParentCycle(NodeId),
}

/// Failures during rule evaluation.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("no rule registered with id {0:?}")]
    UnknownRule(String),
    #[error("integer literal {0} has no abstract value; store is incomplete")]
    MissingAbstractValue(NodeId),
    #[error("evaluation cancelled")]
    Cancelled,
    #[error(transparent)]
    Graph(#[from] GraphError),
}
