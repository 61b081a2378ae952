//! Program graph model.
//!
//! A `CompilationUnit` is an immutable arena of typed program-element nodes
//! produced by an external front-end (or by `GraphBuilder` in tests). Edges -
//! parent, def-use, invocation targets and arguments - are plain `NodeId`
//! indices into the arena, never owning references. The arena lives for the
//! duration of one analysis run and is never mutated after construction.

mod builder;
mod node;
mod unit;

pub use builder::GraphBuilder;
pub use node::{BinaryOp, GraphNode, NodeId, NodeKind, NodeTag, Span};
pub use unit::CompilationUnit;
