//! Programmatic construction of compilation unit graphs.
//!
//! Front-end adapters and tests build arenas through this: each `GraphBuilder`
//! method appends one node and wires the parent edge of every child it
//! consumes. Ids are handed out in creation order, which callers should keep
//! aligned with source order.

use crate::error::GraphError;
use crate::graph::{BinaryOp, CompilationUnit, GraphNode, NodeId, NodeKind, Span};

/// Incremental builder for a `CompilationUnit`.
pub struct GraphBuilder {
    path: String,
    nodes: Vec<GraphNode>,
}

impl GraphBuilder {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            nodes: Vec::new(),
        }
    }

    fn push(&mut self, kind: NodeKind, span: Span) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(GraphNode {
            id,
            kind,
            span,
            parent: None,
        });
        id
    }

    fn adopt(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[child.index()].parent = Some(parent);
    }

    /// Structural container node (unit body, statement block).
    pub fn block(&mut self, span: Span) -> NodeId {
        self.push(NodeKind::Block, span)
    }

    pub fn integer_literal(&mut self, value: i64, span: Span) -> NodeId {
        self.push(NodeKind::IntegerLiteral { value }, span)
    }

    pub fn boolean_literal(&mut self, value: bool, span: Span) -> NodeId {
        self.push(NodeKind::BooleanLiteral { value }, span)
    }

    /// Declare a name, adopting the initializer expression if present.
    pub fn declarator(
        &mut self,
        name: &str,
        type_name: Option<&str>,
        initializer: Option<NodeId>,
        span: Span,
    ) -> NodeId {
        let id = self.push(
            NodeKind::Declarator {
                name: name.to_string(),
                type_name: type_name.map(str::to_string),
                initializer,
            },
            span,
        );
        if let Some(init) = initializer {
            self.adopt(id, init);
        }
        id
    }

    /// A name reference, resolved to `declaration` when def-use resolution
    /// succeeded.
    pub fn reference(&mut self, name: &str, declaration: Option<NodeId>, span: Span) -> NodeId {
        self.push(
            NodeKind::UnknownReference {
                name: name.to_string(),
                declaration,
            },
            span,
        )
    }

    /// Invoke `name` on `target` with `arguments`, adopting target and args.
    pub fn method_invocation(
        &mut self,
        name: &str,
        target: Option<NodeId>,
        arguments: &[NodeId],
        span: Span,
    ) -> NodeId {
        let id = self.push(
            NodeKind::MethodInvocation {
                name: name.to_string(),
                target,
                arguments: arguments.to_vec(),
            },
            span,
        );
        if let Some(t) = target {
            self.adopt(id, t);
        }
        for &arg in arguments {
            self.adopt(id, arg);
        }
        id
    }

    /// `new TypeName(arguments)`, adopting the arguments.
    pub fn object_creation(&mut self, type_name: &str, arguments: &[NodeId], span: Span) -> NodeId {
        let id = self.push(
            NodeKind::ObjectCreation {
                type_name: type_name.to_string(),
                arguments: arguments.to_vec(),
            },
            span,
        );
        for &arg in arguments {
            self.adopt(id, arg);
        }
        id
    }

    /// `target.member`, adopting the receiver.
    pub fn member_access(&mut self, target: NodeId, member: &str, span: Span) -> NodeId {
        let id = self.push(
            NodeKind::MemberAccess {
                target,
                member: member.to_string(),
            },
            span,
        );
        self.adopt(id, target);
        id
    }

    /// Binary arithmetic expression, adopting both operands.
    pub fn binary(&mut self, op: BinaryOp, lhs: NodeId, rhs: NodeId, span: Span) -> NodeId {
        let id = self.push(NodeKind::BinaryExpression { op, lhs, rhs }, span);
        self.adopt(id, lhs);
        self.adopt(id, rhs);
        id
    }

    /// Re-parent a statement node under a block.
    pub fn attach(&mut self, parent: NodeId, child: NodeId) {
        self.adopt(parent, child);
    }

    /// Validate and freeze the arena.
    pub fn finish(self) -> Result<CompilationUnit, GraphError> {
        CompilationUnit::new(self.path, self.nodes)
    }
}
