//! Node types for the program graph.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity of a node within one compilation unit's arena.
///
/// Ids are assigned in source order by the front-end, so iterating nodes in
/// id order is the deterministic traversal every query primitive relies on.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Arena index for this id.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Source location span, 1-indexed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    #[serde(default)]
    pub start_line: usize,
    #[serde(default)]
    pub start_col: usize,
    #[serde(default)]
    pub end_line: usize,
    #[serde(default)]
    pub end_col: usize,
}

impl Span {
    /// A synthetic span covering a single line.
    pub fn line(line: usize) -> Self {
        Self {
            start_line: line,
            start_col: 1,
            end_line: line,
            end_col: 1,
        }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start_line, self.start_col)
    }
}

/// Fieldless node discriminant, used for kind matching in queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeTag {
    IntegerLiteral,
    BooleanLiteral,
    Declarator,
    MethodInvocation,
    ObjectCreation,
    MemberAccess,
    UnknownReference,
    BinaryExpression,
    Block,
}

impl NodeTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeTag::IntegerLiteral => "integer_literal",
            NodeTag::BooleanLiteral => "boolean_literal",
            NodeTag::Declarator => "declarator",
            NodeTag::MethodInvocation => "method_invocation",
            NodeTag::ObjectCreation => "object_creation",
            NodeTag::MemberAccess => "member_access",
            NodeTag::UnknownReference => "unknown_reference",
            NodeTag::BinaryExpression => "binary_expression",
            NodeTag::Block => "block",
        }
    }
}

impl fmt::Display for NodeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Binary operators the abstract interpreter folds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Shl,
    Shr,
}

/// Node payload, tagged by variant.
///
/// The variant set is closed: the abstract interpreter and the relational
/// operators match exhaustively, so adding a variant is a deliberate engine
/// change, not an extension point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum NodeKind {
    IntegerLiteral {
        value: i64,
    },
    BooleanLiteral {
        value: bool,
    },
    /// Introduces a named variable/field/parameter.
    Declarator {
        name: String,
        #[serde(default)]
        type_name: Option<String>,
        #[serde(default)]
        initializer: Option<NodeId>,
    },
    MethodInvocation {
        name: String,
        #[serde(default)]
        target: Option<NodeId>,
        #[serde(default)]
        arguments: Vec<NodeId>,
    },
    ObjectCreation {
        type_name: String,
        #[serde(default)]
        arguments: Vec<NodeId>,
    },
    MemberAccess {
        target: NodeId,
        member: String,
    },
    /// A name reference the front-end could not (or did not) fully type.
    /// `declaration` is the resolved declarator when def-use resolution
    /// succeeded, None otherwise - unresolved references stay in the graph
    /// rather than failing.
    UnknownReference {
        name: String,
        #[serde(default)]
        declaration: Option<NodeId>,
    },
    BinaryExpression {
        op: BinaryOp,
        lhs: NodeId,
        rhs: NodeId,
    },
    /// Structural container (unit body, statement block).
    Block,
}

impl NodeKind {
    /// The fieldless discriminant for this payload.
    pub fn tag(&self) -> NodeTag {
        match self {
            NodeKind::IntegerLiteral { .. } => NodeTag::IntegerLiteral,
            NodeKind::BooleanLiteral { .. } => NodeTag::BooleanLiteral,
            NodeKind::Declarator { .. } => NodeTag::Declarator,
            NodeKind::MethodInvocation { .. } => NodeTag::MethodInvocation,
            NodeKind::ObjectCreation { .. } => NodeTag::ObjectCreation,
            NodeKind::MemberAccess { .. } => NodeTag::MemberAccess,
            NodeKind::UnknownReference { .. } => NodeTag::UnknownReference,
            NodeKind::BinaryExpression { .. } => NodeTag::BinaryExpression,
            NodeKind::Block => NodeTag::Block,
        }
    }

    /// The declared short identifier queries match on: a declarator's name,
    /// an invocation's method name, a creation's type name, an accessed
    /// member, a reference's name. Blocks and literals have none.
    pub fn short_name(&self) -> Option<&str> {
        match self {
            NodeKind::Declarator { name, .. } => Some(name),
            NodeKind::MethodInvocation { name, .. } => Some(name),
            NodeKind::ObjectCreation { type_name, .. } => Some(type_name),
            NodeKind::MemberAccess { member, .. } => Some(member),
            NodeKind::UnknownReference { name, .. } => Some(name),
            NodeKind::IntegerLiteral { .. }
            | NodeKind::BooleanLiteral { .. }
            | NodeKind::BinaryExpression { .. }
            | NodeKind::Block => None,
        }
    }

    /// Every node id this payload points at, for arena validation.
    pub fn edges(&self) -> Vec<NodeId> {
        match self {
            NodeKind::Declarator { initializer, .. } => initializer.iter().copied().collect(),
            NodeKind::MethodInvocation {
                target, arguments, ..
            } => target.iter().copied().chain(arguments.iter().copied()).collect(),
            NodeKind::ObjectCreation { arguments, .. } => arguments.clone(),
            NodeKind::MemberAccess { target, .. } => vec![*target],
            NodeKind::UnknownReference { declaration, .. } => {
                declaration.iter().copied().collect()
            }
            NodeKind::BinaryExpression { lhs, rhs, .. } => vec![*lhs, *rhs],
            NodeKind::IntegerLiteral { .. }
            | NodeKind::BooleanLiteral { .. }
            | NodeKind::Block => Vec::new(),
        }
    }
}

/// A program element in one compilation unit.
///
/// Created once when the unit graph is built; immutable thereafter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: NodeId,
    #[serde(flatten)]
    pub kind: NodeKind,
    #[serde(default)]
    pub span: Span,
    #[serde(default)]
    pub parent: Option<NodeId>,
}

impl GraphNode {
    pub fn tag(&self) -> NodeTag {
        self.kind.tag()
    }

    pub fn short_name(&self) -> Option<&str> {
        self.kind.short_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_span_display() {
        let span = Span::line(7);
        assert_eq!(span.to_string(), "7:1");
    }

    #[test]
    fn test_tag_and_short_name() {
        let kind = NodeKind::ObjectCreation {
            type_name: "KeyParameter".to_string(),
            arguments: vec![NodeId(3)],
        };
        assert_eq!(kind.tag(), NodeTag::ObjectCreation);
        assert_eq!(kind.short_name(), Some("KeyParameter"));
        assert_eq!(kind.edges(), vec![NodeId(3)]);

        assert_eq!(NodeKind::Block.tag(), NodeTag::Block);
        assert_eq!(NodeKind::Block.short_name(), None);
    }

    #[test]
    fn test_node_json_format() {
        // The interchange format front-ends emit; pinned so testdata
        // fixtures stay loadable.
        let node: GraphNode = serde_json::from_value(json!({
            "id": 5,
            "node": "method_invocation",
            "name": "DoFinal",
            "target": 3,
            "arguments": [4],
            "span": {"start_line": 9, "start_col": 1, "end_line": 9, "end_col": 24},
            "parent": 6
        }))
        .unwrap();

        assert_eq!(node.id, NodeId(5));
        assert_eq!(node.tag(), NodeTag::MethodInvocation);
        assert_eq!(node.short_name(), Some("DoFinal"));
        assert_eq!(node.parent, Some(NodeId(6)));
        assert_eq!(node.span.start_line, 9);

        // Optional edge fields may be omitted entirely.
        let bare: GraphNode = serde_json::from_value(json!({
            "id": 0,
            "node": "unknown_reference",
            "name": "data"
        }))
        .unwrap();
        assert_eq!(
            bare.kind,
            NodeKind::UnknownReference {
                name: "data".to_string(),
                declaration: None
            }
        );
        assert_eq!(bare.parent, None);
    }

    #[test]
    fn test_node_json_roundtrip() {
        let node = GraphNode {
            id: NodeId(2),
            kind: NodeKind::BinaryExpression {
                op: BinaryOp::Mul,
                lhs: NodeId(0),
                rhs: NodeId(1),
            },
            span: Span::line(4),
            parent: Some(NodeId(3)),
        };
        let text = serde_json::to_string(&node).unwrap();
        let back: GraphNode = serde_json::from_str(&text).unwrap();
        assert_eq!(node, back);
    }
}
