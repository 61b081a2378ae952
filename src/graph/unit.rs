//! Compilation unit: the arena owning all nodes of one translation unit.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::GraphError;
use crate::graph::{GraphNode, NodeId, NodeTag};

/// One translation unit's program graph.
///
/// The arena owns every node; all edges are ids into it. Built once by a
/// front-end (or `GraphBuilder`), validated, then read-only for the rest of
/// the analysis run. Malformed *semantics* are the front-end's problem;
/// `validate` only rejects graphs that are structurally unusable (dangling
/// edges, parent cycles).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompilationUnit {
    /// Source path, used when rendering findings.
    pub path: String,
    pub nodes: Vec<GraphNode>,
}

impl CompilationUnit {
    /// Construct and validate a unit from its node arena.
    pub fn new(path: impl Into<String>, nodes: Vec<GraphNode>) -> Result<Self, GraphError> {
        let unit = Self {
            path: path.into(),
            nodes,
        };
        unit.validate()?;
        Ok(unit)
    }

    /// Number of nodes in the arena.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Look up a node by id. Ids handed out by this unit are always valid;
    /// out-of-range ids (from another unit) return None.
    pub fn node(&self, id: NodeId) -> Option<&GraphNode> {
        self.nodes.get(id.index())
    }

    /// All node ids of the given kind, in id (source) order.
    pub fn find_all(&self, tag: NodeTag) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .iter()
            .filter(move |n| n.tag() == tag)
            .map(|n| n.id)
    }

    /// Iterate the ancestor chain of a node, nearest first, root last.
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            unit: self,
            current: self.node(id).and_then(|n| n.parent),
        }
    }

    /// Name of the nearest enclosing declarator, for finding rendering.
    pub fn enclosing_declaration(&self, id: NodeId) -> Option<&str> {
        self.ancestors(id)
            .filter_map(|a| self.node(a))
            .find(|n| n.tag() == NodeTag::Declarator)
            .and_then(|n| n.short_name())
    }

    /// Check arena integrity: ids match indices, all edges are in bounds,
    /// and parent chains terminate.
    pub fn validate(&self) -> Result<(), GraphError> {
        for (idx, node) in self.nodes.iter().enumerate() {
            if node.id.index() != idx {
                return Err(GraphError::MisnumberedNode(idx, node.id.0));
            }
            for edge in node
                .kind
                .edges()
                .into_iter()
                .chain(node.parent.into_iter())
            {
                if edge.index() >= self.nodes.len() {
                    return Err(GraphError::DanglingEdge {
                        from: node.id,
                        to: edge,
                    });
                }
            }
        }
        // Parent chains are acyclic iff no walk exceeds the arena size.
        for node in &self.nodes {
            let mut steps = 0usize;
            let mut current = node.parent;
            while let Some(p) = current {
                steps += 1;
                if steps > self.nodes.len() {
                    return Err(GraphError::ParentCycle(node.id));
                }
                current = self.nodes[p.index()].parent;
            }
        }
        Ok(())
    }

    /// Load a unit graph from its JSON interchange form.
    pub fn from_json(text: &str) -> anyhow::Result<Self> {
        let unit: CompilationUnit = serde_json::from_str(text)?;
        unit.validate()?;
        Ok(unit)
    }

    /// Load a unit graph from a JSON file produced by a front-end.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path.as_ref())?;
        Self::from_json(&text)
    }

    /// Serialize to the JSON interchange form.
    pub fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Iterator over a node's ancestor chain.
pub struct Ancestors<'a> {
    unit: &'a CompilationUnit,
    current: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.current?;
        self.current = self.unit.node(id).and_then(|n| n.parent);
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{GraphBuilder, NodeKind, Span};

    fn sample_unit() -> CompilationUnit {
        let mut b = GraphBuilder::new("sample.cs");
        let root = b.block(Span::line(1));
        let lit = b.integer_literal(16, Span::line(2));
        let decl = b.declarator("keySize", Some("int"), Some(lit), Span::line(2));
        b.attach(root, decl);
        let r = b.reference("keySize", Some(decl), Span::line(3));
        b.attach(root, r);
        b.finish().unwrap()
    }

    #[test]
    fn test_find_all_in_id_order() {
        let unit = sample_unit();
        let decls: Vec<_> = unit.find_all(NodeTag::Declarator).collect();
        assert_eq!(decls.len(), 1);
        let refs: Vec<_> = unit.find_all(NodeTag::UnknownReference).collect();
        assert_eq!(refs.len(), 1);
        // id order is arena order
        let all: Vec<_> = unit.nodes.iter().map(|n| n.id.index()).collect();
        assert_eq!(all, (0..unit.len()).collect::<Vec<_>>());
    }

    #[test]
    fn test_ancestors_nearest_first() {
        let unit = sample_unit();
        let lit = unit.find_all(NodeTag::IntegerLiteral).next().unwrap();
        let chain: Vec<_> = unit
            .ancestors(lit)
            .map(|id| unit.node(id).unwrap().tag())
            .collect();
        assert_eq!(chain, vec![NodeTag::Declarator, NodeTag::Block]);
    }

    #[test]
    fn test_enclosing_declaration() {
        let unit = sample_unit();
        let lit = unit.find_all(NodeTag::IntegerLiteral).next().unwrap();
        assert_eq!(unit.enclosing_declaration(lit), Some("keySize"));
    }

    #[test]
    fn test_validate_rejects_dangling_edge() {
        let nodes = vec![GraphNode {
            id: NodeId(0),
            kind: NodeKind::UnknownReference {
                name: "x".to_string(),
                declaration: Some(NodeId(9)),
            },
            span: Span::default(),
            parent: None,
        }];
        let err = CompilationUnit::new("bad.cs", nodes).unwrap_err();
        assert_eq!(
            err,
            GraphError::DanglingEdge {
                from: NodeId(0),
                to: NodeId(9)
            }
        );
    }

    #[test]
    fn test_validate_rejects_parent_cycle() {
        let nodes = vec![
            GraphNode {
                id: NodeId(0),
                kind: NodeKind::Block,
                span: Span::default(),
                parent: Some(NodeId(1)),
            },
            GraphNode {
                id: NodeId(1),
                kind: NodeKind::Block,
                span: Span::default(),
                parent: Some(NodeId(0)),
            },
        ];
        let err = CompilationUnit::new("bad.cs", nodes).unwrap_err();
        assert!(matches!(err, GraphError::ParentCycle(_)));
    }

    #[test]
    fn test_json_roundtrip() {
        let unit = sample_unit();
        let text = unit.to_json().unwrap();
        let back = CompilationUnit::from_json(&text).unwrap();
        assert_eq!(unit, back);
    }
}
