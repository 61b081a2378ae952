//! Write-once store of abstract values, keyed by node identity.

use rayon::prelude::*;

use crate::absint::AbstractValue;
use crate::graph::{CompilationUnit, GraphNode, NodeId, NodeKind};

/// Abstract values for one compilation unit.
///
/// Computed by a bounded fixed-point over the arena before any rule query
/// runs, then never mutated (recompute-on-change, not incremental). Only
/// numeric-expression kinds carry entries: integer literals, binary
/// expressions, declarators (through their initializer), and resolved
/// references (through their declaration). Every other node has no entry.
pub struct AbstractValueStore {
    values: Vec<Option<AbstractValue>>,
}

impl AbstractValueStore {
    /// Run the propagation to fixpoint.
    ///
    /// Each pass applies the transfer function to every node against an
    /// immutable snapshot of the previous pass, so passes parallelize
    /// cleanly and the result is deterministic. Value chains are at most as
    /// long as the arena, which bounds the pass count.
    pub fn compute(unit: &CompilationUnit) -> Self {
        let mut values: Vec<Option<AbstractValue>> = vec![None; unit.len()];

        for _ in 0..=unit.len() {
            let next: Vec<Option<AbstractValue>> = unit
                .nodes
                .par_iter()
                .map(|node| transfer(node, &values))
                .collect();
            if next == values {
                break;
            }
            values = next;
        }

        Self { values }
    }

    /// The abstract value associated with a node, if the node denotes a
    /// numeric-valued expression.
    pub fn get(&self, id: NodeId) -> Option<&AbstractValue> {
        self.values.get(id.index()).and_then(|v| v.as_ref())
    }

    /// Number of nodes carrying a value.
    pub fn len(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Test-only: a store with explicit contents, for exercising the
    /// missing-value invariant without corrupting a real computation.
    #[cfg(test)]
    pub(crate) fn from_values(values: Vec<Option<AbstractValue>>) -> Self {
        Self { values }
    }
}

/// Value lookup against the previous pass; absent entries read as `Unknown`.
fn lookup(values: &[Option<AbstractValue>], id: NodeId) -> AbstractValue {
    values
        .get(id.index())
        .and_then(|v| *v)
        .unwrap_or(AbstractValue::Unknown)
}

/// One application of the transfer function.
fn transfer(node: &GraphNode, values: &[Option<AbstractValue>]) -> Option<AbstractValue> {
    match &node.kind {
        NodeKind::IntegerLiteral { value } => Some(AbstractValue::exact(*value)),
        NodeKind::BinaryExpression { op, lhs, rhs } => Some(AbstractValue::apply(
            *op,
            lookup(values, *lhs),
            lookup(values, *rhs),
        )),
        // A declarator takes the value of its single initializer;
        // reassignment is not modeled.
        NodeKind::Declarator { initializer, .. } => Some(
            initializer
                .map(|init| lookup(values, init))
                .unwrap_or(AbstractValue::Unknown),
        ),
        // A resolved reference takes its declaration's value; unresolved
        // references stay unknown.
        NodeKind::UnknownReference { declaration, .. } => Some(
            declaration
                .map(|decl| lookup(values, decl))
                .unwrap_or(AbstractValue::Unknown),
        ),
        NodeKind::BooleanLiteral { .. }
        | NodeKind::MethodInvocation { .. }
        | NodeKind::ObjectCreation { .. }
        | NodeKind::MemberAccess { .. }
        | NodeKind::Block => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{BinaryOp, GraphBuilder, Span};

    #[test]
    fn test_literal_is_singleton_interval() {
        let mut b = GraphBuilder::new("t.cs");
        let lit = b.integer_literal(16, Span::line(1));
        let unit = b.finish().unwrap();

        let store = AbstractValueStore::compute(&unit);
        assert_eq!(store.get(lit), Some(&AbstractValue::exact(16)));
    }

    #[test]
    fn test_binary_expression_folds() {
        let mut b = GraphBuilder::new("t.cs");
        let eight = b.integer_literal(8, Span::line(1));
        let two = b.integer_literal(2, Span::line(1));
        let product = b.binary(BinaryOp::Mul, eight, two, Span::line(1));
        let unit = b.finish().unwrap();

        let store = AbstractValueStore::compute(&unit);
        assert_eq!(store.get(product), Some(&AbstractValue::exact(16)));
    }

    #[test]
    fn test_reference_chases_declaration() {
        // int sz = 16; use of sz
        let mut b = GraphBuilder::new("t.cs");
        let lit = b.integer_literal(16, Span::line(1));
        let decl = b.declarator("sz", Some("int"), Some(lit), Span::line(1));
        let use_site = b.reference("sz", Some(decl), Span::line(2));
        let unit = b.finish().unwrap();

        let store = AbstractValueStore::compute(&unit);
        assert_eq!(store.get(decl), Some(&AbstractValue::exact(16)));
        assert_eq!(store.get(use_site), Some(&AbstractValue::exact(16)));
    }

    #[test]
    fn test_chain_through_two_declarations() {
        // int a = 16; int b = a; use of b
        let mut b = GraphBuilder::new("t.cs");
        let lit = b.integer_literal(16, Span::line(1));
        let decl_a = b.declarator("a", Some("int"), Some(lit), Span::line(1));
        let ref_a = b.reference("a", Some(decl_a), Span::line(2));
        let decl_b = b.declarator("b", Some("int"), Some(ref_a), Span::line(2));
        let ref_b = b.reference("b", Some(decl_b), Span::line(3));
        let unit = b.finish().unwrap();

        let store = AbstractValueStore::compute(&unit);
        assert_eq!(store.get(ref_b), Some(&AbstractValue::exact(16)));
    }

    #[test]
    fn test_runtime_value_stays_unknown() {
        // byte[] key = ReadKey(); use of key
        let mut b = GraphBuilder::new("t.cs");
        let call = b.method_invocation("ReadKey", None, &[], Span::line(1));
        let decl = b.declarator("key", Some("byte[]"), Some(call), Span::line(1));
        let use_site = b.reference("key", Some(decl), Span::line(2));
        let unit = b.finish().unwrap();

        let store = AbstractValueStore::compute(&unit);
        assert_eq!(store.get(call), None);
        assert_eq!(store.get(decl), Some(&AbstractValue::Unknown));
        assert_eq!(store.get(use_site), Some(&AbstractValue::Unknown));
    }

    #[test]
    fn test_unresolved_reference_is_unknown() {
        let mut b = GraphBuilder::new("t.cs");
        let r = b.reference("mystery", None, Span::line(1));
        let unit = b.finish().unwrap();

        let store = AbstractValueStore::compute(&unit);
        assert_eq!(store.get(r), Some(&AbstractValue::Unknown));
    }

    #[test]
    fn test_non_numeric_nodes_have_no_entry() {
        let mut b = GraphBuilder::new("t.cs");
        let root = b.block(Span::line(1));
        let flag = b.boolean_literal(true, Span::line(1));
        let creation = b.object_creation("KeyParameter", &[], Span::line(1));
        b.attach(root, creation);
        let unit = b.finish().unwrap();

        let store = AbstractValueStore::compute(&unit);
        assert_eq!(store.get(root), None);
        assert_eq!(store.get(flag), None);
        assert_eq!(store.get(creation), None);
    }

    #[test]
    fn test_determinism() {
        let mut b = GraphBuilder::new("t.cs");
        let lit = b.integer_literal(8, Span::line(1));
        let two = b.integer_literal(2, Span::line(1));
        let shifted = b.binary(BinaryOp::Shl, lit, two, Span::line(1));
        let decl = b.declarator("n", Some("int"), Some(shifted), Span::line(1));
        let unit = b.finish().unwrap();

        let a = AbstractValueStore::compute(&unit);
        let c = AbstractValueStore::compute(&unit);
        for id in unit.nodes.iter().map(|n| n.id) {
            assert_eq!(a.get(id), c.get(id));
        }
        assert_eq!(a.get(decl), Some(&AbstractValue::exact(32)));
    }
}
