//! Relational operators over one compilation unit.

use std::collections::HashSet;

use crate::absint::{AbstractValue, AbstractValueStore};
use crate::error::EngineError;
use crate::graph::{CompilationUnit, NodeId, NodeKind, NodeTag};
use crate::query::{CancellationToken, ElementSet};

/// Read-only view a rule queries: the unit graph, its abstract value store,
/// and the host's cancellation token.
///
/// Every operator is pure over immutable inputs, preserves or defines a
/// deterministic order, and deduplicates by node identity. Operators check
/// the cancellation token on entry so a host can bound traversal cost on
/// pathological graphs.
pub struct QueryContext<'a> {
    unit: &'a CompilationUnit,
    store: &'a AbstractValueStore,
    cancel: CancellationToken,
}

impl<'a> QueryContext<'a> {
    pub fn new(
        unit: &'a CompilationUnit,
        store: &'a AbstractValueStore,
        cancel: CancellationToken,
    ) -> Self {
        Self { unit, store, cancel }
    }

    pub fn unit(&self) -> &CompilationUnit {
        self.unit
    }

    pub fn store(&self) -> &AbstractValueStore {
        self.store
    }

    fn checkpoint(&self) -> Result<(), EngineError> {
        if self.cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }
        Ok(())
    }

    /// Every node of the given kind, in id (source) order.
    pub fn find_all(&self, tag: NodeTag) -> Result<ElementSet, EngineError> {
        self.checkpoint()?;
        Ok(self.unit.find_all(tag).collect())
    }

    /// Elements of `set` whose node kind matches `tag`.
    pub fn filter_by_kind(
        &self,
        set: &ElementSet,
        tag: NodeTag,
    ) -> Result<ElementSet, EngineError> {
        self.checkpoint()?;
        Ok(set.filtered(|id| {
            self.unit.node(id).map(|n| n.tag() == tag).unwrap_or(false)
        }))
    }

    /// Elements of `set` whose declared short identifier equals `name`.
    pub fn filter_by_short_name(
        &self,
        set: &ElementSet,
        name: &str,
    ) -> Result<ElementSet, EngineError> {
        self.checkpoint()?;
        Ok(set.filtered(|id| {
            self.unit
                .node(id)
                .and_then(|n| n.short_name())
                .map(|n| n == name)
                .unwrap_or(false)
        }))
    }

    /// Invocation/creation elements of `set` with at least one argument in
    /// `params`. An empty candidate set matches nothing - there is no
    /// universal match.
    pub fn filter_by_parameters(
        &self,
        set: &ElementSet,
        params: &ElementSet,
    ) -> Result<ElementSet, EngineError> {
        self.checkpoint()?;
        if params.is_empty() {
            return Ok(ElementSet::new());
        }
        Ok(set.filtered(|id| {
            let Some(node) = self.unit.node(id) else {
                return false;
            };
            let arguments = match &node.kind {
                NodeKind::MethodInvocation { arguments, .. } => arguments,
                NodeKind::ObjectCreation { arguments, .. } => arguments,
                _ => return false,
            };
            arguments.iter().any(|arg| params.contains(*arg))
        }))
    }

    /// Elements of `set` whose associated abstract value satisfies `pred`,
    /// order preserved. Nodes with no associated value are skipped - except
    /// an integer literal, which always has one unless the store is broken.
    pub fn filter_by_abstract_value(
        &self,
        set: &ElementSet,
        pred: impl Fn(&AbstractValue) -> bool,
    ) -> Result<ElementSet, EngineError> {
        self.checkpoint()?;
        let mut result = ElementSet::new();
        for id in set.iter() {
            match self.store.get(id) {
                Some(value) => {
                    if pred(value) {
                        result.push(id);
                    }
                }
                None => {
                    let tag = self.unit.node(id).map(|n| n.tag());
                    if tag == Some(NodeTag::IntegerLiteral) {
                        return Err(EngineError::MissingAbstractValue(id));
                    }
                }
            }
        }
        Ok(result)
    }

    /// For each element, every ancestor of the given kind, nearest first,
    /// all the way to the root.
    pub fn ancestors_of_type(
        &self,
        set: &ElementSet,
        tag: NodeTag,
    ) -> Result<ElementSet, EngineError> {
        self.checkpoint()?;
        let mut result = ElementSet::new();
        for id in set.iter() {
            for anc in self.unit.ancestors(id) {
                if self.unit.node(anc).map(|n| n.tag() == tag).unwrap_or(false) {
                    result.push(anc);
                }
            }
        }
        Ok(result)
    }

    /// Def-use resolution: the subset of `refs`, in input order, whose
    /// resolved declaration is one of `targets` (each target taken as a
    /// declarator directly, or through its own `declaration` edge when it
    /// is itself a reference). Targets that resolve to nothing are silently
    /// dropped.
    pub fn find_all_references(
        &self,
        refs: &ElementSet,
        targets: &ElementSet,
    ) -> Result<ElementSet, EngineError> {
        self.checkpoint()?;
        let mut declarators: HashSet<NodeId> = HashSet::new();
        for id in targets.iter() {
            if let Some(decl) = self.resolve_declarator(id) {
                declarators.insert(decl);
            }
        }
        if declarators.is_empty() {
            return Ok(ElementSet::new());
        }
        Ok(refs.filtered(|id| {
            matches!(
                self.unit.node(id).map(|n| &n.kind),
                Some(NodeKind::UnknownReference {
                    declaration: Some(decl),
                    ..
                }) if declarators.contains(decl)
            )
        }))
    }

    /// Project invocation/member-access elements to their receiver
    /// expressions, first-seen order.
    pub fn target_of_members(&self, set: &ElementSet) -> Result<ElementSet, EngineError> {
        self.checkpoint()?;
        let mut result = ElementSet::new();
        for id in set.iter() {
            match self.unit.node(id).map(|n| &n.kind) {
                Some(NodeKind::MethodInvocation {
                    target: Some(t), ..
                }) => result.push(*t),
                Some(NodeKind::MemberAccess { target, .. }) => result.push(*target),
                _ => {}
            }
        }
        Ok(result)
    }

    /// Inverse projection: every invocation/member access in the unit whose
    /// receiver is one of `set`, in unit order.
    pub fn members_of_target(&self, set: &ElementSet) -> Result<ElementSet, EngineError> {
        self.checkpoint()?;
        let mut result = ElementSet::new();
        for node in &self.unit.nodes {
            let receiver = match &node.kind {
                NodeKind::MethodInvocation {
                    target: Some(t), ..
                } => Some(*t),
                NodeKind::MemberAccess { target, .. } => Some(*target),
                _ => None,
            };
            if let Some(r) = receiver {
                if set.contains(r) {
                    result.push(node.id);
                }
            }
        }
        Ok(result)
    }

    /// Invocation/member-access elements of `set` whose member name is in
    /// `members` and whose receiver's candidate type names intersect
    /// `receivers`.
    ///
    /// Candidate type names are gathered by chasing the receiver expression
    /// through references, declarations, chained calls, and nested creation
    /// arguments (a `CbcBlockCipher` wrapped inside a
    /// `PaddedBufferedBlockCipher` construction is still a match).
    pub fn filter_by_member_accesses(
        &self,
        set: &ElementSet,
        receivers: &[impl AsRef<str>],
        members: &[impl AsRef<str>],
    ) -> Result<ElementSet, EngineError> {
        self.checkpoint()?;
        Ok(set.filtered(|id| {
            let Some(node) = self.unit.node(id) else {
                return false;
            };
            let (member, target) = match &node.kind {
                NodeKind::MethodInvocation { name, target, .. } => (name, *target),
                NodeKind::MemberAccess { target, member } => (member, Some(*target)),
                _ => return false,
            };
            if !members.iter().any(|m| m.as_ref() == member.as_str()) {
                return false;
            }
            let Some(target) = target else {
                return false;
            };
            let names = self.receiver_type_names(target);
            receivers
                .iter()
                .any(|r| names.iter().any(|n| n == r.as_ref()))
        }))
    }

    /// Resolve a node to a declarator: itself when it is one, or through
    /// its `declaration` edge when it is a reference.
    fn resolve_declarator(&self, id: NodeId) -> Option<NodeId> {
        match self.unit.node(id).map(|n| &n.kind)? {
            NodeKind::Declarator { .. } => Some(id),
            NodeKind::UnknownReference {
                declaration: Some(decl),
                ..
            } => Some(*decl),
            _ => None,
        }
    }

    /// All type names a receiver expression could denote, cycle-guarded.
    fn receiver_type_names(&self, start: NodeId) -> Vec<String> {
        let mut names = Vec::new();
        let mut visited = HashSet::new();
        let mut worklist = vec![start];
        while let Some(id) = worklist.pop() {
            if !visited.insert(id) {
                continue;
            }
            match self.unit.node(id).map(|n| &n.kind) {
                Some(NodeKind::ObjectCreation {
                    type_name,
                    arguments,
                }) => {
                    names.push(type_name.clone());
                    worklist.extend(arguments.iter().copied());
                }
                Some(NodeKind::Declarator {
                    type_name,
                    initializer,
                    ..
                }) => {
                    if let Some(t) = type_name {
                        names.push(t.clone());
                    }
                    worklist.extend(initializer.iter().copied());
                }
                Some(NodeKind::UnknownReference {
                    declaration: Some(decl),
                    ..
                }) => worklist.push(*decl),
                Some(NodeKind::MemberAccess { target, .. }) => worklist.push(*target),
                Some(NodeKind::MethodInvocation {
                    target: Some(t), ..
                }) => worklist.push(*t),
                _ => {}
            }
        }
        names
    }
}
