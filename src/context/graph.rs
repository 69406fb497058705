//! Execution graphs of interpreted method bodies.
//!
//! An [`ExecutionGraph`] records the paths an interpreter explored through one
//! method invocation. Nodes are stored in an arena and addressed by
//! [`NodeId`]; each node owns the [`ExecutionContext`] as it was after the
//! instruction at its address executed.
//!
//! # Terminating Nodes
//!
//! A node is terminating when it is reachable from the root, has no children
//! and raised no exception. These are the states a caller may observe after
//! the call returns, so [`ExecutionGraph::terminating_register_consensus`]
//! merges a register across exactly these nodes.

use std::sync::Arc;

use crate::{
    context::{
        context::ExecutionContext, exception::VirtualException, item::HeapItem,
        sideeffect::SideEffect, state::Register,
    },
    types::{
        manager::ClassManager,
        method::VirtualMethodRc,
        name::{self, TypeName},
    },
};

/// Index of a node in an [`ExecutionGraph`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Arena index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// One executed instruction on one path.
#[derive(Clone, Debug)]
pub struct ExecutionNode {
    address: usize,
    context: ExecutionContext,
    children: Vec<NodeId>,
    exceptions: Vec<VirtualException>,
    side_effect: SideEffect,
}

impl ExecutionNode {
    /// Creates a node for the instruction at `address` with no observed side
    /// effect.
    #[must_use]
    pub fn new(address: usize, context: ExecutionContext) -> Self {
        ExecutionNode {
            address,
            context,
            children: Vec::new(),
            exceptions: Vec::new(),
            side_effect: SideEffect::None,
        }
    }

    /// Sets the side-effect level of the node's instruction.
    #[must_use]
    pub fn with_side_effect(mut self, side_effect: SideEffect) -> Self {
        self.side_effect = side_effect;
        self
    }

    /// Code address of the instruction.
    #[must_use]
    pub fn address(&self) -> usize {
        self.address
    }

    /// State after the instruction.
    #[must_use]
    pub fn context(&self) -> &ExecutionContext {
        &self.context
    }

    /// State after the instruction, mutably.
    pub fn context_mut(&mut self) -> &mut ExecutionContext {
        &mut self.context
    }

    /// Successor nodes.
    #[must_use]
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Exceptions raised by the instruction.
    #[must_use]
    pub fn exceptions(&self) -> &[VirtualException] {
        &self.exceptions
    }

    /// Side-effect level of the instruction.
    #[must_use]
    pub fn side_effect(&self) -> SideEffect {
        self.side_effect
    }

    /// Updates the side-effect level.
    pub fn set_side_effect(&mut self, side_effect: SideEffect) {
        self.side_effect = side_effect;
    }

    /// Drops every successor; execution along this path stops here.
    pub fn clear_children(&mut self) {
        self.children.clear();
    }

    /// Replaces the exceptions raised by this instruction.
    pub fn set_exceptions(&mut self, exceptions: Vec<VirtualException>) {
        self.exceptions = exceptions;
    }
}

/// Arena of [`ExecutionNode`]s rooted at the method entry.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use smaliscope::context::{
///     ExecutionContext, ExecutionGraph, ExecutionNode, Heap, HeapItem, MethodState, Register,
/// };
/// use smaliscope::types::{ClassManager, MethodFlags, VirtualMethod};
///
/// let method = Arc::new(VirtualMethod::new("Lapp/A;->f()I", MethodFlags::STATIC)?.with_body(1));
/// let mut state = MethodState::for_method(&method);
/// state.assign_return_register(HeapItem::int(3));
/// let context = ExecutionContext::new(method.clone(), state, Arc::new(Heap::default()));
///
/// let graph = ExecutionGraph::new(
///     Arc::new(ClassManager::new()),
///     method,
///     ExecutionNode::new(0, context),
/// );
/// assert_eq!(graph.terminating_register_consensus(Register::Return), HeapItem::int(3));
/// # Ok::<(), smaliscope::Error>(())
/// ```
#[derive(Clone, Debug)]
pub struct ExecutionGraph {
    classes: Arc<ClassManager>,
    method: VirtualMethodRc,
    nodes: Vec<ExecutionNode>,
}

impl ExecutionGraph {
    /// Creates a graph containing only `root`.
    #[must_use]
    pub fn new(classes: Arc<ClassManager>, method: VirtualMethodRc, root: ExecutionNode) -> Self {
        ExecutionGraph {
            classes,
            method,
            nodes: vec![root],
        }
    }

    /// The entry node.
    #[must_use]
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// The method this graph executes.
    #[must_use]
    pub fn method(&self) -> &VirtualMethodRc {
        &self.method
    }

    /// Adds `node` as a successor of `parent`.
    ///
    /// Returns `None` if `parent` does not exist.
    pub fn add_child(&mut self, parent: NodeId, node: ExecutionNode) -> Option<NodeId> {
        if parent.0 >= self.nodes.len() {
            return None;
        }
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        self.nodes[parent.0].children.push(id);
        Some(id)
    }

    /// Looks up a node.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&ExecutionNode> {
        self.nodes.get(id.0)
    }

    /// Looks up a node mutably.
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut ExecutionNode> {
        self.nodes.get_mut(id.0)
    }

    /// Number of nodes, including ones cut off by [`ExecutionNode::clear_children`].
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always `false`, a graph has at least its root.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Reachable leaves that raised no exception.
    #[must_use]
    pub fn terminating_nodes(&self) -> Vec<&ExecutionNode> {
        let mut terminating = Vec::new();
        let mut visited = vec![false; self.nodes.len()];
        let mut pending = vec![self.root()];

        while let Some(id) = pending.pop() {
            let Some(node) = self.nodes.get(id.0) else {
                continue;
            };
            if std::mem::replace(&mut visited[id.0], true) {
                continue;
            }
            if node.children.is_empty() {
                if node.exceptions.is_empty() {
                    terminating.push(node);
                }
            } else {
                pending.extend(node.children.iter().rev().copied());
            }
        }
        terminating
    }

    /// Merges `register` across all terminating nodes.
    ///
    /// If every terminating node holds the same item, that item is returned.
    /// Otherwise the result is an unknown value of the narrowest type that
    /// covers all observed types. With no observed value at all, the result
    /// is an unknown of the register's declared type.
    #[must_use]
    pub fn terminating_register_consensus(&self, register: Register) -> HeapItem {
        let items: Vec<&HeapItem> = self
            .terminating_nodes()
            .into_iter()
            .filter_map(|node| node.context().state().get(register))
            .collect();

        let Some((first, rest)) = items.split_first() else {
            return HeapItem::unknown(self.declared_type(register));
        };
        if rest.iter().all(|item| *item == *first) {
            return (*first).clone();
        }

        let widened = rest.iter().fold(first.type_name().clone(), |acc, item| {
            self.widen(&acc, item.type_name())
        });
        if log::log_enabled!(log::Level::Trace) {
            log::trace!(
                "No consensus for {} in {} across {} paths, widened to {}",
                register,
                self.method,
                items.len(),
                widened
            );
        }
        HeapItem::unknown(widened)
    }

    fn widen(&self, a: &TypeName, b: &TypeName) -> TypeName {
        if a == b {
            a.clone()
        } else if name::is_int_like(a) && name::is_int_like(b) {
            TypeName::from("I")
        } else if name::is_object(a) && name::is_object(b) {
            self.classes.common_ancestor(a, b)
        } else {
            self.declared_type_or_object()
        }
    }

    fn declared_type_or_object(&self) -> TypeName {
        if self.method.returns_void() {
            TypeName::from(name::OBJECT)
        } else {
            self.method.return_type().clone()
        }
    }

    fn declared_type(&self, register: Register) -> TypeName {
        match register {
            Register::Return | Register::Result => self.method.return_type().clone(),
            Register::Index(index) => {
                let parameter_start = self
                    .method
                    .register_count()
                    .saturating_sub(self.method.parameter_size());
                self.method
                    .parameter_type_at(parameter_start, index)
                    .cloned()
                    .unwrap_or_else(|| TypeName::from(name::OBJECT))
            }
        }
    }

    /// Highest side-effect level over all nodes, [`SideEffect::None`] for a
    /// graph where nothing happened.
    #[must_use]
    pub fn highest_side_effect_level(&self) -> SideEffect {
        self.nodes
            .iter()
            .map(ExecutionNode::side_effect)
            .max()
            .unwrap_or(SideEffect::None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        context::{Heap, MethodState},
        types::{MethodFlags, VirtualMethod, VirtualType},
    };

    fn method(signature: &str) -> VirtualMethodRc {
        Arc::new(
            VirtualMethod::new(signature, MethodFlags::STATIC)
                .unwrap()
                .with_body(2),
        )
    }

    fn node_returning(method: &VirtualMethodRc, item: Option<HeapItem>) -> ExecutionNode {
        let mut state = MethodState::for_method(method);
        if let Some(item) = item {
            state.assign_return_register(item);
        }
        ExecutionNode::new(
            1,
            ExecutionContext::new(method.clone(), state, Arc::new(Heap::default())),
        )
    }

    fn branching(method: &VirtualMethodRc, a: HeapItem, b: HeapItem) -> ExecutionGraph {
        let classes = ClassManager::new();
        classes.register(VirtualType::new(name::OBJECT).framework());
        classes.register(VirtualType::new("Lapp/Base;").extends(name::OBJECT));
        classes.register(VirtualType::new("Lapp/Left;").extends("Lapp/Base;"));
        classes.register(VirtualType::new("Lapp/Right;").extends("Lapp/Base;"));

        let mut graph = ExecutionGraph::new(
            Arc::new(classes),
            method.clone(),
            node_returning(method, None),
        );
        let root = graph.root();
        graph.add_child(root, node_returning(method, Some(a))).unwrap();
        graph.add_child(root, node_returning(method, Some(b))).unwrap();
        graph
    }

    #[test]
    fn test_consensus_agree() {
        let m = method("Lapp/A;->f()I");
        let graph = branching(&m, HeapItem::int(5), HeapItem::int(5));
        assert_eq!(graph.terminating_register_consensus(Register::Return), HeapItem::int(5));
    }

    #[test]
    fn test_consensus_disagree_int_like() {
        let m = method("Lapp/A;->f()I");
        let graph = branching(
            &m,
            HeapItem::int(5),
            HeapItem::new(crate::context::Value::Boolean(true), "Z"),
        );
        let consensus = graph.terminating_register_consensus(Register::Return);
        assert!(consensus.is_unknown());
        assert_eq!(&**consensus.type_name(), "I");
    }

    #[test]
    fn test_consensus_disagree_references_widen() {
        let m = method("Lapp/A;->f()Ljava/lang/Object;");
        let graph = branching(
            &m,
            HeapItem::unknown("Lapp/Left;"),
            HeapItem::unknown("Lapp/Right;"),
        );
        let consensus = graph.terminating_register_consensus(Register::Return);
        assert!(consensus.is_unknown());
        assert_eq!(&**consensus.type_name(), "Lapp/Base;");
    }

    #[test]
    fn test_consensus_ignores_exceptional_paths() {
        let m = method("Lapp/A;->f()I");
        let mut graph = branching(&m, HeapItem::int(1), HeapItem::int(2));
        let failing = graph.node(graph.root()).unwrap().children()[1];
        graph
            .node_mut(failing)
            .unwrap()
            .set_exceptions(vec![VirtualException::without_message(
                "Ljava/lang/RuntimeException;",
            )]);
        assert_eq!(graph.terminating_register_consensus(Register::Return), HeapItem::int(1));
    }

    #[test]
    fn test_consensus_without_values_uses_declared_type() {
        let m = method("Lapp/A;->f(J)Ljava/lang/String;");
        let graph = ExecutionGraph::new(
            Arc::new(ClassManager::new()),
            m.clone(),
            node_returning(&m, None),
        );
        let consensus = graph.terminating_register_consensus(Register::Return);
        assert!(consensus.is_unknown());
        assert_eq!(&**consensus.type_name(), name::STRING);
        let parameter = graph.terminating_register_consensus(Register::Index(0));
        assert_eq!(&**parameter.type_name(), "J");
    }

    #[test]
    fn test_clear_children_makes_node_terminating() {
        let m = method("Lapp/A;->f()I");
        let mut graph = branching(&m, HeapItem::int(1), HeapItem::int(2));
        let root = graph.root();
        graph.node_mut(root).unwrap().clear_children();
        assert_eq!(graph.terminating_nodes().len(), 1);
        assert_eq!(graph.len(), 3);
    }

    #[test]
    fn test_highest_side_effect_level() {
        let m = method("Lapp/A;->f()I");
        let mut graph = branching(&m, HeapItem::int(1), HeapItem::int(1));
        assert_eq!(graph.highest_side_effect_level(), SideEffect::None);
        let root = graph.root();
        let child = graph.node(root).unwrap().children()[0];
        graph.node_mut(child).unwrap().set_side_effect(SideEffect::Weak);
        assert_eq!(graph.highest_side_effect_level(), SideEffect::Weak);
    }
}
