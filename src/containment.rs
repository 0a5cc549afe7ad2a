//! Containment queries used for overlay hit-testing.

use crate::dom::{NodeId, NodeTree};

/// Answers whether `node` is `root` itself or lies inside `root`'s subtree.
///
/// Any `Fn(&N, &N) -> bool` works as a containment predicate, which keeps
/// the dispatcher testable against hand-written relations.
pub trait Containment<N> {
    fn contains(&self, root: &N, node: &N) -> bool;
}

impl<N, F> Containment<N> for F
where
    F: Fn(&N, &N) -> bool,
{
    fn contains(&self, root: &N, node: &N) -> bool {
        self(root, node)
    }
}

impl Containment<NodeId> for NodeTree {
    fn contains(&self, root: &NodeId, node: &NodeId) -> bool {
        NodeTree::contains(self, *root, *node)
    }
}
