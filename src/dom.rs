//! Minimal node tree used as the hit-testing model for overlays.
//!
//! Nodes live in an arena and only record their parent, which is all the
//! containment query needs. Ids are never reused, so a stale id held by an
//! overlay keeps answering "not contained" after its subtree is removed.

use std::fmt;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u32);

impl NodeId {
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DomError {
    #[error("node {0} does not exist")]
    UnknownNode(NodeId),
    #[error("node {0} is detached from the document")]
    Detached(NodeId),
}

#[derive(Debug, Clone)]
struct NodeData {
    parent: Option<NodeId>,
    attached: bool,
    label: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NodeTree {
    nodes: Vec<NodeData>,
}

impl Default for NodeTree {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeTree {
    /// Create a tree holding only the root node.
    pub fn new() -> Self {
        Self {
            nodes: vec![NodeData {
                parent: None,
                attached: true,
                label: Some("body".to_string()),
            }],
        }
    }

    pub const fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn append_child(&mut self, parent: NodeId) -> Result<NodeId, DomError> {
        self.append_labeled(parent, None)
    }

    pub fn append_labeled(
        &mut self,
        parent: NodeId,
        label: Option<&str>,
    ) -> Result<NodeId, DomError> {
        let data = self
            .nodes
            .get(parent.index())
            .ok_or(DomError::UnknownNode(parent))?;
        if !data.attached {
            return Err(DomError::Detached(parent));
        }
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(NodeData {
            parent: Some(parent),
            attached: true,
            label: label.map(str::to_owned),
        });
        Ok(id)
    }

    /// Detach `node` and its whole subtree. Removing the root or an unknown
    /// node does nothing and returns `false`.
    pub fn remove(&mut self, node: NodeId) -> bool {
        if node == self.root() || !self.is_attached(node) {
            return false;
        }
        // Children always have larger ids than their parent, so a single
        // forward pass sees every parent's state before its descendants.
        self.nodes[node.index()].attached = false;
        for idx in node.index() + 1..self.nodes.len() {
            if let Some(parent) = self.nodes[idx].parent
                && !self.nodes[parent.index()].attached
            {
                self.nodes[idx].attached = false;
            }
        }
        true
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node.index()).and_then(|n| n.parent)
    }

    pub fn label(&self, node: NodeId) -> Option<&str> {
        self.nodes.get(node.index()).and_then(|n| n.label.as_deref())
    }

    pub fn is_attached(&self, node: NodeId) -> bool {
        self.nodes.get(node.index()).is_some_and(|n| n.attached)
    }

    /// Walk from `node` up to the root, starting with `node` itself.
    pub fn ancestors(&self, node: NodeId) -> Ancestors<'_> {
        Ancestors {
            tree: self,
            next: self.nodes.get(node.index()).map(|_| node),
        }
    }

    /// Whether `node` is `ancestor` or one of its descendants. Detached nodes
    /// are contained by nothing, and contain nothing.
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        if !self.is_attached(ancestor) || !self.is_attached(node) {
            return false;
        }
        self.ancestors(node).any(|n| n == ancestor)
    }
}

pub struct Ancestors<'a> {
    tree: &'a NodeTree,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.tree.parent(current);
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contains_is_reflexive_and_follows_parents() {
        let mut tree = NodeTree::new();
        let root = tree.root();
        let a = tree.append_child(root).unwrap();
        let b = tree.append_child(a).unwrap();
        let c = tree.append_child(root).unwrap();

        assert!(tree.contains(a, a));
        assert!(tree.contains(a, b));
        assert!(tree.contains(root, b));
        assert!(!tree.contains(b, a));
        assert!(!tree.contains(c, b));
    }

    #[test]
    fn remove_detaches_subtree() {
        let mut tree = NodeTree::new();
        let root = tree.root();
        let a = tree.append_child(root).unwrap();
        let b = tree.append_child(a).unwrap();
        let sibling = tree.append_child(root).unwrap();

        assert!(tree.remove(a));
        assert!(!tree.is_attached(a));
        assert!(!tree.is_attached(b));
        assert!(tree.is_attached(sibling));
        assert!(!tree.contains(root, b));
        // second removal is a no-op
        assert!(!tree.remove(a));
    }

    #[test]
    fn root_cannot_be_removed() {
        let mut tree = NodeTree::new();
        assert!(!tree.remove(tree.root()));
        assert!(tree.is_attached(tree.root()));
    }

    #[test]
    fn append_rejects_unknown_and_detached_parents() {
        let mut tree = NodeTree::new();
        let a = tree.append_child(tree.root()).unwrap();
        tree.remove(a);
        assert_eq!(tree.append_child(a), Err(DomError::Detached(a)));
        let bogus = NodeId(99);
        assert_eq!(tree.append_child(bogus), Err(DomError::UnknownNode(bogus)));
    }

    #[test]
    fn ancestors_walks_to_root() {
        let mut tree = NodeTree::new();
        let a = tree.append_labeled(tree.root(), Some("popup")).unwrap();
        let b = tree.append_child(a).unwrap();
        let chain: Vec<_> = tree.ancestors(b).collect();
        assert_eq!(chain, vec![b, a, tree.root()]);
        assert_eq!(tree.label(a), Some("popup"));
        assert_eq!(tree.label(tree.root()), Some("body"));
    }
}
