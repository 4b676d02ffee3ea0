use crate::index::NodeOffset;
use std::sync::Arc;

/// Child of a node, keyed on the character adjacent to the parent's string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeChild {
    pub key: u8,
    pub node: NodeOffset,
}

/// Child of a node whose edge label is a purely numeric substring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumericChild {
    pub value: u32,
    pub node: NodeOffset,
}

/// Element of the signature trie.
///
/// A node represents the substring of the target string that starts at
/// [`Node::position`]. Tries are rooted per end position and grow to the
/// left: a child prepends its edge label to the parent's string. Nodes
/// that belong to at least one signature are complete and list the ranked
/// indexes of those signatures.
#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) offset: NodeOffset,
    pub(crate) position: i16,
    pub(crate) parent: Option<NodeOffset>,
    pub(crate) characters: Option<Arc<[u8]>>,
    pub(crate) ranked_signatures: Vec<u32>,
    pub(crate) children: Vec<NodeChild>,
    pub(crate) numeric_children: Vec<NumericChild>,
}

impl Node {
    #[must_use]
    pub fn offset(&self) -> NodeOffset {
        self.offset
    }

    /// Index of the first character of the node within the target string.
    #[must_use]
    pub fn position(&self) -> usize {
        usize::try_from(self.position).unwrap_or_default()
    }

    #[must_use]
    pub fn parent(&self) -> Option<NodeOffset> {
        self.parent
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Full string represented by the node, empty for roots.
    #[must_use]
    pub fn characters(&self) -> &[u8] {
        self.characters.as_deref().unwrap_or_default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.characters().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Position right after the last character of the node.
    #[must_use]
    pub fn end(&self) -> usize {
        self.position() + self.len()
    }

    /// A node is complete when at least one signature contains it.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.ranked_signatures.is_empty()
    }

    /// Ranked indexes of the signatures containing this node, ascending.
    #[must_use]
    pub fn ranked_signatures(&self) -> &[u32] {
        &self.ranked_signatures
    }

    #[must_use]
    pub fn children(&self) -> &[NodeChild] {
        &self.children
    }

    #[must_use]
    pub fn numeric_children(&self) -> &[NumericChild] {
        &self.numeric_children
    }

    /// Child whose edge label ends with `key`.
    #[must_use]
    pub fn child(&self, key: u8) -> Option<NodeOffset> {
        self.children
            .binary_search_by_key(&key, |child| child.key)
            .ok()
            .map(|idx| self.children[idx].node)
    }

    /// `true` if `target` holds this node's characters at its position.
    #[must_use]
    pub fn matches(&self, target: &[u8]) -> bool {
        target
            .get(self.position()..self.end())
            .is_some_and(|window| window == self.characters())
    }
}
