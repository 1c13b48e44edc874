//! Tree builder from logical paths.

use super::{title_case, tokenise, DirectoryNode, NodeKind};
use tracing::debug;

/// Result of placing a logical path into the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// A new leaf was created for the path
    Added,
    /// A leaf for this exact path already existed
    Existing,
    /// The path's shape clashes with a node placed earlier
    Conflict,
}

/// Builds the navigation tree one logical path at a time.
///
/// Nodes are created lazily, only when a path needs them, and keep
/// first-insertion order. Labels that title-case to the same text share a
/// node; the first path to claim a label decides whether it is a branch or
/// a leaf.
#[derive(Debug, Default)]
pub struct TreeBuilder {
    nodes: Vec<DirectoryNode>,
}

impl TreeBuilder {
    /// Create a new, empty tree builder.
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    /// Place a logical path into the tree.
    pub fn place(&mut self, logical_path: &str) -> Placement {
        let tokens = tokenise(logical_path);
        let placement = place_in(&mut self.nodes, &tokens, logical_path);

        debug!(path = %logical_path, placement = ?placement, "Placed path");

        placement
    }

    /// Top-level nodes built so far.
    pub fn nodes(&self) -> &[DirectoryNode] {
        &self.nodes
    }

    /// Consume the builder and return the top-level nodes.
    pub fn finish(self) -> Vec<DirectoryNode> {
        self.nodes
    }
}

/// Recursive descent over one level of the tree.
///
/// `logical_path` is carried through unchanged so leaves always store the
/// full path rather than the remaining suffix.
fn place_in(nodes: &mut Vec<DirectoryNode>, tokens: &[&str], logical_path: &str) -> Placement {
    let Some((first, rest)) = tokens.split_first() else {
        return Placement::Conflict;
    };

    let label = title_case(first);
    let (index, created) = match nodes.iter().position(|n| n.label == label) {
        Some(index) => (index, false),
        None => {
            let node = if rest.is_empty() {
                DirectoryNode::leaf(label, logical_path)
            } else {
                DirectoryNode::branch(label)
            };
            nodes.push(node);
            (nodes.len() - 1, true)
        }
    };

    match (&mut nodes[index].kind, rest.is_empty()) {
        (NodeKind::Leaf { .. }, true) if created => Placement::Added,
        (NodeKind::Leaf { path }, true) if path == logical_path => Placement::Existing,
        (NodeKind::Leaf { .. }, _) => Placement::Conflict,
        (NodeKind::Branch { .. }, true) => Placement::Conflict,
        (NodeKind::Branch { children }, false) => place_in(children, rest, logical_path),
    }
}
