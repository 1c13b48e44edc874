//! Navigation tree for indexed pages.
//!
//! Provides the hierarchical representation of logical paths used to
//! browse the documentation, built lazily from the pages that exist.

mod builder;

pub use builder::{Placement, TreeBuilder};

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

/// Path separator used inside logical paths.
pub const SEPARATOR: char = '/';

/// Icon shown for a collapsed branch.
pub const BRANCH_ICON: &str = "keyboard_arrow_up";

/// Icon shown for an expanded branch.
pub const BRANCH_ICON_ALT: &str = "keyboard_arrow_down";

/// Icon shown for a document.
pub const LEAF_ICON: &str = "note";

/// A node in the navigation tree.
///
/// On the wire every node carries the full key set the front end expects:
/// branches have an empty `path`, leaves have `children: null`, and
/// `model` is always `false`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "WireNode")]
pub struct DirectoryNode {
    /// Display text for this path segment
    pub label: String,

    /// Icon for the default state
    pub icon: String,

    /// Icon for the alternate (expanded) state
    pub icon_alt: String,

    /// Branch or leaf payload
    pub kind: NodeKind,
}

/// Kind of tree node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// Intermediate segment holding further nodes
    Branch {
        /// Children, unique by label, in first-insertion order
        children: Vec<DirectoryNode>,
    },

    /// Document segment pointing at a page
    Leaf {
        /// Logical path of the page
        path: String,
    },
}

impl DirectoryNode {
    /// Create an empty branch node.
    pub fn branch(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            icon: BRANCH_ICON.to_string(),
            icon_alt: BRANCH_ICON_ALT.to_string(),
            kind: NodeKind::Branch {
                children: Vec::new(),
            },
        }
    }

    /// Create a leaf node for a logical path.
    pub fn leaf(label: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            icon: LEAF_ICON.to_string(),
            icon_alt: LEAF_ICON.to_string(),
            kind: NodeKind::Leaf { path: path.into() },
        }
    }

    /// Check if this is a branch node.
    pub fn is_branch(&self) -> bool {
        matches!(self.kind, NodeKind::Branch { .. })
    }

    /// Check if this is a leaf node.
    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf { .. })
    }

    /// Get the logical path if this is a leaf.
    pub fn path(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Leaf { path } => Some(path),
            NodeKind::Branch { .. } => None,
        }
    }

    /// Get the children of this node (always empty for leaves).
    pub fn children(&self) -> &[DirectoryNode] {
        match &self.kind {
            NodeKind::Branch { children } => children,
            NodeKind::Leaf { .. } => &[],
        }
    }

}

impl Serialize for DirectoryNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut node = serializer.serialize_struct("DirectoryNode", 6)?;
        match &self.kind {
            NodeKind::Branch { children } => {
                node.serialize_field("children", children)?;
            }
            NodeKind::Leaf { .. } => {
                node.serialize_field("children", &None::<Vec<DirectoryNode>>)?;
            }
        }
        node.serialize_field("icon", &self.icon)?;
        node.serialize_field("icon-alt", &self.icon_alt)?;
        node.serialize_field("model", &false)?;
        node.serialize_field("path", self.path().unwrap_or_default())?;
        node.serialize_field("text", &self.label)?;
        node.end()
    }
}

/// Serialized form of a node. `children` present means branch.
#[derive(Deserialize)]
struct WireNode {
    #[serde(default)]
    children: Option<Vec<DirectoryNode>>,
    icon: String,
    #[serde(rename = "icon-alt")]
    icon_alt: String,
    #[serde(default)]
    path: String,
    text: String,
}

impl From<WireNode> for DirectoryNode {
    fn from(wire: WireNode) -> Self {
        let kind = match wire.children {
            Some(children) => NodeKind::Branch { children },
            None => NodeKind::Leaf { path: wire.path },
        };
        Self {
            label: wire.text,
            icon: wire.icon,
            icon_alt: wire.icon_alt,
            kind,
        }
    }
}

/// Find a node by following labels from a top-level sequence.
pub fn find_by_labels<'a>(nodes: &'a [DirectoryNode], labels: &[&str]) -> Option<&'a DirectoryNode> {
    let (first, rest) = labels.split_first()?;
    let node = nodes.iter().find(|n| n.label == *first)?;
    if rest.is_empty() {
        Some(node)
    } else {
        find_by_labels(node.children(), rest)
    }
}

/// Split a logical path into its segments, ignoring leading and
/// trailing separators.
pub fn tokenise(path: &str) -> Vec<&str> {
    path.trim_matches(SEPARATOR).split(SEPARATOR).collect()
}

/// Title-case a path token for display.
///
/// The first letter of every word is upper-cased; the rest of the word is
/// left untouched. Words are broken on anything that is not a letter,
/// digit or underscore.
pub fn title_case(token: &str) -> String {
    let mut out = String::with_capacity(token.len());
    let mut prev_separator = true;

    for c in token.chars() {
        if prev_separator {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        prev_separator = is_word_separator(c);
    }

    out
}

fn is_word_separator(c: char) -> bool {
    if c.is_ascii() {
        return !(c.is_ascii_alphanumeric() || c == '_');
    }
    if c.is_alphanumeric() {
        return false;
    }
    c.is_whitespace()
}
