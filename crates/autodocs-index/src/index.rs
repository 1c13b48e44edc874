//! Queryable page index.
//!
//! A [`PageIndex`] is an immutable snapshot: the flat table of rendered
//! pages plus the navigation tree over them. New snapshots are produced by
//! [`PageIndexBuilder`] and replace old ones wholesale.

use crate::tree::{tokenise, DirectoryNode, Placement, TreeBuilder};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

/// A single rendered document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// Last segment of the logical path
    pub name: String,

    /// Rendered HTML
    pub content: String,
}

impl Page {
    /// Create a page for a logical path, naming it after the last segment.
    pub fn new(logical_path: &str, content: impl Into<String>) -> Self {
        let name = tokenise(logical_path).last().copied().unwrap_or_default();
        Self {
            name: name.to_string(),
            content: content.into(),
        }
    }
}

/// Read-only view of a whole index.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct IndexSnapshot<'a> {
    /// Top-level navigation nodes
    #[serde(rename = "pages")]
    pub tree: &'a [DirectoryNode],
}

/// Immutable page index.
#[derive(Debug, Clone)]
pub struct PageIndex {
    tree: Vec<DirectoryNode>,
    pages: HashMap<String, Page>,
    built_at: DateTime<Utc>,
}

impl PageIndex {
    /// Create an index with no pages.
    pub fn empty() -> Self {
        Self {
            tree: Vec::new(),
            pages: HashMap::new(),
            built_at: Utc::now(),
        }
    }

    /// Start building a new index.
    pub fn builder() -> PageIndexBuilder {
        PageIndexBuilder::new()
    }

    /// Look up a page by logical path.
    pub fn lookup(&self, logical_path: &str) -> Option<&Page> {
        self.pages.get(logical_path)
    }

    /// Serializable view of the navigation tree.
    pub fn snapshot(&self) -> IndexSnapshot<'_> {
        IndexSnapshot {
            tree: &self.tree,
        }
    }

    /// Top-level navigation nodes.
    pub fn tree(&self) -> &[DirectoryNode] {
        &self.tree
    }

    /// All pages keyed by logical path.
    pub fn pages(&self) -> &HashMap<String, Page> {
        &self.pages
    }

    /// Number of pages.
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    /// Check if the index has no pages.
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// When this index was built.
    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }
}

impl Default for PageIndex {
    fn default() -> Self {
        Self::empty()
    }
}

/// Accumulates pages and their tree placement for one rebuild.
#[derive(Debug, Default)]
pub struct PageIndexBuilder {
    tree: TreeBuilder,
    pages: HashMap<String, Page>,
}

impl PageIndexBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self {
            tree: TreeBuilder::new(),
            pages: HashMap::new(),
        }
    }

    /// Add a page under its logical path.
    ///
    /// Returns `false` when the path clashes with the tree shape claimed by
    /// an earlier page; the page is then left out so every page keeps
    /// exactly one leaf. Re-adding an existing path replaces its content.
    pub fn insert(&mut self, logical_path: &str, page: Page) -> bool {
        match self.tree.place(logical_path) {
            Placement::Added | Placement::Existing => {
                self.pages.insert(logical_path.to_string(), page);
                true
            }
            Placement::Conflict => {
                warn!(path = %logical_path, "Path clashes with an existing tree node, skipping");
                false
            }
        }
    }

    /// Number of pages added so far.
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    /// Check if no pages were added.
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Finish the index.
    pub fn build(self) -> PageIndex {
        PageIndex {
            tree: self.tree.finish(),
            pages: self.pages,
            built_at: Utc::now(),
        }
    }
}
