//! Shared handle to the currently served page index.

use crate::index::{Page, PageIndex};
use crate::tree::DirectoryNode;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::info;

#[derive(Debug)]
struct Installed {
    index: Arc<PageIndex>,
    generation: u64,
}

/// Publishes page indexes to concurrent readers.
///
/// Cloning the store yields another handle to the same slot. Installing a
/// new index swaps a single `Arc`, so a reader sees either the old index or
/// the new one in full.
#[derive(Debug, Clone)]
pub struct PageStore {
    slot: Arc<RwLock<Installed>>,
}

impl PageStore {
    /// Create a store serving an empty index.
    pub fn new() -> Self {
        Self::with_index(PageIndex::empty())
    }

    /// Create a store serving the given index.
    pub fn with_index(index: PageIndex) -> Self {
        Self {
            slot: Arc::new(RwLock::new(Installed {
                index: Arc::new(index),
                generation: 0,
            })),
        }
    }

    /// Current index. The returned snapshot stays valid after later installs.
    pub fn current(&self) -> Arc<PageIndex> {
        self.slot.read().index.clone()
    }

    /// Replace the served index, returning the new generation.
    pub fn install(&self, index: PageIndex) -> u64 {
        let pages = index.len();
        let index = Arc::new(index);

        let generation = {
            let mut slot = self.slot.write();
            slot.index = index;
            slot.generation += 1;
            slot.generation
        };

        info!(generation = generation, pages = pages, "Installed page index");

        generation
    }

    /// Number of indexes installed since creation.
    pub fn generation(&self) -> u64 {
        self.slot.read().generation
    }

    /// Navigation tree of the current index.
    pub fn list_tree(&self) -> Vec<DirectoryNode> {
        self.current().tree().to_vec()
    }

    /// Look up a page in the current index.
    pub fn get_page(&self, logical_path: &str) -> Option<Page> {
        self.current().lookup(logical_path).cloned()
    }
}

impl Default for PageStore {
    fn default() -> Self {
        Self::new()
    }
}
