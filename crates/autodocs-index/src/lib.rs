//! auto-docs Index
//!
//! This crate provides the page index behind auto-docs, including:
//! - Walking a documentation checkout and selecting markdown sources
//! - Rendering markdown to HTML
//! - Building the navigation tree and page lookup table
//! - Publishing whole index snapshots to concurrent readers

mod error;
mod index;
mod indexer;
pub mod render;
pub mod scanner;
mod store;
pub mod tree;

pub use error::IndexerError;
pub use index::{IndexSnapshot, Page, PageIndex, PageIndexBuilder};
pub use indexer::Indexer;
pub use render::{MarkdownRenderer, RenderError, Renderer};
pub use scanner::{ScanOptions, ScanResult, Scanner, SourceFile};
pub use store::PageStore;
pub use tree::{DirectoryNode, NodeKind, TreeBuilder};
