//! Full rebuild of a page index from a directory of sources.

use crate::index::{Page, PageIndex};
use crate::render::{MarkdownRenderer, Renderer};
use crate::scanner::{ScanOptions, Scanner, SourceFile};
use crate::IndexerError;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Turns a checkout into a [`PageIndex`].
#[derive(Clone)]
pub struct Indexer {
    renderer: Arc<dyn Renderer>,
    options: ScanOptions,
}

impl Indexer {
    /// Create an indexer using the markdown renderer.
    pub fn new() -> Self {
        Self::with_renderer(Arc::new(MarkdownRenderer::new()))
    }

    /// Create an indexer with a custom renderer.
    pub fn with_renderer(renderer: Arc<dyn Renderer>) -> Self {
        Self {
            renderer,
            options: ScanOptions::default(),
        }
    }

    /// Override scan options.
    pub fn with_options(mut self, options: ScanOptions) -> Self {
        self.options = options;
        self
    }

    /// Rebuild the whole index from `base_path`.
    ///
    /// Fails only if the root cannot be walked. Files that cannot be read
    /// or rendered are logged and left out.
    pub fn rebuild(&self, base_path: &Path) -> Result<PageIndex, IndexerError> {
        let start = Instant::now();

        let scan = Scanner::with_options(self.options.clone()).scan(base_path)?;

        let mut builder = PageIndex::builder();
        let mut skipped = scan.skipped_count;

        for file in &scan.files {
            match self.build_page(file) {
                Ok(page) => {
                    if !builder.insert(&file.logical_path, page) {
                        skipped += 1;
                    }
                }
                Err(e) => {
                    warn!(path = ?file.path, error = %e, "Unable to build page, skipping");
                    skipped += 1;
                }
            }
        }

        let index = builder.build();

        info!(
            root = ?base_path,
            pages = index.len(),
            skipped = skipped,
            duration_ms = start.elapsed().as_millis(),
            "Index rebuilt"
        );

        Ok(index)
    }

    /// Read and render one source file.
    fn build_page(&self, file: &SourceFile) -> Result<Page, IndexerError> {
        let raw = std::fs::read(&file.path)?;
        let content = self
            .renderer
            .render(&raw)
            .map_err(|e| IndexerError::render(&file.path, e.to_string()))?;

        debug!(path = %file.logical_path, bytes = file.size, "Rendered page");

        Ok(Page::new(&file.logical_path, content))
    }
}

impl Default for Indexer {
    fn default() -> Self {
        Self::new()
    }
}
