//! File system walker over a documentation checkout.

use ignore::{WalkBuilder, WalkState};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use tracing::{debug, warn};

/// Directory holding version control metadata, never indexed.
const VCS_DIR: &str = ".git";

/// A discovered file entry.
#[derive(Debug, Clone)]
pub struct FileEntry {
    /// Absolute path to the file
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
}

/// File system walker that visits every file below a root.
///
/// Ignore files and hidden-file rules are not applied: every file that is
/// part of the checkout is a candidate. Only the `.git` directory is pruned.
pub struct Walker {
    root: PathBuf,
    follow_symlinks: bool,
}

impl Walker {
    /// Create a new walker for the given root directory.
    pub fn new(root: &Path, follow_symlinks: bool) -> Self {
        Self {
            root: root.to_path_buf(),
            follow_symlinks,
        }
    }

    /// Walk the directory tree and return all discovered files.
    ///
    /// Entries that cannot be read are logged and skipped. The result is
    /// sorted by path, which yields a lexical depth-first order.
    pub fn walk(&self) -> Vec<FileEntry> {
        let (tx, rx) = mpsc::channel();

        let walker = WalkBuilder::new(&self.root)
            .follow_links(self.follow_symlinks)
            .standard_filters(false)
            .filter_entry(|entry| entry.file_name() != VCS_DIR)
            .build_parallel();

        walker.run(|| {
            let tx = tx.clone();
            Box::new(move |result| {
                match result {
                    Ok(entry) => {
                        // Symlinks are followed for files even when directory
                        // links are not, so `metadata` goes through the link.
                        match std::fs::metadata(entry.path()) {
                            Ok(metadata) if metadata.is_file() => {
                                let _ = tx.send(FileEntry {
                                    path: entry.path().to_path_buf(),
                                    size: metadata.len(),
                                });
                            }
                            Ok(_) => {}
                            Err(e) => {
                                warn!(path = ?entry.path(), error = %e, "Unable to read path");
                            }
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "Walk error");
                    }
                }
                WalkState::Continue
            })
        });

        // Drop the original sender so the receiver knows when we're done
        drop(tx);

        let mut entries: Vec<FileEntry> = rx.into_iter().collect();
        entries.sort_by(|a, b| a.path.cmp(&b.path));

        debug!(root = ?self.root, count = entries.len(), "Walk complete");

        entries
    }
}
