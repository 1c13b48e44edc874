//! File system scanner module.
//!
//! Finds the documentation sources below a root and maps each one to the
//! logical path it is served under.

mod walker;

pub use walker::{FileEntry, Walker};

use crate::tree::SEPARATOR;
use crate::IndexerError;
use std::path::{Component, Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

/// Extension of indexable documentation files.
pub const DOC_EXTENSION: &str = ".md";

/// Options for scanning a checkout.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Maximum file size to index in bytes (larger files are skipped)
    pub max_file_size: u64,
    /// Whether to follow directory symlinks
    pub follow_symlinks: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            max_file_size: 10 * 1024 * 1024, // 10MB
            follow_symlinks: false,
        }
    }
}

/// Result of scanning a checkout.
#[derive(Debug, Clone)]
pub struct ScanResult {
    /// Indexable files in lexical depth-first order
    pub files: Vec<SourceFile>,
    /// Number of candidate files skipped (too large, unmappable name)
    pub skipped_count: usize,
}

/// A documentation file selected for indexing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Absolute path on disk
    pub path: PathBuf,
    /// Canonical lookup key, e.g. `/guides/setup`
    pub logical_path: String,
    /// File size in bytes
    pub size: u64,
}

/// Scanner selecting documentation files below a root.
pub struct Scanner {
    options: ScanOptions,
}

impl Scanner {
    /// Create a new scanner with default options.
    pub fn new() -> Self {
        Self {
            options: ScanOptions::default(),
        }
    }

    /// Create a scanner with custom options.
    pub fn with_options(options: ScanOptions) -> Self {
        Self { options }
    }

    /// Scan a directory and return the indexable files.
    ///
    /// Fails only if the root itself cannot be walked.
    pub fn scan(&self, root: &Path) -> Result<ScanResult, IndexerError> {
        let start = Instant::now();

        check_root(root)?;

        info!(path = ?root, "Starting scan");

        let entries = Walker::new(root, self.options.follow_symlinks).walk();

        let mut files = Vec::new();
        let mut skipped = 0;

        for entry in entries {
            if !is_indexable(&entry.path) {
                continue;
            }

            if entry.size > self.options.max_file_size {
                debug!(path = ?entry.path, size = entry.size, "Skipping large file");
                skipped += 1;
                continue;
            }

            let Some(logical_path) = logical_path(root, &entry.path) else {
                debug!(path = ?entry.path, "Skipping file without a usable name");
                skipped += 1;
                continue;
            };

            files.push(SourceFile {
                path: entry.path,
                logical_path,
                size: entry.size,
            });
        }

        let duration = start.elapsed();

        info!(
            files = files.len(),
            skipped = skipped,
            duration_ms = duration.as_millis(),
            "Scan complete"
        );

        Ok(ScanResult {
            files,
            skipped_count: skipped,
        })
    }
}

impl Default for Scanner {
    fn default() -> Self {
        Self::new()
    }
}

/// Make sure the root exists and is a directory.
fn check_root(root: &Path) -> Result<(), IndexerError> {
    let metadata = std::fs::metadata(root).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => IndexerError::NotFound(root.to_path_buf()),
        _ => IndexerError::Io(e),
    })?;

    if !metadata.is_dir() {
        return Err(IndexerError::NotADirectory(root.to_path_buf()));
    }

    Ok(())
}

/// Check whether a file name marks a documentation source.
pub fn is_indexable(path: &Path) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy().to_lowercase().ends_with(DOC_EXTENSION))
        .unwrap_or(false)
}

/// Compute the logical path of a file below `root`.
///
/// The path relative to the root is joined with `/`, prefixed with `/`,
/// lower-cased and stripped of its extension. Returns `None` when the file
/// is not below the root or its name is nothing but the extension.
pub fn logical_path(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;

    let mut logical = String::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => {
                logical.push(SEPARATOR);
                logical.push_str(&part.to_string_lossy());
            }
            _ => return None,
        }
    }

    let logical = logical.to_lowercase();
    let logical = logical.strip_suffix(DOC_EXTENSION).unwrap_or(&logical);

    if logical.is_empty() || logical.ends_with(SEPARATOR) {
        return None;
    }

    Some(logical.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_is_indexable() {
        assert!(is_indexable(Path::new("/docs/readme.md")));
        assert!(is_indexable(Path::new("/docs/README.MD")));
        assert!(!is_indexable(Path::new("/docs/notes.txt")));
        assert!(!is_indexable(Path::new("/docs/md")));
    }

    #[test]
    fn test_logical_path() {
        let root = Path::new("/srv/docs");

        assert_eq!(
            logical_path(root, Path::new("/srv/docs/root.md")),
            Some("/root".to_string())
        );
        assert_eq!(
            logical_path(root, Path::new("/srv/docs/Guides/Setup.MD")),
            Some("/guides/setup".to_string())
        );
    }

    #[test]
    fn test_logical_path_keeps_root_case() {
        // Only the part below the root is lower-cased
        let root = Path::new("/Srv/Docs");
        assert_eq!(
            logical_path(root, Path::new("/Srv/Docs/First/One.md")),
            Some("/first/one".to_string())
        );
    }

    #[test]
    fn test_logical_path_rejects_bare_extension() {
        let root = Path::new("/srv/docs");
        assert_eq!(logical_path(root, Path::new("/srv/docs/.md")), None);
        assert_eq!(logical_path(root, Path::new("/srv/docs/guides/.md")), None);
    }

    #[test]
    fn test_logical_path_outside_root() {
        let root = Path::new("/srv/docs");
        assert_eq!(logical_path(root, Path::new("/elsewhere/a.md")), None);
        assert_eq!(logical_path(root, root), None);
    }

    #[test]
    fn test_scan_missing_root() {
        let temp_dir = tempdir().unwrap();
        let missing = temp_dir.path().join("missing");

        let result = Scanner::new().scan(&missing);
        assert!(matches!(result, Err(IndexerError::NotFound(_))));
    }

    #[test]
    fn test_scan_root_is_file() {
        let temp_dir = tempdir().unwrap();
        let file = temp_dir.path().join("file.md");
        fs::write(&file, "# hi").unwrap();

        let result = Scanner::new().scan(&file);
        assert!(matches!(result, Err(IndexerError::NotADirectory(_))));
    }

    #[test]
    fn test_scan_selects_markdown_only() {
        let temp_dir = tempdir().unwrap();

        fs::write(temp_dir.path().join("root.md"), "# root").unwrap();
        fs::write(temp_dir.path().join("notes.txt"), "plain").unwrap();
        fs::create_dir(temp_dir.path().join("first")).unwrap();
        fs::write(temp_dir.path().join("first/One.md"), "# one").unwrap();
        fs::create_dir(temp_dir.path().join("empty")).unwrap();

        let result = Scanner::new().scan(temp_dir.path()).unwrap();
        let paths: Vec<_> = result.files.iter().map(|f| f.logical_path.as_str()).collect();

        assert_eq!(paths, vec!["/first/one", "/root"]);
        assert_eq!(result.skipped_count, 0);
    }

    #[test]
    fn test_scan_skips_large_files() {
        let temp_dir = tempdir().unwrap();

        fs::write(temp_dir.path().join("small.md"), "# s").unwrap();
        fs::write(temp_dir.path().join("large.md"), "x".repeat(64)).unwrap();

        let options = ScanOptions {
            max_file_size: 16,
            ..Default::default()
        };
        let result = Scanner::with_options(options).scan(temp_dir.path()).unwrap();

        assert_eq!(result.files.len(), 1);
        assert_eq!(result.files[0].logical_path, "/small");
        assert_eq!(result.skipped_count, 1);
    }

    #[test]
    fn test_scan_options_default() {
        let opts = ScanOptions::default();
        assert_eq!(opts.max_file_size, 10 * 1024 * 1024);
        assert!(!opts.follow_symlinks);
    }
}
