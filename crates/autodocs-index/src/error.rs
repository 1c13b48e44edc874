//! Indexer error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during indexing operations.
///
/// Only failures that stop a rebuild from starting are surfaced this way.
/// Problems with individual files are logged and the file is skipped.
#[derive(Debug, Error)]
pub enum IndexerError {
    /// I/O error during file operations
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Root path does not exist
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// Root path exists but is not a directory
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// Source file could not be rendered
    #[error("Render error in {path}: {message}")]
    Render { path: PathBuf, message: String },
}

impl IndexerError {
    /// Build a render error for a file.
    pub fn render(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        IndexerError::Render {
            path: path.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = IndexerError::NotFound(PathBuf::from("/test/path"));
        assert!(err.to_string().contains("/test/path"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: IndexerError = io_err.into();
        assert!(matches!(err, IndexerError::Io(_)));
    }

    #[test]
    fn test_render_error_display() {
        let err = IndexerError::render("/docs/bad.md", "invalid utf-8");
        let msg = err.to_string();
        assert!(msg.contains("/docs/bad.md"));
        assert!(msg.contains("invalid utf-8"));
    }
}
