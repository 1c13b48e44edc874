//! Core error types for auto-docs.

use autodocs_index::IndexerError;
use thiserror::Error;

/// Errors that can occur in core operations
#[derive(Debug, Error)]
pub enum CoreError {
    /// Configuration failed validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Errors reported by a version control backend.
#[derive(Debug, Error)]
pub enum VcsError {
    /// Remote rejected the credentials
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Remote could not be reached or the transfer broke off
    #[error("network error: {0}")]
    Network(String),

    /// Transfer ran past the configured timeout
    #[error("transfer timed out after {0}s")]
    Timeout(u64),

    /// Local repository is missing, corrupt or in an unexpected state
    #[error("repository error: {0}")]
    Repository(String),
}

impl VcsError {
    /// Check if the remote refused our credentials.
    pub fn is_auth(&self) -> bool {
        matches!(self, VcsError::Auth(_))
    }
}

impl From<git2::Error> for VcsError {
    fn from(err: git2::Error) -> Self {
        use git2::{ErrorClass, ErrorCode};

        let message = err.message().to_string();

        match (err.code(), err.class()) {
            (ErrorCode::Auth, _) | (ErrorCode::Certificate, _) => VcsError::Auth(message),
            _ if looks_like_auth(&message) => VcsError::Auth(message),
            (_, ErrorClass::Net)
            | (_, ErrorClass::Ssh)
            | (_, ErrorClass::Http)
            | (_, ErrorClass::Ssl)
            | (_, ErrorClass::Callback) => VcsError::Network(message),
            _ => VcsError::Repository(message),
        }
    }
}

/// libgit2 reports some credential rejections with a generic code.
fn looks_like_auth(message: &str) -> bool {
    let message = message.to_lowercase();
    message.contains("authentication") || message.contains("credentials")
}

/// Errors raised while preparing or polling a tracked repository.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Credentials could not be set up before contacting the remote
    #[error("authentication setup failed: {0}")]
    AuthSetup(String),

    /// Remote rejected our credentials during checkout
    #[error("authentication rejected: {0}")]
    Auth(VcsError),

    /// Initial checkout failed for a reason other than authentication
    #[error("checkout failed: {0}")]
    Checkout(VcsError),

    /// Version control operation failed while tracking
    #[error("version control error: {0}")]
    Vcs(VcsError),

    /// Index could not be rebuilt
    #[error("index error: {0}")]
    Index(#[from] IndexerError),

    /// Background task panicked or was cancelled
    #[error("task failed: {0}")]
    Task(String),
}

impl SyncError {
    /// Whether the process should stop instead of retrying later.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SyncError::AuthSetup(_) | SyncError::Auth(_))
    }
}
