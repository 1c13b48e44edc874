//! Version control seam.
//!
//! [`RepoSync`](crate::RepoSync) only talks to a remote through the [`Vcs`]
//! trait. [`GitVcs`] is the libgit2 implementation used by the daemon.

mod git;

pub use git::GitVcs;

use crate::VcsError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Commit id of the checked-out HEAD.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Revision(String);

impl Revision {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How to authenticate against a remote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    /// No credentials (local or anonymous remotes)
    None,

    /// SSH private key
    SshKey {
        username: String,
        private_key: PathBuf,
        passphrase: Option<String>,
    },

    /// Plain user and password over HTTP(S)
    UserPass { username: String, password: String },
}

impl Credentials {
    /// Verify the credentials can be used before contacting the remote.
    ///
    /// For SSH the private key must be readable.
    pub fn check(&self) -> Result<(), String> {
        match self {
            Credentials::SshKey { private_key, .. } => std::fs::File::open(private_key)
                .map(|_| ())
                .map_err(|e| format!("cannot read ssh key {}: {}", private_key.display(), e)),
            Credentials::UserPass { username, .. } if username.is_empty() => {
                Err("username is empty".to_string())
            }
            _ => Ok(()),
        }
    }
}

/// Everything needed to mirror one remote branch locally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteDescriptor {
    /// Remote URL
    pub uri: String,
    /// Tracked branch
    pub branch: String,
    /// Working copy location
    pub local_path: PathBuf,
    /// Authentication
    pub credentials: Credentials,
    /// Upper bound for a single transfer
    pub timeout: Duration,
}

/// Result of an initial checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloneOutcome {
    /// A fresh working copy was created
    Cloned,
    /// A repository already exists at the target path
    AlreadyExists,
}

/// Result of bringing a working copy up to date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullOutcome {
    /// New commits were applied to the working copy
    Updated,
    /// The working copy already matched the remote
    AlreadyUpToDate,
}

/// Operations on a mirrored repository.
#[async_trait]
pub trait Vcs: Send + Sync {
    /// Create the working copy for `remote`.
    async fn clone_repo(&self, remote: &RemoteDescriptor) -> Result<CloneOutcome, VcsError>;

    /// Fetch the tracked branch and update the working copy.
    async fn pull(&self, remote: &RemoteDescriptor) -> Result<PullOutcome, VcsError>;

    /// Commit id checked out in the working copy at `path`.
    async fn head_revision(&self, path: &Path) -> Result<Revision, VcsError>;
}
