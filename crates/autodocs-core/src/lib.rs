//! auto-docs Core Components
//!
//! This crate provides the core functionality for the auto-docs daemon,
//! including configuration, repository checkout and polling, and the
//! schedule that keeps the served page index current.

mod config;
mod error;
mod scheduler;
mod sync;
pub mod vcs;

pub use config::{Config, GitConfig, DEFAULT_CONFIG_FILE};
pub use error::{CoreError, SyncError, VcsError};
pub use scheduler::{Scheduler, SchedulerHandle};
pub use sync::{PollOutcome, RepoState, RepoSync, SyncPhase};
pub use vcs::{CloneOutcome, Credentials, GitVcs, PullOutcome, RemoteDescriptor, Revision, Vcs};
