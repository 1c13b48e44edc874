//! Repository synchronisation.
//!
//! [`RepoSync`] owns one tracked remote. It performs the initial checkout,
//! then on every poll fetches upstream, compares HEAD with the revision it
//! last indexed and rebuilds the served index only when they differ.

use crate::vcs::{CloneOutcome, PullOutcome, RemoteDescriptor, Revision, Vcs};
use crate::SyncError;
use autodocs_index::{Indexer, PageStore};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// Lifecycle of a tracked repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    /// No usable working copy yet
    Uninitialized,
    /// Working copy checked out and indexed at least once
    Tracking,
}

/// Observable state of a tracked repository.
#[derive(Debug, Clone)]
pub struct RepoState {
    /// Remote being mirrored
    pub remote: RemoteDescriptor,
    /// Current phase
    pub phase: SyncPhase,
    /// Revision the served index was built from
    pub current_revision: Option<Revision>,
    /// Time of the last poll that ran
    pub last_polled: Option<DateTime<Utc>>,
    /// Most recent failure, cleared on the next success
    pub last_error: Option<String>,
}

/// What a single poll did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// Deferred checkout succeeded and the first index was installed
    Initialized { revision: Revision },
    /// HEAD matches the indexed revision, nothing rebuilt
    Unchanged,
    /// HEAD moved and a new index was installed
    Rebuilt { revision: Revision },
    /// Deferred checkout failed again
    CheckoutFailed,
    /// Fetch or HEAD lookup failed, previous index kept
    FetchFailed,
    /// Rebuild failed, previous index and revision kept
    RebuildFailed,
    /// Another poll was still running
    Busy,
}

/// Keeps a [`PageStore`] in step with one remote branch.
pub struct RepoSync {
    vcs: Arc<dyn Vcs>,
    indexer: Indexer,
    store: PageStore,
    state: RwLock<RepoState>,
    poll_lock: Mutex<()>,
}

impl RepoSync {
    /// Create an uninitialized sync for `remote`.
    pub fn new(remote: RemoteDescriptor, vcs: Arc<dyn Vcs>, indexer: Indexer, store: PageStore) -> Self {
        Self {
            vcs,
            indexer,
            store,
            state: RwLock::new(RepoState {
                remote,
                phase: SyncPhase::Uninitialized,
                current_revision: None,
                last_polled: None,
                last_error: None,
            }),
            poll_lock: Mutex::new(()),
        }
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> RepoState {
        self.state.read().clone()
    }

    /// Check out the remote and install the first index.
    ///
    /// Errors where [`SyncError::is_fatal`] holds mean the remote will never
    /// accept us. Any other error leaves the sync uninitialized and the next
    /// [`poll`](Self::poll) retries.
    pub async fn prepare(&self) -> Result<Revision, SyncError> {
        let _guard = self.poll_lock.lock().await;
        self.prepare_locked().await
    }

    /// Run one synchronisation step.
    ///
    /// Never runs concurrently with another poll or `prepare` on the same
    /// instance; an overlapping call returns [`PollOutcome::Busy`].
    pub async fn poll(&self, now: DateTime<Utc>) -> PollOutcome {
        let Ok(_guard) = self.poll_lock.try_lock() else {
            debug!("Poll already in progress, skipping");
            return PollOutcome::Busy;
        };

        let (phase, remote, current) = {
            let mut state = self.state.write();
            state.last_polled = Some(now);
            (state.phase, state.remote.clone(), state.current_revision.clone())
        };

        match phase {
            SyncPhase::Uninitialized => match self.prepare_locked().await {
                Ok(revision) => PollOutcome::Initialized { revision },
                Err(e) => {
                    warn!(error = %e, "Checkout retry failed");
                    PollOutcome::CheckoutFailed
                }
            },
            SyncPhase::Tracking => self.track(&remote, current).await,
        }
    }

    async fn prepare_locked(&self) -> Result<Revision, SyncError> {
        let remote = self.state.read().remote.clone();

        let result = self.checkout(&remote).await;
        match &result {
            Ok(revision) => {
                let mut state = self.state.write();
                state.phase = SyncPhase::Tracking;
                state.current_revision = Some(revision.clone());
                state.last_error = None;
                info!(revision = %revision, uri = %remote.uri, "Repository tracked");
            }
            Err(e) => self.record_error(e),
        }

        result
    }

    async fn checkout(&self, remote: &RemoteDescriptor) -> Result<Revision, SyncError> {
        remote.credentials.check().map_err(SyncError::AuthSetup)?;

        match self.vcs.clone_repo(remote).await {
            Ok(CloneOutcome::Cloned) => info!(path = ?remote.local_path, "Repository cloned"),
            Ok(CloneOutcome::AlreadyExists) => {
                debug!(path = ?remote.local_path, "Reusing existing checkout")
            }
            Err(e) if e.is_auth() => return Err(SyncError::Auth(e)),
            Err(e) => return Err(SyncError::Checkout(e)),
        }

        let revision = self
            .vcs
            .head_revision(&remote.local_path)
            .await
            .map_err(SyncError::Checkout)?;

        self.rebuild(&remote.local_path).await?;

        Ok(revision)
    }

    async fn track(&self, remote: &RemoteDescriptor, current: Option<Revision>) -> PollOutcome {
        match self.vcs.pull(remote).await {
            Ok(PullOutcome::Updated) => debug!("Pulled upstream changes"),
            Ok(PullOutcome::AlreadyUpToDate) => debug!("Already up to date"),
            Err(e) => {
                warn!(error = %e, "Fetch failed, keeping current index");
                self.record_error(&SyncError::Vcs(e));
                return PollOutcome::FetchFailed;
            }
        }

        let head = match self.vcs.head_revision(&remote.local_path).await {
            Ok(head) => head,
            Err(e) => {
                warn!(error = %e, "Unable to read HEAD, keeping current index");
                self.record_error(&SyncError::Vcs(e));
                return PollOutcome::FetchFailed;
            }
        };

        if current.as_ref() == Some(&head) {
            self.state.write().last_error = None;
            return PollOutcome::Unchanged;
        }

        info!(
            from = %current.as_ref().map(Revision::as_str).unwrap_or("-"),
            to = %head,
            "Revision changed, rebuilding"
        );

        match self.rebuild(&remote.local_path).await {
            Ok(()) => {
                let mut state = self.state.write();
                state.current_revision = Some(head.clone());
                state.last_error = None;
                PollOutcome::Rebuilt { revision: head }
            }
            Err(e) => {
                error!(error = %e, "Rebuild failed, keeping current index");
                self.record_error(&e);
                PollOutcome::RebuildFailed
            }
        }
    }

    /// Rebuild from the working copy and publish the result.
    async fn rebuild(&self, path: &Path) -> Result<(), SyncError> {
        let indexer = self.indexer.clone();
        let path = path.to_path_buf();

        let index = tokio::task::spawn_blocking(move || indexer.rebuild(&path))
            .await
            .map_err(|e| SyncError::Task(e.to_string()))??;

        self.store.install(index);
        Ok(())
    }

    fn record_error(&self, err: &SyncError) {
        self.state.write().last_error = Some(err.to_string());
    }
}
