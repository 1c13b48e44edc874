//! Integration tests for repository sync and scheduling.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::{tempdir, TempDir};
use tokio::time::timeout;

use autodocs_core::{
    CloneOutcome, Credentials, PollOutcome, PullOutcome, RemoteDescriptor, RepoSync, Revision,
    Scheduler, SyncError, SyncPhase, Vcs, VcsError,
};
use autodocs_index::{Indexer, PageStore};

#[derive(Default)]
struct FakeState {
    /// Upstream revision number, bumped by `commit`
    upstream: u32,
    /// Revision copied into the working copy
    checked_out: Option<u32>,
    clone_errors: Vec<VcsError>,
    pull_errors: Vec<VcsError>,
    clone_calls: usize,
    pull_calls: usize,
}

/// Version control double that mirrors a plain directory.
struct FakeVcs {
    upstream_dir: PathBuf,
    pull_delay: Duration,
    state: Mutex<FakeState>,
}

impl FakeVcs {
    fn new(upstream_dir: &Path) -> Self {
        Self {
            upstream_dir: upstream_dir.to_path_buf(),
            pull_delay: Duration::ZERO,
            state: Mutex::new(FakeState {
                upstream: 1,
                ..Default::default()
            }),
        }
    }

    fn with_pull_delay(mut self, delay: Duration) -> Self {
        self.pull_delay = delay;
        self
    }

    /// Write a file upstream and advance the revision.
    fn commit(&self, rel: &str, content: &str) {
        write(&self.upstream_dir, rel, content);
        self.state.lock().upstream += 1;
    }

    /// Remove a file upstream and advance the revision.
    fn remove(&self, rel: &str) {
        std::fs::remove_file(self.upstream_dir.join(rel)).unwrap();
        self.state.lock().upstream += 1;
    }

    fn fail_next_clone(&self, err: VcsError) {
        self.state.lock().clone_errors.push(err);
    }

    fn fail_next_pull(&self, err: VcsError) {
        self.state.lock().pull_errors.push(err);
    }

    fn clone_calls(&self) -> usize {
        self.state.lock().clone_calls
    }

    fn pull_calls(&self) -> usize {
        self.state.lock().pull_calls
    }

    fn mirror(&self, target: &Path) {
        if target.exists() {
            std::fs::remove_dir_all(target).unwrap();
        }
        copy_dir(&self.upstream_dir, target);
    }
}

#[async_trait]
impl Vcs for FakeVcs {
    async fn clone_repo(&self, remote: &RemoteDescriptor) -> Result<CloneOutcome, VcsError> {
        let upstream = {
            let mut state = self.state.lock();
            state.clone_calls += 1;
            if let Some(err) = state.clone_errors.pop() {
                return Err(err);
            }
            if state.checked_out.is_some() {
                return Ok(CloneOutcome::AlreadyExists);
            }
            state.upstream
        };

        self.mirror(&remote.local_path);
        self.state.lock().checked_out = Some(upstream);
        Ok(CloneOutcome::Cloned)
    }

    async fn pull(&self, remote: &RemoteDescriptor) -> Result<PullOutcome, VcsError> {
        if !self.pull_delay.is_zero() {
            tokio::time::sleep(self.pull_delay).await;
        }

        let upstream = {
            let mut state = self.state.lock();
            state.pull_calls += 1;
            if let Some(err) = state.pull_errors.pop() {
                return Err(err);
            }
            if state.checked_out == Some(state.upstream) {
                return Ok(PullOutcome::AlreadyUpToDate);
            }
            state.upstream
        };

        self.mirror(&remote.local_path);
        self.state.lock().checked_out = Some(upstream);
        Ok(PullOutcome::Updated)
    }

    async fn head_revision(&self, _path: &Path) -> Result<Revision, VcsError> {
        match self.state.lock().checked_out {
            Some(rev) => Ok(Revision::new(format!("rev-{rev}"))),
            None => Err(VcsError::Repository("no checkout".into())),
        }
    }
}

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

fn copy_dir(from: &Path, to: &Path) {
    std::fs::create_dir_all(to).unwrap();
    for entry in std::fs::read_dir(from).unwrap() {
        let entry = entry.unwrap();
        let target = to.join(entry.file_name());
        if entry.file_type().unwrap().is_dir() {
            copy_dir(&entry.path(), &target);
        } else {
            std::fs::copy(entry.path(), target).unwrap();
        }
    }
}

struct Fixture {
    _temp_dir: TempDir,
    vcs: Arc<FakeVcs>,
    sync: Arc<RepoSync>,
    store: PageStore,
}

fn remote(temp_dir: &Path) -> RemoteDescriptor {
    RemoteDescriptor {
        uri: "git@example.com:org/docs.git".to_string(),
        branch: "master".to_string(),
        local_path: temp_dir.join("checkout"),
        credentials: Credentials::None,
        timeout: Duration::from_secs(30),
    }
}

fn fixture_with(build: impl FnOnce(&Path) -> FakeVcs) -> Fixture {
    let temp_dir = tempdir().unwrap();
    let upstream = temp_dir.path().join("upstream");
    write(&upstream, "root.md", "# root");
    write(&upstream, "first/one.md", "one");

    let vcs = Arc::new(build(&upstream));
    let store = PageStore::new();
    let sync = Arc::new(RepoSync::new(
        remote(temp_dir.path()),
        vcs.clone(),
        Indexer::new(),
        store.clone(),
    ));

    Fixture {
        _temp_dir: temp_dir,
        vcs,
        sync,
        store,
    }
}

fn fixture() -> Fixture {
    fixture_with(FakeVcs::new)
}

#[tokio::test]
async fn test_prepare_installs_first_index() {
    let f = fixture();

    let revision = f.sync.prepare().await.unwrap();

    assert_eq!(revision, Revision::new("rev-1"));
    assert_eq!(f.store.generation(), 1);
    assert_eq!(
        f.store.get_page("/root").unwrap().content,
        "<h1>root</h1>\n"
    );
    assert!(f.store.get_page("/first/one").is_some());

    let state = f.sync.state();
    assert_eq!(state.phase, SyncPhase::Tracking);
    assert_eq!(state.current_revision, Some(revision));
    assert!(state.last_error.is_none());
}

#[tokio::test]
async fn test_poll_without_change_does_not_rebuild() {
    let f = fixture();
    f.sync.prepare().await.unwrap();

    let outcome = f.sync.poll(Utc::now()).await;

    assert_eq!(outcome, PollOutcome::Unchanged);
    assert_eq!(f.store.generation(), 1);
    assert_eq!(f.vcs.pull_calls(), 1);
    assert!(f.sync.state().last_polled.is_some());
}

#[tokio::test]
async fn test_poll_after_upstream_change_rebuilds() {
    let f = fixture();
    f.sync.prepare().await.unwrap();

    f.vcs.commit("first/two.md", "two");
    f.vcs.remove("root.md");

    let outcome = f.sync.poll(Utc::now()).await;

    assert_eq!(
        outcome,
        PollOutcome::Rebuilt {
            revision: Revision::new("rev-3")
        }
    );
    assert_eq!(f.store.generation(), 2);
    assert!(f.store.get_page("/first/two").is_some());
    assert!(f.store.get_page("/root").is_none());
    assert_eq!(
        f.sync.state().current_revision,
        Some(Revision::new("rev-3"))
    );

    assert_eq!(f.sync.poll(Utc::now()).await, PollOutcome::Unchanged);
    assert_eq!(f.store.generation(), 2);
}

#[tokio::test]
async fn test_fetch_failure_keeps_index() {
    let f = fixture();
    f.sync.prepare().await.unwrap();

    f.vcs.commit("new.md", "new");
    f.vcs.fail_next_pull(VcsError::Network("connection reset".into()));

    assert_eq!(f.sync.poll(Utc::now()).await, PollOutcome::FetchFailed);
    assert_eq!(f.store.generation(), 1);
    assert!(f.store.get_page("/new").is_none());
    assert!(f.sync.state().last_error.is_some());

    // Next tick recovers
    assert!(matches!(
        f.sync.poll(Utc::now()).await,
        PollOutcome::Rebuilt { .. }
    ));
    assert!(f.store.get_page("/new").is_some());
    assert!(f.sync.state().last_error.is_none());
}

#[tokio::test]
async fn test_missing_ssh_key_is_fatal() {
    let temp_dir = tempdir().unwrap();
    let upstream = temp_dir.path().join("upstream");
    write(&upstream, "root.md", "# root");

    let mut remote = remote(temp_dir.path());
    remote.credentials = Credentials::SshKey {
        username: "git".into(),
        private_key: temp_dir.path().join("missing_key"),
        passphrase: None,
    };

    let vcs = Arc::new(FakeVcs::new(&upstream));
    let sync = RepoSync::new(remote, vcs.clone(), Indexer::new(), PageStore::new());

    let err = sync.prepare().await.unwrap_err();
    assert!(matches!(err, SyncError::AuthSetup(_)));
    assert!(err.is_fatal());
    assert_eq!(vcs.clone_calls(), 0);
    assert_eq!(sync.state().phase, SyncPhase::Uninitialized);
}

#[tokio::test]
async fn test_auth_rejection_is_fatal() {
    let f = fixture();
    f.vcs
        .fail_next_clone(VcsError::Auth("permission denied".into()));

    let err = f.sync.prepare().await.unwrap_err();

    assert!(matches!(err, SyncError::Auth(_)));
    assert!(err.is_fatal());
    assert_eq!(f.store.generation(), 0);
}

#[tokio::test]
async fn test_checkout_failure_is_retried_by_poll() {
    let f = fixture();
    f.vcs
        .fail_next_clone(VcsError::Network("host unreachable".into()));

    let err = f.sync.prepare().await.unwrap_err();
    assert!(matches!(err, SyncError::Checkout(_)));
    assert!(!err.is_fatal());
    assert_eq!(f.sync.state().phase, SyncPhase::Uninitialized);
    assert!(f.store.current().is_empty());

    let outcome = f.sync.poll(Utc::now()).await;

    assert_eq!(
        outcome,
        PollOutcome::Initialized {
            revision: Revision::new("rev-1")
        }
    );
    assert_eq!(f.sync.state().phase, SyncPhase::Tracking);
    assert!(f.store.get_page("/root").is_some());
    assert_eq!(f.vcs.clone_calls(), 2);
}

#[tokio::test]
async fn test_overlapping_poll_is_busy() {
    let f = fixture_with(|upstream| {
        FakeVcs::new(upstream).with_pull_delay(Duration::from_millis(300))
    });
    f.sync.prepare().await.unwrap();

    let sync = f.sync.clone();
    let first = tokio::spawn(async move { sync.poll(Utc::now()).await });

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(f.sync.poll(Utc::now()).await, PollOutcome::Busy);

    assert_eq!(first.await.unwrap(), PollOutcome::Unchanged);
    assert_eq!(f.vcs.pull_calls(), 1);
}

#[tokio::test]
async fn test_state_readable_during_poll() {
    let f = fixture_with(|upstream| {
        FakeVcs::new(upstream).with_pull_delay(Duration::from_millis(300))
    });
    f.sync.prepare().await.unwrap();

    let sync = f.sync.clone();
    let poll = tokio::spawn(async move { sync.poll(Utc::now()).await });

    tokio::time::sleep(Duration::from_millis(50)).await;
    let state = f.sync.state();
    assert_eq!(state.phase, SyncPhase::Tracking);

    poll.await.unwrap();
}

#[tokio::test]
async fn test_scheduler_picks_up_changes() {
    let f = fixture();
    f.sync.prepare().await.unwrap();

    let handle = Scheduler::new(Duration::from_millis(50))
        .unwrap()
        .start(f.sync.clone());

    f.vcs.commit("later.md", "later");

    let store = f.store.clone();
    let found = timeout(Duration::from_secs(5), async move {
        loop {
            if store.get_page("/later").is_some() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await;
    assert!(found.is_ok());

    handle.stop().await;
}

#[tokio::test]
async fn test_scheduler_stop_waits_for_poll() {
    let f = fixture_with(|upstream| {
        FakeVcs::new(upstream).with_pull_delay(Duration::from_millis(200))
    });
    f.sync.prepare().await.unwrap();

    let handle = Scheduler::new(Duration::from_millis(20))
        .unwrap()
        .start(f.sync.clone());

    // Let a poll get under way
    tokio::time::sleep(Duration::from_millis(60)).await;

    timeout(Duration::from_secs(5), handle.stop())
        .await
        .unwrap();

    // No poll is left running once stop returns
    assert_ne!(f.sync.poll(Utc::now()).await, PollOutcome::Busy);
}
