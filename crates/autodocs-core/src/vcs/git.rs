//! libgit2 backed [`Vcs`].

use super::{CloneOutcome, Credentials, PullOutcome, RemoteDescriptor, Revision, Vcs};
use crate::VcsError;
use async_trait::async_trait;
use git2::build::RepoBuilder;
use git2::{
    Cred, CredentialType, ErrorClass, ErrorCode, FetchOptions, RemoteCallbacks, Repository,
    ResetType,
};
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Credential callbacks give up after this many attempts.
const MAX_CREDENTIAL_ATTEMPTS: usize = 3;

/// Slack on top of the transfer timeout before a blocking call is abandoned.
const DEADLINE_GRACE: Duration = Duration::from_secs(5);

/// Mirrors a single branch with shallow fetches and hard resets.
///
/// The working copy is treated as read-only: local changes are discarded
/// whenever upstream moves.
#[derive(Debug, Clone, Default)]
pub struct GitVcs;

impl GitVcs {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Vcs for GitVcs {
    async fn clone_repo(&self, remote: &RemoteDescriptor) -> Result<CloneOutcome, VcsError> {
        let limit = remote.timeout;
        let remote = remote.clone();
        with_deadline(limit, tokio::task::spawn_blocking(move || clone_repo(&remote))).await
    }

    async fn pull(&self, remote: &RemoteDescriptor) -> Result<PullOutcome, VcsError> {
        let limit = remote.timeout;
        let remote = remote.clone();
        with_deadline(limit, tokio::task::spawn_blocking(move || pull_repo(&remote))).await
    }

    async fn head_revision(&self, path: &Path) -> Result<Revision, VcsError> {
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || head_revision(&path))
            .await
            .map_err(|e| VcsError::Repository(e.to_string()))?
    }
}

/// Await a blocking transfer, giving up once it overruns `limit` by
/// [`DEADLINE_GRACE`].
///
/// The socket timeouts normally end a stalled transfer first. An abandoned
/// task keeps running in the background but no longer holds up the caller.
async fn with_deadline<T>(
    limit: Duration,
    task: tokio::task::JoinHandle<Result<T, VcsError>>,
) -> Result<T, VcsError> {
    match tokio::time::timeout(limit + DEADLINE_GRACE, task).await {
        Ok(joined) => joined.map_err(|e| VcsError::Repository(e.to_string()))?,
        Err(_) => {
            warn!(timeout_secs = limit.as_secs(), "Transfer did not finish, abandoning it");
            Err(VcsError::Timeout(limit.as_secs()))
        }
    }
}

/// Bound connecting to and reading from the remote.
///
/// libgit2 keeps these as process-wide settings, so every transfer sets
/// them from its own descriptor before starting.
fn apply_socket_timeouts(timeout: Duration) -> Result<(), VcsError> {
    let millis = i32::try_from(timeout.as_millis()).unwrap_or(i32::MAX);
    // SAFETY: both options only store an integer read by later socket calls
    unsafe {
        git2::opts::set_server_connect_timeout_in_milliseconds(millis)?;
        git2::opts::set_server_timeout_in_milliseconds(millis)?;
    }
    Ok(())
}

/// Clone the tracked branch (blocking)
fn clone_repo(remote: &RemoteDescriptor) -> Result<CloneOutcome, VcsError> {
    if Repository::open(&remote.local_path).is_ok() {
        debug!(path = ?remote.local_path, "Repository already present");
        return Ok(CloneOutcome::AlreadyExists);
    }

    if let Some(parent) = remote.local_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| VcsError::Repository(e.to_string()))?;
    }

    info!(uri = %remote.uri, branch = %remote.branch, path = ?remote.local_path, "Cloning");

    apply_socket_timeouts(remote.timeout)?;
    let started = Instant::now();

    // Only the tracked branch is fetched, now and on every later pull
    let refspec = tracking_refspec(&remote.branch);

    let mut builder = RepoBuilder::new();
    builder.branch(&remote.branch);
    builder.remote_create(move |repo, name, url| repo.remote_with_fetch(name, url, &refspec));
    builder.fetch_options(fetch_options(remote, started));

    builder
        .clone(&remote.uri, &remote.local_path)
        .map_err(|e| transfer_error(e, remote, started))?;

    Ok(CloneOutcome::Cloned)
}

/// Fetch the tracked branch and reset onto it (blocking)
fn pull_repo(remote: &RemoteDescriptor) -> Result<PullOutcome, VcsError> {
    let repo = Repository::open(&remote.local_path)?;
    let mut origin = repo.find_remote("origin")?;

    let tracking = tracking_ref(&remote.branch);
    let refspec = tracking_refspec(&remote.branch);

    apply_socket_timeouts(remote.timeout)?;
    let started = Instant::now();
    let mut opts = fetch_options(remote, started);
    origin
        .fetch(&[refspec.as_str()], Some(&mut opts), None)
        .map_err(|e| transfer_error(e, remote, started))?;

    let fetched = repo.find_reference(&tracking)?.peel_to_commit()?;
    let head = repo.head()?.peel_to_commit()?;

    if fetched.id() == head.id() {
        return Ok(PullOutcome::AlreadyUpToDate);
    }

    repo.reset(fetched.as_object(), ResetType::Hard, None)?;

    info!(from = %head.id(), to = %fetched.id(), "Working copy updated");

    Ok(PullOutcome::Updated)
}

fn tracking_ref(branch: &str) -> String {
    format!("refs/remotes/origin/{}", branch)
}

fn tracking_refspec(branch: &str) -> String {
    format!("+refs/heads/{}:{}", branch, tracking_ref(branch))
}

/// Read the commit id at HEAD (blocking)
fn head_revision(path: &Path) -> Result<Revision, VcsError> {
    let repo = Repository::open(path)?;
    let commit = repo.head()?.peel_to_commit()?;
    Ok(Revision::new(commit.id().to_string()))
}

/// Build fetch options carrying credentials and the transfer deadline.
fn fetch_options(remote: &RemoteDescriptor, started: Instant) -> FetchOptions<'static> {
    let mut callbacks = RemoteCallbacks::new();

    let credentials = remote.credentials.clone();
    let mut attempts = 0;
    callbacks.credentials(move |_url, username_from_url, allowed| {
        attempts += 1;
        if attempts > MAX_CREDENTIAL_ATTEMPTS {
            return Err(git2::Error::new(
                ErrorCode::Auth,
                ErrorClass::Callback,
                "credentials rejected by remote",
            ));
        }
        credential_for(&credentials, username_from_url, allowed)
    });

    let timeout = remote.timeout;
    callbacks.transfer_progress(move |_| started.elapsed() < timeout);

    let mut opts = FetchOptions::new();
    opts.remote_callbacks(callbacks);

    // libgit2's local transport cannot negotiate shallow fetches
    if !is_local(&remote.uri) {
        opts.depth(1);
    }

    opts
}

fn credential_for(
    credentials: &Credentials,
    username_from_url: Option<&str>,
    allowed: CredentialType,
) -> Result<Cred, git2::Error> {
    match credentials {
        Credentials::SshKey {
            username,
            private_key,
            passphrase,
        } => {
            let username = username_from_url.unwrap_or(username);
            if allowed.contains(CredentialType::USERNAME) {
                return Cred::username(username);
            }
            Cred::ssh_key(username, None, private_key, passphrase.as_deref())
        }
        Credentials::UserPass { username, password }
            if allowed.contains(CredentialType::USER_PASS_PLAINTEXT) =>
        {
            Cred::userpass_plaintext(username, password)
        }
        _ if allowed.contains(CredentialType::DEFAULT) => Cred::default(),
        _ => Err(git2::Error::new(
            ErrorCode::Auth,
            ErrorClass::Callback,
            "no usable credentials for remote",
        )),
    }
}

/// Map a transfer failure, reporting deadline aborts and socket timeouts
/// as [`VcsError::Timeout`].
fn transfer_error(err: git2::Error, remote: &RemoteDescriptor, started: Instant) -> VcsError {
    let timed_out = match err.code() {
        ErrorCode::Timeout => true,
        ErrorCode::User => started.elapsed() >= remote.timeout,
        _ => err.message().contains("timed out"),
    };
    if timed_out {
        return VcsError::Timeout(remote.timeout.as_secs());
    }
    VcsError::from(err)
}

fn is_local(uri: &str) -> bool {
    uri.starts_with("file://") || Path::new(uri).is_absolute()
}
