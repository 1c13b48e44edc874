//! Daemon lifecycle management.

use anyhow::{Context, Result};
use autodocs_core::{Config, GitVcs, RepoSync, Scheduler};
use autodocs_index::{Indexer, PageStore};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use crate::http::{self, AppState};
use crate::signals;

/// The main server process
pub struct Daemon {
    config: Config,
    shutdown_tx: broadcast::Sender<()>,
    shutdown_rx: broadcast::Receiver<()>,
}

impl Daemon {
    /// Create a new daemon instance
    pub fn new(config: Config) -> Result<Self> {
        config.validate().context("Invalid configuration")?;

        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        Ok(Self {
            config,
            shutdown_tx,
            shutdown_rx,
        })
    }

    /// Sender that stops a running daemon.
    pub fn shutdown_handle(&self) -> broadcast::Sender<()> {
        self.shutdown_tx.clone()
    }

    /// Run the daemon until a shutdown signal arrives
    pub async fn run(self) -> Result<()> {
        let addr = self.config.listen_addr()?;
        let remote = self.config.remote();

        tracing::info!(
            name = %self.config.name,
            uri = %remote.uri,
            branch = %remote.branch,
            path = %remote.local_path.display(),
            "Daemon starting"
        );

        // Initialize components
        let store = PageStore::new();
        let sync = Arc::new(RepoSync::new(
            remote,
            Arc::new(GitVcs::new()),
            Indexer::new(),
            store.clone(),
        ));

        match sync.prepare().await {
            Ok(revision) => tracing::info!(revision = %revision, "Initial index ready"),
            Err(e) if e.is_fatal() => {
                return Err(anyhow::Error::new(e).context("Unable to access repository"));
            }
            Err(e) => {
                tracing::warn!(error = %e, "Initial checkout failed, retrying on next poll");
            }
        }

        let scheduler = Scheduler::new(self.config.period())?.start(sync.clone());

        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind {}", addr))?;

        tracing::info!(addr = %addr, "Listening");

        let app = http::router(AppState {
            name: self.config.name.clone(),
            store,
            sync,
        });

        let result = axum::serve(listener, app)
            .with_graceful_shutdown(signals::wait_for_shutdown(self.shutdown_rx))
            .await;

        // Cleanup
        tracing::info!("Cleaning up...");
        scheduler.stop().await;
        tracing::info!("Cleanup complete");

        result.context("HTTP server error")
    }
}
