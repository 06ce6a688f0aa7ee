use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use regmirror_fetch::{ByteFetcher, Registry};
use regmirror_state::{CommitLedger, LedgerError};
use thiserror::Error;
use tracing::info;

use crate::dispatch::{DEFAULT_WORKERS, DispatchSummary, Dispatcher};
use crate::feed::{Candidate, FeedError, read_feed};
use crate::plan::plan;

/// Failures that stop a run before any package is processed.
#[derive(Debug, Error)]
pub enum MirrorError {
    #[error(transparent)]
    Feed(#[from] FeedError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

#[derive(Debug, Clone)]
pub struct MirrorOptions {
    pub feed_path:     PathBuf,
    pub download_root: PathBuf,
    pub workers:       usize,
    /// Process at most this many planned packages per run.
    pub max_packages:  Option<usize>,
}

impl MirrorOptions {
    pub fn new(feed_path: impl Into<PathBuf>, download_root: impl Into<PathBuf>) -> Self {
        Self {
            feed_path:     feed_path.into(),
            download_root: download_root.into(),
            workers:       DEFAULT_WORKERS,
            max_packages:  None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub candidates:    usize,
    pub dispatch:      DispatchSummary,
    /// Size of the ledger's error table after the run.
    pub ledger_errors: usize,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} candidates, {} planned: {} unchanged, {} synced, {} failed ({} packages with recorded errors)",
            self.candidates,
            self.dispatch.planned,
            self.dispatch.unchanged,
            self.dispatch.synced,
            self.dispatch.failed,
            self.ledger_errors,
        )
    }
}

/// One mirror pass: feed + ledger -> plan -> dispatch -> ledger.
pub struct Mirror<R, F> {
    dispatcher:   Dispatcher<R, F>,
    feed_path:    PathBuf,
    max_packages: Option<usize>,
}

impl<R, F> Mirror<R, F>
where
    R: Registry + 'static,
    F: ByteFetcher + 'static,
{
    pub fn new(registry: R, fetcher: F, options: MirrorOptions) -> Self {
        Self {
            dispatcher:   Dispatcher::new(registry, fetcher, options.download_root).workers(options.workers),
            feed_path:    options.feed_path,
            max_packages: options.max_packages,
        }
    }

    /// Read the change feed from disk, then [`Mirror::sync`].
    pub async fn run(&self, ledger: &CommitLedger) -> Result<RunSummary, MirrorError> {
        let candidates = read_feed(&self.feed_path)?;
        info!(path = %self.feed_path.display(), candidates = candidates.len(), "change feed loaded");
        self.sync(&candidates, ledger).await
    }

    pub async fn sync(
        &self,
        candidates: &BTreeMap<String, Candidate>,
        ledger: &CommitLedger,
    ) -> Result<RunSummary, MirrorError> {
        let snapshot = Arc::new(ledger.load_all_successful()?);

        let mut work = plan(candidates, &snapshot);
        info!(planned = work.len(), recorded = snapshot.len(), "sync planned");
        if let Some(max) = self.max_packages
            && work.len() > max
        {
            info!(max, deferred = work.len() - max, "capping work set");
            work.truncate(max);
        }

        let dispatch = self.dispatcher.run(work, snapshot, ledger).await;
        let ledger_errors = ledger.count_errors()?;

        Ok(RunSummary {
            candidates: candidates.len(),
            dispatch,
            ledger_errors,
        })
    }
}
