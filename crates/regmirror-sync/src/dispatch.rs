//! Bounded worker pool that drains the work set and feeds a single ledger
//! writer.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use regmirror_fetch::{ByteFetcher, FetchError, PackageMetadata, Registry};
use regmirror_fs::{METADATA_FILE, package_dir};
use regmirror_state::{CommitLedger, PackageCommit};
use thiserror::Error;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, error, info, warn};

use crate::outcome::Outcome;
use crate::plan::WorkItem;
use crate::synchronizer::{AggregateError, SyncReport, VersionSynchronizer, create_dir, write_file};

pub const DEFAULT_WORKERS: usize = 16;

/// Why a package pass failed. Its text is what the ledger's error table
/// stores.
#[derive(Debug, Error)]
pub enum PackageError {
    #[error("metadata fetch failed: {0}")]
    Fetch(#[from] FetchError),
    #[error("cannot store metadata: {0}")]
    Storage(#[from] regmirror_fs::Error),
    #[error(transparent)]
    Aggregate(#[from] AggregateError),
}

/// Counts of what happened to each dispatched item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    pub planned:   usize,
    pub unchanged: usize,
    pub synced:    usize,
    pub failed:    usize,
}

pub struct Dispatcher<R, F> {
    registry:      Arc<R>,
    synchronizer:  Arc<VersionSynchronizer<F>>,
    download_root: Arc<Path>,
    workers:       usize,
}

impl<R, F> Dispatcher<R, F>
where
    R: Registry + 'static,
    F: ByteFetcher + 'static,
{
    pub fn new(registry: R, fetcher: F, download_root: impl Into<PathBuf>) -> Self {
        let download_root: PathBuf = download_root.into();
        Self {
            registry:      Arc::new(registry),
            synchronizer:  Arc::new(VersionSynchronizer::new(fetcher)),
            download_root: Arc::from(download_root),
            workers:       DEFAULT_WORKERS,
        }
    }

    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Process every item and apply the outcomes to `ledger`.
    ///
    /// The queue is filled and closed before any worker starts, so workers
    /// simply drain it. Only this task writes to the ledger.
    pub async fn run(
        &self,
        items: Vec<WorkItem>,
        snapshot: Arc<BTreeMap<String, PackageCommit>>,
        ledger: &CommitLedger,
    ) -> DispatchSummary {
        let total = items.len();
        let mut summary = DispatchSummary {
            planned: total,
            ..DispatchSummary::default()
        };
        if total == 0 {
            return summary;
        }

        let (job_tx, job_rx) = mpsc::channel(total);
        for item in items {
            // capacity equals the work set, so this never waits
            if job_tx.send(item).await.is_err() {
                break;
            }
        }
        drop(job_tx);
        let queue = Arc::new(Mutex::new(job_rx));

        let (result_tx, mut result_rx) = mpsc::channel(total);
        let workers = self.workers.min(total);
        debug!(workers, items = total, "starting workers");

        let handles: Vec<_> = (0..workers)
            .map(|n| {
                let worker = Worker {
                    registry:      Arc::clone(&self.registry),
                    synchronizer:  Arc::clone(&self.synchronizer),
                    download_root: Arc::clone(&self.download_root),
                    snapshot:      Arc::clone(&snapshot),
                };
                tokio::spawn(worker.drain(n, Arc::clone(&queue), result_tx.clone()))
            })
            .collect();
        drop(result_tx);

        let mut seen = 0;
        while let Some(outcome) = result_rx.recv().await {
            seen += 1;
            apply(seen, total, outcome, ledger, &mut summary);
        }

        for handle in handles {
            if let Err(e) = handle.await {
                error!(error = %e, "worker terminated abnormally");
            }
        }
        if seen < total {
            error!(missing = total - seen, "some work items produced no outcome");
            summary.failed += total - seen;
        }

        summary
    }
}

fn apply(seen: usize, total: usize, outcome: Outcome, ledger: &CommitLedger, summary: &mut DispatchSummary) {
    let category = outcome.category();
    match outcome {
        Outcome::Unchanged { id, .. } => {
            summary.unchanged += 1;
            info!("[{seen}/{total}] {id} {category}");
        }
        Outcome::Success { id, commit, downloaded } => match ledger.record_success(&id, &commit) {
            Ok(()) => {
                summary.synced += 1;
                info!(downloaded, revision = %commit.revision, "[{seen}/{total}] {id} {category}");
            }
            Err(e) => {
                summary.failed += 1;
                error!(error = %e, "[{seen}/{total}] {id} synced but could not be committed");
            }
        },
        Outcome::Error { id, detail } => {
            summary.failed += 1;
            warn!("[{seen}/{total}] {id} {category}: {detail}");
            if let Err(e) = ledger.record_error(&id, &detail) {
                error!(package = %id, error = %e, "failed to record error");
            }
        }
    }
}

struct Worker<R, F> {
    registry:      Arc<R>,
    synchronizer:  Arc<VersionSynchronizer<F>>,
    download_root: Arc<Path>,
    snapshot:      Arc<BTreeMap<String, PackageCommit>>,
}

impl<R: Registry, F: ByteFetcher> Worker<R, F> {
    async fn drain(self, n: usize, queue: Arc<Mutex<mpsc::Receiver<WorkItem>>>, results: mpsc::Sender<Outcome>) {
        loop {
            let item = queue.lock().await.recv().await;
            let Some(item) = item else { break };

            let outcome = process_item(
                &item,
                self.registry.as_ref(),
                &self.synchronizer,
                &self.download_root,
                self.snapshot.get(&item.id),
            )
            .await;

            if results.send(outcome).await.is_err() {
                break;
            }
        }
        debug!(worker = n, "queue drained");
    }
}

/// Run one sync pass for `item`. Never fails: every error becomes
/// [`Outcome::Error`].
pub async fn process_item<R: Registry, F: ByteFetcher>(
    item: &WorkItem,
    registry: &R,
    synchronizer: &VersionSynchronizer<F>,
    download_root: &Path,
    recorded: Option<&PackageCommit>,
) -> Outcome {
    let metadata = match registry.fetch_metadata(&item.id).await {
        Ok(metadata) => metadata,
        Err(e) => {
            return Outcome::Error {
                id:     item.id.clone(),
                detail: PackageError::from(e).to_string(),
            };
        }
    };
    if metadata.revision != item.target_revision {
        debug!(
            package = %item.id,
            feed = %item.target_revision,
            remote = %metadata.revision,
            "registry is at a different revision than the feed"
        );
    }

    let remote = metadata.version_set();
    if let Some(commit) = recorded
        && commit.revision == metadata.revision
        && commit.versions == remote
    {
        return Outcome::Unchanged {
            id:       item.id.clone(),
            revision: metadata.revision,
        };
    }

    let empty = BTreeSet::new();
    let previous = recorded.map_or(&empty, |commit| &commit.versions);
    match sync_package(&metadata, previous, &remote, synchronizer, download_root).await {
        Ok(report) => Outcome::Success {
            id:         item.id.clone(),
            downloaded: report.downloaded.len(),
            commit:     PackageCommit {
                id:       item.id.clone(),
                revision: metadata.revision,
                versions: remote,
            },
        },
        Err(e) => Outcome::Error {
            id:     item.id.clone(),
            detail: e.to_string(),
        },
    }
}

async fn sync_package<F: ByteFetcher>(
    metadata: &PackageMetadata,
    previous: &BTreeSet<String>,
    remote: &BTreeSet<String>,
    synchronizer: &VersionSynchronizer<F>,
    download_root: &Path,
) -> Result<SyncReport, PackageError> {
    let dir = package_dir(download_root, &metadata.revision, &metadata.id);
    create_dir(dir.clone()).await?;
    write_file(dir.join(METADATA_FILE), metadata.blob.clone()).await?;

    Ok(synchronizer
        .synchronize(&dir, previous, remote, &metadata.versions)
        .await?)
}
