//! Incremental, verified mirroring of a package registry.
//!
//! A run reads the change feed ([`feed`]), diffs it against the ledger's
//! last known good commits ([`plan`]), and hands the resulting work set to a
//! bounded worker pool ([`Dispatcher`]). Each worker fetches a package's
//! metadata and downloads only versions not already recorded
//! ([`VersionSynchronizer`]). Outcomes flow back to one consumer that writes
//! the [`CommitLedger`](regmirror_state::CommitLedger).
//!
//! A package is committed only when every new version was verified and
//! written, so a failed package is simply planned again next run.

mod dispatch;
pub mod feed;
mod mirror;
mod outcome;
mod plan;
mod synchronizer;

pub use dispatch::{DEFAULT_WORKERS, DispatchSummary, Dispatcher, PackageError, process_item};
pub use feed::{Candidate, ChangeRecord, FeedError};
pub use mirror::{Mirror, MirrorError, MirrorOptions, RunSummary};
pub use outcome::{Category, Outcome};
pub use plan::{WorkItem, plan};
pub use synchronizer::{
    AggregateError, SyncReport, VersionError, VersionErrorKind, VersionSynchronizer, versions_to_download,
};
