//! Durable, transactional record of what the mirror has already fetched.
//!
//! [`CommitLedger`] is the only persisted state of the mirror. A
//! [`PackageCommit`] in its `Success` table promises that every listed version
//! is on local storage; the next run diffs against it so nothing recorded there
//! is downloaded again.

mod commit;
mod error;
mod ledger;

pub use commit::PackageCommit;
pub use error::LedgerError;
pub use ledger::CommitLedger;
