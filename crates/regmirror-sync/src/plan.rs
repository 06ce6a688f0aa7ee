use std::collections::BTreeMap;

use regmirror_state::PackageCommit;

use crate::feed::Candidate;

/// One package that needs a sync pass this run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    pub id:              String,
    pub target_revision: String,
}

/// Decide which candidates need work.
///
/// A candidate is planned when the ledger has no success entry for it or the
/// recorded revision differs from the feed's. Ledger entries without a
/// candidate are left alone. Output is ordered by package id.
pub fn plan(
    candidates: &BTreeMap<String, Candidate>,
    ledger: &BTreeMap<String, PackageCommit>,
) -> Vec<WorkItem> {
    candidates
        .values()
        .filter(|candidate| {
            ledger
                .get(&candidate.id)
                .is_none_or(|commit| commit.revision != candidate.revision)
        })
        .map(|candidate| WorkItem {
            id:              candidate.id.clone(),
            target_revision: candidate.revision.clone(),
        })
        .collect()
}
