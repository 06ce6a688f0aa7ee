use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Last known good state of a package.
///
/// Recorded only after every version in `versions` has been verified and
/// written to local storage (or was already there from an earlier commit).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageCommit {
    pub id:       String,
    pub revision: String,
    pub versions: BTreeSet<String>,
}

impl PackageCommit {
    pub fn new(
        id: impl Into<String>,
        revision: impl Into<String>,
        versions: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            id:       id.into(),
            revision: revision.into(),
            versions: versions.into_iter().map(Into::into).collect(),
        }
    }
}
