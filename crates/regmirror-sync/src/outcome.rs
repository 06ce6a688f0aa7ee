use std::fmt;

use regmirror_state::PackageCommit;

/// Result of one work item, handed from a worker to the ledger consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Remote revision and version set match the ledger; nothing was fetched.
    Unchanged { id: String, revision: String },
    /// Every new version was downloaded and verified.
    Success {
        id:         String,
        commit:     PackageCommit,
        downloaded: usize,
    },
    Error { id: String, detail: String },
}

impl Outcome {
    pub fn id(&self) -> &str {
        match self {
            Outcome::Unchanged { id, .. } | Outcome::Success { id, .. } | Outcome::Error { id, .. } => id,
        }
    }

    pub fn category(&self) -> Category {
        match self {
            Outcome::Unchanged { .. } => Category::Unchanged,
            Outcome::Success { .. } => Category::Synced,
            Outcome::Error { .. } => Category::Failed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Unchanged,
    Synced,
    Failed,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Unchanged => write!(f, "unchanged"),
            Category::Synced => write!(f, "synced"),
            Category::Failed => write!(f, "failed"),
        }
    }
}
