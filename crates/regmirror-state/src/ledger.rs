use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use sled::transaction::ConflictableTransactionError;
use tracing::{debug, warn};

use crate::commit::PackageCommit;
use crate::error::LedgerError;

const SUCCESS_TABLE: &str = "Success";
const ERROR_TABLE: &str = "Error";

/// Persistent record of per-package sync outcomes.
///
/// Two independent tables keyed by package id: `Success` holds the last
/// [`PackageCommit`] that was fully mirrored, `Error` holds the message of the
/// last failed attempt. Writes overwrite, are single-key transactions, and are
/// flushed before returning.
///
/// The store is flushed when the ledger is dropped, so pending data reaches
/// disk on every exit path. Call [`CommitLedger::close`] to observe flush
/// errors.
pub struct CommitLedger {
    path:    PathBuf,
    db:      sled::Db,
    success: sled::Tree,
    errors:  sled::Tree,
    closed:  bool,
}

impl CommitLedger {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, LedgerError> {
        let path = path.as_ref().to_path_buf();
        let open_err = |source| LedgerError::Open {
            path: path.clone(),
            source,
        };

        let db = sled::open(&path).map_err(open_err)?;
        let success = db.open_tree(SUCCESS_TABLE).map_err(open_err)?;
        let errors = db.open_tree(ERROR_TABLE).map_err(open_err)?;
        debug!(path = %path.display(), "ledger opened");

        Ok(Self {
            path,
            db,
            success,
            errors,
            closed: false,
        })
    }

    pub fn path(&self) -> &Path { &self.path }

    pub fn record_success(&self, id: &str, commit: &PackageCommit) -> Result<(), LedgerError> {
        let val = postcard::to_allocvec(commit)?;
        put(&self.success, id.as_bytes(), &val)?;
        self.db.flush()?;
        Ok(())
    }

    /// Overwrite the error entry for `id`. The success table is left alone,
    /// so a package may carry an older success next to a fresh error.
    pub fn record_error(&self, id: &str, message: &str) -> Result<(), LedgerError> {
        put(&self.errors, id.as_bytes(), message.as_bytes())?;
        self.db.flush()?;
        Ok(())
    }

    pub fn load_all_successful(&self) -> Result<BTreeMap<String, PackageCommit>, LedgerError> {
        let mut commits = BTreeMap::new();
        for entry in self.success.iter() {
            let (key, val) = entry?;
            let commit = decode_commit(&key, &val)?;
            commits.insert(commit.id.clone(), commit);
        }
        Ok(commits)
    }

    pub fn successful(&self, id: &str) -> Result<Option<PackageCommit>, LedgerError> {
        match self.success.get(id.as_bytes())? {
            Some(val) => Ok(Some(decode_commit(id.as_bytes(), &val)?)),
            None => Ok(None),
        }
    }

    pub fn count_successful(&self) -> Result<usize, LedgerError> { count(&self.success) }

    pub fn count_errors(&self) -> Result<usize, LedgerError> { count(&self.errors) }

    pub fn errors(&self) -> Result<BTreeMap<String, String>, LedgerError> {
        let mut errors = BTreeMap::new();
        for entry in self.errors.iter() {
            let (key, val) = entry?;
            errors.insert(
                String::from_utf8_lossy(&key).into_owned(),
                String::from_utf8_lossy(&val).into_owned(),
            );
        }
        Ok(errors)
    }

    pub fn close(mut self) -> Result<(), LedgerError> {
        self.db.flush()?;
        self.closed = true;
        debug!(path = %self.path.display(), "ledger closed");
        Ok(())
    }
}

impl Drop for CommitLedger {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        if let Err(e) = self.db.flush() {
            warn!(path = %self.path.display(), error = %e, "failed to flush ledger on drop");
        }
    }
}

fn put(tree: &sled::Tree, key: &[u8], val: &[u8]) -> Result<(), LedgerError> {
    tree.transaction(|tx| {
        tx.insert(key, val)?;
        Ok::<_, ConflictableTransactionError>(())
    })?;
    Ok(())
}

fn count(tree: &sled::Tree) -> Result<usize, LedgerError> {
    let mut n = 0;
    for entry in tree.iter() {
        entry?;
        n += 1;
    }
    Ok(n)
}

fn decode_commit(key: &[u8], val: &[u8]) -> Result<PackageCommit, LedgerError> {
    postcard::from_bytes(val).map_err(|source| LedgerError::Decode {
        table: SUCCESS_TABLE,
        key: String::from_utf8_lossy(key).into_owned(),
        source,
    })
}
