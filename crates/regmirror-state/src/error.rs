use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("failed to open ledger at {path}: {source}")]
    Open {
        path:   PathBuf,
        #[source]
        source: sled::Error,
    },
    #[error("Serialization Error {0}")]
    Serialization(#[from] postcard::Error),
    #[error("Database Error {0}")]
    Database(#[from] sled::Error),
    #[error("Transaction Error {0}")]
    Transaction(#[from] sled::transaction::TransactionError),
    #[error("undecodable {table} entry for {key}: {source}")]
    Decode {
        table:  &'static str,
        key:    String,
        #[source]
        source: postcard::Error,
    },
}
