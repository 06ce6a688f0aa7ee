use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to write {path}: {source}")]
    Write {
        path:   PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to create directory {path}: {source}")]
    CreateDir {
        path:   PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} has no parent directory")]
    NoParent { path: PathBuf },
}

pub type Result<T> = std::result::Result<T, Error>;
