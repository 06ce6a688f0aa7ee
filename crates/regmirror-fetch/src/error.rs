//! Error types for regmirror-fetch.

use thiserror::Error;

/// Failure to obtain the bytes behind a URL.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request to {url} failed: {message}")]
    Request { url: String, message: String },

    #[error("{url} responded with HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("failed to read body of {url}: {message}")]
    Body { url: String, message: String },
}

/// Failure to obtain a package's registry metadata.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid registry URL for {id}: {source}")]
    InvalidUrl {
        id:     String,
        #[source]
        source: url::ParseError,
    },

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("malformed metadata for {id}: {source}")]
    Parse {
        id:     String,
        #[source]
        source: serde_json::Error,
    },

    #[error("metadata for {id} carries no revision")]
    MissingRevision { id: String },
}
