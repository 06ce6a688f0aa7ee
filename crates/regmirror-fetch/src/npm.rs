//! npm-compatible registry adapter.
//!
//! Package documents are fetched from `<base>/<id>` and reduced to the
//! revision (`_rev`) and, per version, the tarball URL plus its declared
//! digest. `dist.integrity` is preferred over the legacy `dist.shasum`.

use std::collections::BTreeMap;

use bytes::Bytes;
use regmirror_verify::Digest;
use serde::Deserialize;
use tracing::debug;

use crate::error::FetchError;
use crate::http::ByteFetcher;
use crate::registry::{Artifact, PackageMetadata, Registry};

pub struct NpmRegistry<C: ByteFetcher> {
    base_url: String,
    client:   C,
}

impl<C: ByteFetcher> NpmRegistry<C> {
    pub fn new(base_url: impl Into<String>, client: C) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url, client }
    }

    /// Document URL for `id`. Scoped names keep their `@` but the separator
    /// is escaped, which is how the public registry addresses them.
    pub fn package_url(&self, id: &str) -> Result<url::Url, FetchError> {
        let raw = format!("{}/{}", self.base_url, id.replace('/', "%2f"));
        url::Url::parse(&raw).map_err(|source| FetchError::InvalidUrl {
            id: id.to_string(),
            source,
        })
    }
}

impl<C: ByteFetcher> Registry for NpmRegistry<C> {
    async fn fetch_metadata(&self, id: &str) -> Result<PackageMetadata, FetchError> {
        let url = self.package_url(id)?;
        debug!(package = id, %url, "fetching metadata");
        let blob = self.client.fetch(url.as_str()).await?;
        parse_document(id, blob)
    }
}

#[derive(Deserialize)]
struct Document {
    #[serde(rename = "_rev")]
    rev:      Option<String>,
    #[serde(default)]
    versions: BTreeMap<String, VersionEntry>,
}

#[derive(Deserialize)]
struct VersionEntry {
    dist: Dist,
}

#[derive(Deserialize)]
struct Dist {
    tarball:   String,
    #[serde(default)]
    shasum:    Option<String>,
    #[serde(default)]
    integrity: Option<String>,
}

/// Parse a registry document, keeping the raw bytes as the metadata blob.
///
/// A document without `versions` (an unpublished package) yields an empty
/// version set; a document without `_rev` is rejected.
pub fn parse_document(id: &str, blob: Bytes) -> Result<PackageMetadata, FetchError> {
    let document: Document = serde_json::from_slice(&blob).map_err(|source| FetchError::Parse {
        id: id.to_string(),
        source,
    })?;

    let revision = document
        .rev
        .filter(|rev| !rev.is_empty())
        .ok_or_else(|| FetchError::MissingRevision { id: id.to_string() })?;

    let versions = document
        .versions
        .into_iter()
        .map(|(version, entry)| {
            let digest = declared_digest(id, &version, entry.dist.integrity, entry.dist.shasum);
            (version, Artifact::new(digest, entry.dist.tarball))
        })
        .collect();

    Ok(PackageMetadata {
        id: id.to_string(),
        revision,
        blob,
        versions,
    })
}

// `integrity` wins when it holds a usable hash; otherwise fall back to the
// legacy `shasum`. An empty result surfaces later as a malformed digest.
fn declared_digest(id: &str, version: &str, integrity: Option<String>, shasum: Option<String>) -> String {
    match integrity {
        Some(integrity) if Digest::parse(&integrity).is_ok() => integrity,
        Some(integrity) => {
            debug!(package = id, version, %integrity, "unusable integrity value, using shasum");
            shasum.unwrap_or(integrity)
        }
        None => shasum.unwrap_or_default(),
    }
}
