//! Per-package version diffing and verified artifact download.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use futures_util::future::join_all;
use regmirror_fetch::{Artifact, ByteFetcher, TransportError};
use regmirror_fs::AtomicWriteOptions;
use regmirror_verify::{Digest, VerificationError};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum VersionErrorKind {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("integrity check failed: {0}")]
    Integrity(#[from] VerificationError),
    #[error(transparent)]
    Io(#[from] regmirror_fs::Error),
    #[error("no artifact listed for this version")]
    MissingArtifact,
    #[error("artifact URL has no file name")]
    NoFileName,
}

/// Failure of a single version, tagged with where it came from.
#[derive(Debug, Error)]
#[error("{version} ({url}): {kind}")]
pub struct VersionError {
    pub version: String,
    pub url:     String,
    #[source]
    pub kind:    VersionErrorKind,
}

/// Every version that failed during one package pass.
#[derive(Debug)]
pub struct AggregateError {
    pub attempted: usize,
    pub failures:  Vec<VersionError>,
}

impl fmt::Display for AggregateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} of {} versions failed", self.failures.len(), self.attempted)?;
        for failure in &self.failures {
            write!(f, "\n  {failure}")?;
        }
        Ok(())
    }
}

impl std::error::Error for AggregateError {}

#[derive(Debug, Default)]
pub struct SyncReport {
    /// Version -> file written for it.
    pub downloaded: BTreeMap<String, PathBuf>,
}

/// Versions present remotely but not yet recorded locally.
pub fn versions_to_download(previous: &BTreeSet<String>, remote: &BTreeSet<String>) -> BTreeSet<String> {
    remote.difference(previous).cloned().collect()
}

pub struct VersionSynchronizer<F> {
    fetcher: F,
}

impl<F: ByteFetcher> VersionSynchronizer<F> {
    pub fn new(fetcher: F) -> Self { Self { fetcher } }

    /// Download every version in `remote - previous` into `package_dir`.
    ///
    /// All downloads run concurrently and to completion; one failure does not
    /// cancel the others. Succeeds only if every version was fetched,
    /// verified and written.
    pub async fn synchronize(
        &self,
        package_dir: &Path,
        previous: &BTreeSet<String>,
        remote: &BTreeSet<String>,
        index: &BTreeMap<String, Artifact>,
    ) -> Result<SyncReport, AggregateError> {
        let to_download = versions_to_download(previous, remote);
        if to_download.is_empty() {
            return Ok(SyncReport::default());
        }

        debug!(dir = %package_dir.display(), count = to_download.len(), "downloading versions");
        let attempts = join_all(
            to_download
                .iter()
                .map(|version| self.download_version(package_dir, version, index.get(version))),
        )
        .await;

        let mut report = SyncReport::default();
        let mut failures = Vec::new();
        for (version, attempt) in to_download.iter().zip(attempts) {
            match attempt {
                Ok(path) => {
                    report.downloaded.insert(version.clone(), path);
                }
                Err(e) => failures.push(e),
            }
        }

        if failures.is_empty() {
            Ok(report)
        } else {
            Err(AggregateError {
                attempted: to_download.len(),
                failures,
            })
        }
    }

    async fn download_version(
        &self,
        package_dir: &Path,
        version: &str,
        artifact: Option<&Artifact>,
    ) -> Result<PathBuf, VersionError> {
        let Some(artifact) = artifact else {
            return Err(VersionError {
                version: version.to_string(),
                url:     String::new(),
                kind:    VersionErrorKind::MissingArtifact,
            });
        };

        self.fetch_and_store(package_dir, artifact)
            .await
            .map_err(|kind| VersionError {
                version: version.to_string(),
                url: artifact.url.clone(),
                kind,
            })
    }

    async fn fetch_and_store(&self, package_dir: &Path, artifact: &Artifact) -> Result<PathBuf, VersionErrorKind> {
        let file_name = artifact.file_name().ok_or(VersionErrorKind::NoFileName)?;
        let digest = Digest::parse(&artifact.digest)?;

        let bytes = self.fetcher.fetch(&artifact.url).await?;
        digest.verify(&bytes)?;

        let dest = package_dir.join(file_name);
        write_file(dest.clone(), bytes).await?;
        debug!(path = %dest.display(), "artifact stored");
        Ok(dest)
    }
}

/// Atomically write `content` to `dest` on the blocking pool.
pub(crate) async fn write_file(dest: PathBuf, content: Bytes) -> Result<(), regmirror_fs::Error> {
    let path = dest.clone();
    tokio::task::spawn_blocking(move || {
        regmirror_fs::atomic_write(&dest, &content, AtomicWriteOptions::new().sync(true))
    })
    .await
    .map_err(|e| regmirror_fs::Error::Write {
        path,
        source: std::io::Error::other(e),
    })?
}

/// Create `dir` and its parents on the blocking pool.
pub(crate) async fn create_dir(dir: PathBuf) -> Result<(), regmirror_fs::Error> {
    let path = dir.clone();
    tokio::task::spawn_blocking(move || regmirror_fs::ensure_dir(&dir))
        .await
        .map_err(|e| regmirror_fs::Error::CreateDir {
            path,
            source: std::io::Error::other(e),
        })?
}
