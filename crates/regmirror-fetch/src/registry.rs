use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;

use bytes::Bytes;

use crate::error::FetchError;

/// Where a version's artifact lives and what it must hash to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub digest: String,
    pub url:    String,
}

impl Artifact {
    pub fn new(digest: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            digest: digest.into(),
            url:    url.into(),
        }
    }

    /// Final path segment of the artifact URL, used as the on-disk file name.
    ///
    /// Returns `None` when the URL does not parse or ends without a usable
    /// segment (empty, `.` or `..`).
    pub fn file_name(&self) -> Option<String> {
        let url = url::Url::parse(&self.url).ok()?;
        let segment = url.path_segments()?.next_back()?;
        match segment {
            "" | "." | ".." => None,
            name => Some(name.to_string()),
        }
    }
}

/// Everything the mirror needs to know about one package at one revision.
#[derive(Debug, Clone)]
pub struct PackageMetadata {
    pub id:       String,
    pub revision: String,
    /// Raw registry document, stored verbatim next to the artifacts.
    pub blob:     Bytes,
    pub versions: BTreeMap<String, Artifact>,
}

impl PackageMetadata {
    pub fn version_set(&self) -> BTreeSet<String> { self.versions.keys().cloned().collect() }
}

/// A package registry, reduced to the single capability the mirror uses.
///
/// Additional registries are added as further implementations; the sync
/// pipeline is generic over this trait.
pub trait Registry: Send + Sync {
    fn fetch_metadata(&self, id: &str) -> impl Future<Output = Result<PackageMetadata, FetchError>> + Send;
}

impl<T: Registry + ?Sized> Registry for std::sync::Arc<T> {
    fn fetch_metadata(&self, id: &str) -> impl Future<Output = Result<PackageMetadata, FetchError>> + Send {
        (**self).fetch_metadata(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_name_from_tarball_url() {
        let artifact = Artifact::new("", "https://registry.npmjs.org/react/-/react-18.2.0.tgz");
        assert_eq!(artifact.file_name().as_deref(), Some("react-18.2.0.tgz"));
    }

    #[test]
    fn test_file_name_ignores_query() {
        let artifact = Artifact::new("", "https://cdn.example/pkg/a-1.0.tgz?token=x");
        assert_eq!(artifact.file_name().as_deref(), Some("a-1.0.tgz"));
    }

    #[test]
    fn test_file_name_rejects_directory_urls() {
        assert_eq!(Artifact::new("", "https://example.com/dir/").file_name(), None);
        assert_eq!(Artifact::new("", "not a url").file_name(), None);
    }

    #[test]
    fn test_version_set() {
        let mut versions = BTreeMap::new();
        versions.insert("1.0.0".to_string(), Artifact::new("d", "https://x/a-1.0.0.tgz"));
        versions.insert("0.9.0".to_string(), Artifact::new("d", "https://x/a-0.9.0.tgz"));
        let metadata = PackageMetadata {
            id: "a".into(),
            revision: "1-a".into(),
            blob: Bytes::new(),
            versions,
        };
        let set: Vec<_> = metadata.version_set().into_iter().collect();
        assert_eq!(set, vec!["0.9.0", "1.0.0"]);
    }
}
