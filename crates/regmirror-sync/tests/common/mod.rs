#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use bytes::Bytes;
use regmirror_fetch::{Artifact, ByteFetcher, FetchError, PackageMetadata, Registry, TransportError};
use sha1::{Digest, Sha1};

pub fn sha1_hex(data: &[u8]) -> String { hex::encode(Sha1::digest(data)) }

pub fn tarball_url(id: &str, version: &str) -> String {
    format!("https://registry.test/{id}/-/{id}-{version}.tgz")
}

/// Serves artifact bytes from memory and records every requested URL.
#[derive(Default)]
pub struct MemoryFetcher {
    blobs:    HashMap<String, Bytes>,
    requests: Mutex<Vec<String>>,
}

impl MemoryFetcher {
    pub fn serve(&mut self, url: impl Into<String>, body: impl Into<Bytes>) {
        self.blobs.insert(url.into(), body.into());
    }

    pub fn requests(&self) -> Vec<String> {
        let mut requests = self.requests.lock().unwrap().clone();
        requests.sort();
        requests
    }
}

impl ByteFetcher for MemoryFetcher {
    async fn fetch(&self, url: &str) -> Result<Bytes, TransportError> {
        self.requests.lock().unwrap().push(url.to_string());
        self.blobs.get(url).cloned().ok_or_else(|| TransportError::Status {
            url:    url.to_string(),
            status: 404,
        })
    }
}

/// Registry backed by a map of prepared metadata.
#[derive(Default)]
pub struct MemoryRegistry {
    packages: HashMap<String, PackageMetadata>,
    calls:    AtomicUsize,
}

impl MemoryRegistry {
    pub fn publish(&mut self, metadata: PackageMetadata) { self.packages.insert(metadata.id.clone(), metadata); }

    pub fn calls(&self) -> usize { self.calls.load(Ordering::SeqCst) }
}

impl Registry for MemoryRegistry {
    async fn fetch_metadata(&self, id: &str) -> Result<PackageMetadata, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.packages.get(id).cloned().ok_or_else(|| {
            FetchError::Transport(TransportError::Status {
                url:    format!("https://registry.test/{id}"),
                status: 404,
            })
        })
    }
}

/// A package whose versions are all served correctly by `fetcher`.
pub fn package(id: &str, revision: &str, versions: &[&str], fetcher: &mut MemoryFetcher) -> PackageMetadata {
    let mut index = BTreeMap::new();
    for version in versions {
        let url = tarball_url(id, version);
        let body = format!("{id}@{version} tarball");
        index.insert(version.to_string(), Artifact::new(sha1_hex(body.as_bytes()), url.clone()));
        fetcher.serve(url, body);
    }
    PackageMetadata {
        id:       id.to_string(),
        revision: revision.to_string(),
        blob:     Bytes::from(format!(r#"{{"_id":"{id}","_rev":"{revision}"}}"#)),
        versions: index,
    }
}
