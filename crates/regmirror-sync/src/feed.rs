//! Change feed parsing.
//!
//! Accepts a CouchDB `_changes` document (`{"results": [...], "last_seq": ..}`)
//! or newline-delimited change records, and reduces either to one
//! [`Candidate`] per live package id.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde::de::IgnoredAny;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("cannot open change feed {path}: {source}")]
    Open {
        path:   PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot read change feed: {0}")]
    Read(#[from] std::io::Error),
    #[error("malformed change feed: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("change record for {id} lists no revision")]
    MissingRevision { id: String },
    #[error("change record without an id")]
    MissingId,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChangeRevision {
    pub rev: String,
}

/// One entry of the change feed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChangeRecord {
    pub id:       String,
    #[serde(default)]
    pub deleted:  bool,
    #[serde(default, alias = "changeRevisions")]
    pub changes:  Vec<ChangeRevision>,
    #[serde(default)]
    pub revision: Option<String>,
}

impl ChangeRecord {
    /// The first listed change revision, falling back to an explicit
    /// `revision` field.
    pub fn latest_revision(&self) -> Option<&str> {
        self.changes
            .first()
            .map(|c| c.rev.as_str())
            .or(self.revision.as_deref())
    }
}

/// A package the feed claims has changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub id:       String,
    pub revision: String,
}

/// One top-level JSON value in the feed: a whole `_changes` document, a
/// single change record, or a `last_seq` checkpoint.
#[derive(Deserialize)]
struct FeedEntry {
    #[serde(default)]
    results:  Option<Vec<ChangeRecord>>,
    #[serde(default)]
    last_seq: Option<IgnoredAny>,
    #[serde(default)]
    id:       Option<String>,
    #[serde(default)]
    deleted:  bool,
    #[serde(default, alias = "changeRevisions")]
    changes:  Vec<ChangeRevision>,
    #[serde(default)]
    revision: Option<String>,
}

impl FeedEntry {
    fn collect_into(self, records: &mut Vec<ChangeRecord>) -> Result<(), FeedError> {
        if let Some(results) = self.results {
            records.extend(results);
            return Ok(());
        }
        match self.id {
            Some(id) => records.push(ChangeRecord {
                id,
                deleted: self.deleted,
                changes: self.changes,
                revision: self.revision,
            }),
            // trailing checkpoint of a continuous feed
            None if self.last_seq.is_some() => {}
            None => return Err(FeedError::MissingId),
        }
        Ok(())
    }
}

/// Parse every change record in `reader`, one top-level value at a time.
///
/// The reader is consumed byte by byte; pass a buffered reader.
pub fn read_records(reader: impl Read) -> Result<Vec<ChangeRecord>, FeedError> {
    let mut records = Vec::new();
    for entry in serde_json::Deserializer::from_reader(reader).into_iter::<FeedEntry>() {
        let entry = entry.map_err(|e| {
            if e.is_io() {
                FeedError::Read(e.into())
            } else {
                FeedError::Parse(e)
            }
        })?;
        entry.collect_into(&mut records)?;
    }
    Ok(records)
}

pub fn parse_records(raw: &str) -> Result<Vec<ChangeRecord>, FeedError> { read_records(raw.as_bytes()) }

/// Reduce records to candidates: deleted records are ignored and a later
/// record for the same id replaces an earlier one.
pub fn candidates(
    records: impl IntoIterator<Item = ChangeRecord>,
) -> Result<BTreeMap<String, Candidate>, FeedError> {
    let mut out = BTreeMap::new();
    for record in records {
        if record.deleted {
            debug!(package = %record.id, "skipping deleted package");
            continue;
        }
        let revision = record
            .latest_revision()
            .ok_or_else(|| FeedError::MissingRevision {
                id: record.id.clone(),
            })?
            .to_string();
        out.insert(record.id.clone(), Candidate {
            id: record.id,
            revision,
        });
    }
    Ok(out)
}

/// Read the feed file at `path` into a candidate set.
pub fn read_feed(path: &Path) -> Result<BTreeMap<String, Candidate>, FeedError> {
    let file = std::fs::File::open(path).map_err(|source| FeedError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    candidates(read_records(std::io::BufReader::new(file))?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_couchdb_document() {
        let raw = r#"{
            "results": [
                {"seq": 1, "id": "react", "changes": [{"rev": "10-abc"}]},
                {"seq": 2, "id": "left-pad", "deleted": true, "changes": [{"rev": "4-dead"}]},
                {"seq": 3, "id": "lodash", "changes": [{"rev": "7-b"}, {"rev": "6-a"}]}
            ],
            "last_seq": 3
        }"#;
        let candidates = candidates(parse_records(raw).unwrap()).unwrap();

        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates["react"].revision, "10-abc");
        assert_eq!(candidates["lodash"].revision, "7-b");
        assert!(!candidates.contains_key("left-pad"));
    }

    #[test]
    fn test_newline_delimited_records() {
        let raw = concat!(
            r#"{"id":"a","changeRevisions":[{"rev":"1-x"}]}"#,
            "\n\n",
            r#"{"id":"b","revision":"2-y","deleted":false}"#,
            "\n",
            r#"{"last_seq":"42-g1AAAA"}"#,
            "\n"
        );
        let candidates = candidates(parse_records(raw).unwrap()).unwrap();

        assert_eq!(candidates["a"].revision, "1-x");
        assert_eq!(candidates["b"].revision, "2-y");
        assert_eq!(candidates.len(), 2);
    }

    #[test]
    fn test_last_seen_wins() {
        let raw = r#"{"results":[
            {"id":"a","changes":[{"rev":"1-x"}]},
            {"id":"a","changes":[{"rev":"2-y"}]}
        ]}"#;
        let candidates = candidates(parse_records(raw).unwrap()).unwrap();
        assert_eq!(candidates["a"].revision, "2-y");
    }

    #[test]
    fn test_later_deletion_does_not_remove_candidate() {
        let raw = r#"{"results":[
            {"id":"a","changes":[{"rev":"1-x"}]},
            {"id":"a","deleted":true,"changes":[{"rev":"2-y"}]}
        ]}"#;
        let candidates = candidates(parse_records(raw).unwrap()).unwrap();
        assert_eq!(candidates["a"].revision, "1-x");
    }

    #[test]
    fn test_missing_revision_is_rejected() {
        let raw = r#"{"results":[{"id":"a","changes":[]}]}"#;
        assert!(matches!(
            candidates(parse_records(raw).unwrap()),
            Err(FeedError::MissingRevision { id }) if id == "a"
        ));
    }

    #[test]
    fn test_malformed_feed_is_rejected() {
        assert!(matches!(parse_records(r#"{"results": [{"id": 5}]}"#), Err(FeedError::Parse(_))));
        assert!(matches!(parse_records("{\"results\": ["), Err(FeedError::Parse(_))));
        assert!(matches!(parse_records("[1, 2]"), Err(FeedError::Parse(_))));
    }

    #[test]
    fn test_record_without_id_is_rejected() {
        assert!(matches!(
            parse_records(r#"{"changes":[{"rev":"1-x"}]}"#),
            Err(FeedError::MissingId)
        ));
    }

    /// Hands out a few bytes per call, then optionally fails.
    struct Chunked {
        data: Vec<u8>,
        pos:  usize,
        fail: bool,
    }

    impl Read for Chunked {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.pos == self.data.len() {
                if self.fail {
                    return Err(std::io::Error::other("disk went away"));
                }
                return Ok(0);
            }
            let n = buf.len().min(3).min(self.data.len() - self.pos);
            buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    #[test]
    fn test_reads_incrementally_from_reader() {
        let raw = r#"{"results":[{"id":"a","changes":[{"rev":"1-x"}]},{"id":"b","changes":[{"rev":"2-y"}]}],"last_seq":2}
{"id":"c","revision":"3-z"}"#;
        let reader = Chunked {
            data: raw.as_bytes().to_vec(),
            pos:  0,
            fail: false,
        };
        let ids: Vec<_> = read_records(reader).unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, ["a", "b", "c"]);
    }

    #[test]
    fn test_io_failure_is_read_error() {
        let reader = Chunked {
            data: br#"{"id":"a","revision":"1-x"}"#.to_vec(),
            pos:  0,
            fail: true,
        };
        assert!(matches!(read_records(reader), Err(FeedError::Read(_))));
    }

    #[test]
    fn test_empty_feed() {
        assert!(parse_records("").unwrap().is_empty());
        assert!(parse_records("  \n").unwrap().is_empty());
    }

    #[test]
    fn test_missing_file_is_open_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            read_feed(&dir.path().join("_changes")),
            Err(FeedError::Open { .. })
        ));
    }
}
