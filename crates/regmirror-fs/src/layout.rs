//! On-disk layout of the mirror.
//!
//! Every package pass writes into `<root>/<revision>-<id>/`. The name is a
//! pure function of the revision and the package id, so two passes over
//! different revisions of a package never share a directory and distinct
//! packages never write into each other's directories.

use std::path::{Path, PathBuf};

/// File name of the raw registry document inside a package directory.
pub const METADATA_FILE: &str = "package.json";

/// Directory for `id` at `revision` under `root`.
///
/// Path separators in the id (scoped npm packages look like `@scope/name`)
/// are percent-encoded so each package occupies exactly one directory level.
pub fn package_dir(root: &Path, revision: &str, id: &str) -> PathBuf {
    root.join(package_dir_name(revision, id))
}

pub fn package_dir_name(revision: &str, id: &str) -> String {
    format!("{}-{}", revision, encode_segment(id))
}

fn encode_segment(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '%' => out.push_str("%25"),
            '/' => out.push_str("%2f"),
            '\\' => out.push_str("%5c"),
            _ => out.push(c),
        }
    }
    out
}
