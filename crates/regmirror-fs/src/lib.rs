//! Filesystem primitives for the mirror.
//!
//! - [`atomic_write`] places a file with write-then-rename semantics
//! - [`layout`] names the per-package directories under the download root

mod error;
pub mod layout;
mod rw;

pub use error::{Error, Result};
pub use layout::{METADATA_FILE, package_dir};
pub use rw::{AtomicWriteOptions, atomic_write, ensure_dir};
