//! Content verification for mirrored artifacts.
//!
//! Registries declare a digest for each artifact; [`Digest::parse`] turns the
//! declared text into an algorithm plus expected bytes and [`Digest::verify`]
//! checks downloaded content against it.
//!
//! # Example
//!
//! ```
//! use regmirror_verify::Digest;
//!
//! let digest = Digest::parse("2aae6c35c94fcfb415dbe95f408b9ce91ee846ed").unwrap();
//! digest.verify(b"hello world").unwrap();
//! assert!(digest.verify(b"hello there").is_err());
//! ```

pub use self::digest::{Algorithm, Digest};
pub use self::error::{Result, VerificationError};
pub use self::hasher::{Hasher, Sha1Hasher, Sha256Hasher, Sha512Hasher};

mod digest;
mod error;
mod hasher;
