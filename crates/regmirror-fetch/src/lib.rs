//! Registry metadata and artifact fetching.
//!
//! Two capability traits form the boundary between the sync pipeline and the
//! network:
//! - [`ByteFetcher`] fetches the bytes behind a URL
//! - [`Registry`] turns a package id into [`PackageMetadata`]
//!
//! [`NpmRegistry`] implements [`Registry`] on top of any [`ByteFetcher`];
//! [`ReqwestClient`] is the production [`ByteFetcher`].

mod error;
mod http;
pub mod npm;
mod registry;

pub use error::{FetchError, TransportError};
pub use http::ByteFetcher;
pub use npm::NpmRegistry;
pub use registry::{Artifact, PackageMetadata, Registry};

#[cfg(feature = "reqwest")]
pub use http::ReqwestClient;
