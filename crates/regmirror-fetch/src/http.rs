use std::future::Future;

use bytes::Bytes;

use crate::error::TransportError;

/// Raw byte transfer for a single URL.
///
/// This is the only network primitive the mirror needs: metadata documents
/// and artifacts are both fetched whole. Implementations map their own
/// failures, including non-success HTTP statuses, onto [`TransportError`].
///
/// # Implementations
///
/// - [`ReqwestClient`]: production implementation using `reqwest`
/// - in-memory implementations in tests
pub trait ByteFetcher: Send + Sync {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<Bytes, TransportError>> + Send;
}

impl<T: ByteFetcher + ?Sized> ByteFetcher for std::sync::Arc<T> {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<Bytes, TransportError>> + Send {
        (**self).fetch(url)
    }
}

#[cfg(feature = "reqwest")]
mod reqwest_impl {
    use std::time::Duration;

    use super::*;

    /// Production byte fetcher backed by a shared `reqwest::Client`.
    ///
    /// There is no bound on total transfer time: a download that keeps
    /// receiving data always runs to completion. `connect_timeout` bounds
    /// connection setup and the optional `read_timeout` bounds the wait for
    /// the next chunk, resetting whenever data arrives.
    #[derive(Clone)]
    pub struct ReqwestClient {
        client: reqwest::Client,
    }

    impl ReqwestClient {
        pub fn new(connect_timeout: Duration, read_timeout: Option<Duration>) -> Result<Self, reqwest::Error> {
            let mut builder = reqwest::Client::builder()
                .connect_timeout(connect_timeout)
                .user_agent(concat!("regmirror/", env!("CARGO_PKG_VERSION")));
            if let Some(read_timeout) = read_timeout {
                builder = builder.read_timeout(read_timeout);
            }
            Ok(Self {
                client: builder.build()?,
            })
        }
    }

    impl ByteFetcher for ReqwestClient {
        async fn fetch(&self, url: &str) -> Result<Bytes, TransportError> {
            let response = self.client.get(url).send().await.map_err(|e| TransportError::Request {
                url:     url.to_string(),
                message: describe(&e),
            })?;

            let status = response.status();
            if !status.is_success() {
                return Err(TransportError::Status {
                    url:    url.to_string(),
                    status: status.as_u16(),
                });
            }

            response.bytes().await.map_err(|e| TransportError::Body {
                url:     url.to_string(),
                message: describe(&e),
            })
        }
    }

    // reqwest's own message omits the cause, e.g. a read timeout shows up
    // only as "error decoding response body".
    fn describe(err: &reqwest::Error) -> String {
        let mut message = err.to_string();
        let mut source = std::error::Error::source(err);
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        message
    }
}

#[cfg(feature = "reqwest")]
pub use reqwest_impl::ReqwestClient;
