//! Remote fetch transports
//!
//! [`ArtifactCache`](crate::ArtifactCache) only needs a readable body for a
//! URL. The [`Transport`] trait is that seam: [`HttpTransport`] talks to the
//! network, tests plug in in-memory fakes.

use crate::{CacheError, CacheResult};
use std::io::Read;
use tracing::debug;

/// Source of remote resource bodies
pub trait Transport {
    /// Open `url` for reading
    ///
    /// # Errors
    ///
    /// Returns `CacheError::Http` if the resource cannot be fetched.
    fn open(&self, url: &str) -> CacheResult<Box<dyn Read + Send>>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn open(&self, url: &str) -> CacheResult<Box<dyn Read + Send>> {
        (**self).open(url)
    }
}

/// Blocking HTTP(S) transport
///
/// Redirects are followed. There is no timeout and no retry: a stalled or
/// failed transfer is surfaced to the caller as-is.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    agent: ureq::Agent,
}

impl HttpTransport {
    /// Create a transport with a fresh connection pool
    #[must_use]
    pub fn new() -> Self {
        Self {
            agent: ureq::AgentBuilder::new().build(),
        }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for HttpTransport {
    fn open(&self, url: &str) -> CacheResult<Box<dyn Read + Send>> {
        debug!("GET {}", url);

        let response = self.agent.get(url).call().map_err(|e| CacheError::Http {
            url: url.to_string(),
            message: match e {
                ureq::Error::Status(code, response) => {
                    format!("status {code} {}", response.status_text())
                }
                ureq::Error::Transport(transport) => transport.to_string(),
            },
        })?;

        Ok(Box::new(response.into_reader()))
    }
}
