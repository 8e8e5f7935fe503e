//! Store client with builder pattern.
//!
//! # Example
//!
//! ```rust,no_run
//! use storenet::{StoreClient, StoreConfig};
//! use storenet::http::HttpsTransport;
//! use std::time::Duration;
//!
//! # async fn run() -> Result<(), storenet::StoreError> {
//! let client = StoreClient::builder()
//!     .config(StoreConfig::default().max_redirects(4))
//!     .transport(HttpsTransport::new().with_timeout(Duration::from_secs(15)))
//!     .build();
//!
//! let account = client
//!     .authenticate("user@example.com", "password", None, None, None)
//!     .await?;
//! println!("signed in, store front {}", account.store_front);
//! # Ok(())
//! # }
//! ```

use crate::http::{HttpsTransport, Transport};
use crate::store::config::StoreConfig;
use std::sync::Arc;

/// Client for the store backend.
///
/// Cheap to clone; clones share the transport. Every operation takes an
/// account snapshot and returns a new one.
pub struct StoreClient<T: Transport = HttpsTransport> {
    pub(crate) transport: Arc<T>,
    pub(crate) config: StoreConfig,
}

impl<T: Transport> Clone for StoreClient<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            config: self.config.clone(),
        }
    }
}

impl Default for StoreClient<HttpsTransport> {
    fn default() -> Self {
        Self::new()
    }
}

impl StoreClient<HttpsTransport> {
    /// Client with the default configuration over HTTPS.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> StoreClientBuilder<HttpsTransport> {
        StoreClientBuilder::default()
    }
}

impl<T: Transport> StoreClient<T> {
    /// Client over an already shared transport.
    pub fn with_transport(transport: Arc<T>, config: StoreConfig) -> Self {
        Self { transport, config }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}

/// Builder for creating a [`StoreClient`].
pub struct StoreClientBuilder<T: Transport> {
    config: StoreConfig,
    transport: T,
}

impl Default for StoreClientBuilder<HttpsTransport> {
    fn default() -> Self {
        Self {
            config: StoreConfig::default(),
            transport: HttpsTransport::default(),
        }
    }
}

impl<T: Transport> StoreClientBuilder<T> {
    pub fn config(mut self, config: StoreConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the transport, e.g. with a test double.
    pub fn transport<U: Transport>(self, transport: U) -> StoreClientBuilder<U> {
        StoreClientBuilder {
            config: self.config,
            transport,
        }
    }

    pub fn build(self) -> StoreClient<T> {
        StoreClient {
            transport: Arc::new(self.transport),
            config: self.config,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_builder_defaults() {
        let client = StoreClient::builder().build();
        assert_eq!(client.config().max_redirects, 4);
        assert_eq!(client.transport().timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_builder_overrides() {
        let client = StoreClient::builder()
            .config(StoreConfig::default().auth_host("auth.test"))
            .transport(HttpsTransport::new().with_timeout(Duration::from_secs(5)))
            .build();
        assert_eq!(client.config().auth_host, "auth.test");
        assert_eq!(client.transport().timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_clone_shares_transport() {
        let client = StoreClient::new();
        let other = client.clone();
        assert!(Arc::ptr_eq(&client.transport, &other.transport));
    }
}
