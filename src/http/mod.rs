//! HTTP transport for store requests.
//!
//! Flows talk to the network only through the [`Transport`] trait. The default
//! implementation, [`HttpsTransport`], opens a BoringSSL connection and speaks
//! HTTP/1.1 through hyper; tests substitute a scripted transport.

pub mod connector;
pub mod transport;

pub use connector::HttpsTransport;
pub use transport::{Transport, TransportRequest, TransportResponse};
