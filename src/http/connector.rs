//! Default HTTPS transport: TCP, BoringSSL, then HTTP/1.1 over hyper.
//!
//! Every request opens a fresh connection. Store flows issue a handful of
//! sequential requests per operation, so no pooling is done.

use crate::base::neterror::NetError;
use crate::http::transport::{Transport, TransportRequest, TransportResponse};
use async_trait::async_trait;
use boring::ssl::{SslConnector, SslMethod};
use bytes::Bytes;
use http::header::{COOKIE, HOST};
use http::Request;
use http_body_util::{BodyExt, Full};
use hyper::client::conn::http1;
use hyper_util::rt::TokioIo;
use std::time::Duration;
use tokio::net::TcpStream;

const HTTPS_PORT: u16 = 443;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const HTTP1_ALPN: &[u8] = b"http/1.1";
/// Wire form: length-prefixed protocol names.
const ALPN_PROTOS: &[u8] = b"\x08http/1.1";

#[derive(Debug, Clone)]
pub struct HttpsTransport {
    timeout: Duration,
    port: u16,
}

impl Default for HttpsTransport {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            port: HTTPS_PORT,
        }
    }
}

impl HttpsTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound the whole exchange (connect, handshake, request, body).
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn connect(&self, host: &str) -> Result<tokio_boring::SslStream<TcpStream>, NetError> {
        let addrs = tokio::net::lookup_host((host, self.port))
            .await
            .map_err(|_| NetError::NameNotResolved)?;

        let mut last_error = NetError::NameNotResolved;
        let mut stream = None;
        for addr in addrs {
            match TcpStream::connect(addr).await {
                Ok(s) => {
                    stream = Some(s);
                    break;
                }
                Err(e) => {
                    tracing::debug!("Connect to {} failed: {}", addr, e);
                    last_error = NetError::from(e);
                }
            }
        }
        let stream = stream.ok_or(last_error)?;

        let mut builder =
            SslConnector::builder(SslMethod::tls()).map_err(|_| NetError::SslProtocolError)?;
        builder
            .set_alpn_protos(ALPN_PROTOS)
            .map_err(|_| NetError::SslProtocolError)?;
        let config = builder
            .build()
            .configure()
            .map_err(|_| NetError::SslProtocolError)?;

        let tls = tokio_boring::connect(config, host, stream)
            .await
            .map_err(|e| {
                tracing::debug!("TLS handshake with {} failed: {:?}", host, e);
                NetError::SslProtocolError
            })?;
        check_alpn(tls.ssl().selected_alpn_protocol())?;
        Ok(tls)
    }

    async fn exchange(&self, request: TransportRequest) -> Result<TransportResponse, NetError> {
        let tls = self.connect(&request.host).await?;
        let (mut sender, conn) = http1::handshake::<_, Full<Bytes>>(TokioIo::new(tls)).await?;

        tokio::spawn(async move {
            if let Err(e) = conn.await {
                tracing::debug!("Connection closed with error: {}", e);
            }
        });

        let mut builder = Request::builder()
            .method(request.method)
            .uri(request.path.as_str())
            .header(HOST, request.host.as_str());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(cookie) = request.cookies.header_value() {
            builder = builder.header(COOKIE, cookie);
        }
        let http_request = builder
            .body(Full::new(request.body))
            .map_err(|_| NetError::InvalidUrl)?;

        let response = sender.send_request(http_request).await?;
        let (parts, body) = response.into_parts();
        let body = body
            .collect()
            .await
            .map_err(|_| NetError::ResponseBodyReadFailed)?
            .to_bytes();

        let raw_headers = parts
            .headers
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();

        Ok(TransportResponse {
            status: parts.status,
            headers: parts.headers,
            raw_headers,
            body,
        })
    }
}

/// A server that skips ALPN is assumed to speak HTTP/1.1; any other
/// selected protocol cannot be driven by the http1 connection.
fn check_alpn(selected: Option<&[u8]>) -> Result<(), NetError> {
    match selected {
        None | Some(HTTP1_ALPN) => Ok(()),
        Some(other) => {
            tracing::debug!(
                "Server selected unsupported protocol {}",
                String::from_utf8_lossy(other)
            );
            Err(NetError::AlpnNegotiationFailed)
        }
    }
}

#[async_trait]
impl Transport for HttpsTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, NetError> {
        tracing::debug!("{} https://{}{}", request.method, request.host, request.path);
        let host = request.host.clone();
        let result = tokio::time::timeout(self.timeout, self.exchange(request))
            .await
            .map_err(|_| NetError::ConnectionTimedOut)?;

        if let Err(e) = &result {
            if e.is_connect_phase() {
                tracing::debug!("Could not reach {}: {}", host, e);
            } else {
                tracing::debug!("Request to {} failed: {}", host, e);
            }
        }
        result
    }
}
