//! The transport seam between store flows and the network.

use crate::base::neterror::NetError;
use crate::cookies::CookieSet;
use async_trait::async_trait;
use bytes::Bytes;
use http::header::{HeaderMap, HeaderName, HeaderValue, LOCATION};
use http::{Method, StatusCode};

/// One outgoing request.
///
/// `path` includes the query string. The transport is responsible for turning
/// `cookies` into a `Cookie` header.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: Method,
    pub host: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub cookies: CookieSet,
    pub body: Bytes,
}

impl TransportRequest {
    pub fn post(host: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: Method::POST,
            host: host.into(),
            path: path.into(),
            headers: Vec::new(),
            cookies: CookieSet::new(),
            body: Bytes::new(),
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn cookies(mut self, cookies: CookieSet) -> Self {
        self.cookies = cookies;
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Value of the first header named `name` (case-insensitive).
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// One response as received.
///
/// `raw_headers` keeps every header line in arrival order, including repeated
/// names; `headers` is the same data as a [`HeaderMap`].
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub raw_headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl TransportResponse {
    /// Build a response from raw header lines. Lines that are not valid HTTP
    /// header names or values stay in `raw_headers` only.
    pub fn new(status: StatusCode, raw_headers: Vec<(String, String)>, body: impl Into<Bytes>) -> Self {
        let mut headers = HeaderMap::new();
        for (name, value) in &raw_headers {
            if let (Ok(name), Ok(value)) = (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                headers.append(name, value);
            }
        }
        Self {
            status,
            headers,
            raw_headers,
            body: body.into(),
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn location(&self) -> Option<&str> {
        self.headers
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.trim().is_empty())
    }
}

/// Sends one request and returns the response, without retries or
/// interpretation.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, NetError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_keeps_repeated_headers() {
        let resp = TransportResponse::new(
            StatusCode::OK,
            vec![
                ("Set-Cookie".into(), "a=1".into()),
                ("set-cookie".into(), "b=2".into()),
                ("pod".into(), "25".into()),
            ],
            Bytes::new(),
        );
        assert_eq!(resp.raw_headers.len(), 3);
        assert_eq!(resp.headers.get_all("set-cookie").iter().count(), 2);
        assert_eq!(resp.header("POD"), Some("25"));
    }

    #[test]
    fn test_location_ignores_blank() {
        let blank = TransportResponse::new(
            StatusCode::FOUND,
            vec![("Location".into(), " ".into())],
            Bytes::new(),
        );
        assert_eq!(blank.location(), None);

        let set = TransportResponse::new(
            StatusCode::FOUND,
            vec![("location".into(), "https://p25-buy.example.com/x".into())],
            Bytes::new(),
        );
        assert_eq!(set.location(), Some("https://p25-buy.example.com/x"));
    }

    #[test]
    fn test_request_builder() {
        let req = TransportRequest::post("auth.example.com", "/auth?guid=1")
            .header("Content-Type", "application/x-apple-plist")
            .body(Bytes::from_static(b"<plist/>"));
        assert_eq!(req.method, Method::POST);
        assert_eq!(req.header_value("content-type"), Some("application/x-apple-plist"));
        assert_eq!(&req.body[..], b"<plist/>");
    }
}
