//! Shared request plumbing: plist bodies, identity headers, redirects and
//! cookie merging.

use crate::base::neterror::NetError;
use crate::base::storeerror::StoreError;
use crate::client::StoreClient;
use crate::cookies::CookieSet;
use crate::http::{Transport, TransportRequest, TransportResponse};
use crate::plist::{self, Dictionary};
use bytes::Bytes;
use http::{Method, StatusCode};
use url::Url;

/// Why a redirect could not be followed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RedirectFailure {
    MissingLocation,
    TooMany,
}

/// A final (non-redirect) response and the cookies accumulated on the way.
#[derive(Debug)]
pub(crate) struct Exchange {
    pub response: TransportResponse,
    pub cookies: CookieSet,
}

impl Exchange {
    pub fn decode(&self) -> Result<Dictionary, StoreError> {
        plist::from_bytes(&self.response.body)
    }
}

/// Headers identifying a signed-in account. Both slots always carry the same id.
pub(crate) fn identity_headers(dsid: &str) -> Vec<(String, String)> {
    vec![
        ("iCloud-DSID".to_string(), dsid.to_string()),
        ("X-Dsid".to_string(), dsid.to_string()),
    ]
}

/// Resolve a `Location` header against the current URL into host and path
/// (with query).
pub(crate) fn resolve_location(
    host: &str,
    path: &str,
    location: &str,
) -> Result<(String, String), StoreError> {
    let base = Url::parse(&format!("https://{host}{path}")).map_err(|_| NetError::InvalidUrl)?;
    let target = base.join(location.trim()).map_err(|_| NetError::InvalidUrl)?;
    let host = target.host_str().ok_or(NetError::InvalidUrl)?.to_string();
    let path = match target.query() {
        Some(query) => format!("{}?{}", target.path(), query),
        None => target.path().to_string(),
    };
    Ok((host, path))
}

impl<T: Transport> StoreClient<T> {
    /// POST `payload` as a plist, following up to `max_redirects` redirects
    /// with the same body. Cookies from every response are merged in order.
    pub(crate) async fn post_plist(
        &self,
        host: String,
        path: String,
        extra_headers: Vec<(String, String)>,
        payload: &Dictionary,
        cookies: &CookieSet,
        redirect_error: fn(RedirectFailure) -> StoreError,
    ) -> Result<Exchange, StoreError> {
        let body = Bytes::from(plist::to_xml(payload));
        let mut headers = vec![
            ("User-Agent".to_string(), self.config.user_agent.clone()),
            ("Content-Type".to_string(), plist::CONTENT_TYPE.to_string()),
        ];
        headers.extend(extra_headers);

        let mut host = host;
        let mut path = path;
        let mut cookies = cookies.clone();
        let mut redirects = 0;

        loop {
            let request = TransportRequest {
                method: Method::POST,
                host: host.clone(),
                path: path.clone(),
                headers: headers.clone(),
                cookies: cookies.clone(),
                body: body.clone(),
            };
            let response = self.transport.send(request).await?;
            cookies = cookies.merge(&response.raw_headers);

            if response.status != StatusCode::FOUND {
                return Ok(Exchange { response, cookies });
            }

            if redirects >= self.config.max_redirects {
                tracing::warn!("Giving up after {} redirects at {}", redirects, host);
                return Err(redirect_error(RedirectFailure::TooMany));
            }
            let location = response
                .location()
                .ok_or_else(|| redirect_error(RedirectFailure::MissingLocation))?;
            let (next_host, next_path) = resolve_location(&host, &path, location)?;
            redirects += 1;
            tracing::debug!(
                "Redirect {} from {} to {}{}",
                redirects,
                host,
                next_host,
                next_path
            );
            host = next_host;
            path = next_path;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_absolute_location() {
        let (host, path) = resolve_location(
            "buy.itunes.apple.com",
            "/WebObjects/MZFinance.woa/wa/buyProduct",
            "https://p25-buy.itunes.apple.com/WebObjects/x?guid=AB&z=1",
        )
        .unwrap();
        assert_eq!(host, "p25-buy.itunes.apple.com");
        assert_eq!(path, "/WebObjects/x?guid=AB&z=1");
    }

    #[test]
    fn test_resolve_relative_location() {
        let (host, path) =
            resolve_location("buy.itunes.apple.com", "/a/b?x=1", "/c/d").unwrap();
        assert_eq!(host, "buy.itunes.apple.com");
        assert_eq!(path, "/c/d");
    }

    #[test]
    fn test_identity_headers_match() {
        let headers = identity_headers("123456");
        assert_eq!(headers.len(), 2);
        assert!(headers.iter().all(|(_, v)| v == "123456"));
    }
}
