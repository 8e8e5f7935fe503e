//! Download tickets for free items.

use crate::base::storeerror::{DownloadFailure, StoreError};
use crate::client::StoreClient;
use crate::cookies::CookieSet;
use crate::http::Transport;
use crate::plist::{self, Dictionary, Value};
use crate::store::account::{Account, DownloadOutput, Software, Sinf};
use crate::store::failure::BackendFailure;
use crate::store::relogin::with_relogin;
use crate::store::request::{identity_headers, RedirectFailure};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

const DOWNLOAD_PATH: &str = "/WebObjects/MZFinance.woa/wa/volumeStoreDownloadProduct";

#[derive(Debug, Clone, PartialEq)]
pub struct DownloadResult {
    pub output: DownloadOutput,
    pub updated_cookies: CookieSet,
    /// Present only when the session had to be renewed.
    pub updated_account: Option<Account>,
}

fn download_redirect_error(failure: RedirectFailure) -> StoreError {
    match failure {
        RedirectFailure::MissingLocation => {
            StoreError::download(DownloadFailure::MissingRedirectLocation)
        }
        RedirectFailure::TooMany => StoreError::download(DownloadFailure::TooManyRedirects),
    }
}

impl<T: Transport> StoreClient<T> {
    /// Request a download ticket for `software`, optionally for a specific
    /// historical version.
    pub async fn download_info(
        &self,
        account: &Account,
        software: &Software,
        external_version_id: Option<&str>,
    ) -> Result<DownloadResult, StoreError> {
        let relogged = with_relogin(self, account, |acc| async move {
            self.download_once(&acc, software, external_version_id).await
        })
        .await?;

        let (output, updated_cookies) = relogged.value;
        Ok(DownloadResult {
            output,
            updated_cookies,
            updated_account: relogged.account,
        })
    }

    async fn download_once(
        &self,
        account: &Account,
        software: &Software,
        external_version_id: Option<&str>,
    ) -> Result<(DownloadOutput, CookieSet), StoreError> {
        let device_id = &account.device_identifier;

        let mut payload = Dictionary::new();
        payload.insert("creditDisplay", "");
        payload.insert("guid", device_id);
        payload.insert("salableAdamId", software.id);
        if let Some(version) = external_version_id.filter(|v| !v.is_empty()) {
            payload.insert("externalVersionId", version);
        }

        let exchange = self
            .post_plist(
                self.config.store_host_for(account.pod.as_deref()),
                format!("{DOWNLOAD_PATH}?guid={device_id}"),
                identity_headers(&account.directory_services_identifier),
                &payload,
                &account.cookies,
                download_redirect_error,
            )
            .await?;

        let dict = exchange.decode()?;
        if let Some(failure) = BackendFailure::from_dictionary(&dict) {
            tracing::warn!(
                "Download of {} rejected with code {}",
                software.id,
                failure.code
            );
            return Err(failure.into_download_error());
        }

        let output = parse_download(&dict, &account.email)?;
        tracing::debug!(
            "Download ticket for {} version {} with {} sinf(s)",
            software.id,
            output.bundle_short_version_string,
            output.sinfs.len()
        );
        Ok((output, exchange.cookies))
    }
}

fn parse_download(dict: &Dictionary, email: &str) -> Result<DownloadOutput, StoreError> {
    let item = dict
        .get_array("songList")
        .and_then(|items| items.first())
        .and_then(Value::as_dictionary)
        .ok_or_else(|| StoreError::download(DownloadFailure::NoItems))?;

    let download_url = item
        .get_text("URL")
        .ok_or_else(|| StoreError::download(DownloadFailure::MissingUrl))?;

    let metadata = item
        .get_dictionary("metadata")
        .ok_or_else(|| StoreError::download(DownloadFailure::MissingMetadata))?;

    let (bundle_short_version_string, bundle_version) = match (
        metadata.get_text("bundleShortVersionString"),
        metadata.get_text("bundleVersion"),
    ) {
        (Some(short), Some(build)) => (short, build),
        _ => return Err(StoreError::download(DownloadFailure::MissingVersion)),
    };

    let sinfs = parse_sinfs(item)?;
    if sinfs.is_empty() {
        return Err(StoreError::download(DownloadFailure::NoSignatures));
    }

    Ok(DownloadOutput {
        download_url,
        sinfs,
        bundle_short_version_string,
        bundle_version,
        itunes_metadata: install_metadata(metadata, email),
    })
}

/// Entries without an id or blob are skipped; a blob that is neither data
/// nor base64 text fails the whole ticket.
fn parse_sinfs(item: &Dictionary) -> Result<Vec<Sinf>, StoreError> {
    let Some(entries) = item.get_array("sinfs") else {
        return Ok(Vec::new());
    };

    let mut sinfs = Vec::with_capacity(entries.len());
    for entry in entries.iter().filter_map(Value::as_dictionary) {
        let id = match entry.get("id") {
            Some(Value::Integer(id)) => *id,
            Some(Value::String(id)) => id
                .trim()
                .parse()
                .map_err(|_| StoreError::download(DownloadFailure::InvalidSignature))?,
            _ => continue,
        };
        let Some(blob) = entry.get("sinf") else {
            continue;
        };
        let bytes = blob
            .data_bytes()
            .ok_or_else(|| StoreError::download(DownloadFailure::InvalidSignature))?;
        if bytes.is_empty() {
            continue;
        }
        sinfs.push(Sinf {
            id,
            sinf: STANDARD.encode(bytes),
        });
    }
    Ok(sinfs)
}

/// Install metadata: the item metadata stamped with the owner and stripped
/// of the session token, as base64 of an XML plist.
fn install_metadata(metadata: &Dictionary, email: &str) -> String {
    let mut document = metadata.clone();
    document.insert("apple-id", email);
    document.insert("userName", email);
    document.remove("passwordToken");
    STANDARD.encode(plist::to_xml(&document))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item() -> Dictionary {
        let mut metadata = Dictionary::new();
        metadata.insert("bundleShortVersionString", "2.1");
        metadata.insert("bundleVersion", "210");
        metadata.insert("passwordToken", "secret-token");

        let mut sinf = Dictionary::new();
        sinf.insert("id", 0_i64);
        sinf.insert("sinf", vec![1_u8, 2, 3]);

        let mut item = Dictionary::new();
        item.insert("URL", "https://iosapps.example.com/a.ipa");
        item.insert("metadata", metadata);
        item.insert("sinfs", vec![Value::from(sinf)]);
        item
    }

    fn response(item: Dictionary) -> Dictionary {
        let mut dict = Dictionary::new();
        dict.insert("songList", vec![Value::from(item)]);
        dict
    }

    fn download_reason(err: StoreError) -> DownloadFailure {
        match err {
            StoreError::Download { reason, .. } => reason,
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_parse_complete_ticket() {
        let output = parse_download(&response(item()), "user@example.com").unwrap();
        assert_eq!(output.download_url, "https://iosapps.example.com/a.ipa");
        assert_eq!(output.bundle_short_version_string, "2.1");
        assert_eq!(output.bundle_version, "210");
        assert_eq!(output.sinfs, vec![Sinf { id: 0, sinf: "AQID".into() }]);
    }

    #[test]
    fn test_install_metadata_strips_token() {
        let output = parse_download(&response(item()), "user@example.com").unwrap();
        let xml = STANDARD.decode(output.itunes_metadata).unwrap();
        let doc = plist::from_bytes(&xml).unwrap();
        assert_eq!(doc.get_str("apple-id"), Some("user@example.com"));
        assert_eq!(doc.get_str("userName"), Some("user@example.com"));
        assert!(!doc.contains_key("passwordToken"));
        assert_eq!(doc.get_str("bundleVersion"), Some("210"));
    }

    #[test]
    fn test_sinf_as_base64_text() {
        let mut entry = Dictionary::new();
        entry.insert("id", "4");
        entry.insert("sinf", "AQID");
        let mut it = item();
        it.insert("sinfs", vec![Value::from(entry)]);

        let output = parse_download(&response(it), "u").unwrap();
        assert_eq!(output.sinfs, vec![Sinf { id: 4, sinf: "AQID".into() }]);
    }

    #[test]
    fn test_missing_fields_have_specific_errors() {
        let empty = Dictionary::new();
        assert_eq!(
            download_reason(parse_download(&empty, "u").unwrap_err()),
            DownloadFailure::NoItems
        );

        let mut no_url = item();
        no_url.remove("URL");
        assert_eq!(
            download_reason(parse_download(&response(no_url), "u").unwrap_err()),
            DownloadFailure::MissingUrl
        );

        let mut no_meta = item();
        no_meta.remove("metadata");
        assert_eq!(
            download_reason(parse_download(&response(no_meta), "u").unwrap_err()),
            DownloadFailure::MissingMetadata
        );

        let mut no_version = item();
        let mut metadata = no_version.get_dictionary("metadata").unwrap().clone();
        metadata.remove("bundleVersion");
        no_version.insert("metadata", metadata);
        assert_eq!(
            download_reason(parse_download(&response(no_version), "u").unwrap_err()),
            DownloadFailure::MissingVersion
        );

        let mut no_sinfs = item();
        no_sinfs.remove("sinfs");
        assert_eq!(
            download_reason(parse_download(&response(no_sinfs), "u").unwrap_err()),
            DownloadFailure::NoSignatures
        );

        let mut bad_sinf = item();
        let mut entry = Dictionary::new();
        entry.insert("id", 0_i64);
        entry.insert("sinf", true);
        bad_sinf.insert("sinfs", vec![Value::from(entry)]);
        assert_eq!(
            download_reason(parse_download(&response(bad_sinf), "u").unwrap_err()),
            DownloadFailure::InvalidSignature
        );
    }
}
