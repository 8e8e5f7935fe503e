//! Error taxonomy for every store operation.

use crate::base::neterror::NetError;
use thiserror::Error;

/// Why a download ticket request failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadFailure {
    /// Session or password token expired; re-authentication fixes it.
    PasswordExpired,
    /// The account holds no license for the item.
    LicenseRequired,
    /// Backend rejection carrying its own customer-facing message.
    Backend(String),
    /// Backend rejection without a message.
    Failed,
    MissingRedirectLocation,
    TooManyRedirects,
    NoItems,
    MissingUrl,
    MissingMetadata,
    MissingVersion,
    InvalidSignature,
    NoSignatures,
}

impl std::fmt::Display for DownloadFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DownloadFailure::PasswordExpired => {
                f.write_str("password token expired, sign in again")
            }
            DownloadFailure::LicenseRequired => {
                f.write_str("a license is required, acquire the app first")
            }
            DownloadFailure::Backend(message) => f.write_str(message),
            DownloadFailure::Failed => f.write_str("download failed"),
            DownloadFailure::MissingRedirectLocation => f.write_str("missing redirect location"),
            DownloadFailure::TooManyRedirects => f.write_str("too many redirects"),
            DownloadFailure::NoItems => f.write_str("no items in download response"),
            DownloadFailure::MissingUrl => f.write_str("missing download URL"),
            DownloadFailure::MissingMetadata => f.write_str("missing item metadata"),
            DownloadFailure::MissingVersion => f.write_str("missing version information"),
            DownloadFailure::InvalidSignature => f.write_str("invalid signature data"),
            DownloadFailure::NoSignatures => f.write_str("no signature entries"),
        }
    }
}

/// Why a purchase confirmation failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PurchaseFailure {
    /// Paid items are never checked out by this client.
    PaidNotSupported,
    PasswordExpired,
    SubscriptionRequired,
    /// The pricing parameter does not match the item class (code 2059).
    WrongPricingParameter,
    Backend(String),
    Failed,
}

impl std::fmt::Display for PurchaseFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PurchaseFailure::PaidNotSupported => f.write_str("paid apps are not supported"),
            PurchaseFailure::PasswordExpired => {
                f.write_str("password token expired, sign in again")
            }
            PurchaseFailure::SubscriptionRequired => f.write_str("a subscription is required"),
            PurchaseFailure::WrongPricingParameter => {
                f.write_str("pricing parameter rejected for this item")
            }
            PurchaseFailure::Backend(message) => f.write_str(message),
            PurchaseFailure::Failed => f.write_str("purchase failed"),
        }
    }
}

fn code_suffix(code: &Option<String>) -> String {
    match code {
        Some(code) => format!(" (code {code})"),
        None => String::new(),
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Malformed wire format: {0}")]
    MalformedWireFormat(String),

    /// `code_required` routes the caller to a two-factor challenge instead of a hard failure.
    #[error("Authentication failed: {reason}")]
    Authentication { code_required: bool, reason: String },

    #[error("Download failed: {reason}{}", code_suffix(.code))]
    Download {
        reason: DownloadFailure,
        code: Option<String>,
    },

    #[error("Purchase failed: {reason}{}", code_suffix(.code))]
    Purchase {
        reason: PurchaseFailure,
        code: Option<String>,
    },

    #[error("Transport error: {0}")]
    Transport(#[from] NetError),

    #[error("Persistence error: {0}")]
    Persistence(String),
}

impl StoreError {
    pub fn malformed(reason: impl Into<String>) -> Self {
        StoreError::MalformedWireFormat(reason.into())
    }

    pub fn download(reason: DownloadFailure) -> Self {
        StoreError::Download { reason, code: None }
    }

    pub fn purchase(reason: PurchaseFailure) -> Self {
        StoreError::Purchase { reason, code: None }
    }

    pub fn auth_rejected(reason: impl Into<String>) -> Self {
        StoreError::Authentication {
            code_required: false,
            reason: reason.into(),
        }
    }

    /// Raw backend failure code, when the backend supplied one.
    pub fn code(&self) -> Option<&str> {
        match self {
            StoreError::Download { code, .. } | StoreError::Purchase { code, .. } => {
                code.as_deref()
            }
            _ => None,
        }
    }

    /// True when re-authenticating and retrying once may recover.
    ///
    /// Classification happens when the backend failure is parsed, so this
    /// never looks at message text.
    pub fn is_session_expired(&self) -> bool {
        matches!(
            self,
            StoreError::Download {
                reason: DownloadFailure::PasswordExpired,
                ..
            } | StoreError::Purchase {
                reason: PurchaseFailure::PasswordExpired,
                ..
            }
        )
    }

    pub fn is_code_required(&self) -> bool {
        matches!(
            self,
            StoreError::Authentication {
                code_required: true,
                ..
            }
        )
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Persistence(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Persistence(err.to_string())
    }
}
