//! Backend failure parsing.
//!
//! Response dictionaries signal failure with a `failureType` code and an
//! optional `customerMessage`. Codes are overloaded across endpoints, so this
//! module only classifies them; each flow maps the class onto its own error.
//! This is the only place that looks at message text.

use crate::base::storeerror::{DownloadFailure, PurchaseFailure, StoreError};
use crate::plist::Dictionary;

const EXPIRED_CODES: [&str; 2] = ["2034", "2042"];
const ENTITLEMENT_REQUIRED_CODE: &str = "9610";
const WRONG_PRICING_CODE: &str = "2059";
const PASSWORD_CHANGED_MESSAGE: &str = "Your password has changed.";
const EXPIRY_INDICATOR: &str = "expired";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FailureClass {
    SessionExpired,
    /// License for downloads, subscription for purchases.
    EntitlementRequired,
    WrongPricingParameter,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct BackendFailure {
    pub code: String,
    pub message: Option<String>,
}

impl BackendFailure {
    /// Extract the failure indicator from a decoded response, if any.
    pub fn from_dictionary(dict: &Dictionary) -> Option<Self> {
        let code = dict.get_text("failureType")?;
        let message = dict
            .get_str("customerMessage")
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_string);
        Some(Self { code, message })
    }

    /// Classification for download responses. The download endpoint has no
    /// pricing parameter, so 2059 is an ordinary failure there and the
    /// expiry messages still apply to it.
    pub fn download_class(&self) -> FailureClass {
        match self.code.as_str() {
            c if EXPIRED_CODES.contains(&c) => FailureClass::SessionExpired,
            ENTITLEMENT_REQUIRED_CODE => FailureClass::EntitlementRequired,
            _ => self.message_class(),
        }
    }

    /// Classification for purchase responses; 2059 always selects the
    /// pricing fallback.
    pub fn purchase_class(&self) -> FailureClass {
        match self.code.as_str() {
            c if EXPIRED_CODES.contains(&c) => FailureClass::SessionExpired,
            ENTITLEMENT_REQUIRED_CODE => FailureClass::EntitlementRequired,
            WRONG_PRICING_CODE => FailureClass::WrongPricingParameter,
            _ => self.message_class(),
        }
    }

    fn message_class(&self) -> FailureClass {
        match self.message.as_deref() {
            Some(PASSWORD_CHANGED_MESSAGE) => FailureClass::SessionExpired,
            Some(m) if m.to_lowercase().contains(EXPIRY_INDICATOR) => FailureClass::SessionExpired,
            _ => FailureClass::Other,
        }
    }

    pub fn into_download_error(self) -> StoreError {
        let reason = match self.download_class() {
            FailureClass::SessionExpired => DownloadFailure::PasswordExpired,
            FailureClass::EntitlementRequired => DownloadFailure::LicenseRequired,
            FailureClass::WrongPricingParameter | FailureClass::Other => match self.message {
                Some(message) => DownloadFailure::Backend(message),
                None => DownloadFailure::Failed,
            },
        };
        StoreError::Download {
            reason,
            code: Some(self.code),
        }
    }

    pub fn into_purchase_error(self) -> StoreError {
        let reason = match self.purchase_class() {
            FailureClass::SessionExpired => PurchaseFailure::PasswordExpired,
            FailureClass::EntitlementRequired => PurchaseFailure::SubscriptionRequired,
            FailureClass::WrongPricingParameter => PurchaseFailure::WrongPricingParameter,
            FailureClass::Other => match self.message {
                Some(message) => PurchaseFailure::Backend(message),
                None => PurchaseFailure::Failed,
            },
        };
        StoreError::Purchase {
            reason,
            code: Some(self.code),
        }
    }
}
