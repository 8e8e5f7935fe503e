//! Acquisition of free items.

use crate::base::storeerror::{PurchaseFailure, StoreError};
use crate::client::StoreClient;
use crate::cookies::CookieSet;
use crate::http::Transport;
use crate::plist::Dictionary;
use crate::store::account::{Account, Software};
use crate::store::failure::BackendFailure;
use crate::store::relogin::with_relogin;
use crate::store::request::{identity_headers, RedirectFailure};

const PURCHASE_PATH: &str = "/WebObjects/MZFinance.woa/wa/buyProduct";

/// Which backend acquisition path an item goes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PricingParameter {
    /// Regular free apps (`STDQ`).
    Standard,
    /// Games and bundles (`GAME`).
    Game,
}

impl PricingParameter {
    pub fn as_str(&self) -> &'static str {
        match self {
            PricingParameter::Standard => "STDQ",
            PricingParameter::Game => "GAME",
        }
    }
}

impl std::fmt::Display for PricingParameter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PurchaseResult {
    pub updated_cookies: CookieSet,
    /// Present only when the session had to be renewed.
    pub updated_account: Option<Account>,
}

fn purchase_redirect_error(failure: RedirectFailure) -> StoreError {
    let reason = match failure {
        RedirectFailure::MissingLocation => "missing redirect location",
        RedirectFailure::TooMany => "too many redirects",
    };
    StoreError::purchase(PurchaseFailure::Backend(reason.to_string()))
}

impl<T: Transport> StoreClient<T> {
    /// Acquire a free item for the account.
    ///
    /// Paid items fail with [`PurchaseFailure::PaidNotSupported`] before any
    /// request is made.
    pub async fn purchase(
        &self,
        account: &Account,
        software: &Software,
    ) -> Result<PurchaseResult, StoreError> {
        if !software.is_free() {
            return Err(StoreError::purchase(PurchaseFailure::PaidNotSupported));
        }

        let relogged = with_relogin(self, account, |acc| async move {
            self.purchase_with_fallback(&acc, software).await
        })
        .await?;

        Ok(PurchaseResult {
            updated_cookies: relogged.value,
            updated_account: relogged.account,
        })
    }

    /// Standard pricing first; game pricing only when the backend says the
    /// standard parameter does not apply to this item.
    async fn purchase_with_fallback(
        &self,
        account: &Account,
        software: &Software,
    ) -> Result<CookieSet, StoreError> {
        match self
            .purchase_with(account, software, PricingParameter::Standard)
            .await
        {
            Err(StoreError::Purchase {
                reason: PurchaseFailure::WrongPricingParameter,
                ..
            }) => {
                tracing::info!(
                    "Item {} rejected standard pricing, retrying as {}",
                    software.id,
                    PricingParameter::Game
                );
                self.purchase_with(account, software, PricingParameter::Game)
                    .await
            }
            other => other,
        }
    }

    async fn purchase_with(
        &self,
        account: &Account,
        software: &Software,
        pricing: PricingParameter,
    ) -> Result<CookieSet, StoreError> {
        let mut payload = Dictionary::new();
        if let Some(version_id) = software.version_id {
            payload.insert("appExtVrsId", version_id);
        }
        payload.insert("buyWithoutAuthorization", "true");
        payload.insert("guid", &account.device_identifier);
        payload.insert("hasAskedToFulfillPreorder", "true");
        payload.insert("needDiv", "0");
        payload.insert("origPage", "SoftwarePage");
        payload.insert("price", "0");
        payload.insert("pricingParameter", pricing.as_str());
        payload.insert("productType", "C");
        payload.insert("salableAdamId", software.id);

        let exchange = self
            .post_plist(
                self.config.store_host_for(account.pod.as_deref()),
                PURCHASE_PATH.to_string(),
                identity_headers(&account.directory_services_identifier),
                &payload,
                &account.cookies,
                purchase_redirect_error,
            )
            .await?;

        let dict = exchange.decode()?;
        if let Some(failure) = BackendFailure::from_dictionary(&dict) {
            tracing::warn!(
                "Purchase of {} ({}) rejected with code {}",
                software.id,
                pricing,
                failure.code
            );
            return Err(failure.into_purchase_error());
        }

        tracing::debug!("Purchased {} with {}", software.id, pricing);
        Ok(exchange.cookies)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pricing_parameter_wire_values() {
        assert_eq!(PricingParameter::Standard.as_str(), "STDQ");
        assert_eq!(PricingParameter::Game.to_string(), "GAME");
    }
}
