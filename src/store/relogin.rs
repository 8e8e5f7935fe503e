//! Re-authenticate once when a session has expired, then retry once.

use crate::base::storeerror::StoreError;
use crate::client::StoreClient;
use crate::http::Transport;
use crate::store::account::Account;
use async_trait::async_trait;
use std::future::Future;

/// Signs an account in again with its stored credentials.
///
/// Implementations must reuse the account's existing device identifier.
#[async_trait]
pub trait Reauthenticate: Send + Sync {
    async fn relogin(&self, account: &Account) -> Result<Account, StoreError>;
}

#[async_trait]
impl<T: Transport> Reauthenticate for StoreClient<T> {
    async fn relogin(&self, account: &Account) -> Result<Account, StoreError> {
        self.authenticate(
            &account.email,
            account.password.expose(),
            None,
            Some(&account.cookies),
            Some(&account.device_identifier),
        )
        .await
    }
}

/// Result of an action run under [`with_relogin`].
#[derive(Debug, Clone, PartialEq)]
pub struct Relogged<T> {
    pub value: T,
    /// The refreshed account, present only if a re-login happened.
    pub account: Option<Account>,
}

/// Run `action`; if it fails with an expired session, sign in again and run
/// it exactly once more with the refreshed account.
///
/// Any other failure, a failed re-login, or a second failure propagates.
pub async fn with_relogin<R, F, Fut, T>(
    reauth: &R,
    account: &Account,
    mut action: F,
) -> Result<Relogged<T>, StoreError>
where
    R: Reauthenticate + ?Sized,
    F: FnMut(Account) -> Fut,
    Fut: Future<Output = Result<T, StoreError>>,
{
    match action(account.clone()).await {
        Ok(value) => Ok(Relogged {
            value,
            account: None,
        }),
        Err(err) if err.is_session_expired() => {
            tracing::info!("Session expired for {}, signing in again", account.email);
            let refreshed = reauth.relogin(account).await?;
            let value = action(refreshed.clone()).await?;
            Ok(Relogged {
                value,
                account: Some(refreshed),
            })
        }
        Err(err) => Err(err),
    }
}
