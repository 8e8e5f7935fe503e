//! Sign-in against the authentication endpoint.

use crate::base::storeerror::StoreError;
use crate::client::StoreClient;
use crate::cookies::CookieSet;
use crate::http::Transport;
use crate::plist::Dictionary;
use crate::store::account::{Account, Password};
use crate::store::device;
use crate::store::request::RedirectFailure;
use http::StatusCode;

const AUTH_PATH: &str = "/auth/v1/native/fast";

/// Customer message the backend sends when a two-factor code is needed.
const CODE_REQUIRED_MESSAGE: &str = "MZFinance.BadLogin.Configurator_message";

fn auth_redirect_error(failure: RedirectFailure) -> StoreError {
    match failure {
        RedirectFailure::MissingLocation => StoreError::auth_rejected("missing redirect location"),
        RedirectFailure::TooMany => StoreError::auth_rejected("too many redirects"),
    }
}

impl<T: Transport> StoreClient<T> {
    /// Exchange credentials for a session.
    ///
    /// Without `device_id` a new identifier is generated; the returned account
    /// carries whichever one was used. When the backend asks for a two-factor
    /// code this fails with `Authentication { code_required: true, .. }`; call
    /// again with the same cookies and device id plus the code.
    pub async fn authenticate(
        &self,
        email: &str,
        password: &str,
        code: Option<&str>,
        cookies: Option<&CookieSet>,
        device_id: Option<&str>,
    ) -> Result<Account, StoreError> {
        let device_id = match device_id.map(str::trim).filter(|d| !d.is_empty()) {
            Some(id) => id.to_string(),
            None => device::generate_device_id()?,
        };
        let code = code.map(str::trim).filter(|c| !c.is_empty());

        let mut payload = Dictionary::new();
        payload.insert("appleId", email);
        payload.insert("attempt", if code.is_some() { "2" } else { "4" });
        payload.insert("createSession", "true");
        payload.insert("guid", &device_id);
        payload.insert("password", format!("{}{}", password, code.unwrap_or("")));
        payload.insert("rmp", "0");
        payload.insert("why", "signIn");

        tracing::debug!("Signing in {} (two-factor code: {})", email, code.is_some());

        let empty = CookieSet::new();
        let exchange = self
            .post_plist(
                self.config.auth_host.clone(),
                format!("{AUTH_PATH}?guid={device_id}"),
                Vec::new(),
                &payload,
                cookies.unwrap_or(&empty),
                auth_redirect_error,
            )
            .await?;

        let status = exchange.response.status;
        let dict = match exchange.decode() {
            Ok(dict) => dict,
            Err(_) if status != StatusCode::OK => {
                return Err(StoreError::auth_rejected(format!(
                    "unexpected HTTP status {}",
                    status.as_u16()
                )));
            }
            Err(e) => return Err(e),
        };

        let failure_type = dict.get_text("failureType");
        let message = dict
            .get_str("customerMessage")
            .map(str::trim)
            .filter(|m| !m.is_empty());

        if message == Some(CODE_REQUIRED_MESSAGE) && code.is_none() {
            tracing::info!("Two-factor code required for {}", email);
            return Err(StoreError::Authentication {
                code_required: true,
                reason: "a two-factor verification code is required".to_string(),
            });
        }

        if failure_type.is_some() || message.is_some() || status != StatusCode::OK {
            let reason = match (message, failure_type) {
                (Some(CODE_REQUIRED_MESSAGE), _) => "the verification code was rejected".to_string(),
                (Some(m), _) => m.to_string(),
                (None, Some(code)) => format!("sign-in failed (code {code})"),
                (None, None) => format!("unexpected HTTP status {}", status.as_u16()),
            };
            tracing::warn!("Sign-in rejected for {}: {}", email, reason);
            return Err(StoreError::auth_rejected(reason));
        }

        let password_token = dict
            .get_text("passwordToken")
            .ok_or_else(|| StoreError::auth_rejected("response carried no password token"))?;
        let dsid = dict
            .get_text("dsPersonId")
            .ok_or_else(|| StoreError::auth_rejected("response carried no account identifier"))?;

        let info = dict.get_dictionary("accountInfo");
        let address = info.and_then(|i| i.get_dictionary("address"));
        let apple_id = info
            .and_then(|i| i.get_text("appleId"))
            .unwrap_or_else(|| email.to_string());
        let first_name = address.and_then(|a| a.get_text("firstName")).unwrap_or_default();
        let last_name = address.and_then(|a| a.get_text("lastName")).unwrap_or_default();

        let pod = exchange
            .response
            .header("pod")
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string);
        let store_front = exchange
            .response
            .header("x-set-apple-store-front")
            .and_then(|s| s.split('-').next())
            .unwrap_or_default()
            .to_string();

        tracing::info!("Signed in {} (pod {:?})", email, pod);

        Ok(Account {
            email: email.to_string(),
            password: Password::new(password),
            apple_id,
            store_front,
            first_name,
            last_name,
            password_token,
            directory_services_identifier: dsid,
            cookies: exchange.cookies,
            device_identifier: device_id,
            pod,
        })
    }
}
