//! Account and item snapshots passed into and returned from store flows.

use crate::cookies::CookieSet;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use zeroize::Zeroizing;

/// Account password. Redacted in `Debug`, wiped from memory on drop.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Password(Zeroizing<String>);

impl Password {
    pub fn new(password: impl Into<String>) -> Self {
        Self(Zeroizing::new(password.into()))
    }

    pub fn expose(&self) -> &str {
        self.0.as_str()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Debug for Password {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Password(<redacted>)")
    }
}

impl From<&str> for Password {
    fn from(password: &str) -> Self {
        Self::new(password)
    }
}

impl Serialize for Password {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.expose())
    }
}

impl<'de> Deserialize<'de> for Password {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Password::new)
    }
}

/// An identity plus its session state.
///
/// Flows never mutate an `Account` they are given; they return a new one.
/// `device_identifier` is assigned once and carried through every re-login.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub email: String,
    pub password: Password,
    #[serde(default)]
    pub apple_id: String,
    #[serde(default)]
    pub store_front: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub password_token: String,
    #[serde(default)]
    pub directory_services_identifier: String,
    #[serde(default)]
    pub cookies: CookieSet,
    #[serde(default)]
    pub device_identifier: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pod: Option<String>,
}

impl Account {
    /// An account that has never signed in.
    pub fn new(email: impl Into<String>, password: impl Into<Password>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            ..Default::default()
        }
    }

    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    /// Whether the backend has issued a session for this account.
    pub fn has_session(&self) -> bool {
        !self.password_token.is_empty() && !self.directory_services_identifier.is_empty()
    }

    /// Same account with a newer cookie set.
    pub fn with_cookies(&self, cookies: CookieSet) -> Self {
        Self {
            cookies,
            ..self.clone()
        }
    }
}

/// A store item.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Software {
    pub id: i64,
    #[serde(default)]
    pub bundle_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub price: f64,
    /// External version id sent as `appExtVrsId` when purchasing.
    #[serde(default)]
    pub version_id: Option<i64>,
}

impl Software {
    pub fn new(id: i64) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }

    pub fn is_free(&self) -> bool {
        self.price <= 0.0
    }
}

/// One signature blob for a downloadable item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sinf {
    pub id: i64,
    /// Base64 of the raw blob.
    pub sinf: String,
}

/// A download ticket. Always carries at least one [`Sinf`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadOutput {
    #[serde(rename = "downloadURL")]
    pub download_url: String,
    pub sinfs: Vec<Sinf>,
    pub bundle_short_version_string: String,
    pub bundle_version: String,
    /// Base64 of the XML install-metadata document.
    #[serde(rename = "iTunesMetadata")]
    pub itunes_metadata: String,
}
