//! One-time default account seeded from the environment.
//!
//! When `DEFAULT_APPLE_EMAIL` and `DEFAULT_APPLE_PASSWORD` are set and no
//! seed file exists yet, the pair is written to `default-account.json` in the
//! data directory. An existing file is never overwritten.

use crate::base::storeerror::StoreError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use zeroize::Zeroize;

pub const EMAIL_VAR: &str = "DEFAULT_APPLE_EMAIL";
pub const PASSWORD_VAR: &str = "DEFAULT_APPLE_PASSWORD";
pub const FILE_NAME: &str = "default-account.json";

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefaultAccount {
    pub email: String,
    pub password: String,
    /// Unix milliseconds.
    #[serde(default)]
    pub created_at: i64,
}

impl std::fmt::Debug for DefaultAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DefaultAccount")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("created_at", &self.created_at)
            .finish()
    }
}

impl Drop for DefaultAccount {
    fn drop(&mut self) {
        self.password.zeroize();
    }
}

pub fn default_account_path(data_dir: &Path) -> PathBuf {
    data_dir.join(FILE_NAME)
}

/// Seed from the process environment. Returns whether a file was written.
pub fn seed_from_env(data_dir: &Path) -> Result<bool, StoreError> {
    let email = std::env::var(EMAIL_VAR).ok();
    let password = std::env::var(PASSWORD_VAR).ok();
    seed_from_vars(data_dir, email.as_deref(), password.as_deref())
}

/// Seed from explicit values; blank values disable seeding.
pub fn seed_from_vars(
    data_dir: &Path,
    email: Option<&str>,
    password: Option<&str>,
) -> Result<bool, StoreError> {
    let email = email.map(str::trim).filter(|e| !e.is_empty());
    let password = password.filter(|p| !p.is_empty());
    let (Some(email), Some(password)) = (email, password) else {
        return Ok(false);
    };

    let path = default_account_path(data_dir);
    if path.exists() {
        return Ok(false);
    }
    fs::create_dir_all(data_dir).map_err(persistence)?;

    let account = DefaultAccount {
        email: email.to_string(),
        password: password.to_string(),
        created_at: (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64,
    };
    let json = serde_json::to_string_pretty(&account)?;
    fs::write(&path, json).map_err(persistence)?;

    tracing::info!("Default account saved: {}", account.email);
    Ok(true)
}

/// Read the seed file. Missing or malformed files read as `None`.
pub fn read_default_account(data_dir: &Path) -> Option<DefaultAccount> {
    let raw = fs::read_to_string(default_account_path(data_dir)).ok()?;
    match serde_json::from_str(&raw) {
        Ok(account) => Some(account),
        Err(e) => {
            tracing::warn!("Ignoring malformed default account file: {}", e);
            None
        }
    }
}

fn persistence(err: std::io::Error) -> StoreError {
    StoreError::Persistence(err.to_string())
}
