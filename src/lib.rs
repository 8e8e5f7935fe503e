//! # storenet
//!
//! A client for the store backend's sign-in, download and purchase protocol.
//!
//! `storenet` signs an account in, keeps its session cookies and tokens
//! consistent across requests, and drives the download-ticket and free-item
//! purchase flows, re-authenticating once when the backend reports an
//! expired session.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use storenet::{Software, StoreClient};
//!
//! # async fn run() -> Result<(), storenet::StoreError> {
//! let client = StoreClient::new();
//! let account = client
//!     .authenticate("user@example.com", "password", None, None, None)
//!     .await?;
//!
//! let app = Software::new(284882215);
//! let purchase = client.purchase(&account, &app).await?;
//! let account = purchase.updated_account.unwrap_or(account).with_cookies(purchase.updated_cookies);
//!
//! let ticket = client.download_info(&account, &app, None).await?;
//! println!("{}", ticket.output.download_url);
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`base`] - Error types
//! - [`plist`] - Property list wire codec
//! - [`cookies`] - Session cookie jar
//! - [`http`] - Transport trait and the default HTTPS transport
//! - [`store`] - Authentication, download and purchase flows
//! - [`accounts`] - Local account records and the seeded default account
//!
//! ## Security
//!
//! Passwords are redacted from `Debug` output, zeroed on drop and never
//! logged. The session token is stripped from install metadata handed back
//! to callers.

pub mod accounts;
pub mod base;
pub mod client;
pub mod cookies;
pub mod http;
pub mod plist;
pub mod store;

pub use base::neterror::NetError;
pub use base::storeerror::{DownloadFailure, PurchaseFailure, StoreError};
pub use client::{StoreClient, StoreClientBuilder};
pub use cookies::CookieSet;
pub use store::{Account, DownloadOutput, Software, StoreConfig};
