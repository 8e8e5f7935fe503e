//! Store protocol flows.
//!
//! Every flow is a method on [`StoreClient`](crate::client::StoreClient):
//!
//! - [`authenticate`](authenticate) signs in and handles the two-factor branch
//! - [`download`] fetches a download ticket, following redirects
//! - [`purchase`] acquires a free item with a pricing fallback
//!
//! Download and purchase run under [`relogin::with_relogin`], which signs in
//! again once when the backend reports an expired session.

pub mod account;
pub mod authenticate;
pub mod config;
pub mod device;
pub mod download;
pub(crate) mod failure;
pub mod purchase;
pub mod relogin;
pub(crate) mod request;

pub use account::{Account, DownloadOutput, Password, Sinf, Software};
pub use config::StoreConfig;
pub use download::DownloadResult;
pub use purchase::{PricingParameter, PurchaseResult};
pub use relogin::{with_relogin, Reauthenticate, Relogged};
