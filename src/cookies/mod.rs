//! Session cookie continuity.
//!
//! The store backend keeps session state in cookies that must be echoed back
//! on every request. A [`CookieSet`](jar::CookieSet) is the per-account jar:
//! a small ordered map where the latest value for a name wins.
//!
//! ```rust
//! use storenet::cookies::CookieSet;
//!
//! let jar = CookieSet::new();
//! let headers = vec![("Set-Cookie", "mz_at0=token; Path=/; Secure")];
//! let jar = jar.merge(&headers);
//! assert_eq!(jar.header_value().as_deref(), Some("mz_at0=token"));
//! ```

pub mod jar;

pub use jar::{CookieSet, SessionCookie};
