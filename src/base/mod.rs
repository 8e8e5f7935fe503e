//! Base types and error handling.
//!
//! - [`NetError`](neterror::NetError): transport error codes matching `net_error_list.h`
//! - [`StoreError`](storeerror::StoreError): every failure a store operation can surface

pub mod neterror;
pub mod storeerror;
