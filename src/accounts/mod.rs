//! Local account persistence: the account record store and the
//! environment-seeded default account.

pub mod seed;
pub mod store;

pub use seed::{read_default_account, seed_from_env, DefaultAccount};
pub use store::AccountStore;
