//! Hostmask based permission levels.

mod authority;
pub use authority::Authority;

mod grant;
pub use grant::{Change, Decision, Grant, Refusal};

pub mod mask;

mod store;
pub use store::{FileStore, GrantStore, MemoryStore};
