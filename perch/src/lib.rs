pub mod config;
pub mod router;

mod builtin;
pub use builtin::{Help, Source};

mod permission;
pub use permission::Permission;

mod client;
pub use client::run_client;
