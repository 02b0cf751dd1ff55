//! An IRC client: line decoding, registration, nickname negotiation and paced
//! output for a single server connection.

pub mod chunk;
pub mod command;
pub mod config;
pub mod formatting;

mod connection;
mod error;
mod event;
mod frame;
mod pacer;
mod prefix;

pub use config::{Channel, Config};
pub use connection::{Events, Handle, Phase, SendOptions, Session};
pub use error::Error;
pub use event::{Event, Privmsg};
pub use frame::Frame;
pub use pacer::{Pacer, PendingSend};
pub use prefix::Identity;
