//! Commands and numeric replies the client cares about.

pub const PASS: &str = "PASS";
pub const NICK: &str = "NICK";
pub const USER: &str = "USER";
pub const JOIN: &str = "JOIN";
pub const PING: &str = "PING";
pub const PONG: &str = "PONG";
pub const PRIVMSG: &str = "PRIVMSG";
pub const QUIT: &str = "QUIT";
pub const ERROR: &str = "ERROR";

pub mod numeric {
    pub const RPL_WELCOME: &str = "001";
    pub const ERR_NICKNAMEINUSE: &str = "433";
}
