/// Failures a session reports to its callers.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("not connected")]
    NotConnected,

    #[error("could not change nickname to '{0}'")]
    NickExhausted(String),

    #[error("a change to nickname '{0}' is already pending")]
    NickPending(String),

    #[error("could not connect to {addr}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("transport: {0}")]
    Transport(#[from] std::io::Error),
}

impl Error {
    /// Whether the session is gone after this error
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Connect { .. } | Self::Transport(..))
    }
}
