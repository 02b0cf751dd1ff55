use crate::{command::PRIVMSG, Frame, Identity};

/// A conversational message, decoded from a `PRIVMSG` frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Privmsg {
    pub sender: Identity,
    pub target: String,
    pub text: String,
    reply_to: String,
}

impl Privmsg {
    /// `own_nickname` decides where replies go: messages sent straight to us
    /// are answered to the sender instead of to ourselves.
    pub fn from_frame(frame: &Frame, own_nickname: Option<&str>) -> Option<Self> {
        if frame.command != PRIVMSG {
            return None;
        }

        let sender = frame.prefix.clone()?;
        let target = frame.params.first()?.clone();
        let text = frame
            .trailing
            .clone()
            .or_else(|| frame.params.get(1).cloned())?;

        let direct = own_nickname.map_or(false, |nick| nick.eq_ignore_ascii_case(&target));
        let reply_to = match sender.nickname() {
            Some(nickname) if direct => nickname.to_string(),
            _ => target.clone(),
        };

        Some(Self {
            sender,
            target,
            text,
            reply_to,
        })
    }

    pub fn reply_target(&self) -> &str {
        &self.reply_to
    }

    pub fn is_direct(&self) -> bool {
        self.reply_to != self.target
    }

    pub fn sender_name(&self) -> &str {
        match &self.sender {
            Identity::User { nickname, .. } => nickname,
            Identity::Server(name) => name,
        }
    }
}

/// What a session publishes to its owner.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// The server accepted our identity and the initial channels were joined
    Connected { nickname: String },
    Frame(Frame),
    Privmsg(Privmsg),
    /// A line is about to be written, without its terminator
    RawSent(String),
    /// Initial nick negotiation ran out of retries. The session waits for a
    /// new nickname, see `Handle::nick`
    NickExhausted { nickname: String },
    Disconnected,
}
