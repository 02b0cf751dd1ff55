/// Who a frame came from.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Identity {
    Server(String),
    User {
        nickname: String,
        user: Option<String>,
        host: Option<String>,
    },
}

impl Identity {
    /// Parses a frame prefix, with or without its leading `:`
    ///
    /// Anything without an `@` is a server name.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.strip_prefix(':').unwrap_or(raw);

        let Some((head, host)) = raw.split_once('@') else {
            return Self::Server(raw.to_string());
        };

        let (nickname, user) = match head.split_once('!') {
            Some((nickname, user)) => (nickname, Some(user.to_string())),
            None => (head, None),
        };

        Self::User {
            nickname: nickname.to_string(),
            user,
            host: Some(host.to_string()),
        }
    }

    pub fn nickname(&self) -> Option<&str> {
        match self {
            Self::User { nickname, .. } => Some(nickname),
            Self::Server(..) => None,
        }
    }

    pub fn server_name(&self) -> Option<&str> {
        match self {
            Self::Server(name) => Some(name),
            Self::User { .. } => None,
        }
    }

    /// The canonical `nick!user@host` form, lower-cased for mask matching
    pub fn address(&self) -> String {
        self.to_string().to_ascii_lowercase()
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Server(name) => f.write_str(name),
            Self::User {
                nickname,
                user,
                host,
            } => {
                f.write_str(nickname)?;
                if let Some(user) = user {
                    write!(f, "!{user}")?;
                }
                if let Some(host) = host {
                    write!(f, "@{host}")?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(nickname: &str, user: Option<&str>, host: Option<&str>) -> Identity {
        Identity::User {
            nickname: nickname.to_string(),
            user: user.map(ToString::to_string),
            host: host.map(ToString::to_string),
        }
    }

    #[test]
    fn full_hostmask() {
        let id = Identity::parse(":Angel!wings@irc.org");
        assert_eq!(id, user("Angel", Some("wings"), Some("irc.org")));
        assert_eq!(id.nickname(), Some("Angel"));
        assert_eq!(id.server_name(), None);
        assert_eq!(id.to_string(), "Angel!wings@irc.org");
    }

    #[test]
    fn nick_and_host() {
        let id = Identity::parse("Angel@irc.org");
        assert_eq!(id, user("Angel", None, Some("irc.org")));
        assert_eq!(id.to_string(), "Angel@irc.org");
    }

    #[test]
    fn server_name() {
        for input in [":irc.example.net", "irc.example.net"] {
            let id = Identity::parse(input);
            assert_eq!(id, Identity::Server(String::from("irc.example.net")));
            assert_eq!(id.nickname(), None);
            assert_eq!(id.to_string(), "irc.example.net");
        }
    }

    #[test]
    fn without_at_is_a_server() {
        let id = Identity::parse("nick!user");
        assert_eq!(id, Identity::Server(String::from("nick!user")));
    }

    #[test]
    fn only_first_separators_split() {
        let id = Identity::parse("a!b!c@d@e");
        assert_eq!(id, user("a", Some("b!c"), Some("d@e")));
        assert_eq!(id.to_string(), "a!b!c@d@e");
    }

    #[test]
    fn address_is_lowercase() {
        let id = Identity::parse("Bob!~Bob@Some.Host");
        assert_eq!(id.address(), "bob!~bob@some.host");
    }
}
