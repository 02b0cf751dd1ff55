use std::{collections::BTreeMap, sync::Arc};

use perch_irc::{Identity, Privmsg};
use perch_permission::Authority;

use crate::config::Config;

pub const DENIED: &str = "you do not have permission to do that";

/// Describes a command for `help`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Command {
    pub name: &'static str,
    pub usage: &'static str,
    pub help: &'static str,
}

/// Everything a handler can look at besides the message.
pub struct Context<'a> {
    pub server_name: &'a str,
    pub authority: &'a Authority,
    pub settings: &'a Settings,
    pub commands: &'a [Command],
}

/// The bits of the configuration handlers use
#[derive(Clone, Debug)]
pub struct Settings {
    pub command_prefix: String,
    pub source_url: String,
}

/// A command someone typed.
#[derive(Debug)]
pub struct Invocation<'a> {
    pub msg: &'a Privmsg,
    /// Lower-cased, without the prefix
    pub command: String,
    pub args: Vec<&'a str>,
}

impl<'a> Invocation<'a> {
    /// Splits `!name arg arg` into its parts, if the text starts with `prefix`
    pub fn parse(prefix: &str, msg: &'a Privmsg) -> Option<Self> {
        let text = msg.text.strip_prefix(prefix)?;
        let mut parts = text.split_whitespace();
        let command = parts.next()?.to_lowercase();
        Some(Self {
            msg,
            command,
            args: parts.collect(),
        })
    }

    pub fn sender(&self) -> &'a Identity {
        &self.msg.sender
    }

    pub fn arg(&self, index: usize) -> Option<&'a str> {
        self.args.get(index).copied()
    }
}

#[async_trait::async_trait]
pub trait Handler: Send + Sync {
    fn command(&self) -> Command;

    /// Returns the reply, an empty reply sends nothing
    async fn handle(&self, ctx: &Context<'_>, invocation: &Invocation<'_>)
        -> anyhow::Result<String>;
}

/// Finds the handler for a message and checks the sender may use it.
pub struct Router {
    handlers: BTreeMap<&'static str, Arc<dyn Handler>>,
    commands: Vec<Command>,
    levels: BTreeMap<String, u32>,
    settings: Settings,
    authority: Arc<Authority>,
}

impl Router {
    pub fn new(config: &Config, authority: Arc<Authority>) -> Self {
        Self {
            handlers: BTreeMap::new(),
            commands: vec![],
            levels: config
                .commands
                .iter()
                .map(|(name, level)| (name.to_lowercase(), *level))
                .collect(),
            settings: Settings {
                command_prefix: config.command_prefix.clone(),
                source_url: config.source_url.clone(),
            },
            authority,
        }
    }

    pub fn register(mut self, handler: impl Handler + 'static) -> Self {
        let command = handler.command();
        log::trace!("registering {}", command.name);
        self.commands.push(command);
        self.handlers.insert(command.name, Arc::new(handler));
        self
    }

    /// Routes a message, returning the reply if there is one
    pub async fn dispatch(&self, server_name: &str, msg: &Privmsg) -> Option<String> {
        let invocation = Invocation::parse(&self.settings.command_prefix, msg)?;
        let handler = self.handlers.get(&*invocation.command)?;

        let required = self.levels.get(&invocation.command).copied().unwrap_or(0);
        if !self
            .authority
            .check(required, invocation.sender(), server_name)
            .await
        {
            log::warn!(
                "{} cannot use {} on {server_name}",
                msg.sender,
                invocation.command
            );
            return Some(DENIED.to_string());
        }

        log::debug!(
            "{} on {server_name} ({}): {}{} {:?}",
            msg.sender,
            msg.target,
            self.settings.command_prefix,
            invocation.command,
            invocation.args
        );

        let ctx = Context {
            server_name,
            authority: &self.authority,
            settings: &self.settings,
            commands: &self.commands,
        };

        match handler.handle(&ctx, &invocation).await {
            Ok(reply) if reply.trim().is_empty() => None,
            Ok(reply) => Some(reply),
            Err(err) => {
                log::error!("{} failed: {err:#}", invocation.command);
                Some(format!("a problem occurred: {err}"))
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;

    use perch_irc::{Frame, Privmsg};
    use perch_permission::{Authority, Grant, MemoryStore};

    use super::Router;
    use crate::config::Config;

    pub const SERVER: &str = "rizon";

    pub fn privmsg(sender: &str, target: &str, text: &str) -> Privmsg {
        let frame = Frame::decode(&format!(":{sender} PRIVMSG {target} :{text}"));
        Privmsg::from_frame(&frame, Some("perch")).unwrap()
    }

    /// A router over an in-memory store seeded with `(mask, level)` grants
    pub fn router(
        grants: impl IntoIterator<Item = (&'static str, u32)>,
        build: impl FnOnce(Router) -> Router,
    ) -> Router {
        let config = Config::default_config();
        let grants = grants
            .into_iter()
            .map(|(mask, level)| Grant::new(SERVER, mask, level));
        let authority = Authority::new(Arc::new(MemoryStore::new(grants)), 100);
        build(Router::new(&config, Arc::new(authority)))
    }
}

#[cfg(test)]
mod tests {
    use super::{testing::*, *};
    use perch_permission::{Grant, MemoryStore};

    struct Echo;

    #[async_trait::async_trait]
    impl Handler for Echo {
        fn command(&self) -> Command {
            Command {
                name: "echo",
                usage: "!echo <text>",
                help: "repeats you",
            }
        }

        async fn handle(&self, _: &Context<'_>, inv: &Invocation<'_>) -> anyhow::Result<String> {
            anyhow::ensure!(!inv.args.is_empty(), "nothing to echo");
            Ok(inv.args.join(" "))
        }
    }

    // `permission` needs level 1 in the default config
    struct Permission;

    #[async_trait::async_trait]
    impl Handler for Permission {
        fn command(&self) -> Command {
            Command {
                name: "permission",
                usage: "!permission",
                help: "",
            }
        }

        async fn handle(&self, _: &Context<'_>, _: &Invocation<'_>) -> anyhow::Result<String> {
            Ok(String::from("allowed"))
        }
    }

    #[test]
    fn parse_invocation() {
        let msg = privmsg("a!b@c", "#perch", "!Echo  hello   world ");
        let inv = Invocation::parse("!", &msg).unwrap();
        assert_eq!(inv.command, "echo");
        assert_eq!(inv.args, ["hello", "world"]);
        assert_eq!(inv.arg(1), Some("world"));
        assert_eq!(inv.arg(2), None);

        let msg = privmsg("a!b@c", "#perch", "hello !echo");
        assert!(Invocation::parse("!", &msg).is_none());
        let msg = privmsg("a!b@c", "#perch", "!");
        assert!(Invocation::parse("!", &msg).is_none());
    }

    #[tokio::test]
    async fn dispatches_by_name() {
        let router = router([], |r| r.register(Echo));

        let msg = privmsg("a!b@c", "#perch", "!echo hi there");
        assert_eq!(router.dispatch(SERVER, &msg).await.unwrap(), "hi there");

        let msg = privmsg("a!b@c", "#perch", "!unknown");
        assert_eq!(router.dispatch(SERVER, &msg).await, None);

        let msg = privmsg("a!b@c", "#perch", "just talking");
        assert_eq!(router.dispatch(SERVER, &msg).await, None);
    }

    #[tokio::test]
    async fn reports_problems() {
        let router = router([], |r| r.register(Echo));
        let msg = privmsg("a!b@c", "#perch", "!echo");
        assert_eq!(
            router.dispatch(SERVER, &msg).await.unwrap(),
            "a problem occurred: nothing to echo"
        );
    }

    #[tokio::test]
    async fn checks_levels() {
        let router = router([("trusted!*@*", 1)], |r| r.register(Permission));

        let msg = privmsg("stranger!s@host", "#perch", "!permission");
        assert_eq!(router.dispatch(SERVER, &msg).await.unwrap(), DENIED);

        let msg = privmsg("trusted!t@host", "#perch", "!permission");
        assert_eq!(router.dispatch(SERVER, &msg).await.unwrap(), "allowed");

        // grants don't carry over to other servers
        assert_eq!(router.dispatch("libera", &msg).await.unwrap(), DENIED);
    }

    #[tokio::test]
    async fn configured_names_ignore_case() {
        let mut config = Config::default_config();
        config.commands.insert(String::from("ECHO"), 5);

        let grants = [Grant::new(SERVER, "loud!*@*", 5)];
        let authority = Authority::new(Arc::new(MemoryStore::new(grants)), 100);
        let router = Router::new(&config, Arc::new(authority)).register(Echo);

        let msg = privmsg("quiet!q@host", "#perch", "!echo hi");
        assert_eq!(router.dispatch(SERVER, &msg).await.unwrap(), DENIED);

        let msg = privmsg("loud!l@host", "#perch", "!ECHO hi");
        assert_eq!(router.dispatch(SERVER, &msg).await.unwrap(), "hi");
    }
}
