use crate::router::{Command, Context, Handler, Invocation};

/// Lists commands, or explains one.
pub struct Help;

#[async_trait::async_trait]
impl Handler for Help {
    fn command(&self) -> Command {
        Command {
            name: "help",
            usage: "help [command]",
            help: "lists the commands, or shows how to use one",
        }
    }

    async fn handle(&self, ctx: &Context<'_>, inv: &Invocation<'_>) -> anyhow::Result<String> {
        let prefix = &ctx.settings.command_prefix;

        let Some(name) = inv.arg(0) else {
            let names = ctx
                .commands
                .iter()
                .map(|cmd| format!("{prefix}{}", cmd.name))
                .collect::<Vec<_>>();
            return Ok(format!("commands: {}", names.join(" ")));
        };

        let name = name.strip_prefix(&**prefix).unwrap_or(name);
        match ctx
            .commands
            .iter()
            .find(|cmd| cmd.name.eq_ignore_ascii_case(name))
        {
            Some(cmd) => Ok(format!("{prefix}{} | {}", cmd.usage, cmd.help)),
            None => anyhow::bail!("cannot find '{name}'"),
        }
    }
}

/// Points at where the code lives.
pub struct Source;

#[async_trait::async_trait]
impl Handler for Source {
    fn command(&self) -> Command {
        Command {
            name: "source",
            usage: "source",
            help: "shows where to find my source code",
        }
    }

    async fn handle(&self, ctx: &Context<'_>, _: &Invocation<'_>) -> anyhow::Result<String> {
        Ok(format!("you can find my source at {}", ctx.settings.source_url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::testing::*;

    #[tokio::test]
    async fn help() {
        let router = router([], |r| r.register(Help).register(Source));

        let reply = |text: &'static str| {
            let router = &router;
            async move {
                let msg = privmsg("a!b@c", "#perch", text);
                router.dispatch(SERVER, &msg).await.unwrap()
            }
        };

        assert_eq!(reply("!help").await, "commands: !help !source");
        assert_eq!(
            reply("!help source").await,
            "!source | shows where to find my source code"
        );
        assert_eq!(
            reply("!help !HELP").await,
            "!help [command] | lists the commands, or shows how to use one"
        );
        assert_eq!(
            reply("!help nope").await,
            "a problem occurred: cannot find 'nope'"
        );
    }

    #[tokio::test]
    async fn source() {
        let router = router([], |r| r.register(Source));
        let msg = privmsg("a!b@c", "perch", "!source");
        let reply = router.dispatch(SERVER, &msg).await.unwrap();
        assert_eq!(
            reply,
            "you can find my source at https://github.com/perch-irc/perch"
        );
        assert_eq!(msg.reply_target(), "a");
    }
}
