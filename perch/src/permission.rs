use crate::router::{Command, Context, Handler, Invocation};

/// Shows and changes permission levels.
///
/// * `permission` is the caller's own level
/// * `permission <user>` is someone else's, by nickname or mask
/// * `permission add <mask> <level>` and `permission delete <mask>` change them
pub struct Permission;

impl Permission {
    fn usage(prefix: &str) -> String {
        format!("usage: {prefix}permission [add|delete] <mask> [level]")
    }
}

#[async_trait::async_trait]
impl Handler for Permission {
    fn command(&self) -> Command {
        Command {
            name: "permission",
            usage: "permission [add|delete] <mask> [level]",
            help: "shows or changes permission levels",
        }
    }

    async fn handle(&self, ctx: &Context<'_>, inv: &Invocation<'_>) -> anyhow::Result<String> {
        let authority = ctx.authority;
        let server = ctx.server_name;
        let sender = inv.sender();

        let action = match inv.arg(0) {
            None => {
                let level = authority.level_of(sender, server).await;
                return Ok(format!("your permission level is {level}"));
            }
            Some(action) => action.to_lowercase(),
        };

        let decision = match (&*action, inv.arg(1), inv.arg(2)) {
            ("add", Some(mask), Some(level)) => {
                let Ok(level) = level.parse() else {
                    let max = authority.max_level();
                    return Ok(format!("invalid level, it must be a number between 1 and {max}"));
                };
                authority.grant(sender, server, mask, level).await?
            }
            ("delete", Some(mask), None) => authority.revoke(sender, server, mask).await?,
            ("add" | "delete", ..) => return Ok(Self::usage(&ctx.settings.command_prefix)),
            (user, ..) => {
                let level = authority.level_for(user, server).await;
                return Ok(format!("user {user} has permission level {level}"));
            }
        };

        Ok(match decision {
            Ok(change) => change.to_string(),
            Err(refusal) => refusal.to_string(),
        })
    }
}
