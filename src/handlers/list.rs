//! `/list` - show the members of the current channel.

use super::context::{plural, Context};
use super::registry::Command;
use crate::error::CommandError;

pub struct ListCommand;

impl Command for ListCommand {
    fn name(&self) -> &'static str {
        "list"
    }

    fn usage(&self) -> &'static str {
        ""
    }

    fn description(&self) -> &'static str {
        "List who is in your channel."
    }

    fn run(&self, ctx: &mut Context<'_>, args: &[String], _tail: &str) -> Result<(), CommandError> {
        if !args.is_empty() {
            return Err(self.usage_error());
        }
        let name = ctx.current_channel_name()?;

        let mut entries: Vec<(String, String)> = Vec::new();
        if let Some(channel) = ctx.state.channels.get(&name) {
            for jid in &channel.members {
                let nick = ctx
                    .state
                    .users
                    .get(jid)
                    .map(|u| u.nick.clone())
                    .unwrap_or_else(|| jid.clone());
                entries.push((nick, jid.clone()));
            }
        }
        entries.sort();

        let mut reply = format!("{} user{} in \"{name}\":", entries.len(), plural(entries.len()));
        for (nick, jid) in &entries {
            reply.push_str(&format!("\n*{nick}* <{jid}>"));
        }
        ctx.reply(reply);
        Ok(())
    }
}
