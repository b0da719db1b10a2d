//! `/alias` - change your display name.

use super::context::Context;
use super::registry::Command;
use crate::error::CommandError;
use crate::state::User;

pub struct AliasCommand;

impl Command for AliasCommand {
    fn name(&self) -> &'static str {
        "alias"
    }

    fn usage(&self) -> &'static str {
        "name"
    }

    fn description(&self) -> &'static str {
        "Change the name you go by."
    }

    fn run(&self, ctx: &mut Context<'_>, args: &[String], _tail: &str) -> Result<(), CommandError> {
        let [proposed] = args else {
            return Err(self.usage_error());
        };

        if ctx.user().nick == *proposed {
            return Err(CommandError::Rejected(format!(
                "You are already known as \"{proposed}\"."
            )));
        }
        if let Some(other) = ctx.state.get_user_with_nick(proposed) {
            return Err(CommandError::Rejected(format!(
                "Alias \"{proposed}\" already in use by {}.",
                other.jid
            )));
        }
        if !User::valid_nick(proposed) {
            return Err(CommandError::Rejected(format!(
                "Invalid alias \"{proposed}\"."
            )));
        }

        let old_nick = ctx.user().nick.clone();
        let channel_name = ctx.user().channel.clone();
        let jid = ctx.jid.to_string();

        if let Some(user) = ctx.state.users.get_mut(&jid) {
            user.nick = proposed.clone();
        }
        ctx.state.bump();

        if let Some(name) = channel_name {
            if let Some(channel) = ctx.state.channels.get(&name) {
                channel.broadcast_message(
                    &format!("_*{old_nick}* <{jid}> is now known as *{proposed}*._"),
                    ctx.out,
                );
            }
        }
        Ok(())
    }
}
