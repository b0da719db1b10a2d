//! `/join` - enter a channel, creating it if needed.

use super::context::{plural, Context};
use super::part::leave_channel;
use super::registry::Command;
use crate::error::CommandError;

pub struct JoinCommand;

impl Command for JoinCommand {
    fn name(&self) -> &'static str {
        "join"
    }

    fn usage(&self) -> &'static str {
        "name [password]"
    }

    fn description(&self) -> &'static str {
        "Join a channel, creating it if it does not exist."
    }

    fn run(&self, ctx: &mut Context<'_>, args: &[String], _tail: &str) -> Result<(), CommandError> {
        let (name, password) = match args {
            [name] => (name.as_str(), None),
            [name, password] => (name.as_str(), Some(password.as_str())),
            _ => return Err(self.usage_error()),
        };

        if let Some(channel) = ctx.state.channels.get(name) {
            if let Some(expected) = channel.password.as_deref() {
                if password != Some(expected) {
                    return Err(CommandError::Rejected(format!(
                        "Incorrect or missing password for \"{name}\"."
                    )));
                }
            }
            if channel.is_member(ctx.jid) {
                return Err(CommandError::Rejected(format!(
                    "Already a member of \"{name}\"."
                )));
            }
        } else {
            ctx.state.create_channel(name, password);
            ctx.reply(format!("_Created \"{name}\"._"));
        }

        // Switching channels goes through the full `/part` semantics first.
        if let Some(previous) = ctx.user().channel.clone() {
            leave_channel(ctx, &previous);
        }

        // Announce to the sitting members, then add the newcomer.
        let nick = ctx.user().nick.clone();
        let jid = ctx.jid.to_string();
        if let Some(channel) = ctx.state.channels.get(name) {
            channel.broadcast_message(
                &format!("_*{nick}* <{jid}> has joined \"{name}\"._"),
                ctx.out,
            );
        }
        ctx.state.move_user_to_channel(&jid, Some(name));

        let total = ctx.state.channels.get(name).map_or(0, |c| c.members.len());
        ctx.reply(format!(
            "_Joined \"{name}\" with {total} user{} total._",
            plural(total)
        ));
        Ok(())
    }
}
