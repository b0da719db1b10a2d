//! `/part` - leave the current channel.

use super::context::Context;
use super::registry::Command;
use crate::error::CommandError;

pub struct PartCommand;

impl Command for PartCommand {
    fn name(&self) -> &'static str {
        "part"
    }

    fn usage(&self) -> &'static str {
        ""
    }

    fn description(&self) -> &'static str {
        "Leave your current channel."
    }

    fn run(&self, ctx: &mut Context<'_>, args: &[String], _tail: &str) -> Result<(), CommandError> {
        if !args.is_empty() {
            return Err(self.usage_error());
        }
        let name = ctx.current_channel_name()?;
        leave_channel(ctx, &name);
        Ok(())
    }
}

/// Remove the issuer from `name`, announce it to the remaining members, and
/// garbage-collect the channel if it emptied. Shared with `/join`, which
/// parts any previous channel first.
///
/// Removal and delete-if-empty happen in the same critical section, so a
/// concurrent `/join` on the same name either finds the channel or
/// re-creates it, never a half-emptied one.
pub(super) fn leave_channel(ctx: &mut Context<'_>, name: &str) {
    let nick = ctx.user().nick.clone();
    let jid = ctx.jid.to_string();

    ctx.state.move_user_to_channel(&jid, None);
    ctx.reply(format!("_Left \"{name}\"._"));
    if let Some(channel) = ctx.state.channels.get(name) {
        channel.broadcast_message(&format!("_*{nick}* <{jid}> has left \"{name}\"._"), ctx.out);
    }
    ctx.state.delete_channel(name);
}
