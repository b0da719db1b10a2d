//! `/reset` - zero out a score.

use super::context::Context;
use super::registry::Command;
use crate::error::CommandError;

pub struct ResetCommand;

impl Command for ResetCommand {
    fn name(&self) -> &'static str {
        "reset"
    }

    fn usage(&self) -> &'static str {
        "thing [reason]"
    }

    fn description(&self) -> &'static str {
        "Reset something's score to zero."
    }

    fn run(&self, ctx: &mut Context<'_>, args: &[String], _tail: &str) -> Result<(), CommandError> {
        let (thing, reason) = match args {
            [thing] => (thing.as_str(), None),
            [thing, reason] => (thing.as_str(), Some(reason.as_str())),
            _ => return Err(self.usage_error()),
        };
        let name = ctx.current_channel_name()?;
        let nick = ctx.user().nick.clone();

        let Some(channel) = ctx.state.channels.get_mut(&name) else {
            return Ok(());
        };
        match channel.scores.get(thing).copied() {
            None | Some(0) => Err(CommandError::Rejected(format!(
                "\"{thing}\" has no score to reset."
            ))),
            Some(_) => {
                channel.scores.insert(thing.to_string(), 0);
                let line = match reason {
                    Some(reason) => format!("_*{nick}* reset {thing}'s score to 0 ({reason})._"),
                    None => format!("_*{nick}* reset {thing}'s score to 0._"),
                };
                channel.broadcast_message(&line, ctx.out);
                ctx.state.bump();
                Ok(())
            }
        }
    }
}
