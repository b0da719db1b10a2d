//! `/me` - send an action message to the channel.

use super::context::Context;
use super::registry::Command;
use crate::error::CommandError;

pub struct MeCommand;

impl Command for MeCommand {
    fn name(&self) -> &'static str {
        "me"
    }

    fn usage(&self) -> &'static str {
        "text"
    }

    fn description(&self) -> &'static str {
        "Narrate an action, IRC style."
    }

    fn run(&self, ctx: &mut Context<'_>, _args: &[String], tail: &str) -> Result<(), CommandError> {
        if tail.is_empty() {
            return Err(self.usage_error());
        }
        let name = ctx.current_channel_name()?;
        let nick = ctx.user().nick.clone();

        if let Some(channel) = ctx.state.channels.get(&name) {
            channel.broadcast_message(&format!("_* {nick} {tail}_"), ctx.out);
        }
        Ok(())
    }
}
