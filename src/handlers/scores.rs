//! `/scores` - show the channel scoreboard.

use super::context::Context;
use super::registry::Command;
use crate::error::CommandError;

pub struct ScoresCommand;

impl Command for ScoresCommand {
    fn name(&self) -> &'static str {
        "scores"
    }

    fn usage(&self) -> &'static str {
        ""
    }

    fn description(&self) -> &'static str {
        "List your channel's scores."
    }

    fn run(&self, ctx: &mut Context<'_>, args: &[String], _tail: &str) -> Result<(), CommandError> {
        if !args.is_empty() {
            return Err(self.usage_error());
        }
        let name = ctx.current_channel_name()?;

        let mut reply = format!("Scores for \"{name}\":");
        if let Some(channel) = ctx.state.channels.get(&name) {
            for (item, score) in &channel.scores {
                reply.push_str(&format!("\n*{item}*: {score}"));
            }
        }
        ctx.reply(reply);
        Ok(())
    }
}
