//! `/help` - list every registered command.

use super::context::Context;
use super::registry::Command;
use crate::error::CommandError;

pub struct HelpCommand;

impl Command for HelpCommand {
    fn name(&self) -> &'static str {
        "help"
    }

    fn usage(&self) -> &'static str {
        ""
    }

    fn description(&self) -> &'static str {
        "Show this list."
    }

    fn run(&self, ctx: &mut Context<'_>, args: &[String], _tail: &str) -> Result<(), CommandError> {
        if !args.is_empty() {
            return Err(self.usage_error());
        }

        // BTreeMap iteration keeps the listing sorted by command name.
        let lines: Vec<String> = ctx
            .commands
            .values()
            .map(|command| {
                let usage = command.usage();
                if usage.is_empty() {
                    format!("*/{}* - {}", command.name(), command.description())
                } else {
                    format!("*/{} {}* - {}", command.name(), usage, command.description())
                }
            })
            .collect();
        for line in lines {
            ctx.reply(line);
        }
        Ok(())
    }
}
