//! Command registry and dispatch.
//!
//! The `Dispatcher` owns the command table (a name-keyed map of boxed
//! handler trait objects) and the line-handler chain. Command errors never
//! escape: every variant is rendered into an italicized reply delivered
//! only to the issuing user.

use super::context::Context;
use crate::batch::Outbox;
use crate::error::CommandError;
use crate::state::EngineState;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;
use tracing::debug;

/// A slash command. One implementation per verb, registered at engine
/// construction.
pub trait Command: Send + Sync {
    fn name(&self) -> &'static str;
    /// Argument synopsis shown by `/help`; empty for zero-arity commands.
    fn usage(&self) -> &'static str;
    fn description(&self) -> &'static str;
    /// Execute with `args` split from the argument tail and `tail` the raw
    /// trimmed argument text (for commands that take free-form text).
    fn run(&self, ctx: &mut Context<'_>, args: &[String], tail: &str) -> Result<(), CommandError>;

    /// The standard wrong-arity error for this command.
    fn usage_error(&self) -> CommandError {
        CommandError::Usage {
            name: self.name(),
            usage: self.usage(),
        }
    }
}

/// Scans every non-command channel line after it has been relayed.
pub trait LineHandler: Send + Sync {
    fn on_line(
        &self,
        state: &mut EngineState,
        sender_jid: &str,
        channel_name: &str,
        body: &str,
        out: &mut Outbox,
    );
}

/// Command grammar: a lowercase verb, then either end of input or
/// whitespace and the argument tail.
static COMMAND_RE: LazyLock<Regex> = LazyLock::new(|| {
    // SAFETY: compile-time constant pattern, always valid
    Regex::new(r"(?s)^/([a-z]+)(?:$|\s+(.*))").expect("command pattern is always valid")
});

/// Parses message bodies and routes them to a command or the line handlers.
pub struct Dispatcher {
    commands: BTreeMap<&'static str, Box<dyn Command>>,
    line_handlers: Vec<Box<dyn LineHandler>>,
}

impl Dispatcher {
    /// Build the dispatcher with every command and line handler registered.
    pub fn new() -> Self {
        let mut commands: BTreeMap<&'static str, Box<dyn Command>> = BTreeMap::new();
        for command in [
            Box::new(super::alias::AliasCommand) as Box<dyn Command>,
            Box::new(super::help::HelpCommand),
            Box::new(super::join::JoinCommand),
            Box::new(super::list::ListCommand),
            Box::new(super::me::MeCommand),
            Box::new(super::part::PartCommand),
            Box::new(super::reset::ResetCommand),
            Box::new(super::scores::ScoresCommand),
        ] {
            commands.insert(command.name(), command);
        }

        let line_handlers: Vec<Box<dyn LineHandler>> = vec![
            Box::new(super::line::PlusPlusHandler),
            Box::new(super::line::VamosQuestionHandler),
        ];

        Self {
            commands,
            line_handlers,
        }
    }

    /// Route one message body from `jid`, creating the user on first
    /// contact. Runs under the engine's state mutex.
    pub fn dispatch(&self, state: &mut EngineState, jid: &str, body: &str, out: &mut Outbox) {
        if !state.users.contains_key(jid) {
            state.create_user(jid);
        }

        if body.starts_with('/') {
            if let Err(e) = self.run_command(state, jid, body, out) {
                debug!(jid = %jid, error = %e, "Command rejected");
                out.push(jid, render_error(&e));
            }
            return;
        }

        let (channel_name, nick, welcome_sent) = {
            let user = state
                .users
                .get(jid)
                .expect("sender was created on entry");
            (user.channel.clone(), user.nick.clone(), user.welcome_sent)
        };

        match channel_name {
            Some(channel_name) => {
                if let Some(channel) = state.channels.get(&channel_name) {
                    channel.repeat_message(jid, &nick, body, out);
                }
                for handler in &self.line_handlers {
                    handler.on_line(state, jid, &channel_name, body, out);
                }
            }
            None if !welcome_sent => {
                if let Some(user) = state.users.get_mut(jid) {
                    user.welcome_sent = true;
                }
                out.push(jid, format!("Welcome! You are known as *{nick}*."));
                out.push(
                    jid,
                    "Use */join #channel* to join a channel, or */help* for the command list.",
                );
            }
            None => out.push(jid, "_You need to join a channel first._"),
        }
    }

    fn run_command(
        &self,
        state: &mut EngineState,
        jid: &str,
        body: &str,
        out: &mut Outbox,
    ) -> Result<(), CommandError> {
        let caps = COMMAND_RE.captures(body).ok_or(CommandError::Unparsable)?;
        let name = &caps[1];
        let tail = caps.get(2).map(|m| m.as_str().trim()).unwrap_or("");

        let command = self
            .commands
            .get(name)
            .ok_or_else(|| CommandError::Unknown(name.to_string()))?;
        let args = split_args(tail);

        let mut ctx = Context {
            state,
            jid,
            out,
            commands: &self.commands,
        };
        command.run(&mut ctx, &args, tail)
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Render a command error as the italicized reply the issuer sees.
fn render_error(error: &CommandError) -> String {
    match error {
        CommandError::Unparsable => "_Unparsable command; try */help*._".to_string(),
        CommandError::Unknown(name) => format!("_Unknown command \"{name}\"; try */help*._"),
        CommandError::Usage { name, usage } if usage.is_empty() => format!("_Usage: */{name}*._"),
        CommandError::Usage { name, usage } => format!("_Usage: */{name} {usage}*._"),
        CommandError::NotInChannel => "_You need to join a channel first._".to_string(),
        CommandError::Rejected(text) => format!("_{text}_"),
    }
}

/// Split an argument tail on whitespace with double-quote grouping.
///
/// Standard CSV semantics with space as the delimiter: quotes group spaces
/// into one argument and a doubled quote inside a group is a literal quote.
/// An empty tail yields an empty list.
pub fn split_args(tail: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut has_token = false;
    let mut chars = tail.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    current.push('"');
                } else {
                    in_quotes = false;
                }
            }
            '"' => {
                in_quotes = true;
                has_token = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if has_token {
                    args.push(std::mem::take(&mut current));
                    has_token = false;
                }
            }
            c => {
                current.push(c);
                has_token = true;
            }
        }
    }
    if has_token {
        args.push(current);
    }
    args
}
