//! Command handler context.

use super::registry::Command;
use crate::batch::Outbox;
use crate::error::CommandError;
use crate::state::{EngineState, User};
use std::collections::BTreeMap;

/// Everything a command sees while the state mutex is held.
pub struct Context<'a> {
    /// The locked model.
    pub state: &'a mut EngineState,
    /// Bare JID of the issuing user.
    pub jid: &'a str,
    /// Collected outbound lines, flushed to the batcher after the lock is
    /// released.
    pub out: &'a mut Outbox,
    /// The registered command table, for `/help`.
    pub commands: &'a BTreeMap<&'static str, Box<dyn Command>>,
}

impl Context<'_> {
    /// Queue a reply line to the issuing user.
    pub fn reply(&mut self, line: impl Into<String>) {
        self.out.push(self.jid, line);
    }

    /// The issuing user's record.
    pub fn user(&self) -> &User {
        self.state
            .users
            .get(self.jid)
            .expect("dispatch creates the sender before running commands")
    }

    /// Name of the issuer's current channel, or the standard nudge error.
    pub fn current_channel_name(&self) -> Result<String, CommandError> {
        self.user().channel.clone().ok_or(CommandError::NotInChannel)
    }
}

/// Pluralization suffix for user counts.
pub(super) fn plural(n: usize) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}
