//! The chat engine: model ownership, lookups, and inbound dispatch.
//!
//! [`ChatEngine`] owns the user and channel maps behind a single state
//! mutex, the monotonic version counter the persister watches, and the
//! wiring to the injected transport. Users and channels reference each
//! other by key only; the engine enforces the symmetric link through
//! [`EngineState::move_user_to_channel`].

use crate::batch::{Outbox, OutboundBatcher};
use crate::config::Config;
use crate::error::StateError;
use crate::handlers::Dispatcher;
use crate::state::persist::{self, StateSnapshot};
use crate::state::{Channel, User};
use crate::transport::{bare_jid, ChatTransport, MessageStanza, MessageType, PresenceStanza, Roster};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{debug, info, warn};

/// The mutable model guarded by the engine's state mutex.
///
/// Every mutation of a serializable field bumps the version counter exactly
/// once before the mutex is released; the persister wakes on the counter
/// moving past its saved mark.
#[derive(Debug)]
pub struct EngineState {
    /// All known users, keyed by bare JID. Users are never destroyed.
    pub users: HashMap<String, User>,
    /// Live channels, keyed by name. Empty channels are garbage-collected.
    pub channels: HashMap<String, Channel>,
    current_version: u64,
    saved_version: u64,
}

impl Default for EngineState {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineState {
    pub fn new() -> Self {
        Self {
            users: HashMap::new(),
            channels: HashMap::new(),
            current_version: 0,
            saved_version: 0,
        }
    }

    /// Record one model mutation.
    pub fn bump(&mut self) {
        self.current_version += 1;
    }

    pub fn current_version(&self) -> u64 {
        self.current_version
    }

    pub(crate) fn is_dirty(&self) -> bool {
        self.current_version > self.saved_version
    }

    pub(crate) fn mark_saved(&mut self) {
        self.saved_version = self.current_version;
    }

    /// Reset both counters; used after a snapshot load, where the document
    /// content rather than the counter is what survives a restart.
    pub(crate) fn reset_versions(&mut self) {
        self.current_version = 0;
        self.saved_version = 0;
    }

    pub fn get_user_with_nick(&self, nick: &str) -> Option<&User> {
        self.users.values().find(|u| u.nick == nick)
    }

    pub fn nick_in_use(&self, nick: &str) -> bool {
        self.get_user_with_nick(nick).is_some()
    }

    /// Create a user record for `jid` with an invented nick.
    pub fn create_user(&mut self, jid: &str) {
        let nick = self.invent_nick(jid);
        info!(jid = %jid, nick = %nick, "New user");
        self.users.insert(jid.to_string(), User::new(jid, nick));
        self.bump();
    }

    /// Derive an initial nick from the JID's localpart.
    ///
    /// Falls back to the full JID when the localpart fails validation, and
    /// appends the smallest suffix in `2..=100` on collision.
    pub fn invent_nick(&self, jid: &str) -> String {
        let localpart = match jid.find('@') {
            Some(idx) => &jid[..idx],
            None => jid,
        };
        if !User::valid_nick(localpart) {
            return jid.to_string();
        }
        self.uniquify_nick(localpart, jid)
    }

    /// Make `base` unique, falling back to the full JID when every
    /// numbered variant is taken.
    pub(crate) fn uniquify_nick(&self, base: &str, jid: &str) -> String {
        if !self.nick_in_use(base) {
            return base.to_string();
        }
        for n in 2..=100u32 {
            let candidate = format!("{base}{n}");
            if !self.nick_in_use(&candidate) {
                return candidate;
            }
        }
        jid.to_string()
    }

    /// Create a channel. The creator still has to join it.
    pub fn create_channel(&mut self, name: &str, password: Option<&str>) {
        info!(channel = %name, protected = password.is_some(), "Channel created");
        self.channels
            .insert(name.to_string(), Channel::new(name, password.map(String::from)));
        self.bump();
    }

    /// Move a user between channels (or out of any channel with `None`).
    ///
    /// The single primitive for membership changes: `User.channel` and
    /// `Channel.members` stay symmetric because both sides flip inside one
    /// critical section. Deleting a newly emptied channel is a separate,
    /// same-critical-section step via [`EngineState::delete_channel`].
    pub fn move_user_to_channel(&mut self, jid: &str, target: Option<&str>) {
        let previous = match self.users.get_mut(jid) {
            Some(user) => user.channel.take(),
            None => return,
        };
        if let Some(old_name) = previous {
            if let Some(old) = self.channels.get_mut(&old_name) {
                old.remove_user(jid);
            }
        }
        if let Some(name) = target {
            if let Some(channel) = self.channels.get_mut(name) {
                channel.add_user(jid);
                if let Some(user) = self.users.get_mut(jid) {
                    user.channel = Some(name.to_string());
                }
            }
        }
        self.bump();
    }

    /// Remove a channel. No-op while members remain.
    pub fn delete_channel(&mut self, name: &str) -> bool {
        match self.channels.get(name) {
            Some(channel) if channel.members.is_empty() => {
                self.channels.remove(name);
                info!(channel = %name, "Empty channel deleted");
                self.bump();
                true
            }
            _ => false,
        }
    }

    /// Build a snapshot of every serializable field.
    pub fn snapshot(&self) -> StateSnapshot {
        persist::snapshot(self)
    }

    /// Rebuild a state from a snapshot, repairing what it can (duplicate
    /// nicks, dangling channel references) and dropping memberless channels.
    pub fn from_snapshot(snapshot: StateSnapshot) -> Self {
        persist::restore(snapshot)
    }
}

/// The in-process chat engine.
///
/// Construction loads any existing snapshot and starts the two background
/// workers (outbound batcher pump and state persister); both run for the
/// process lifetime.
pub struct ChatEngine {
    pub(crate) state: Mutex<EngineState>,
    /// Woken whenever the version counter moves past the saved mark.
    pub(crate) dirty: Notify,
    batcher: OutboundBatcher,
    roster: Arc<dyn Roster>,
    dispatcher: Dispatcher,
    pub(crate) state_file: PathBuf,
    pub(crate) save_interval: Duration,
}

impl ChatEngine {
    /// Construct the engine, load the snapshot file if one exists, and
    /// start the background workers.
    ///
    /// A snapshot that exists but fails to parse is fatal.
    pub fn start(
        config: &Config,
        transport: Arc<dyn ChatTransport>,
        roster: Arc<dyn Roster>,
    ) -> Result<Arc<Self>, StateError> {
        let state = match std::fs::read_to_string(&config.state.file) {
            Ok(document) => {
                let snapshot = serde_yaml::from_str(&document)?;
                let state = EngineState::from_snapshot(snapshot);
                info!(
                    path = %config.state.file.display(),
                    users = state.users.len(),
                    channels = state.channels.len(),
                    "State restored"
                );
                state
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %config.state.file.display(), "No state file; starting empty");
                EngineState::new()
            }
            Err(e) => return Err(e.into()),
        };

        let engine = Arc::new(Self {
            state: Mutex::new(state),
            dirty: Notify::new(),
            batcher: OutboundBatcher::start(transport, &config.batch),
            roster,
            dispatcher: Dispatcher::new(),
            state_file: config.state.file.clone(),
            save_interval: config.state.save_interval(),
        });
        persist::spawn_persister(Arc::clone(&engine));
        Ok(engine)
    }

    /// Lock the model. Reads may use this freely; mutations belong to the
    /// dispatcher.
    pub fn state(&self) -> MutexGuard<'_, EngineState> {
        // Poisoning means a handler panicked; the exception policy crashes
        // the process anyway.
        self.state.lock().expect("state mutex poisoned")
    }

    pub fn batcher(&self) -> &OutboundBatcher {
        &self.batcher
    }

    /// Process one inbound message stanza.
    ///
    /// Drops error-typed and bodyless stanzas, normalizes the sender to a
    /// bare JID, creates the user on first contact, and dispatches the body
    /// as a command or a channel line. All model access happens under the
    /// state mutex; collected replies are handed to the batcher afterwards.
    pub fn handle_message(&self, msg: &MessageStanza) {
        if msg.kind == MessageType::Error {
            debug!(from = %msg.from, "Ignoring error stanza");
            return;
        }
        let Some(body) = msg.body.as_deref() else {
            return;
        };
        let jid = bare_jid(&msg.from);

        let mut outbox = Outbox::new();
        let dirty = {
            let mut state = self.state();
            self.dispatcher.dispatch(&mut state, jid, body, &mut outbox);
            state.is_dirty()
        };
        if dirty {
            self.dirty.notify_one();
        }
        self.batcher.enqueue_outbox(outbox);
    }

    /// Unconditionally accept a subscription request.
    pub async fn handle_subscription_request(&self, presence: &PresenceStanza) {
        let jid = bare_jid(&presence.from);
        info!(jid = %jid, "Accepting subscription request");
        if let Err(e) = self.roster.accept_subscription(jid).await {
            warn!(jid = %jid, error = %e, "Failed to accept subscription");
        }
    }

    /// Serialize the model if it changed since the last save, advancing the
    /// saved mark. Returns `None` when the model is clean.
    ///
    /// The traversal runs under the state mutex; the YAML encoding of the
    /// detached snapshot does not.
    pub(crate) fn serialize_if_dirty(&self) -> Result<Option<String>, StateError> {
        let snapshot = {
            let mut state = self.state();
            if !state.is_dirty() {
                return Ok(None);
            }
            let snapshot = state.snapshot();
            state.mark_saved();
            snapshot
        };
        Ok(Some(serde_yaml::to_string(&snapshot)?))
    }

    /// Synchronous save path for shutdown: snapshot and write in one call,
    /// skipping the persister's cooldown. Returns whether a write happened.
    pub fn save_state_if_changed(&self) -> Result<bool, StateError> {
        match self.serialize_if_dirty()? {
            Some(document) => {
                persist::write_snapshot(&self.state_file, &document)?;
                info!(path = %self.state_file.display(), "State saved");
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
