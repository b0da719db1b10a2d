//! User-related types and state.

use regex::Regex;
use std::sync::LazyLock;

/// Nicks are limited to a conservative token alphabet so they survive both
/// chat markup and the snapshot encoding untouched.
static NICK_RE: LazyLock<Regex> = LazyLock::new(|| {
    // SAFETY: compile-time constant pattern, always valid
    Regex::new("^[-_.a-zA-Z0-9]+$").expect("nick pattern is always valid")
});

/// A subscribed account.
///
/// Created on first inbound message (or on snapshot load) and never
/// destroyed. Keyed by bare JID in the engine's user map.
#[derive(Debug, Clone)]
pub struct User {
    /// Canonical bare JID (`localpart@domain`).
    pub jid: String,
    /// Display name; unique across the whole engine.
    pub nick: String,
    /// Name of the channel this user is joined to, if any. The engine keeps
    /// this symmetric with the channel's member set.
    pub channel: Option<String>,
    /// Whether the first-contact greeting has been delivered. Not part of
    /// the serialized state.
    pub welcome_sent: bool,
}

impl User {
    pub fn new(jid: impl Into<String>, nick: impl Into<String>) -> Self {
        Self {
            jid: jid.into(),
            nick: nick.into(),
            channel: None,
            welcome_sent: false,
        }
    }

    /// Whether `nick` is an acceptable display name.
    ///
    /// Uniqueness is the caller's concern; it has to be checked under the
    /// engine mutex.
    pub fn valid_nick(nick: &str) -> bool {
        NICK_RE.is_match(nick)
    }
}
