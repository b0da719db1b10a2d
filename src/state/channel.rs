//! Channel-related types and state.

use crate::batch::Outbox;
use rand::Rng;
use std::collections::{BTreeMap, BTreeSet};

const PLUS_EXCLAMATIONS: [&str; 2] = ["Hooray!", "Yay!"];
const MINUS_EXCLAMATIONS: [&str; 2] = ["Ouch!", "Zing!"];

/// A named chat room with flat membership and a scoreboard.
///
/// Channels are created by `/join` when absent and destroyed when the last
/// member leaves; a re-created channel starts with a fresh password.
#[derive(Debug, Clone)]
pub struct Channel {
    /// Unique channel name; `#`-prefixed by convention but not enforced.
    pub name: String,
    /// Optional shared secret; when set, joining requires an exact match.
    pub password: Option<String>,
    /// Bare JIDs of current members. The engine keeps this symmetric with
    /// each member's `channel` field. Ordered, so fan-out order is
    /// deterministic.
    pub members: BTreeSet<String>,
    /// Signed counters per arbitrary token, nudged by `++`/`--` suffixes.
    /// Zero-valued entries are elided from snapshots.
    pub scores: BTreeMap<String, i64>,
}

impl Channel {
    pub fn new(name: impl Into<String>, password: Option<String>) -> Self {
        Self {
            name: name.into(),
            password,
            members: BTreeSet::new(),
            scores: BTreeMap::new(),
        }
    }

    /// Add a member. Idempotent.
    pub fn add_user(&mut self, jid: &str) {
        self.members.insert(jid.to_string());
    }

    /// Remove a member. Idempotent.
    pub fn remove_user(&mut self, jid: &str) {
        self.members.remove(jid);
    }

    pub fn is_member(&self, jid: &str) -> bool {
        self.members.contains(jid)
    }

    /// Relay a member's line to everyone in the channel except the sender.
    pub fn repeat_message(&self, sender_jid: &str, sender_nick: &str, body: &str, out: &mut Outbox) {
        let line = format!("*{sender_nick}*: {body}");
        for jid in &self.members {
            if jid != sender_jid {
                out.push(jid, line.clone());
            }
        }
    }

    /// Deliver a line to every member, the actor included.
    pub fn broadcast_message(&self, line: &str, out: &mut Outbox) {
        for jid in &self.members {
            out.push(jid, line.to_string());
        }
    }

    /// Bump `item` up by one and announce the new score.
    pub fn increment_score(&mut self, item: &str, note: Option<&str>, out: &mut Outbox) -> i64 {
        self.nudge_score(item, 1, &PLUS_EXCLAMATIONS, note, out)
    }

    /// Bump `item` down by one and announce the new score.
    pub fn decrement_score(&mut self, item: &str, note: Option<&str>, out: &mut Outbox) -> i64 {
        self.nudge_score(item, -1, &MINUS_EXCLAMATIONS, note, out)
    }

    fn nudge_score(
        &mut self,
        item: &str,
        delta: i64,
        exclamations: &[&str],
        note: Option<&str>,
        out: &mut Outbox,
    ) -> i64 {
        let score = self.scores.entry(item.to_string()).or_insert(0);
        *score += delta;
        let new_score = *score;

        let bang = exclamations[rand::thread_rng().gen_range(0..exclamations.len())];
        let line = match note {
            Some(note) => format!("_{bang} {item} -> {new_score} ({note})_"),
            None => format!("_{bang} {item} -> {new_score}_"),
        };
        self.broadcast_message(&line, out);
        new_score
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn membership_is_idempotent() {
        let mut channel = Channel::new("#nerds", None);
        channel.add_user("foo@example.com");
        channel.add_user("foo@example.com");
        assert_eq!(channel.members.len(), 1);
        channel.remove_user("foo@example.com");
        channel.remove_user("foo@example.com");
        assert!(channel.members.is_empty());
    }

    #[test]
    fn repeat_skips_the_sender() {
        let mut channel = Channel::new("#nerds", None);
        channel.add_user("foo@example.com");
        channel.add_user("bar@example.com");

        let mut out = Outbox::new();
        channel.repeat_message("foo@example.com", "foo", "hi bar!", &mut out);
        assert_eq!(
            out.drain(),
            vec![("bar@example.com".to_string(), "*foo*: hi bar!".to_string())]
        );
    }

    #[test]
    fn broadcast_includes_the_actor() {
        let mut channel = Channel::new("#nerds", None);
        channel.add_user("foo@example.com");
        channel.add_user("bar@example.com");

        let mut out = Outbox::new();
        channel.broadcast_message("_hello_", &mut out);
        let recipients: Vec<String> = out.drain().into_iter().map(|(to, _)| to).collect();
        assert_eq!(recipients, vec!["bar@example.com", "foo@example.com"]);
    }

    #[test]
    fn scores_start_at_zero_and_move_by_one() {
        let mut channel = Channel::new("#nerds", None);
        channel.add_user("foo@example.com");

        let mut out = Outbox::new();
        assert_eq!(channel.increment_score("coffee", None, &mut out), 1);
        assert_eq!(channel.decrement_score("coffee", None, &mut out), 0);
        assert_eq!(channel.decrement_score("mondays", None, &mut out), -1);
    }

    #[test]
    fn score_announcement_carries_the_note() {
        let mut channel = Channel::new("#nerds", None);
        channel.add_user("foo@example.com");

        let mut out = Outbox::new();
        channel.increment_score("coffee", Some("because mornings"), &mut out);
        let (_, line) = out.drain().remove(0);
        assert!(
            line == "_Hooray! coffee -> 1 (because mornings)_"
                || line == "_Yay! coffee -> 1 (because mornings)_",
            "unexpected announcement: {line}"
        );
    }
}
