//! Line handlers: patterns scanned on every relayed channel line.

use super::registry::LineHandler;
use crate::batch::Outbox;
use crate::state::EngineState;
use regex::Regex;
use std::sync::LazyLock;

/// `item++` / `item--` with an optional trailing note, tolerating a comma,
/// period, or sentence-ending dot after the operator.
static PLUSPLUS_RE: LazyLock<Regex> = LazyLock::new(|| {
    // SAFETY: compile-time constant pattern, always valid
    Regex::new(r"\b(\S{2,})(\+\+|--)(?:\s*[.,]?\s+(.*)|\.\s*$|$)")
        .expect("plusplus pattern is always valid")
});

/// "vamos?" used as a question, with or without the inverted mark.
static VAMOS_RE: LazyLock<Regex> = LazyLock::new(|| {
    // SAFETY: compile-time constant pattern, always valid
    Regex::new(r"(?i)\b(?:¿)?vamos\?\s*$").expect("vamos pattern is always valid")
});

/// Adjusts the channel scoreboard when a line carries a `++`/`--` suffix.
pub struct PlusPlusHandler;

impl LineHandler for PlusPlusHandler {
    fn on_line(
        &self,
        state: &mut EngineState,
        _sender_jid: &str,
        channel_name: &str,
        body: &str,
        out: &mut Outbox,
    ) {
        let Some(caps) = PLUSPLUS_RE.captures(body) else {
            return;
        };
        let item = caps[1].to_string();
        let note = caps.get(3).map(|m| m.as_str().to_string());

        let Some(channel) = state.channels.get_mut(channel_name) else {
            return;
        };
        if &caps[2] == "++" {
            channel.increment_score(&item, note.as_deref(), out);
        } else {
            channel.decrement_score(&item, note.as_deref(), out);
        }
        state.bump();
    }
}

/// Gently reminds the channel that "vamos" is a statement.
pub struct VamosQuestionHandler;

impl LineHandler for VamosQuestionHandler {
    fn on_line(
        &self,
        _state: &mut EngineState,
        sender_jid: &str,
        _channel_name: &str,
        body: &str,
        out: &mut Outbox,
    ) {
        if VAMOS_RE.is_match(body) {
            out.push(sender_jid, "_\"vamos\" is a statement, not a question!_");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scored_state() -> EngineState {
        let mut state = EngineState::new();
        state.create_user("foo@example.com");
        state.create_user("bar@example.com");
        state.create_channel("#nerds", None);
        state.move_user_to_channel("foo@example.com", Some("#nerds"));
        state.move_user_to_channel("bar@example.com", Some("#nerds"));
        state
    }

    #[test]
    fn plusplus_captures_item_and_note() {
        let caps = PLUSPLUS_RE.captures("coffee++ because mornings").expect("matches");
        assert_eq!(&caps[1], "coffee");
        assert_eq!(&caps[2], "++");
        assert_eq!(caps.get(3).map(|m| m.as_str()), Some("because mornings"));
    }

    #[test]
    fn plusplus_tolerates_punctuation_after_the_operator() {
        let caps = PLUSPLUS_RE.captures("mondays--, obviously").expect("matches");
        assert_eq!(&caps[1], "mondays");
        assert_eq!(&caps[2], "--");
        assert_eq!(caps.get(3).map(|m| m.as_str()), Some("obviously"));

        let caps = PLUSPLUS_RE.captures("coffee++.").expect("matches");
        assert_eq!(&caps[1], "coffee");
        assert!(caps.get(3).is_none());
    }

    #[test]
    fn plusplus_needs_two_characters_and_a_real_suffix() {
        assert!(PLUSPLUS_RE.captures("i++").is_none());
        assert!(PLUSPLUS_RE.captures("no score here").is_none());
    }

    #[test]
    fn plusplus_updates_the_scoreboard_and_bumps_the_version() {
        let mut state = scored_state();
        let before = state.current_version();

        let mut out = Outbox::new();
        PlusPlusHandler.on_line(&mut state, "foo@example.com", "#nerds", "coffee++", &mut out);

        assert_eq!(state.channels["#nerds"].scores["coffee"], 1);
        assert!(state.current_version() > before);
        // The announcement goes to everyone, the scorer included.
        assert_eq!(out.drain().len(), 2);
    }

    #[test]
    fn vamos_matches_the_question_forms() {
        for body in ["vamos?", "VAMOS?", "¿vamos?", "bueno, vamos?  "] {
            assert!(VAMOS_RE.is_match(body), "{body} should match");
        }
        for body in ["vamos", "vamos? maybe", "vamonos?"] {
            assert!(!VAMOS_RE.is_match(body), "{body} should not match");
        }
    }

    #[test]
    fn vamos_reply_is_private_to_the_sender() {
        let mut state = scored_state();
        let mut out = Outbox::new();
        VamosQuestionHandler.on_line(&mut state, "foo@example.com", "#nerds", "vamos?", &mut out);

        assert_eq!(
            out.drain(),
            vec![(
                "foo@example.com".to_string(),
                "_\"vamos\" is a statement, not a question!_".to_string()
            )]
        );
    }
}
