//! The injected transport seam.
//!
//! The engine never speaks XMPP itself. It consumes an abstract client that
//! can deliver chat stanzas and a roster handle that can accept subscription
//! requests; connection management, presence, and reconnection live outside
//! this crate. Inbound stanzas are reduced to the few fields the engine
//! actually reads.

use crate::error::TransportError;
use async_trait::async_trait;

/// Message stanza types the engine distinguishes.
///
/// Anything delivered with an error type is dropped on entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    Chat,
    Error,
}

/// An inbound message stanza.
#[derive(Debug, Clone)]
pub struct MessageStanza {
    /// Sender JID; may carry a `/resource` suffix.
    pub from: String,
    /// Message body; absent for typing notifications and the like.
    pub body: Option<String>,
    pub kind: MessageType,
}

impl MessageStanza {
    /// A plain chat message.
    pub fn chat(from: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            body: Some(body.into()),
            kind: MessageType::Chat,
        }
    }
}

/// An inbound presence stanza. Only the sender is inspected.
#[derive(Debug, Clone)]
pub struct PresenceStanza {
    pub from: String,
}

/// Outbound half of the injected client session.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Deliver one chat stanza. Failures are logged by the caller and never
    /// retried; the transport owns reconnection.
    async fn send_chat(&self, to: &str, body: &str) -> Result<(), TransportError>;
}

/// Injected roster handle.
#[async_trait]
pub trait Roster: Send + Sync {
    /// Approve a pending subscription request from `jid`.
    async fn accept_subscription(&self, jid: &str) -> Result<(), TransportError>;
}

/// Strip any `/resource` suffix, leaving the bare `localpart@domain` form
/// used as the user key everywhere in the engine.
pub fn bare_jid(jid: &str) -> &str {
    match jid.find('/') {
        Some(idx) => &jid[..idx],
        None => jid,
    }
}
