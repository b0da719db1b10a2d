//! Unified error handling for partylined.
//!
//! Command errors are user-triggered and never escape the dispatcher: the
//! registry renders each variant into an italicized reply delivered only to
//! the issuing user. State and transport errors carry I/O context; only a
//! snapshot that fails to parse at startup is fatal.

use thiserror::Error;

/// Errors raised while parsing or executing a slash command.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    /// Body started with `/` but did not match the command grammar.
    #[error("unparsable command")]
    Unparsable,

    /// Command name is not in the registry.
    #[error("unknown command \"{0}\"")]
    Unknown(String),

    /// Wrong number of arguments for the command.
    #[error("usage: /{name} {usage}")]
    Usage {
        name: &'static str,
        usage: &'static str,
    },

    /// The command requires channel membership and the issuer has none.
    #[error("not in a channel")]
    NotInChannel,

    /// A validation failure with user-visible text (wrong password, taken
    /// alias, nothing to reset). The text lands inside the italic wrapper.
    #[error("{0}")]
    Rejected(String),
}

/// Errors from loading or saving the engine snapshot.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("state file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("state document invalid: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Errors surfaced by the injected transport.
///
/// The engine treats sends as fire-and-forget: failures are logged and never
/// retried (the transport layer owns reconnection).
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("send failed: {0}")]
    Send(String),

    #[error("roster operation failed: {0}")]
    Roster(String),
}
