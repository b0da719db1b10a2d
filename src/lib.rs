//! partylined - party-line group chat over a point-to-point XMPP session.
//!
//! A single bot identity receives one-to-one chat messages from subscribed
//! users and fans them out to everyone else in the same named channel,
//! giving IRC-like semantics (channels, nicks, passwords, scoreboards,
//! action messages) on top of a protocol that only offers point-to-point
//! delivery.
//!
//! The crate is the in-process chat engine. The wire transport (connection
//! management, presence, reconnection) is injected through the traits in
//! [`transport`]; the daemon binary wires a concrete transport plus signal
//! handling around [`ChatEngine`].

pub mod batch;
pub mod config;
pub mod error;
pub mod handlers;
pub mod state;
pub mod transport;

pub use state::engine::ChatEngine;
