//! In-memory chat model: users, channels, the engine that owns both, and
//! the snapshot persister.
//!
//! # Lock discipline
//!
//! A single `stateMutex` ([`engine::ChatEngine::state`]) serializes every
//! mutation of the model and the version counter. Critical sections are
//! short and never perform I/O: handlers collect outbound lines into an
//! [`crate::batch::Outbox`] under the lock and hand them to the batcher
//! after releasing it, so the state mutex and the batcher's own mutex are
//! never held together.

pub mod channel;
pub mod engine;
pub mod persist;
pub mod user;

pub use channel::Channel;
pub use engine::{ChatEngine, EngineState};
pub use user::User;
