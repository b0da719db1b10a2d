//! Command and line-handler dispatch.
//!
//! A message body is a command iff it begins with `/`. Commands are
//! registered as boxed trait objects in a name-keyed map; everything else
//! that reaches a channel is relayed and then scanned by the line handlers.
//! All handlers run synchronously under the engine's state mutex and
//! collect their output into an [`crate::batch::Outbox`].

mod alias;
mod context;
mod help;
mod join;
mod line;
mod list;
mod me;
mod part;
mod registry;
mod reset;
mod scores;

pub use context::Context;
pub use registry::{split_args, Command, Dispatcher, LineHandler};
