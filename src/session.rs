//! Conversation session core
//!
//! Elm-style: the runtime feeds [`Event`]s to the [`SessionController`],
//! which mutates the owned [`SessionState`] and returns the [`Effect`]s to
//! execute. Nothing in this module performs I/O, so every invariant is
//! testable without a live connection.

pub mod accumulator;
pub mod controller;
pub mod dispatcher;
mod effect;
mod event;
pub mod message;
pub mod state;
pub mod store;


pub use controller::{SessionController, TransitionError, TransitionResult};
pub use effect::{AlertLevel, Effect};
pub use event::Event;
pub use message::{ContextKey, Message, MessageStatus, Side};
pub use state::SessionState;
