//! Client-side chat session for a streaming chatbot backend
//!
//! Questions go out over a persistent WebSocket tagged with a correlation
//! id. Answers stream back as partial fragments, a final result, or an
//! error, and are merged into per-knowledge-base conversation threads.

pub mod config;
pub mod history;
pub mod protocol;
pub mod runtime;
pub mod session;
pub mod transport;
