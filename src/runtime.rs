//! Runtime for a live chat session
//!
//! [`SessionRuntime`] owns the transport and the controller and runs on its
//! own task. Callers talk to it through a cloneable [`SessionHandle`]; the
//! runtime stops once every handle is dropped.

mod executor;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use executor::SessionRuntime;
pub use traits::{Alerter, LogAlerter, Renderer};

use crate::session::ContextKey;
use thiserror::Error;
use tokio::sync::mpsc;

/// Capacity of the command channel
const COMMAND_BUFFER: usize = 32;

/// User-side inputs to a running session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Ask(String),
    SwitchContext(ContextKey),
    SelectModel(String),
    SeedHistory,
    ClearHistory,
}

#[derive(Debug, Error)]
#[error("session runtime has stopped")]
pub struct SessionClosed;

/// Handle to a running session
#[derive(Debug, Clone)]
pub struct SessionHandle {
    command_tx: mpsc::Sender<Command>,
}

impl SessionHandle {
    /// Create a handle and the receiver the runtime consumes
    pub fn channel() -> (Self, mpsc::Receiver<Command>) {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        (Self { command_tx }, command_rx)
    }

    pub async fn send(&self, command: Command) -> Result<(), SessionClosed> {
        self.command_tx.send(command).await.map_err(|_| SessionClosed)
    }

    pub async fn ask(&self, question: impl Into<String>) -> Result<(), SessionClosed> {
        self.send(Command::Ask(question.into())).await
    }

    pub async fn switch_context(&self, context: impl Into<ContextKey>) -> Result<(), SessionClosed> {
        self.send(Command::SwitchContext(context.into())).await
    }

    pub async fn select_model(&self, model: impl Into<String>) -> Result<(), SessionClosed> {
        self.send(Command::SelectModel(model.into())).await
    }

    pub async fn seed_history(&self) -> Result<(), SessionClosed> {
        self.send(Command::SeedHistory).await
    }

    pub async fn clear_history(&self) -> Result<(), SessionClosed> {
        self.send(Command::ClearHistory).await
    }
}
