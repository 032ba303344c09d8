//! Effects produced by the session controller

use super::message::{ContextKey, Message};
use crate::protocol::OutboundRequest;
use std::fmt;

/// Severity passed to the alerting collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertLevel {
    Info,
    Error,
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertLevel::Info => f.write_str("Info"),
            AlertLevel::Error => f.write_str("Error"),
        }
    }
}

/// Effects to be executed by the runtime after a transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Transmit a question over the transport
    Send(OutboundRequest),

    /// Redraw a context's thread
    Render {
        context: ContextKey,
        messages: Vec<Message>,
    },

    /// Surface a notice to the user; never stored in history
    Alert { level: AlertLevel, message: String },
}

impl Effect {
    pub fn render(context: &ContextKey, messages: &[Message]) -> Self {
        Effect::Render {
            context: context.clone(),
            messages: messages.to_vec(),
        }
    }

    pub fn error_alert(message: impl Into<String>) -> Self {
        Effect::Alert {
            level: AlertLevel::Error,
            message: message.into(),
        }
    }
}
