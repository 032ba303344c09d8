//! Collaborators the runtime hands its output to
//!
//! These traits keep presentation out of the session core and let tests
//! record what would have been shown.

use crate::session::{AlertLevel, ContextKey, Message};
use std::sync::Arc;

/// Draws a context's thread
pub trait Renderer: Send + Sync {
    /// Called after every mutation of `context`'s thread
    fn render(&self, context: &ContextKey, messages: &[Message]);

    /// Notice posted into a context's thread when it becomes active
    fn context_notice(&self, context: &ContextKey) -> String {
        format!("You are now chatting about {context}")
    }
}

/// Surfaces transient notices (never stored in history)
pub trait Alerter: Send + Sync {
    fn alert(&self, level: AlertLevel, message: &str);
}

impl<T: Renderer + ?Sized> Renderer for Arc<T> {
    fn render(&self, context: &ContextKey, messages: &[Message]) {
        (**self).render(context, messages);
    }

    fn context_notice(&self, context: &ContextKey) -> String {
        (**self).context_notice(context)
    }
}

impl<T: Alerter + ?Sized> Alerter for Arc<T> {
    fn alert(&self, level: AlertLevel, message: &str) {
        (**self).alert(level, message);
    }
}

/// Alerter that only logs
#[derive(Debug, Clone, Copy, Default)]
pub struct LogAlerter;

impl Alerter for LogAlerter {
    fn alert(&self, level: AlertLevel, message: &str) {
        match level {
            AlertLevel::Info => tracing::info!(%message, "Alert"),
            AlertLevel::Error => tracing::error!(%message, "Alert"),
        }
    }
}
