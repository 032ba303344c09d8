//! Per-context conversation threads

use super::message::{ContextKey, Message, Side};
use crate::protocol::RequestId;
use std::collections::HashMap;

/// Result of merging answer text into a thread
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// No message carried the id; a new bot message was appended
    Created,
    /// An open message with the id absorbed the text
    Extended,
    /// The message with the id is already sealed; nothing changed. The
    /// accumulator retires an id when it seals it, so only direct merges into
    /// the store see this.
    Sealed,
}

/// Ordered, append-mostly message threads keyed by context
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationStore {
    threads: HashMap<ContextKey, Vec<Message>>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a message to a context's thread.
    ///
    /// Partial messages merge into an existing message with the same id.
    /// A system notice replaces a trailing system notice instead of stacking.
    /// Everything else is appended.
    pub fn add_message(&mut self, context: &ContextKey, message: Message) {
        if message.is_partial() {
            if let Some(id) = message.id {
                self.merge(context, id, &message.text, false);
                return;
            }
        }

        let thread = self.threads.entry(context.clone()).or_default();
        if message.side == Side::System {
            if let Some(last) = thread.last_mut() {
                if last.side == Side::System {
                    *last = message;
                    return;
                }
            }
        }
        thread.push(message);
    }

    /// Merge answer text for `id` into `context`, creating the bot message if
    /// none exists yet. `seal` marks the result complete.
    pub fn merge(
        &mut self,
        context: &ContextKey,
        id: RequestId,
        text: &str,
        seal: bool,
    ) -> MergeOutcome {
        let thread = self.threads.entry(context.clone()).or_default();
        match thread.iter_mut().find(|m| m.id == Some(id)) {
            Some(existing) if existing.is_open() => {
                existing.absorb(text, seal);
                MergeOutcome::Extended
            }
            Some(_) => MergeOutcome::Sealed,
            None => {
                let message = if seal {
                    Message::bot_final(id, context.clone(), text)
                } else {
                    Message::bot_fragment(id, context.clone(), text)
                };
                thread.push(message);
                MergeOutcome::Created
            }
        }
    }

    /// Remove every message carrying `id` from `context`. Returns how many
    /// were removed.
    pub fn remove_by_id(&mut self, context: &ContextKey, id: RequestId) -> usize {
        let Some(thread) = self.threads.get_mut(context) else {
            return 0;
        };
        let before = thread.len();
        thread.retain(|m| m.id != Some(id));
        before - thread.len()
    }

    /// Ordered messages for a context; empty if it was never touched
    pub fn get_messages(&self, context: &ContextKey) -> &[Message] {
        self.threads.get(context).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn find(&self, context: &ContextKey, id: RequestId) -> Option<&Message> {
        self.get_messages(context).iter().find(|m| m.id == Some(id))
    }

    pub fn contexts(&self) -> impl Iterator<Item = &ContextKey> {
        self.threads.keys()
    }

    pub fn clear(&mut self) {
        self.threads.clear();
    }
}
