//! Session state aggregate

use super::dispatcher::RequestDispatcher;
use super::message::{ContextKey, Message};
use super::store::ConversationStore;
use std::collections::HashSet;

/// All mutable session data, owned in one place
#[derive(Debug, Clone)]
pub struct SessionState {
    pub store: ConversationStore,
    pub dispatcher: RequestDispatcher,
    /// Context new questions are asked in and the renderer shows
    pub active: ContextKey,
    /// Model named in outbound requests
    pub model: String,
    /// Contexts that have been active at least once
    pub visited: HashSet<ContextKey>,
}

impl SessionState {
    pub fn new(active: ContextKey, model: impl Into<String>) -> Self {
        Self {
            store: ConversationStore::new(),
            dispatcher: RequestDispatcher::new(),
            visited: HashSet::from([active.clone()]),
            active,
            model: model.into(),
        }
    }

    pub fn active_messages(&self) -> &[Message] {
        self.store.get_messages(&self.active)
    }
}
