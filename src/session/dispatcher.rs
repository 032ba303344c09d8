//! Request dispatch and correlation
//!
//! Every outbound question gets a fresh [`RequestId`] and a pending-table
//! entry naming the context it was asked in. The entry is consulted when
//! answers arrive, because the active context may have changed meanwhile.

use super::message::ContextKey;
use crate::protocol::{OutboundRequest, RequestId};
use std::collections::HashMap;

/// Session-scoped monotonic id source
#[derive(Debug, Clone)]
pub struct IdGenerator {
    next: u64,
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self { next: 1 }
    }
}

impl IdGenerator {
    pub fn new_id(&mut self) -> RequestId {
        let id = RequestId::new(self.next);
        self.next += 1;
        id
    }
}

/// Mints ids and remembers which context each request belongs to
#[derive(Debug, Clone, Default)]
pub struct RequestDispatcher {
    ids: IdGenerator,
    pending: HashMap<RequestId, ContextKey>,
}

impl RequestDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_id(&mut self) -> RequestId {
        self.ids.new_id()
    }

    /// Record a question and build its wire payload. The caller sends it and
    /// inserts the placeholder under the returned id.
    pub fn dispatch(
        &mut self,
        question: &str,
        context: &ContextKey,
        model: &str,
    ) -> (RequestId, OutboundRequest) {
        let id = self.new_id();
        self.pending.insert(id, context.clone());
        tracing::debug!(%id, %context, model, "Dispatching question");
        let request = OutboundRequest {
            id,
            question: question.to_string(),
            model: model.to_string(),
            knowledge_base: context.to_string(),
        };
        (id, request)
    }

    /// Context a request was dispatched from
    pub fn context_of(&self, id: RequestId) -> Option<&ContextKey> {
        self.pending.get(&id)
    }

    /// Retire a request that will receive no further frames
    pub fn resolve(&mut self, id: RequestId) -> Option<ContextKey> {
        self.pending.remove(&id)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}
