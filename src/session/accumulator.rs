//! Merging decoded answers into conversation threads

use super::dispatcher::RequestDispatcher;
use super::message::ContextKey;
use super::store::{ConversationStore, MergeOutcome};
use crate::protocol::{RequestId, Response};

/// What applying one response did to the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Accumulated {
    /// Text was merged into (or created in) `context`
    Merged {
        context: ContextKey,
        outcome: MergeOutcome,
    },
    /// The request failed; its bot message was removed from `context`
    Failed {
        context: ContextKey,
        removed: usize,
        reason: String,
    },
    /// No pending request has this id
    Unroutable { id: RequestId },
}

/// Routes answers to their owning context and folds them into the store
pub struct MessageAccumulator;

impl MessageAccumulator {
    pub fn apply(
        store: &mut ConversationStore,
        dispatcher: &mut RequestDispatcher,
        response: Response,
    ) -> Accumulated {
        let id = response.id();
        let Some(context) = dispatcher.context_of(id).cloned() else {
            return Accumulated::Unroutable { id };
        };

        match response {
            Response::Partial { fragment, .. } => {
                let outcome = store.merge(&context, id, &fragment, false);
                Accumulated::Merged { context, outcome }
            }
            Response::Final { text, .. } => {
                let outcome = store.merge(&context, id, &text, true);
                dispatcher.resolve(id);
                Accumulated::Merged { context, outcome }
            }
            Response::Failure { reason, .. } => {
                let removed = store.remove_by_id(&context, id);
                dispatcher.resolve(id);
                Accumulated::Failed {
                    context,
                    removed,
                    reason,
                }
            }
        }
    }
}
