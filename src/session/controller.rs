//! Session controller
//!
//! Turns user input and decoded answers into store mutations plus the
//! effects the runtime must carry out. No I/O happens here.

use super::accumulator::{Accumulated, MessageAccumulator};
use super::message::{ContextKey, Message};
use super::state::SessionState;
use super::store::MergeOutcome;
use super::{Effect, Event};
use crate::history::HistoryEntry;
use crate::protocol::{RequestId, Response};
use thiserror::Error;

/// Result of handling one event
#[derive(Debug, Default)]
pub struct TransitionResult {
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_effects(mut self, effects: impl IntoIterator<Item = Effect>) -> Self {
        self.effects.extend(effects);
        self
    }

    /// Id of the request this transition sends, if any
    pub fn dispatched_id(&self) -> Option<RequestId> {
        self.effects.iter().find_map(|effect| match effect {
            Effect::Send(request) => Some(request.id),
            _ => None,
        })
    }
}

/// Events the controller refuses to apply
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Question is empty")]
    EmptyQuestion,
    #[error("No pending request with id {0}")]
    Unroutable(RequestId),
}

/// Orchestrates dispatch, accumulation and the store
#[derive(Debug, Clone)]
pub struct SessionController {
    state: SessionState,
}

impl SessionController {
    pub fn new(active: ContextKey, model: impl Into<String>) -> Self {
        Self {
            state: SessionState::new(active, model),
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn active_context(&self) -> &ContextKey {
        &self.state.active
    }

    pub fn get_messages(&self, context: &ContextKey) -> &[Message] {
        self.state.store.get_messages(context)
    }

    pub fn handle(&mut self, event: Event) -> Result<TransitionResult, TransitionError> {
        match event {
            Event::UserQuestion { text } => self.submit_question(&text),
            Event::SwitchContext { context, notice } => {
                Ok(self.switch_active_context(context, notice))
            }
            Event::SelectModel { model } => {
                tracing::info!(%model, "Model selected");
                self.state.model = model;
                Ok(TransitionResult::new())
            }
            Event::Inbound(response) => self.apply_response(response),
            Event::SendFailed { id, reason } => self.apply_response(Response::Failure {
                id,
                reason: format!("Could not send question: {reason}"),
            }),
            Event::HistoryLoaded { entries } => Ok(self.seed_history(entries)),
            Event::HistoryCleared => Ok(self.reset()),
        }
    }

    /// Record the question, dispatch it and insert the loading placeholder
    pub fn submit_question(&mut self, text: &str) -> Result<TransitionResult, TransitionError> {
        let question = text.trim();
        if question.is_empty() {
            return Err(TransitionError::EmptyQuestion);
        }

        let context = self.state.active.clone();
        let store = &mut self.state.store;
        store.add_message(&context, Message::user(context.clone(), question));
        let (id, request) = self
            .state
            .dispatcher
            .dispatch(question, &context, &self.state.model);
        store.add_message(&context, Message::placeholder(id, context.clone()));

        Ok(TransitionResult::new()
            .with_effect(Effect::Send(request))
            .with_effect(Effect::render(&context, store.get_messages(&context))))
    }

    /// Make `context` active. The notice is posted only on a context's first
    /// visit, so returning to a thread shows it exactly as it was left.
    /// Switching to the already active context changes nothing.
    pub fn switch_active_context(&mut self, context: ContextKey, notice: String) -> TransitionResult {
        if context == self.state.active {
            return TransitionResult::new();
        }

        tracing::debug!(from = %self.state.active, to = %context, "Switching context");
        if self.state.visited.insert(context.clone()) {
            self.state
                .store
                .add_message(&context, Message::system(context.clone(), notice));
        }
        let result = TransitionResult::new().with_effect(Effect::render(
            &context,
            self.state.store.get_messages(&context),
        ));
        self.state.active = context;
        result
    }

    fn apply_response(&mut self, response: Response) -> Result<TransitionResult, TransitionError> {
        let id = response.id();
        let kind = response.kind();
        let state = &mut self.state;

        match MessageAccumulator::apply(&mut state.store, &mut state.dispatcher, response) {
            Accumulated::Merged {
                outcome: MergeOutcome::Sealed,
                context,
            } => {
                tracing::debug!(%id, %context, kind, "Answer already complete");
                Ok(TransitionResult::new())
            }
            Accumulated::Merged { context, outcome } => {
                tracing::trace!(%id, %context, kind, ?outcome, "Merged answer");
                Ok(TransitionResult::new()
                    .with_effect(Effect::render(&context, state.store.get_messages(&context))))
            }
            Accumulated::Failed {
                context,
                removed,
                reason,
            } => {
                tracing::warn!(%id, %context, removed, %reason, "Request failed");
                Ok(TransitionResult::new()
                    .with_effect(Effect::render(&context, state.store.get_messages(&context)))
                    .with_effect(Effect::error_alert(reason)))
            }
            Accumulated::Unroutable { id } => Err(TransitionError::Unroutable(id)),
        }
    }

    fn seed_history(&mut self, entries: Vec<HistoryEntry>) -> TransitionResult {
        let mut touched: Vec<ContextKey> = Vec::new();
        for entry in entries {
            let context = ContextKey::new(entry.knowledge_base);
            let message = Message::complete(entry.side, context.clone(), entry.content);
            self.state.store.add_message(&context, message);
            if !touched.contains(&context) {
                touched.push(context);
            }
        }

        tracing::info!(contexts = touched.len(), "History seeded");
        let store = &self.state.store;
        TransitionResult::new().with_effects(
            touched
                .iter()
                .map(|context| Effect::render(context, store.get_messages(context))),
        )
    }

    fn reset(&mut self) -> TransitionResult {
        self.state.store.clear();
        self.state.dispatcher.clear();
        self.state.visited.clear();
        self.state.visited.insert(self.state.active.clone());
        tracing::info!("Session history cleared");
        TransitionResult::new().with_effect(Effect::render(&self.state.active, &[]))
    }
}
