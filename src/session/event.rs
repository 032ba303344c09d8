//! Events that drive the session

use super::message::ContextKey;
use crate::history::HistoryEntry;
use crate::protocol::{RequestId, Response};

/// Inputs to [`SessionController::handle`](super::SessionController::handle)
#[derive(Debug, Clone)]
pub enum Event {
    // User events
    UserQuestion {
        text: String,
    },
    SwitchContext {
        context: ContextKey,
        /// Notice describing the new thread, supplied by the renderer
        notice: String,
    },
    SelectModel {
        model: String,
    },

    // Transport events
    Inbound(Response),
    SendFailed {
        id: RequestId,
        reason: String,
    },

    // History events
    HistoryLoaded {
        entries: Vec<HistoryEntry>,
    },
    HistoryCleared,
}
