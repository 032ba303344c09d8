//! Conversation message types

use crate::protocol::RequestId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Text shown in a placeholder until the first fragment arrives
pub const LOADING_TEXT: &str = "loading";

/// Conversation thread key (a knowledge base)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContextKey(String);

impl ContextKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContextKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ContextKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for ContextKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

/// Who authored a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    User,
    Bot,
    System,
}

/// Lifecycle of a message's text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    /// Sealed; the text never changes again
    Complete,
    /// Dispatch-time placeholder; the first fragment replaces its text
    Loading,
    /// Partial bot answer; more fragments are expected
    Streaming,
}

/// One entry in a conversation thread
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Correlation id; only bot answers to dispatched questions carry one
    pub id: Option<RequestId>,
    pub side: Side,
    pub context: ContextKey,
    pub text: String,
    pub status: MessageStatus,
}

impl Message {
    pub fn user(context: ContextKey, text: impl Into<String>) -> Self {
        Self::complete(Side::User, context, text)
    }

    pub fn system(context: ContextKey, text: impl Into<String>) -> Self {
        Self::complete(Side::System, context, text)
    }

    pub fn complete(side: Side, context: ContextKey, text: impl Into<String>) -> Self {
        Self {
            id: None,
            side,
            context,
            text: text.into(),
            status: MessageStatus::Complete,
        }
    }

    pub fn placeholder(id: RequestId, context: ContextKey) -> Self {
        Self {
            id: Some(id),
            side: Side::Bot,
            context,
            text: LOADING_TEXT.to_string(),
            status: MessageStatus::Loading,
        }
    }

    pub fn bot_fragment(id: RequestId, context: ContextKey, fragment: impl Into<String>) -> Self {
        Self {
            id: Some(id),
            side: Side::Bot,
            context,
            text: fragment.into(),
            status: MessageStatus::Streaming,
        }
    }

    pub fn bot_final(id: RequestId, context: ContextKey, text: impl Into<String>) -> Self {
        Self {
            id: Some(id),
            side: Side::Bot,
            context,
            text: text.into(),
            status: MessageStatus::Complete,
        }
    }

    pub fn is_partial(&self) -> bool {
        self.status == MessageStatus::Streaming
    }

    pub fn is_loading(&self) -> bool {
        self.status == MessageStatus::Loading
    }

    /// Whether more text may still be merged into this message
    pub fn is_open(&self) -> bool {
        self.status != MessageStatus::Complete
    }

    /// Merge a fragment. A placeholder's text is replaced, a partial answer's
    /// text is extended. `seal` marks the message complete afterwards.
    pub(crate) fn absorb(&mut self, fragment: &str, seal: bool) {
        if self.is_loading() {
            fragment.clone_into(&mut self.text);
        } else {
            self.text.push_str(fragment);
        }
        self.status = if seal {
            MessageStatus::Complete
        } else {
            MessageStatus::Streaming
        };
    }
}
