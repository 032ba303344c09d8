//! Wire protocol for the chatbot socket
//!
//! Outbound questions and inbound answers are JSON text frames. Inbound frames
//! are decoded exactly once, here, into a [`Response`]; nothing downstream
//! inspects raw payloads.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Correlation identifier linking a question to the frames answering it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(u64);

impl RequestId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Question sent to the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundRequest {
    pub id: RequestId,
    pub question: String,
    pub model: String,
    pub knowledge_base: String,
}

impl OutboundRequest {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Decoded inbound frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Complete answer; no further frames are expected for this id
    Final { id: RequestId, text: String },
    /// One fragment of a streamed answer
    Partial { id: RequestId, fragment: String },
    /// The backend failed to answer this request
    Failure { id: RequestId, reason: String },
}

impl Response {
    pub fn id(&self) -> RequestId {
        match self {
            Response::Final { id, .. }
            | Response::Partial { id, .. }
            | Response::Failure { id, .. } => *id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Response::Final { .. } => "final",
            Response::Partial { .. } => "partial",
            Response::Failure { .. } => "failure",
        }
    }
}

/// Reasons an inbound frame could not be decoded
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("frame has no integer id")]
    MissingId,
    #[error("frame for request {0} carries none of result, partial_result or error")]
    UnknownShape(RequestId),
    #[error("frame for request {0} carries more than one of result, partial_result or error")]
    AmbiguousShape(RequestId),
}

/// Raw shape of an inbound frame before classification
#[derive(Debug, Deserialize)]
struct RawFrame {
    #[serde(default)]
    id: Option<serde_json::Value>,
    #[serde(default)]
    result: Option<String>,
    #[serde(default)]
    partial_result: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Decode one inbound text frame
pub fn decode(text: &str) -> Result<Response, ProtocolError> {
    let raw: RawFrame = serde_json::from_str(text)?;
    let id = raw
        .id
        .as_ref()
        .and_then(serde_json::Value::as_u64)
        .map(RequestId::new)
        .ok_or(ProtocolError::MissingId)?;

    match (raw.result, raw.partial_result, raw.error) {
        (Some(text), None, None) => Ok(Response::Final { id, text }),
        (None, Some(fragment), None) => Ok(Response::Partial { id, fragment }),
        (None, None, Some(reason)) => Ok(Response::Failure { id, reason }),
        (None, None, None) => Err(ProtocolError::UnknownShape(id)),
        _ => Err(ProtocolError::AmbiguousShape(id)),
    }
}
