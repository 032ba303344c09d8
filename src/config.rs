//! Session configuration from the environment

use crate::session::ContextKey;
use crate::transport::policy::DEFAULT_RECONNECT_DELAY;
use crate::transport::{ExponentialBackoff, FixedDelay, ReconnectPolicy};
use std::time::Duration;

pub const DEFAULT_WS_URL: &str = "ws://localhost:8000/chatbot/get-answer";
pub const DEFAULT_KNOWLEDGE_BASE: &str = "postgresml";
pub const DEFAULT_MODEL: &str = "postgresml";

/// How to pace reconnect attempts
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconnectConfig {
    Fixed {
        delay: Duration,
        max_attempts: Option<u32>,
    },
    Backoff {
        max_attempts: Option<u32>,
    },
}

impl ReconnectConfig {
    pub fn policy(&self) -> Box<dyn ReconnectPolicy> {
        match *self {
            ReconnectConfig::Fixed {
                delay,
                max_attempts,
            } => {
                let policy = FixedDelay::new(delay);
                Box::new(match max_attempts {
                    Some(max) => policy.with_max_attempts(max),
                    None => policy,
                })
            }
            ReconnectConfig::Backoff { max_attempts } => {
                let policy = ExponentialBackoff::default();
                Box::new(match max_attempts {
                    Some(max) => policy.with_max_attempts(max),
                    None => policy,
                })
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub ws_url: String,
    pub model: String,
    pub knowledge_base: ContextKey,
    /// Base URL for `/history` and `/clear-history`; history is disabled without it
    pub history_url: Option<String>,
    pub reconnect: ReconnectConfig,
}

impl SessionConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source. Unparseable numbers fall back
    /// to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let number = |key: &str| -> Option<u64> {
            let raw = lookup(key)?;
            match raw.trim().parse() {
                Ok(n) => Some(n),
                Err(_) => {
                    tracing::warn!(var = key, value = %raw, "Ignoring non-numeric setting");
                    None
                }
            }
        };

        let max_attempts =
            number("CHATBOT_RECONNECT_MAX_ATTEMPTS").and_then(|n| u32::try_from(n).ok());
        let reconnect = if lookup("CHATBOT_RECONNECT_BACKOFF").as_deref() == Some("1") {
            ReconnectConfig::Backoff { max_attempts }
        } else {
            ReconnectConfig::Fixed {
                delay: number("CHATBOT_RECONNECT_MS")
                    .map_or(DEFAULT_RECONNECT_DELAY, Duration::from_millis),
                max_attempts,
            }
        };

        Self {
            ws_url: lookup("CHATBOT_WS_URL").unwrap_or_else(|| DEFAULT_WS_URL.to_string()),
            model: lookup("CHATBOT_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            knowledge_base: ContextKey::new(
                lookup("CHATBOT_KNOWLEDGE_BASE")
                    .unwrap_or_else(|| DEFAULT_KNOWLEDGE_BASE.to_string()),
            ),
            history_url: lookup("CHATBOT_HISTORY_URL").filter(|url| !url.is_empty()),
            reconnect,
        }
    }
}
