//! Core types for the model-router abstraction.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Role of a message in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System-level instructions.
    System,
    /// User input.
    User,
    /// Assistant response.
    Assistant,
}

/// A single message in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    /// Create a new message.
    #[must_use]
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Create a system message.
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Create a user message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }
}

/// Per-invocation options for a router call.
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    /// Hard deadline for the call. The orchestrator sets this from its
    /// configured model-call timeout on every invocation.
    pub timeout: Duration,
    /// Model override, when the caller wants a specific model.
    pub model: Option<String>,
    /// Output token cap, when the provider supports one.
    pub max_tokens: Option<u32>,
}

impl GenerateOptions {
    /// Options with the given timeout and provider defaults otherwise.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout,
            model: None,
            max_tokens: None,
        }
    }

    /// Set a model override.
    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set an output token cap.
    #[must_use]
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self::with_timeout(Duration::from_secs(120))
    }
}
