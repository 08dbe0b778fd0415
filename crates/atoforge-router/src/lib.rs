//! Model-router abstraction.
//!
//! The generation core drives a language model through the [`ModelRouter`]
//! trait: plain-text generation, JSON-shaped generation, and a health probe.
//! Concrete routers (HTTP gateways, local models, CLIs) live outside the
//! core; the core only relies on this contract. Every invocation carries an
//! explicit timeout via [`GenerateOptions`] so an unbounded request cannot
//! hold a job in `running` indefinitely.

mod scripted;
mod types;

pub use types::{ChatMessage, GenerateOptions, Role};

pub use atoforge_utils::error::RouterError;

// Test seam; not part of public API stability guarantees.
#[doc(hidden)]
pub use scripted::ScriptedRouter;

use async_trait::async_trait;

/// Contract for model-router implementations.
#[async_trait]
pub trait ModelRouter: Send + Sync {
    /// Generate free-form text from a conversation.
    ///
    /// # Errors
    ///
    /// Returns `RouterError` for transport failures, provider errors, and
    /// timeouts. Callers with a defined degraded value must catch this and
    /// degrade rather than propagate.
    async fn generate_text(
        &self,
        messages: &[ChatMessage],
        opts: &GenerateOptions,
    ) -> Result<String, RouterError>;

    /// Generate a JSON value from a conversation.
    ///
    /// # Errors
    ///
    /// Returns `RouterError::MalformedJson` when the model produced
    /// unparsable output, and the same failure modes as
    /// [`generate_text`](Self::generate_text) otherwise.
    async fn generate_json(
        &self,
        messages: &[ChatMessage],
        opts: &GenerateOptions,
    ) -> Result<serde_json::Value, RouterError>;

    /// Cheap health probe used by pre-flight validation.
    async fn is_available(&self) -> bool;
}
