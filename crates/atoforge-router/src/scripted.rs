//! Scripted router for tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;

use atoforge_utils::error::RouterError;

use crate::{ChatMessage, GenerateOptions, ModelRouter};

enum Scripted {
    Text(String),
    Json(serde_json::Value),
    Error(RouterError),
}

/// A [`ModelRouter`] that replays scripted responses in order.
///
/// When the script runs out, text calls return a generic canned response and
/// JSON calls return an empty object, so tests only script the calls they
/// care about. Availability is a toggle.
#[derive(Default)]
pub struct ScriptedRouter {
    script: Mutex<VecDeque<Scripted>>,
    unavailable: AtomicBool,
    calls: AtomicUsize,
}

impl ScriptedRouter {
    /// A router that answers every call with canned output.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a text response.
    pub fn push_text(&self, text: impl Into<String>) {
        self.script
            .lock()
            .expect("script lock poisoned")
            .push_back(Scripted::Text(text.into()));
    }

    /// Queue a JSON response.
    pub fn push_json(&self, value: serde_json::Value) {
        self.script
            .lock()
            .expect("script lock poisoned")
            .push_back(Scripted::Json(value));
    }

    /// Queue a failure.
    pub fn push_error(&self, error: RouterError) {
        self.script
            .lock()
            .expect("script lock poisoned")
            .push_back(Scripted::Error(error));
    }

    /// Make `is_available` report the given state.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of generate calls made so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn next(&self) -> Option<Scripted> {
        self.script
            .lock()
            .expect("script lock poisoned")
            .pop_front()
    }
}

#[async_trait]
impl ModelRouter for ScriptedRouter {
    async fn generate_text(
        &self,
        _messages: &[ChatMessage],
        _opts: &GenerateOptions,
    ) -> Result<String, RouterError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.next() {
            Some(Scripted::Text(text)) => Ok(text),
            Some(Scripted::Json(value)) => Ok(value.to_string()),
            Some(Scripted::Error(error)) => Err(error),
            None => Ok("Generated content.".to_string()),
        }
    }

    async fn generate_json(
        &self,
        _messages: &[ChatMessage],
        _opts: &GenerateOptions,
    ) -> Result<serde_json::Value, RouterError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.next() {
            Some(Scripted::Json(value)) => Ok(value),
            Some(Scripted::Text(text)) => {
                serde_json::from_str(&text).map_err(|e| RouterError::MalformedJson {
                    reason: e.to_string(),
                })
            }
            Some(Scripted::Error(error)) => Err(error),
            None => Ok(serde_json::json!({})),
        }
    }

    async fn is_available(&self) -> bool {
        !self.unavailable.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scripted_responses_replay_in_order() {
        let router = ScriptedRouter::new();
        router.push_text("first");
        router.push_error(RouterError::Timeout { seconds: 5 });

        let opts = GenerateOptions::default();
        let messages = [ChatMessage::user("hello")];

        assert_eq!(
            router.generate_text(&messages, &opts).await.unwrap(),
            "first"
        );
        assert!(matches!(
            router.generate_text(&messages, &opts).await,
            Err(RouterError::Timeout { seconds: 5 })
        ));
        // Script exhausted: canned response.
        assert!(!router.generate_text(&messages, &opts).await.unwrap().is_empty());
        assert_eq!(router.call_count(), 3);
    }

    #[tokio::test]
    async fn availability_toggle() {
        let router = ScriptedRouter::new();
        assert!(router.is_available().await);
        router.set_unavailable(true);
        assert!(!router.is_available().await);
    }
}
