//! Orchestrator configuration.

use std::time::Duration;

use atoforge_router::GenerateOptions;

/// Default hard deadline for a single model-router call.
pub const DEFAULT_MODEL_CALL_TIMEOUT: Duration = Duration::from_secs(120);

/// Lower bound for the model-call timeout; shorter values are clamped up.
pub const MIN_MODEL_CALL_TIMEOUT: Duration = Duration::from_secs(5);

/// Tunables for the generation orchestrator.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    model_call_timeout: Duration,
    /// Capacity of per-job progress event channels. Events are advisory and
    /// are dropped, not awaited, when a subscriber falls behind.
    pub progress_channel_capacity: usize,
    /// When set, a recoverable per-document step failure fails the whole
    /// job instead of recording the step error and continuing.
    pub abort_on_step_failure: bool,
}

impl OrchestratorConfig {
    /// Configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self {
            model_call_timeout: DEFAULT_MODEL_CALL_TIMEOUT,
            progress_channel_capacity: 64,
            abort_on_step_failure: false,
        }
    }

    /// Set the per-call model timeout, clamped to [`MIN_MODEL_CALL_TIMEOUT`].
    #[must_use]
    pub fn with_model_call_timeout(mut self, timeout: Duration) -> Self {
        self.model_call_timeout = timeout.max(MIN_MODEL_CALL_TIMEOUT);
        self
    }

    /// Fail the whole job when any document step fails.
    #[must_use]
    pub fn with_abort_on_step_failure(mut self, abort: bool) -> Self {
        self.abort_on_step_failure = abort;
        self
    }

    /// The effective per-call model timeout.
    #[must_use]
    pub fn model_call_timeout(&self) -> Duration {
        self.model_call_timeout
    }

    /// Router options carrying the configured timeout.
    #[must_use]
    pub fn generate_options(&self) -> GenerateOptions {
        GenerateOptions::with_timeout(self.model_call_timeout)
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_is_clamped_to_minimum() {
        let config = OrchestratorConfig::new().with_model_call_timeout(Duration::from_secs(1));
        assert_eq!(config.model_call_timeout(), MIN_MODEL_CALL_TIMEOUT);

        let config = OrchestratorConfig::new().with_model_call_timeout(Duration::from_secs(30));
        assert_eq!(config.model_call_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn default_timeout_flows_into_options() {
        let opts = OrchestratorConfig::default().generate_options();
        assert_eq!(opts.timeout, DEFAULT_MODEL_CALL_TIMEOUT);
    }
}
