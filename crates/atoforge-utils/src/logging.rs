//! Logging and observability infrastructure.
//!
//! Structured logging for job and step lifecycles via `tracing`. Library
//! code emits events and spans; only embedding applications should call
//! [`init_tracing`].

use tracing::{Level, info, span, warn};
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Initialize the tracing subscriber for structured logging.
///
/// Verbose format includes target names and span-close events with
/// durations; the compact format is human-readable and minimal. Honors
/// `RUST_LOG` when set.
///
/// # Errors
/// Returns an error if a global subscriber is already installed.
pub fn init_tracing(verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| {
            if verbose {
                EnvFilter::try_new("atoforge=debug,info")
            } else {
                EnvFilter::try_new("atoforge=info,warn")
            }
        })
        .unwrap_or_else(|_| EnvFilter::new("info"));

    if verbose {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_span_events(FmtSpan::CLOSE)
                    .compact(),
            )
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_target(false).compact())
            .try_init()?;
    }

    Ok(())
}

/// Create a span covering one job's execution.
pub fn job_span(job_id: &str, system_id: &str) -> tracing::Span {
    span!(
        Level::INFO,
        "job_execution",
        job_id = %job_id,
        system_id = %system_id,
    )
}

/// Log job acceptance with structured fields.
pub fn log_job_start(job_id: &str, system_id: &str, step_count: usize) {
    info!(
        job_id = %job_id,
        system_id = %system_id,
        step_count,
        "Starting generation job"
    );
}

/// Log job completion with duration.
pub fn log_job_complete(job_id: &str, duration_ms: u128) {
    info!(job_id = %job_id, duration_ms, "Generation job completed");
}

/// Log job failure with the captured message.
pub fn log_job_failed(job_id: &str, error: &str, duration_ms: u128) {
    warn!(job_id = %job_id, error = %error, duration_ms, "Generation job failed");
}
