//! Deprecation dispatch.
//!
//! The dispatcher turns a bare intercepted event into a complete
//! notification (synthesized message, optional backtrace), resolves the
//! active reporter for the current environment, and delivers the event. It
//! owns the system's central failure-isolation contract: `dispatch` never
//! raises to the interceptor, so a broken notification path can never break
//! application code that merely calls a deprecated method.

use crate::config::DeprecationConfig;
use crate::metrics::DeprecationMetrics;
use crate::reporter::{DeprecationEvent, NotifyError};
use crate::selector::EnvironmentProvider;
use std::backtrace::Backtrace;
use std::sync::Arc;
use tracing::warn;

/// Forwards deprecation events to the reporter selected for the current
/// environment.
pub struct DeprecationDispatcher {
    config: DeprecationConfig,
    environment: Arc<dyn EnvironmentProvider>,
    metrics: Arc<DeprecationMetrics>,
}

impl DeprecationDispatcher {
    pub fn new(config: DeprecationConfig, environment: Arc<dyn EnvironmentProvider>) -> Self {
        Self {
            config,
            environment,
            metrics: Arc::new(DeprecationMetrics::default()),
        }
    }

    pub fn config(&self) -> &DeprecationConfig {
        &self.config
    }

    /// Get the metrics collector.
    pub fn metrics(&self) -> &DeprecationMetrics {
        &self.metrics
    }

    /// Complete and deliver one deprecation event.
    ///
    /// Fills in the default message when the event carries none, captures a
    /// backtrace only when debug capture is enabled, and isolates every
    /// reporter failure: resolution errors and notify errors are downgraded
    /// to a warning log line plus a failure counter.
    pub fn dispatch(&self, mut event: DeprecationEvent) {
        if event.message.is_none() {
            event.message = Some(format!(
                "Method `{}` is deprecated. Please refer to {}.",
                event.method_name,
                self.config.referral_contact()
            ));
        }

        if self.config.debug_enabled() && event.backtrace.is_empty() {
            event.backtrace = capture_backtrace();
        }

        let environment = self.environment.current_environment();
        self.metrics.record_dispatch(&event.method_name, &environment);

        let reporter = match self.config.selector().resolve(&environment) {
            Ok(reporter) => reporter,
            Err(error) => {
                warn!(
                    method = %event.method_name,
                    environment = %environment,
                    error = %error,
                    "deprecation notification failed"
                );
                self.metrics
                    .record_failure(&event.method_name, "unresolved_environment");
                return;
            }
        };

        if let Err(error) = reporter.notify(&event) {
            warn!(
                method = %event.method_name,
                environment = %environment,
                error = %error,
                "deprecation notification failed"
            );
            self.metrics
                .record_failure(&event.method_name, failure_reason(&error));
        }
    }
}

fn failure_reason(error: &NotifyError) -> &'static str {
    match error {
        NotifyError::QueueFull => "queue_full",
        NotifyError::TrackerGone => "tracker_gone",
        NotifyError::Delivery(_) => "delivery",
    }
}

/// Capture the current call stack as one frame descriptor per line, with
/// this crate's own dispatch and intercept frames filtered out.
fn capture_backtrace() -> Vec<String> {
    let raw = Backtrace::force_capture().to_string();
    let frames: Vec<String> = raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| !is_internal_frame(line))
        .map(String::from)
        .collect();

    if frames.is_empty() {
        // Over-aggressive filtering must not violate the "non-empty when
        // debug is enabled" contract.
        vec![raw.trim().to_string()]
    } else {
        frames
    }
}

fn is_internal_frame(line: &str) -> bool {
    line.contains("deprecation_notifier::dispatch")
        || line.contains("deprecation_notifier::intercept")
        || line.contains("std::backtrace")
}
