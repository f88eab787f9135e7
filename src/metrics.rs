//! Metrics for deprecated-method usage.
//!
//! Prometheus counters for dispatched notifications and notification
//! failures, plus a gauge for how many methods are currently wrapped.

use prometheus::{IntCounterVec, IntGauge, Opts, Registry};

/// Metrics collector for the deprecation pipeline.
#[derive(Clone)]
pub struct DeprecationMetrics {
    /// Registry for all metrics
    registry: Registry,

    /// Counter for dispatched deprecation notifications
    pub notifications_total: IntCounterVec,

    /// Counter for notification failures swallowed by the dispatcher
    pub notification_failures_total: IntCounterVec,

    /// Gauge for the number of methods declared deprecated
    pub declared_methods: IntGauge,
}

impl DeprecationMetrics {
    /// Create a new metrics collector with the given prefix.
    pub fn new(prefix: &str) -> Self {
        let registry = Registry::new();

        let notifications_total = IntCounterVec::new(
            Opts::new(
                format!("{}_notifications_total", prefix),
                "Total number of deprecation notifications dispatched",
            ),
            &["method", "environment"],
        )
        .expect("Failed to create notifications_total metric");

        let notification_failures_total = IntCounterVec::new(
            Opts::new(
                format!("{}_notification_failures_total", prefix),
                "Total number of notification failures isolated by the dispatcher",
            ),
            &["method", "reason"],
        )
        .expect("Failed to create notification_failures_total metric");

        let declared_methods = IntGauge::new(
            format!("{}_declared_methods", prefix),
            "Number of methods currently declared deprecated",
        )
        .expect("Failed to create declared_methods metric");

        registry
            .register(Box::new(notifications_total.clone()))
            .expect("Failed to register notifications_total");
        registry
            .register(Box::new(notification_failures_total.clone()))
            .expect("Failed to register notification_failures_total");
        registry
            .register(Box::new(declared_methods.clone()))
            .expect("Failed to register declared_methods");

        Self {
            registry,
            notifications_total,
            notification_failures_total,
            declared_methods,
        }
    }

    /// Record one dispatched notification.
    pub fn record_dispatch(&self, method: &str, environment: &str) {
        self.notifications_total
            .with_label_values(&[method, environment])
            .inc();
    }

    /// Record a notification failure that the dispatcher isolated.
    pub fn record_failure(&self, method: &str, reason: &str) {
        self.notification_failures_total
            .with_label_values(&[method, reason])
            .inc();
    }

    /// Record that one more method was declared deprecated.
    pub fn record_declared(&self) {
        self.declared_methods.inc();
    }

    /// Get the Prometheus registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Encode metrics in Prometheus text format.
    pub fn encode(&self) -> String {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer).unwrap();
        String::from_utf8(buffer).unwrap()
    }
}

impl Default for DeprecationMetrics {
    fn default() -> Self {
        Self::new("deprecation_notifier")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_dispatch() {
        let metrics = DeprecationMetrics::new("test");
        metrics.record_dispatch("legacy_sum", "production");

        let output = metrics.encode();
        assert!(output.contains("test_notifications_total"));
        assert!(output.contains("legacy_sum"));
        assert!(output.contains("production"));
    }

    #[test]
    fn test_record_failure() {
        let metrics = DeprecationMetrics::new("test");
        metrics.record_failure("legacy_sum", "queue_full");

        let output = metrics.encode();
        assert!(output.contains("test_notification_failures_total"));
        assert!(output.contains("queue_full"));
    }

    #[test]
    fn test_declared_methods_gauge() {
        let metrics = DeprecationMetrics::new("test");
        metrics.record_declared();
        metrics.record_declared();

        assert_eq!(metrics.declared_methods.get(), 2);
        assert!(metrics.encode().contains("test_declared_methods 2"));
    }
}
