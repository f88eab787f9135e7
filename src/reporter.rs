//! Deprecation events and the reporter backends that consume them.
//!
//! A [`Reporter`] is the pluggable seam of the system: anything that can
//! accept a [`DeprecationEvent`] and act on it. Two implementations ship with
//! the crate: [`LogReporter`] for local logging and [`RemoteTrackerReporter`]
//! for forwarding to an external tracking service through a host-supplied
//! [`TrackerClient`].

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::warn;

/// A single deprecated-method invocation.
///
/// Built fresh for every intercepted call; reporters receive it by shared
/// reference and must not rely on it outliving the call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeprecationEvent {
    /// Name of the deprecated method that was invoked.
    pub method_name: String,

    /// Human-readable description. Left empty by the interceptor and
    /// synthesized by the dispatcher if no explicit message was supplied.
    pub message: Option<String>,

    /// Call-stack frames captured at the point of the deprecated call.
    /// Empty unless debug capture is enabled.
    pub backtrace: Vec<String>,
}

impl DeprecationEvent {
    /// Create an event for the given method, with no message or backtrace.
    pub fn new(method_name: impl Into<String>) -> Self {
        Self {
            method_name: method_name.into(),
            message: None,
            backtrace: Vec::new(),
        }
    }

    /// Create an event carrying an explicit message.
    pub fn with_message(method_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            method_name: method_name.into(),
            message: Some(message.into()),
            backtrace: Vec::new(),
        }
    }

    /// The resolved message text, or a placeholder if dispatch has not
    /// filled one in.
    pub fn message_text(&self) -> &str {
        self.message.as_deref().unwrap_or("(no message)")
    }
}

/// Failure raised inside a reporter during `notify`.
///
/// These are non-fatal by contract: the dispatcher catches them, logs a
/// best-effort warning, and never propagates them to the caller of the
/// deprecated method.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// The remote forwarder's bounded queue is full; the event is dropped.
    #[error("tracker queue is full, dropping deprecation event")]
    QueueFull,

    /// The remote forwarder task has stopped.
    #[error("tracker forwarder has stopped")]
    TrackerGone,

    /// A custom reporter failed to deliver the event.
    #[error("reporter failed to deliver deprecation event")]
    Delivery(#[source] anyhow::Error),
}

/// Capability for consuming deprecation events.
///
/// Implementations must be safe to call from arbitrary threads; the
/// interceptor performs no locking around `notify`.
pub trait Reporter: Send + Sync {
    /// Act on a deprecation event (log it, forward it, ignore it).
    fn notify(&self, event: &DeprecationEvent) -> Result<(), NotifyError>;
}

impl std::fmt::Debug for dyn Reporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("dyn Reporter")
    }
}

/// Reporter that writes one warning line per event to the `tracing` sink.
#[derive(Debug, Default)]
pub struct LogReporter;

impl LogReporter {
    pub fn new() -> Self {
        Self
    }
}

impl Reporter for LogReporter {
    fn notify(&self, event: &DeprecationEvent) -> Result<(), NotifyError> {
        let trace = if event.backtrace.is_empty() {
            "trace unavailable".to_string()
        } else {
            event.backtrace.join(" <- ")
        };

        warn!(
            method = %event.method_name,
            "{} [{}]",
            event.message_text(),
            trace
        );

        Ok(())
    }
}

/// Client for the external error-tracking service.
///
/// The wire protocol and transport belong entirely to the implementation;
/// this crate only requires that an event can be submitted as structured
/// data. [`DeprecationEvent`] is `Serialize` for exactly this purpose.
#[async_trait]
pub trait TrackerClient: Send + Sync {
    /// Submit one event to the tracking service.
    async fn submit(&self, event: DeprecationEvent) -> anyhow::Result<()>;
}

/// Reporter that forwards events to an external tracking service.
///
/// Delivery is fire-and-forget through a bounded queue drained by a spawned
/// forwarder task, so `notify` never blocks the caller on network I/O.
/// Semantics are at-most-once: a full queue drops the event (surfaced as
/// [`NotifyError::QueueFull`]), and submit failures inside the forwarder are
/// logged and discarded.
pub struct RemoteTrackerReporter {
    tx: mpsc::Sender<DeprecationEvent>,
}

impl RemoteTrackerReporter {
    /// Spawn the forwarder task and return the reporter handle.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(client: Arc<dyn TrackerClient>, queue_capacity: usize) -> Self {
        let (tx, mut rx) = mpsc::channel::<DeprecationEvent>(queue_capacity.max(1));

        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                if let Err(error) = client.submit(event).await {
                    warn!(error = %error, "failed to forward deprecation event to tracker");
                }
            }
        });

        Self { tx }
    }

    #[cfg(test)]
    fn with_sender(tx: mpsc::Sender<DeprecationEvent>) -> Self {
        Self { tx }
    }
}

impl Reporter for RemoteTrackerReporter {
    fn notify(&self, event: &DeprecationEvent) -> Result<(), NotifyError> {
        self.tx.try_send(event.clone()).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => NotifyError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => NotifyError::TrackerGone,
        })
    }
}
