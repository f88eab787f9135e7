//! Configuration for deprecation reporting.
//!
//! Two layers: [`DeprecationSettings`] is the serde-friendly file format
//! (which reporter kind serves which environment), and [`DeprecationConfig`]
//! is the runtime shape holding live [`Reporter`] instances. Validation is
//! eager: the environment map is fully materialized and checked when the
//! runtime config is built, before any method is wrapped.

use crate::reporter::{LogReporter, RemoteTrackerReporter, Reporter, TrackerClient};
use crate::selector::ReporterSelector;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Host-application misconfiguration, surfaced at setup time and never
/// swallowed.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// Tried to wrap a method name that was never registered.
    #[error("cannot deprecate unknown method `{0}`")]
    UnknownMethod(String),

    /// Tried to wrap a method that is already wrapped.
    #[error("method `{0}` is already declared deprecated")]
    MethodAlreadyDeprecated(String),

    /// The current environment has no reporter entry and no fallback is set.
    #[error("no reporter configured for environment `{0}` and no fallback is set")]
    UnknownEnvironment(String),

    /// A `remote` reporter entry was configured without a tracker client.
    #[error("reporter entry `{0}` requires a remote tracker client, but none was supplied")]
    MissingTrackerClient(String),

    /// An environment name in the reporter map is empty.
    #[error("environment names must not be empty")]
    EmptyEnvironmentName,
}

/// File-level settings for the notifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeprecationSettings {
    /// Capture a call-stack backtrace on every deprecated call. Off by
    /// default; capture has a real per-call cost.
    #[serde(default)]
    pub debug_enabled: bool,

    /// Who callers should be referred to in synthesized messages.
    #[serde(default = "default_referral_contact")]
    pub referral_contact: String,

    /// Reporter kind per environment name.
    #[serde(default)]
    pub environments: HashMap<String, ReporterKind>,

    /// Reporter used when the current environment has no entry. Without
    /// one, an unmapped environment is a configuration error.
    #[serde(default)]
    pub fallback: Option<ReporterKind>,
}

impl Default for DeprecationSettings {
    fn default() -> Self {
        Self {
            debug_enabled: false,
            referral_contact: default_referral_contact(),
            environments: HashMap::new(),
            fallback: None,
        }
    }
}

fn default_referral_contact() -> String {
    "the API maintainers".to_string()
}

impl DeprecationSettings {
    /// Load settings from a YAML file.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let settings: Self = serde_yaml::from_str(&content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validate the settings.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.environments.keys().any(|name| name.is_empty()) {
            return Err(ConfigurationError::EmptyEnvironmentName);
        }
        if self.environments.is_empty() && self.fallback.is_none() {
            tracing::warn!("no reporter entries configured, every dispatch will fail resolution");
        }
        Ok(())
    }
}

/// Which reporter implementation serves an environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ReporterKind {
    /// Write each event to the local logging sink.
    Log,

    /// Forward each event to the external tracking service.
    Remote {
        /// Bound on the fire-and-forget forwarding queue.
        #[serde(default = "default_queue_capacity")]
        queue_capacity: usize,
    },
}

fn default_queue_capacity() -> usize {
    64
}

/// Runtime configuration: flags plus the live environment → reporter map.
///
/// Read-only from the dispatch path; the selector it carries can be mutated
/// by the host to swap reporters at runtime.
#[derive(Clone, Debug)]
pub struct DeprecationConfig {
    debug_enabled: bool,
    referral_contact: String,
    selector: Arc<ReporterSelector>,
}

impl DeprecationConfig {
    pub fn builder() -> DeprecationConfigBuilder {
        DeprecationConfigBuilder::default()
    }

    /// Build the runtime config from file settings.
    ///
    /// Any `remote` entry needs `tracker` to be supplied; a missing client
    /// fails here, before any method is wrapped. Spawning the remote
    /// forwarder requires a tokio runtime context when a `remote` entry is
    /// present.
    pub fn from_settings(
        settings: &DeprecationSettings,
        tracker: Option<Arc<dyn TrackerClient>>,
    ) -> Result<Self, ConfigurationError> {
        settings.validate()?;

        let mut builder = Self::builder()
            .debug(settings.debug_enabled)
            .referral_contact(settings.referral_contact.clone());

        for (environment, kind) in &settings.environments {
            let reporter = build_reporter(kind, environment, tracker.as_ref())?;
            builder = builder.reporter(environment.clone(), reporter);
        }

        if let Some(kind) = &settings.fallback {
            let reporter = build_reporter(kind, "fallback", tracker.as_ref())?;
            builder = builder.fallback(reporter);
        }

        builder.build()
    }

    pub fn debug_enabled(&self) -> bool {
        self.debug_enabled
    }

    pub fn referral_contact(&self) -> &str {
        &self.referral_contact
    }

    /// Shared handle to the environment → reporter map.
    pub fn selector(&self) -> Arc<ReporterSelector> {
        Arc::clone(&self.selector)
    }
}

fn build_reporter(
    kind: &ReporterKind,
    entry: &str,
    tracker: Option<&Arc<dyn TrackerClient>>,
) -> Result<Arc<dyn Reporter>, ConfigurationError> {
    match kind {
        ReporterKind::Log => Ok(Arc::new(LogReporter::new())),
        ReporterKind::Remote { queue_capacity } => {
            let client = tracker
                .ok_or_else(|| ConfigurationError::MissingTrackerClient(entry.to_string()))?;
            Ok(Arc::new(RemoteTrackerReporter::spawn(
                Arc::clone(client),
                *queue_capacity,
            )))
        }
    }
}

/// Builder for hosts that assemble reporters in code rather than from a
/// settings file. Accepts any `Arc<dyn Reporter>`, including custom
/// implementations.
pub struct DeprecationConfigBuilder {
    debug_enabled: bool,
    referral_contact: String,
    reporters: HashMap<String, Arc<dyn Reporter>>,
    fallback: Option<Arc<dyn Reporter>>,
}

impl Default for DeprecationConfigBuilder {
    fn default() -> Self {
        Self {
            debug_enabled: false,
            referral_contact: default_referral_contact(),
            reporters: HashMap::new(),
            fallback: None,
        }
    }
}

impl DeprecationConfigBuilder {
    pub fn debug(mut self, enabled: bool) -> Self {
        self.debug_enabled = enabled;
        self
    }

    pub fn referral_contact(mut self, contact: impl Into<String>) -> Self {
        self.referral_contact = contact.into();
        self
    }

    pub fn reporter(mut self, environment: impl Into<String>, reporter: Arc<dyn Reporter>) -> Self {
        self.reporters.insert(environment.into(), reporter);
        self
    }

    pub fn fallback(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.fallback = Some(reporter);
        self
    }

    pub fn build(self) -> Result<DeprecationConfig, ConfigurationError> {
        if self.reporters.keys().any(|name| name.is_empty()) {
            return Err(ConfigurationError::EmptyEnvironmentName);
        }

        Ok(DeprecationConfig {
            debug_enabled: self.debug_enabled,
            referral_contact: self.referral_contact,
            selector: Arc::new(ReporterSelector::new(self.reporters, self.fallback)),
        })
    }
}
