//! Reporter selection by runtime environment.
//!
//! The selector is a pure lookup: environment name in, active [`Reporter`]
//! out. The environment itself comes from an injected
//! [`EnvironmentProvider`] rather than any ambient global, so hosts and
//! tests can supply whatever indicator they like.

use crate::config::ConfigurationError;
use crate::reporter::Reporter;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Zero-argument query for the current environment name.
pub trait EnvironmentProvider: Send + Sync {
    /// The current environment indicator, e.g. "production" or "test".
    fn current_environment(&self) -> String;
}

/// Provider that always reports the same environment.
pub struct FixedEnvironment(String);

impl FixedEnvironment {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

impl EnvironmentProvider for FixedEnvironment {
    fn current_environment(&self) -> String {
        self.0.clone()
    }
}

/// Provider that reads the environment from a process environment variable,
/// falling back to "development" when the variable is unset.
pub struct EnvVarEnvironment {
    var: String,
}

impl EnvVarEnvironment {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl EnvironmentProvider for EnvVarEnvironment {
    fn current_environment(&self) -> String {
        std::env::var(&self.var).unwrap_or_else(|_| "development".to_string())
    }
}

/// Resolves the active reporter for an environment.
///
/// The mapping is validated eagerly when the configuration is built; at
/// resolution time the selector only performs the lookup. The map is kept
/// behind a lock so hosts can swap reporters at runtime: subsequent
/// notifications go to the new reporter without any method being
/// re-declared.
#[derive(Debug)]
pub struct ReporterSelector {
    reporters: RwLock<HashMap<String, Arc<dyn Reporter>>>,
    fallback: RwLock<Option<Arc<dyn Reporter>>>,
}

impl ReporterSelector {
    pub fn new(
        reporters: HashMap<String, Arc<dyn Reporter>>,
        fallback: Option<Arc<dyn Reporter>>,
    ) -> Self {
        Self {
            reporters: RwLock::new(reporters),
            fallback: RwLock::new(fallback),
        }
    }

    /// Look up the reporter for `environment`.
    ///
    /// A missing entry falls back to the configured fallback reporter;
    /// without one it is a [`ConfigurationError::UnknownEnvironment`], never
    /// a silent default.
    pub fn resolve(&self, environment: &str) -> Result<Arc<dyn Reporter>, ConfigurationError> {
        if let Some(reporter) = self
            .reporters
            .read()
            .expect("reporter map lock poisoned")
            .get(environment)
        {
            return Ok(Arc::clone(reporter));
        }

        if let Some(fallback) = self
            .fallback
            .read()
            .expect("fallback lock poisoned")
            .as_ref()
        {
            return Ok(Arc::clone(fallback));
        }

        Err(ConfigurationError::UnknownEnvironment(
            environment.to_string(),
        ))
    }

    /// Install or replace the reporter for an environment.
    pub fn set_reporter(&self, environment: impl Into<String>, reporter: Arc<dyn Reporter>) {
        self.reporters
            .write()
            .expect("reporter map lock poisoned")
            .insert(environment.into(), reporter);
    }

    /// Install or replace the fallback reporter.
    pub fn set_fallback(&self, reporter: Option<Arc<dyn Reporter>>) {
        *self.fallback.write().expect("fallback lock poisoned") = reporter;
    }

    /// Environment names with an explicit reporter entry.
    pub fn environments(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .reporters
            .read()
            .expect("reporter map lock poisoned")
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }
}
