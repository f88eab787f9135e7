//! Deprecation Notifier
//!
//! Intercepts calls to methods declared deprecated and routes a notification
//! describing the call to a pluggable reporting backend, selected by runtime
//! environment. Applications mark API surface as deprecated without editing
//! the deprecated operation's body, and operators get a single seam to
//! control what happens on each deprecated call: log it locally, forward it
//! to a tracking service, or both.
//!
//! # Features
//!
//! - **Transparent wrapping**: the wrapped operation's arguments, return
//!   value, and errors pass through unchanged
//! - **Pluggable reporters**: local logging, remote tracking, or any custom
//!   [`Reporter`]
//! - **Environment selection**: one reporter per environment name, with an
//!   optional fallback and runtime swapping
//! - **Failure isolation**: a broken notification path never breaks the
//!   caller of a deprecated method
//! - **Opt-in backtraces**: call-stack capture only when debugging is enabled
//! - **Usage metrics**: Prometheus counters for dispatches and failures
//!
//! # Example Configuration
//!
//! ```yaml
//! debug_enabled: false
//! referral_contact: platform team
//! environments:
//!   development:
//!     type: log
//!   test:
//!     type: log
//!   production:
//!     type: remote
//!     queue_capacity: 128
//! fallback:
//!   type: log
//! ```

pub mod config;
pub mod dispatch;
pub mod intercept;
pub mod metrics;
pub mod reporter;
pub mod selector;

pub use config::{ConfigurationError, DeprecationConfig, DeprecationSettings, ReporterKind};
pub use dispatch::DeprecationDispatcher;
pub use intercept::{deprecate_fn, MethodInterceptor};
pub use reporter::{
    DeprecationEvent, LogReporter, NotifyError, RemoteTrackerReporter, Reporter, TrackerClient,
};
pub use selector::{EnvVarEnvironment, EnvironmentProvider, FixedEnvironment, ReporterSelector};
