//! Method interception.
//!
//! Rust has no runtime class surgery, so deprecation is declared against an
//! explicit registry of named operations: hosts [`register`] a handler, then
//! [`declare_deprecated`] swaps in a wrapper that notifies the dispatcher
//! and delegates to the original with arguments, return value, and errors
//! untouched. The wrapper is installed once at declaration time, not per
//! call.
//!
//! For statically typed call sites that do not need the dynamic table,
//! [`deprecate_fn`] wraps any unary function the same way.
//!
//! [`register`]: MethodInterceptor::register
//! [`declare_deprecated`]: MethodInterceptor::declare_deprecated

use crate::config::ConfigurationError;
use crate::dispatch::DeprecationDispatcher;
use crate::reporter::DeprecationEvent;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Result of a registered operation. Handler errors pass through the
/// wrapper unchanged.
pub type MethodResult = anyhow::Result<Value>;

type MethodFn = dyn Fn(&[Value]) -> MethodResult + Send + Sync;

struct MethodEntry {
    handler: Arc<MethodFn>,
    deprecated: bool,
}

/// Registry of named operations with one-time deprecation wrapping.
///
/// Registration and wrapping are setup-time actions; invocation via
/// [`call`](Self::call) is safe under arbitrary concurrency. The handler
/// lock is released before the handler runs, so handlers may re-enter the
/// interceptor.
pub struct MethodInterceptor {
    dispatcher: Arc<DeprecationDispatcher>,
    methods: RwLock<HashMap<String, MethodEntry>>,
}

impl MethodInterceptor {
    pub fn new(dispatcher: Arc<DeprecationDispatcher>) -> Self {
        Self {
            dispatcher,
            methods: RwLock::new(HashMap::new()),
        }
    }

    /// Register an operation under a name. Registering the same name again
    /// replaces the handler and clears any deprecation wrapping.
    pub fn register<F>(&self, name: impl Into<String>, handler: F)
    where
        F: Fn(&[Value]) -> MethodResult + Send + Sync + 'static,
    {
        self.methods.write().expect("method table lock poisoned").insert(
            name.into(),
            MethodEntry {
                handler: Arc::new(handler),
                deprecated: false,
            },
        );
    }

    /// Declare a registered operation deprecated.
    ///
    /// Replaces the stored handler with a wrapper that dispatches a fresh
    /// [`DeprecationEvent`] and then invokes the original with the exact
    /// arguments received. Wrapping an unknown name or a name that is
    /// already deprecated is a [`ConfigurationError`]; re-declaration is
    /// rejected rather than treated as a no-op so that duplicate
    /// declarations are caught as host bugs.
    pub fn declare_deprecated(&self, name: &str) -> Result<(), ConfigurationError> {
        let mut methods = self.methods.write().expect("method table lock poisoned");
        let entry = methods
            .get_mut(name)
            .ok_or_else(|| ConfigurationError::UnknownMethod(name.to_string()))?;

        if entry.deprecated {
            return Err(ConfigurationError::MethodAlreadyDeprecated(name.to_string()));
        }

        let original = Arc::clone(&entry.handler);
        let dispatcher = Arc::clone(&self.dispatcher);
        let method_name = name.to_string();

        entry.handler = Arc::new(move |args: &[Value]| {
            dispatcher.dispatch(DeprecationEvent::new(method_name.clone()));
            original(args)
        });
        entry.deprecated = true;

        self.dispatcher.metrics().record_declared();
        Ok(())
    }

    /// Invoke a registered operation.
    pub fn call(&self, name: &str, args: &[Value]) -> MethodResult {
        let handler = {
            let methods = self.methods.read().expect("method table lock poisoned");
            let entry = methods
                .get(name)
                .ok_or_else(|| ConfigurationError::UnknownMethod(name.to_string()))?;
            Arc::clone(&entry.handler)
        };

        handler(args)
    }

    /// Whether a name is currently declared deprecated.
    pub fn is_deprecated(&self, name: &str) -> bool {
        self.methods
            .read()
            .expect("method table lock poisoned")
            .get(name)
            .map(|entry| entry.deprecated)
            .unwrap_or(false)
    }
}

/// Wrap a statically typed unary function so each invocation dispatches a
/// deprecation notification before delegating.
pub fn deprecate_fn<A, R, F>(
    dispatcher: Arc<DeprecationDispatcher>,
    name: impl Into<String>,
    f: F,
) -> impl Fn(A) -> R
where
    F: Fn(A) -> R,
{
    let name = name.into();
    move |arg| {
        dispatcher.dispatch(DeprecationEvent::new(name.clone()));
        f(arg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DeprecationConfig;
    use crate::reporter::{NotifyError, Reporter};
    use crate::selector::FixedEnvironment;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    #[derive(Default)]
    struct CountingReporter(AtomicUsize);

    impl Reporter for CountingReporter {
        fn notify(&self, _event: &DeprecationEvent) -> Result<(), NotifyError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct FailingReporter;

    impl Reporter for FailingReporter {
        fn notify(&self, _event: &DeprecationEvent) -> Result<(), NotifyError> {
            Err(NotifyError::Delivery(anyhow::anyhow!("always down")))
        }
    }

    fn interceptor_with(reporter: Arc<dyn Reporter>) -> MethodInterceptor {
        let config = DeprecationConfig::builder()
            .reporter("test", reporter)
            .build()
            .unwrap();
        let dispatcher =
            DeprecationDispatcher::new(config, Arc::new(FixedEnvironment::new("test")));
        MethodInterceptor::new(Arc::new(dispatcher))
    }

    fn register_sum(interceptor: &MethodInterceptor) {
        interceptor.register("legacy_sum", |args| {
            let total: i64 = args.iter().filter_map(Value::as_i64).sum();
            Ok(json!(total))
        });
    }

    #[test]
    fn test_wrapping_preserves_return_value() {
        let interceptor = interceptor_with(Arc::new(CountingReporter::default()));
        register_sum(&interceptor);

        let args = [json!(2), json!(3), json!(5)];
        let before = interceptor.call("legacy_sum", &args).unwrap();

        interceptor.declare_deprecated("legacy_sum").unwrap();
        let after = interceptor.call("legacy_sum", &args).unwrap();

        assert_eq!(before, after);
        assert_eq!(after, json!(10));
    }

    #[test]
    fn test_wrapping_preserves_errors() {
        let interceptor = interceptor_with(Arc::new(CountingReporter::default()));
        interceptor.register("legacy_divide", |args| {
            let divisor = args.get(1).and_then(Value::as_i64).unwrap_or(0);
            if divisor == 0 {
                anyhow::bail!("division by zero");
            }
            let dividend = args.first().and_then(Value::as_i64).unwrap_or(0);
            Ok(json!(dividend / divisor))
        });
        interceptor.declare_deprecated("legacy_divide").unwrap();

        let err = interceptor
            .call("legacy_divide", &[json!(4), json!(0)])
            .unwrap_err();
        assert_eq!(err.to_string(), "division by zero");

        let ok = interceptor
            .call("legacy_divide", &[json!(4), json!(2)])
            .unwrap();
        assert_eq!(ok, json!(2));
    }

    #[test]
    fn test_declare_unknown_method_fails() {
        let interceptor = interceptor_with(Arc::new(CountingReporter::default()));
        let err = interceptor.declare_deprecated("missing").unwrap_err();
        assert!(matches!(err, ConfigurationError::UnknownMethod(ref n) if n == "missing"));
    }

    #[test]
    fn test_double_declaration_is_rejected() {
        let interceptor = interceptor_with(Arc::new(CountingReporter::default()));
        register_sum(&interceptor);

        interceptor.declare_deprecated("legacy_sum").unwrap();
        let err = interceptor.declare_deprecated("legacy_sum").unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::MethodAlreadyDeprecated(ref n) if n == "legacy_sum"
        ));
        assert!(interceptor.is_deprecated("legacy_sum"));
    }

    #[test]
    fn test_exactly_one_notification_per_call() {
        let reporter = Arc::new(CountingReporter::default());
        let interceptor = interceptor_with(Arc::clone(&reporter) as _);
        register_sum(&interceptor);
        interceptor.declare_deprecated("legacy_sum").unwrap();

        for _ in 0..7 {
            interceptor.call("legacy_sum", &[json!(1)]).unwrap();
        }

        assert_eq!(reporter.0.load(Ordering::SeqCst), 7);
    }

    #[test]
    fn test_concurrent_calls_notify_once_each() {
        let reporter = Arc::new(CountingReporter::default());
        let interceptor = Arc::new(interceptor_with(Arc::clone(&reporter) as _));
        register_sum(&interceptor);
        interceptor.declare_deprecated("legacy_sum").unwrap();

        let threads: usize = 8;
        let calls_per_thread: usize = 25;
        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let interceptor = Arc::clone(&interceptor);
                thread::spawn(move || {
                    for _ in 0..calls_per_thread {
                        let result = interceptor.call("legacy_sum", &[json!(1), json!(2)]).unwrap();
                        assert_eq!(result, json!(3));
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(
            reporter.0.load(Ordering::SeqCst),
            threads * calls_per_thread
        );
    }

    #[test]
    fn test_failing_reporter_never_changes_results() {
        let interceptor = interceptor_with(Arc::new(FailingReporter));
        register_sum(&interceptor);
        interceptor.declare_deprecated("legacy_sum").unwrap();

        for _ in 0..5 {
            let result = interceptor.call("legacy_sum", &[json!(20), json!(22)]).unwrap();
            assert_eq!(result, json!(42));
        }
    }

    #[test]
    fn test_call_unknown_method_fails() {
        let interceptor = interceptor_with(Arc::new(CountingReporter::default()));
        assert!(interceptor.call("missing", &[]).is_err());
    }

    #[test]
    fn test_deprecate_fn_is_transparent() {
        let reporter = Arc::new(CountingReporter::default());
        let config = DeprecationConfig::builder()
            .reporter("test", Arc::clone(&reporter) as _)
            .build()
            .unwrap();
        let dispatcher = Arc::new(DeprecationDispatcher::new(
            config,
            Arc::new(FixedEnvironment::new("test")),
        ));

        let double = deprecate_fn(dispatcher, "double", |x: i32| x * 2);

        assert_eq!(double(21), 42);
        assert_eq!(double(-3), -6);
        assert_eq!(reporter.0.load(Ordering::SeqCst), 2);
    }
}
