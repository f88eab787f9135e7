//! Deprecation Notifier - CLI Entry Point
//!
//! Validates reporter configurations, simulates deprecated calls so
//! operators can see what a notification looks like, and optionally serves
//! usage metrics. The binary only wires up log reporters; remote tracking
//! needs a host-supplied client and is a library concern.

use anyhow::Result;
use clap::Parser;
use deprecation_notifier::{
    DeprecationConfig, DeprecationDispatcher, DeprecationSettings, EnvVarEnvironment,
    EnvironmentProvider, FixedEnvironment, MethodInterceptor,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(
    name = "deprecation-notifier",
    about = "Deprecated-method call interception with pluggable reporting",
    version
)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "deprecation-notifier.yaml")]
    config: PathBuf,

    /// Environment to select the reporter for (defaults to $APP_ENV)
    #[arg(short, long)]
    environment: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'L', long, default_value = "info")]
    log_level: Level,

    /// Print default configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Validate configuration and exit
    #[arg(long)]
    validate: bool,

    /// Fire one synthetic deprecated call for the given method name
    #[arg(long, value_name = "METHOD")]
    simulate: Option<String>,

    /// Enable metrics server
    #[arg(long)]
    metrics: bool,

    /// Metrics server port
    #[arg(long, default_value = "9090")]
    metrics_port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(args.log_level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // Print default config if requested
    if args.print_config {
        let default_config = include_str!("../demos/default-config.yaml");
        println!("{}", default_config);
        return Ok(());
    }

    // Load configuration
    let settings = if args.config.exists() {
        info!(path = ?args.config, "Loading configuration");
        DeprecationSettings::from_file(&args.config)?
    } else if args.validate {
        anyhow::bail!("Configuration file not found: {:?}", args.config);
    } else {
        info!("Using default configuration");
        DeprecationSettings::default()
    };

    // Validate and exit if requested
    if args.validate {
        settings.validate()?;
        println!("Configuration is valid");
        return Ok(());
    }

    // Build the runtime config. No tracker client is wired up here, so a
    // `remote` reporter entry is rejected with a configuration error.
    let config = DeprecationConfig::from_settings(&settings, None)?;

    let environment: Arc<dyn EnvironmentProvider> = match args.environment {
        Some(name) => Arc::new(FixedEnvironment::new(name)),
        None => Arc::new(EnvVarEnvironment::new("APP_ENV")),
    };

    let dispatcher = Arc::new(DeprecationDispatcher::new(config, environment));

    // Start metrics server if enabled
    if args.metrics {
        let metrics = dispatcher.metrics().clone();
        let port = args.metrics_port;
        tokio::spawn(async move {
            start_metrics_server(metrics, port).await;
        });
    }

    // Fire a synthetic deprecated call so the active reporter's output can
    // be inspected
    if let Some(method) = &args.simulate {
        let interceptor = MethodInterceptor::new(Arc::clone(&dispatcher));
        interceptor.register(method.clone(), |_args| Ok(serde_json::Value::Null));
        interceptor.declare_deprecated(method)?;
        interceptor.call(method, &[])?;
        info!(method = %method, "simulated deprecated call dispatched");
    }

    if args.metrics {
        info!("Serving metrics until interrupted");
        tokio::signal::ctrl_c().await?;
    }

    Ok(())
}

async fn start_metrics_server(metrics: deprecation_notifier::metrics::DeprecationMetrics, port: u16) {
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpListener;

    let listener = match TcpListener::bind(format!("0.0.0.0:{}", port)).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!(error = %e, "Failed to start metrics server");
            return;
        }
    };

    info!(port = port, "Metrics server started");

    loop {
        match listener.accept().await {
            Ok((mut socket, _)) => {
                let output = metrics.encode();
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: text/plain; charset=utf-8\r\nContent-Length: {}\r\n\r\n{}",
                    output.len(),
                    output
                );
                let _ = socket.write_all(response.as_bytes()).await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to accept metrics connection");
            }
        }
    }
}
