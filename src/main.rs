//! redis-admin service
//!
//! # Architecture Overview
//!
//! ```text
//!     Inbound request ──▶ http (axum) ──▶ services (typed clients)
//!                                              │
//!                                              ▼
//!                         client executor: encode → breaker → transport → decode
//!                                              │
//!                                              ▼
//!                                        child services
//!
//!     Cross-cutting: config (+ hot reload), observability (logs, metrics,
//!     trace context), resilience (breakers, timeouts), lifecycle
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

use redis_admin::config::loader::load_config;
use redis_admin::config::watcher::{restart_required, ConfigWatcher};
use redis_admin::lifecycle::{bootstrap, signals, startup, Shutdown};
use redis_admin::observability::{logging, metrics, PrometheusMetrics};

#[derive(Parser)]
#[command(name = "redis-admin")]
#[command(about = "Admin service with resilient child-service calls", long_about = None)]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "config/app.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = load_config(&args.config)?;

    logging::init_logging(&config.observability)?;
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = ?args.config,
        "redis-admin starting"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let app = bootstrap(&config, Arc::new(PrometheusMetrics))?;

    // Hot reload: breakers, route timeouts and the breaker switch.
    let (watcher, mut updates) = ConfigWatcher::new(&args.config);
    let _watch_handle = match watcher.run() {
        Ok(handle) => Some(handle),
        Err(e) => {
            tracing::warn!(error = %e, "Config watcher unavailable, hot reload disabled");
            None
        }
    };
    let runtime = app.runtime.clone();
    let mut current = config.clone();
    tokio::spawn(async move {
        while let Some(next) = updates.recv().await {
            let fixed = restart_required(&current, &next);
            if !fixed.is_empty() {
                tracing::warn!(sections = ?fixed, "Config sections changed that only apply after restart");
            }
            runtime.apply_reload(&next);
            current = next;
        }
    });

    let shutdown = Arc::new(Shutdown::new());
    signals::spawn_signal_handler(shutdown.clone());

    let listener = startup::bind(&config.listener.bind_address).await?;
    app.server.run(listener, shutdown.wait()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
