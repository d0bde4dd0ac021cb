//! mmv-publish
//!
//! Config-driven demo publisher:
//! - loads `mmvkit.yaml` (or the path given as first argument)
//! - publishes tick, uptime and interval metrics into the region
//! - updates them on a fixed interval until SIGINT/SIGTERM, then withdraws

use std::time::{Duration, Instant};

use tracing_subscriber::{fmt, EnvFilter};

use mmvkit_core::{MetricSemantics, MetricType, Result, TimeUnit};
use mmvkit_registry::{config, Registry};

#[tokio::main]
async fn main() {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let path = std::env::args().nth(1).unwrap_or_else(|| "mmvkit.yaml".into());
    if let Err(e) = run(&path).await {
        tracing::error!(error = %e, code = e.code().as_str(), "mmv-publish failed");
        std::process::exit(1);
    }
}

async fn run(path: &str) -> Result<()> {
    let cfg = config::load_from_file(path)?;
    let interval_ms = cfg.publisher.update_interval_ms;

    let registry = Registry::new(cfg.registry.clone())?;
    let ticks = registry.new_counter(0, "publisher.ticks", &["update loop iterations"])?;
    let uptime = registry.new_singleton_metric(
        0u64,
        "publisher.uptime",
        MetricType::Uint64,
        MetricSemantics::Counter,
        TimeUnit::Second,
        &["seconds since the publisher started"],
    )?;
    registry.new_singleton_metric(
        interval_ms as u32,
        "publisher.interval",
        MetricType::Uint32,
        MetricSemantics::Instant,
        TimeUnit::Millisecond,
        &["configured update interval"],
    )?;

    registry.start()?;
    tracing::info!(path = ?registry.path(), interval_ms, "mmv-publish running");

    let started = Instant::now();
    let mut tick = tokio::time::interval(Duration::from_millis(interval_ms));
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = tick.tick() => {
                ticks.inc(1)?;
                uptime.set(started.elapsed().as_secs())?;
            }
            _ = &mut shutdown => break,
        }
    }

    registry.stop()
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("signal received, withdrawing region");
}
