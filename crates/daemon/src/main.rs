//! Waitline Display - Main Entry Point
//! Runs one live queue surface per configured audience

mod config;
mod telemetry;

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use config::DaemonConfig;
use waitline_core::application::{LinkFreshness, SurfacePorts, SurfaceRegistry, SurfaceView};
use waitline_core::port::id_provider::UuidProvider;
use waitline_core::port::time_provider::SystemTimeProvider;
use waitline_core::port::{QueueApi, TimeProvider};
use waitline_infra_feed::http_api::DEFAULT_REQUEST_TIMEOUT;
use waitline_infra_feed::{HttpQueueApi, WsFeedChannel, WsFeedConfig};
use waitline_infra_system::SubprocessSpeechEngine;

const VERSION: &str = env!("CARGO_PKG_VERSION");
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Logging (JSON in production, pretty for development), plus
    //    OTLP export when configured. One subscriber carries every layer.
    let log_format = std::env::var("WAITLINE_LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("waitline=info"))
        .context("Failed to create env filter")?;

    let (export_layer, export_outcome) = match telemetry::export_layer() {
        Ok(Some((layer, target))) => (Some(layer), Ok(Some(target))),
        Ok(None) => (None, Ok(None)),
        Err(e) => (None, Err(e)),
    };

    let fmt_layer = match log_format.as_str() {
        "json" => fmt::layer().json().boxed(),
        _ => fmt::layer().pretty().boxed(),
    };

    tracing_subscriber::registry()
        .with(export_layer)
        .with(env_filter)
        .with(fmt_layer)
        .init();

    info!("Waitline Display v{} starting...", VERSION);

    match export_outcome {
        Ok(Some(target)) => info!(
            endpoint = %target.endpoint,
            service_name = %target.service_name,
            "OpenTelemetry export enabled"
        ),
        Ok(None) => debug!(
            "OpenTelemetry not configured ({} not set)",
            telemetry::ENDPOINT_VAR
        ),
        Err(e) => warn!(error = ?e, "Failed to initialize OpenTelemetry (continuing without it)"),
    }

    // 2. Configuration
    let config = DaemonConfig::from_env()?;
    info!(
        server_url = %config.server_url,
        feed_url = %config.feed_url,
        surfaces = config.surfaces.len(),
        locale = config.locale.tag(),
        "Configuration loaded"
    );

    // 3. Shared adapters (the speech binary is probed once)
    let api: Arc<dyn QueueApi> = Arc::new(
        HttpQueueApi::new(config.server_url.as_str(), DEFAULT_REQUEST_TIMEOUT)
            .context("HTTP client creation failed")?,
    );
    let time: Arc<dyn TimeProvider> = Arc::new(SystemTimeProvider);
    let speech = SubprocessSpeechEngine::detect(config.tts_binary.as_deref()).await;

    // 4. One surface per audience, each with its own channel and engine
    let mut registry = SurfaceRegistry::new(Arc::new(UuidProvider));
    for profile in config.surfaces.iter().cloned() {
        let channel = WsFeedChannel::connect(WsFeedConfig::new(config.feed_url.as_str()));
        let ports = SurfacePorts {
            channel: Box::new(channel),
            speech: Arc::new(speech.fork()),
            api: Arc::clone(&api),
            time: Arc::clone(&time),
        };
        let id = registry.subscribe(profile, ports);
        tokio::spawn(log_view_changes(registry.watch(&id)?));
    }

    info!(surfaces = ?registry.ids(), "Displays running");
    info!("Press Ctrl+C to shutdown");

    // 5. Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received. Stopping displays...");

    if tokio::time::timeout(SHUTDOWN_TIMEOUT, registry.shutdown_all())
        .await
        .is_err()
    {
        warn!("Displays did not stop in time");
    }

    telemetry::shutdown();
    info!("Shutdown complete.");
    Ok(())
}

/// Log a line whenever what a display shows changes
async fn log_view_changes(mut views: watch::Receiver<SurfaceView>) {
    let mut last: Option<SurfaceView> = None;

    while views.changed().await.is_ok() {
        let view = views.borrow_and_update().clone();
        let unchanged = last.as_ref().is_some_and(|prev| {
            prev.queue == view.queue
                && prev.link == view.link
                && prev.served_today == view.served_today
        });
        if unchanged {
            continue;
        }

        let current = view.queue.current.as_ref().map(|e| e.token_number);
        if view.link == LinkFreshness::Stale {
            warn!(
                surface = %view.surface,
                kind = %view.kind,
                current = ?current,
                "Feed down, showing last known queue"
            );
        } else {
            info!(
                surface = %view.surface,
                kind = %view.kind,
                scope = %view.scope,
                current = ?current,
                waiting = view.queue.waiting_count,
                served = view.queue.served_count,
                served_today = ?view.served_today,
                "Display updated"
            );
        }
        last = Some(view);
    }
}
