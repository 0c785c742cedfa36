mod config;
mod epoch;
mod error;
mod http;
mod metrics;
mod sensor;
mod sync;
mod wirelesstag;

use crate::config::Config;
use crate::http::SharedSnapshot;
use crate::wirelesstag::WirelessTagClient;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tokio::time::MissedTickBehavior;

const SERVICE_NAME: &str = "tag-sync";

/// Console logging filtered by `RUST_LOG`, plus span export when an OTLP
/// endpoint is configured.
fn init_tracing(config: &Config) -> Result<()> {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tag_sync=info".into());
    let otel_layer = match config.otlp_endpoint.as_deref().and_then(otlp_traces_url) {
        Some(url) => Some(tracing_opentelemetry::layer().with_tracer(otlp_tracer(url)?)),
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .with(otel_layer)
        .try_init()?;
    Ok(())
}

fn otlp_tracer(url: String) -> Result<opentelemetry_sdk::trace::Tracer> {
    use opentelemetry::KeyValue;
    use opentelemetry_otlp::WithExportConfig;
    use opentelemetry_sdk::{runtime::Tokio, trace, Resource};

    let resource = Resource::new(vec![KeyValue::new("service.name", SERVICE_NAME)]);
    opentelemetry_otlp::new_pipeline()
        .tracing()
        .with_exporter(opentelemetry_otlp::new_exporter().http().with_endpoint(url))
        .with_trace_config(trace::Config::default().with_resource(resource))
        .install_batch(Tokio)
        .context("failed to install OTLP trace pipeline")
}

/// HTTP exporters want the full signal path. Blank input disables export.
fn otlp_traces_url(endpoint: &str) -> Option<String> {
    let trimmed = endpoint.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.contains("/v1/traces") {
        return Some(trimmed.to_string());
    }
    Some(format!("{}/v1/traces", trimmed.trim_end_matches('/')))
}

/// Runs sync cycles forever. `since` only advances after a successful cycle,
/// so a failed cycle's window is covered by the next one.
async fn run_sync_loop(
    config: Config,
    client: WirelessTagClient,
    snapshot: SharedSnapshot,
) -> Result<()> {
    let mut since: DateTime<Utc> = Utc::now()
        .checked_sub_signed(config.initial_lookback())
        .unwrap_or(DateTime::<Utc>::MIN_UTC);

    let mut ticker = tokio::time::interval(config.poll_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        let started_at = Utc::now();
        match sync::run_cycle(&client, since, started_at).await {
            Ok(outcome) => {
                let kinds: Vec<&str> = outcome.kinds.iter().map(|k| k.display_name()).collect();
                tracing::info!(
                    requested_since = %outcome.requested_since,
                    watermark = %outcome.watermark,
                    sensors = outcome.sensors.len(),
                    sensors_with_data = outcome
                        .sensors
                        .iter()
                        .filter(|sensor| !sensor.metrics.is_empty())
                        .count(),
                    kinds = ?kinds,
                    samples = outcome.samples_merged,
                    "tag sync cycle complete"
                );
                since = outcome.started_at;
                snapshot.record_success(outcome).await;
            }
            Err(err) => {
                tracing::warn!(error = %err, since = %since, "tag sync cycle failed");
                snapshot.record_failure(err.to_string(), started_at).await;
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;
    init_tracing(&config)?;

    let client = WirelessTagClient::new(config.client_options()?)?;
    let snapshot = SharedSnapshot::new();

    let app = http::router(snapshot.clone());
    let listener = tokio::net::TcpListener::bind(&config.http_bind)
        .await
        .with_context(|| format!("failed to bind {}", config.http_bind))?;
    tracing::info!(
        bind = %config.http_bind,
        api = %config.api_url,
        timezone = %config.timezone,
        "tag-sync listening"
    );
    let http_handle = tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });

    let sync_config = config.clone();
    let sync_handle = tokio::spawn(async move {
        if let Err(err) = run_sync_loop(sync_config, client, snapshot).await {
            tracing::error!(error = %err, "sync loop exited");
        }
    });

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received");
        }
        _ = sync_handle => {}
        _ = http_handle => {}
    }

    Ok(())
}
