use crate::metrics::{MetricKind, MetricSample};
use crate::sensor::{SensorDescriptor, SensorId};
use crate::sync::SyncOutcome;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Latest completed cycle plus counters, shared between the poll loop and the
/// HTTP handlers.
#[derive(Clone, Default)]
pub struct SharedSnapshot {
    inner: Arc<RwLock<SnapshotState>>,
}

#[derive(Default)]
struct SnapshotState {
    latest: Option<SyncOutcome>,
    cycles_ok: u64,
    cycles_failed: u64,
    last_error: Option<String>,
    last_error_at: Option<DateTime<Utc>>,
}

impl SharedSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the previous cycle's data wholesale.
    pub async fn record_success(&self, outcome: SyncOutcome) {
        let mut state = self.inner.write().await;
        state.latest = Some(outcome);
        state.cycles_ok += 1;
    }

    /// Keeps the previous snapshot; only the error is recorded.
    pub async fn record_failure(&self, error: String, at: DateTime<Utc>) {
        let mut state = self.inner.write().await;
        state.cycles_failed += 1;
        state.last_error = Some(error);
        state.last_error_at = Some(at);
    }
}

#[derive(Debug, Serialize)]
struct StatusResponse {
    cycles_ok: u64,
    cycles_failed: u64,
    last_synced_at: Option<DateTime<Utc>>,
    watermark: Option<DateTime<Utc>>,
    last_error: Option<String>,
    last_error_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
struct SensorsResponse {
    synced_at: DateTime<Utc>,
    watermark: DateTime<Utc>,
    kinds: Vec<MetricKind>,
    sensors: Vec<SensorView>,
}

#[derive(Debug, Serialize)]
struct SensorView {
    id: SensorId,
    name: String,
    tag_type: i32,
    out_of_range: bool,
    last_comm: DateTime<Utc>,
    labels: BTreeMap<String, String>,
    capabilities: Vec<MetricKind>,
    bucket_count: usize,
    sample_count: usize,
    first_timestamp: Option<i64>,
    last_timestamp: Option<i64>,
    buckets: Vec<BucketView>,
}

#[derive(Debug, Serialize)]
struct BucketView {
    timestamp: i64,
    samples: Vec<MetricSample>,
}

impl From<&SensorDescriptor> for SensorView {
    fn from(sensor: &SensorDescriptor) -> Self {
        Self {
            id: sensor.id,
            name: sensor.name.clone(),
            tag_type: sensor.tag_type,
            out_of_range: sensor.out_of_range,
            last_comm: sensor.last_comm,
            labels: sensor.labels(),
            capabilities: sensor.capabilities(),
            bucket_count: sensor.metrics.len(),
            sample_count: sensor.metrics.sample_count(),
            first_timestamp: sensor.metrics.first_timestamp(),
            last_timestamp: sensor.metrics.last_timestamp(),
            buckets: sensor
                .metrics
                .iter()
                .map(|(timestamp, samples)| BucketView {
                    timestamp,
                    samples: samples.to_vec(),
                })
                .collect(),
        }
    }
}

async fn healthz() -> &'static str {
    "ok"
}

async fn get_status(State(snapshot): State<SharedSnapshot>) -> Json<StatusResponse> {
    let state = snapshot.inner.read().await;
    Json(StatusResponse {
        cycles_ok: state.cycles_ok,
        cycles_failed: state.cycles_failed,
        last_synced_at: state.latest.as_ref().map(|outcome| outcome.started_at),
        watermark: state.latest.as_ref().map(|outcome| outcome.watermark),
        last_error: state.last_error.clone(),
        last_error_at: state.last_error_at,
    })
}

async fn get_sensors(
    State(snapshot): State<SharedSnapshot>,
) -> Result<Json<SensorsResponse>, (StatusCode, String)> {
    let state = snapshot.inner.read().await;
    let outcome = state.latest.as_ref().ok_or_else(|| {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            "no successful sync yet".to_string(),
        )
    })?;
    Ok(Json(SensorsResponse {
        synced_at: outcome.started_at,
        watermark: outcome.watermark,
        kinds: outcome.kinds.clone(),
        sensors: outcome.sensors.iter().map(SensorView::from).collect(),
    }))
}

pub fn router(snapshot: SharedSnapshot) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/v1/status", get(get_status))
        .route("/v1/sensors", get(get_sensors))
        .with_state(snapshot)
}
