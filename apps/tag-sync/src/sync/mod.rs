mod merge;
mod partition;
mod watermark;


pub use merge::{merge_batch, CycleMetrics};
pub use partition::partition_by_kind;
pub use watermark::adjust_watermark;

use crate::error::{SyncError, SyncResult};
use crate::metrics::MetricKind;
use crate::sensor::SensorDescriptor;
use crate::wirelesstag::{StatGroup, WirelessTagClient};
use chrono::{DateTime, Utc};
use futures::future::try_join_all;

/// Result of one full catalog refresh.
#[derive(Debug, Clone)]
pub struct SyncOutcome {
    pub sensors: Vec<SensorDescriptor>,
    pub requested_since: DateTime<Utc>,
    pub watermark: DateTime<Utc>,
    pub started_at: DateTime<Utc>,
    pub kinds: Vec<MetricKind>,
    pub samples_merged: usize,
}

/// Runs one sync cycle: catalog, watermark, per-kind batched stats, merge.
///
/// The per-kind requests run concurrently; the first failure aborts the cycle
/// and drops the remaining requests. Responses are merged temperature, then
/// humidity, then light, once all of them have arrived.
pub async fn run_cycle(
    client: &WirelessTagClient,
    since: DateTime<Utc>,
    now: DateTime<Utc>,
) -> SyncResult<SyncOutcome> {
    let mut sensors = client.list_sensors().await?;
    let watermark = adjust_watermark(since, &sensors);
    let groups = partition_by_kind(&sensors);

    tracing::debug!(
        sensors = sensors.len(),
        requested_since = %since,
        watermark = %watermark,
        "tag catalog loaded"
    );

    let requests = groups.iter().map(|(kind, ids)| async move {
        let response = client.fetch_stats(ids, *kind, watermark, now).await?;
        tracing::debug!(
            kind = kind.display_name(),
            groups = response.stats.len(),
            samples = response.stats.iter().map(StatGroup::sample_count).sum::<usize>(),
            "tag stats received"
        );
        Ok::<_, SyncError>((*kind, response))
    });
    let responses = try_join_all(requests).await?;

    let mut results = CycleMetrics::new();
    let mut samples_merged = 0usize;
    for (kind, response) in &responses {
        samples_merged += merge_batch(response, *kind, watermark, client.timezone(), &mut results)?;
    }

    for sensor in &mut sensors {
        sensor.metrics = results.remove(&sensor.id).unwrap_or_default();
    }

    Ok(SyncOutcome {
        sensors,
        requested_since: since,
        watermark,
        started_at: now,
        kinds: groups.iter().map(|(kind, _)| *kind).collect(),
        samples_merged,
    })
}
