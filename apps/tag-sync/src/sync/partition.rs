use crate::metrics::MetricKind;
use crate::sensor::{SensorDescriptor, SensorId, STAT_KINDS};

/// Groups tag ids by the metric kinds their tag type supports, in
/// `STAT_KINDS` order. Kinds with no members are absent, so no request is
/// issued for them.
pub fn partition_by_kind(sensors: &[SensorDescriptor]) -> Vec<(MetricKind, Vec<SensorId>)> {
    STAT_KINDS
        .into_iter()
        .map(|kind| {
            let ids: Vec<SensorId> = sensors
                .iter()
                .filter(|sensor| sensor.capabilities().contains(&kind))
                .map(|sensor| sensor.id)
                .collect();
            (kind, ids)
        })
        .filter(|(_, ids)| !ids.is_empty())
        .collect()
}
