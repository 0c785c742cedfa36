use crate::error::{SyncError, SyncResult};
use crate::metrics::{MetricKind, MetricSample, MetricsCollection};
use crate::sensor::SensorId;
use crate::wirelesstag::{day_start, parse_wire_date, BatchResponse};
use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use std::collections::HashMap;

/// Per-cycle results keyed by tag id.
pub type CycleMetrics = HashMap<SensorId, MetricsCollection>;

/// Expands each stat group's day + time-of-day offsets into absolute instants
/// and appends the samples at or after `since` into `out`.
///
/// Every group is checked before anything is written, so a malformed response
/// leaves `out` untouched. Returns the number of samples added.
pub fn merge_batch(
    response: &BatchResponse,
    kind: MetricKind,
    since: DateTime<Utc>,
    tz: Tz,
    out: &mut CycleMetrics,
) -> SyncResult<usize> {
    let mut instants = Vec::with_capacity(response.stats.len());
    for group in &response.stats {
        group.validate()?;
        let date = parse_wire_date(&group.date)
            .ok_or_else(|| SyncError::decode(format!("can't parse start date {}", group.date)))?;
        let start = day_start(date, tz).ok_or_else(|| {
            SyncError::decode(format!("no local midnight for {} in {}", group.date, tz))
        })?;
        let mut rows = Vec::with_capacity(group.tods.len());
        for tods in &group.tods {
            let row = tods
                .iter()
                .map(|tod| {
                    start
                        .checked_add_signed(Duration::seconds(i64::from(*tod)))
                        .ok_or_else(|| {
                            SyncError::decode(format!(
                                "offset {tod}s is out of range for {}",
                                group.date
                            ))
                        })
                })
                .collect::<SyncResult<Vec<_>>>()?;
            rows.push(row);
        }
        instants.push(rows);
    }

    let mut added = 0usize;
    for (group, rows) in response.stats.iter().zip(instants) {
        for ((id, values), timestamps) in group.ids.iter().zip(&group.values).zip(rows) {
            for (value, timestamp) in values.iter().zip(timestamps) {
                if timestamp < since {
                    continue;
                }
                let sample = MetricSample {
                    kind,
                    value: *value,
                };
                if out.entry(*id).or_default().insert(timestamp.timestamp(), sample) {
                    added += 1;
                }
            }
        }
    }
    Ok(added)
}
