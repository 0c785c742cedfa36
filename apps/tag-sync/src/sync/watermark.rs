use crate::sensor::SensorDescriptor;
use chrono::{DateTime, Utc};

/// Lowers `requested` to the oldest last-communication instant among tags that
/// are in range, so readings a tag uploaded late are still requested.
/// Out-of-range tags carry a stale `last_comm` and are ignored.
pub fn adjust_watermark(requested: DateTime<Utc>, sensors: &[SensorDescriptor]) -> DateTime<Utc> {
    sensors
        .iter()
        .filter(|sensor| !sensor.out_of_range)
        .map(|sensor| sensor.last_comm)
        .fold(requested, |watermark, last_comm| watermark.min(last_comm))
}
