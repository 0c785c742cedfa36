use serde::Serialize;
use std::collections::BTreeMap;

/// Metric series the remote service can return for a tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    Temperature,
    Humidity,
    Light,
    Motion,
    Battery,
    Signal,
}

impl MetricKind {
    pub const ALL: [MetricKind; 6] = [
        MetricKind::Temperature,
        MetricKind::Humidity,
        MetricKind::Light,
        MetricKind::Motion,
        MetricKind::Battery,
        MetricKind::Signal,
    ];

    /// Value of the `type` field in stats requests.
    pub fn wire_name(self) -> &'static str {
        match self {
            MetricKind::Temperature => "temperature",
            MetricKind::Light => "light",
            MetricKind::Humidity => "cap",
            MetricKind::Motion => "motion",
            MetricKind::Battery => "batteryVolt",
            MetricKind::Signal => "signal",
        }
    }

    /// Name exposed to consumers of the synced data.
    pub fn display_name(self) -> &'static str {
        match self {
            MetricKind::Temperature => "temperature",
            MetricKind::Light => "lux",
            MetricKind::Humidity => "humidity",
            MetricKind::Motion => "motion",
            MetricKind::Battery => "battery",
            MetricKind::Signal => "signal",
        }
    }
}

impl Serialize for MetricKind {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.display_name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricSample {
    pub kind: MetricKind,
    pub value: f32,
}

impl MetricSample {
    fn same_reading(&self, other: &MetricSample) -> bool {
        self.kind == other.kind && self.value.to_bits() == other.value.to_bits()
    }
}

/// Samples for one sensor bucketed by Unix second. Buckets iterate in
/// timestamp order; samples inside a bucket keep their merge order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricsCollection {
    buckets: BTreeMap<i64, Vec<MetricSample>>,
}

impl MetricsCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `sample` to the bucket at `timestamp`. A reading already present
    /// in that bucket (same kind, bit-identical value) is not appended again.
    /// Returns whether the bucket changed.
    pub fn insert(&mut self, timestamp: i64, sample: MetricSample) -> bool {
        let bucket = self.buckets.entry(timestamp).or_default();
        if bucket.iter().any(|existing| existing.same_reading(&sample)) {
            return false;
        }
        bucket.push(sample);
        true
    }

    #[cfg(test)]
    pub fn get(&self, timestamp: i64) -> Option<&[MetricSample]> {
        self.buckets.get(&timestamp).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (i64, &[MetricSample])> + '_ {
        self.buckets
            .iter()
            .map(|(timestamp, samples)| (*timestamp, samples.as_slice()))
    }

    /// Number of distinct timestamps.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn sample_count(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    pub fn first_timestamp(&self) -> Option<i64> {
        self.buckets.keys().next().copied()
    }

    pub fn last_timestamp(&self) -> Option<i64> {
        self.buckets.keys().next_back().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn wire_and_display_names_are_distinct_per_kind() {
        let wire: HashSet<_> = MetricKind::ALL.iter().map(|k| k.wire_name()).collect();
        let display: HashSet<_> = MetricKind::ALL.iter().map(|k| k.display_name()).collect();
        assert_eq!(wire.len(), MetricKind::ALL.len());
        assert_eq!(display.len(), MetricKind::ALL.len());
        assert_eq!(MetricKind::Humidity.wire_name(), "cap");
        assert_eq!(MetricKind::Light.display_name(), "lux");
        assert_eq!(MetricKind::Battery.wire_name(), "batteryVolt");
    }

    #[test]
    fn kinds_at_same_timestamp_share_a_bucket() {
        let mut collection = MetricsCollection::new();
        assert!(collection.insert(
            100,
            MetricSample {
                kind: MetricKind::Temperature,
                value: 21.5,
            },
        ));
        assert!(collection.insert(
            100,
            MetricSample {
                kind: MetricKind::Humidity,
                value: 48.0,
            },
        ));
        assert_eq!(collection.len(), 1);
        let bucket = collection.get(100).expect("bucket");
        assert_eq!(bucket.len(), 2);
        assert_eq!(bucket[0].kind, MetricKind::Temperature);
        assert_eq!(bucket[1].kind, MetricKind::Humidity);
    }

    #[test]
    fn repeated_reading_is_not_duplicated() {
        let mut collection = MetricsCollection::new();
        let sample = MetricSample {
            kind: MetricKind::Temperature,
            value: 19.25,
        };
        assert!(collection.insert(5, sample));
        assert!(!collection.insert(5, sample));
        assert!(collection.insert(
            5,
            MetricSample {
                kind: MetricKind::Temperature,
                value: 19.5,
            },
        ));
        assert_eq!(collection.sample_count(), 2);
    }

    #[test]
    fn buckets_iterate_in_timestamp_order() {
        let mut collection = MetricsCollection::new();
        for ts in [30, 10, 20] {
            collection.insert(
                ts,
                MetricSample {
                    kind: MetricKind::Light,
                    value: ts as f32,
                },
            );
        }
        let keys: Vec<i64> = collection.iter().map(|(ts, _)| ts).collect();
        assert_eq!(keys, vec![10, 20, 30]);
        assert_eq!(collection.first_timestamp(), Some(10));
        assert_eq!(collection.last_timestamp(), Some(30));
    }
}
