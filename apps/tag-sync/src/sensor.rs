use crate::metrics::{MetricKind, MetricsCollection};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Tag identifier on the remote service ("slaveId").
pub type SensorId = u8;

const NO_TEMPERATURE_TAG_TYPES: &[i32] = &[82, 92];
const HUMIDITY_TAG_TYPES: &[i32] = &[13, 21, 26, 52, 72];
const LIGHT_TAG_TYPES: &[i32] = &[26];

/// Kinds fetched as stat series, in the order their samples land in a bucket.
pub const STAT_KINDS: [MetricKind; 3] = [
    MetricKind::Temperature,
    MetricKind::Humidity,
    MetricKind::Light,
];

#[derive(Debug, Clone)]
pub struct SensorDescriptor {
    pub id: SensorId,
    pub name: String,
    pub comment: String,
    pub tag_type: i32,
    pub last_comm: DateTime<Utc>,
    /// The tag is currently unreachable; `last_comm` is stale.
    pub out_of_range: bool,
    pub metrics: MetricsCollection,
}

impl SensorDescriptor {
    pub fn capabilities(&self) -> Vec<MetricKind> {
        capabilities(self.tag_type)
    }

    /// `name` and `id` plus any `key=value` pairs from the comment field
    /// (comma separated, surrounding spaces ignored).
    pub fn labels(&self) -> BTreeMap<String, String> {
        let mut labels = BTreeMap::new();
        labels.insert("name".to_string(), self.name.clone());
        labels.insert("id".to_string(), self.id.to_string());
        for (key, value) in parse_comment_labels(&self.comment) {
            labels.insert(key, value);
        }
        labels
    }
}

/// Metric kinds a tag type reports as stat series.
/// Unknown codes still get temperature. Motion, battery and signal are never
/// declared here.
pub fn capabilities(tag_type: i32) -> Vec<MetricKind> {
    MetricKind::ALL
        .into_iter()
        .filter(|kind| supports(tag_type, *kind))
        .collect()
}

fn supports(tag_type: i32, kind: MetricKind) -> bool {
    match kind {
        MetricKind::Temperature => !NO_TEMPERATURE_TAG_TYPES.contains(&tag_type),
        MetricKind::Humidity => HUMIDITY_TAG_TYPES.contains(&tag_type),
        MetricKind::Light => LIGHT_TAG_TYPES.contains(&tag_type),
        MetricKind::Motion | MetricKind::Battery | MetricKind::Signal => false,
    }
}

fn parse_comment_labels(comment: &str) -> Vec<(String, String)> {
    comment
        .split(',')
        .filter_map(|pair| {
            let parts: Vec<&str> = pair.split('=').collect();
            if parts.len() != 2 {
                return None;
            }
            let key = parts[0].trim_matches(' ');
            if key.is_empty() {
                return None;
            }
            Some((key.to_string(), parts[1].trim_matches(' ').to_string()))
        })
        .collect()
}

#[cfg(test)]
pub(crate) fn test_sensor(id: SensorId, tag_type: i32, last_comm: DateTime<Utc>) -> SensorDescriptor {
    SensorDescriptor {
        id,
        name: format!("tag {id}"),
        comment: String::new(),
        tag_type,
        last_comm,
        out_of_range: false,
        metrics: MetricsCollection::new(),
    }
}
