use crate::epoch::filetime_to_utc;
use crate::error::{SyncError, SyncResult};
use crate::metrics::MetricsCollection;
use crate::sensor::{SensorDescriptor, SensorId};
use serde::ser::SerializeSeq;
use serde::{Deserialize, Serialize, Serializer};

/// Body of `GetMultiTagStatsRaw`.
#[derive(Debug, Clone, Serialize)]
pub struct StatsRequest {
    #[serde(serialize_with = "serialize_ids")]
    pub ids: Vec<SensorId>,
    #[serde(rename = "type")]
    pub kind: &'static str,
    #[serde(rename = "fromDate")]
    pub from_date: String,
    #[serde(rename = "toDate")]
    pub to_date: String,
}

/// Writes tag ids as a plain JSON number array, one element per id.
fn serialize_ids<S: Serializer>(ids: &[SensorId], serializer: S) -> Result<S::Ok, S::Error> {
    let mut seq = serializer.serialize_seq(Some(ids.len()))?;
    for id in ids {
        seq.serialize_element(&u64::from(*id))?;
    }
    seq.end()
}

pub fn encode_stats_request(request: &StatsRequest) -> SyncResult<Vec<u8>> {
    serde_json::to_vec(request)
        .map_err(|err| SyncError::decode(format!("failed to encode stats request: {err}")))
}

#[derive(Debug, Deserialize)]
pub struct StatsEnvelope {
    pub d: StatsPayload,
}

#[derive(Debug, Default, Deserialize)]
pub struct StatsPayload {
    #[serde(default)]
    pub stats: Vec<StatGroup>,
}

/// One calendar day of samples for a set of tags.
#[derive(Debug, Clone, Deserialize)]
pub struct StatGroup {
    pub date: String,
    #[serde(default)]
    pub ids: Vec<SensorId>,
    #[serde(default)]
    pub values: Vec<Vec<f32>>,
    #[serde(default)]
    pub tods: Vec<Vec<u32>>,
}

impl StatGroup {
    /// Checks the per-id arrays line up: one `values` and one `tods` row per
    /// id, and equal row lengths.
    pub fn validate(&self) -> SyncResult<()> {
        if self.ids.len() != self.values.len() || self.ids.len() != self.tods.len() {
            return Err(SyncError::decode(format!(
                "stat group {} has {} ids but {} value rows and {} tod rows",
                self.date,
                self.ids.len(),
                self.values.len(),
                self.tods.len()
            )));
        }
        for (idx, (values, tods)) in self.values.iter().zip(&self.tods).enumerate() {
            if values.len() != tods.len() {
                return Err(SyncError::decode(format!(
                    "stat group {} id {} has {} values but {} tods",
                    self.date,
                    self.ids[idx],
                    values.len(),
                    tods.len()
                )));
            }
        }
        Ok(())
    }

    pub fn sample_count(&self) -> usize {
        self.tods.iter().map(Vec::len).sum()
    }
}

/// Decoded `GetMultiTagStatsRaw` response.
#[derive(Debug, Clone, Default)]
pub struct BatchResponse {
    pub stats: Vec<StatGroup>,
}

impl BatchResponse {
    pub fn decode(body: &[u8]) -> SyncResult<Self> {
        let envelope: StatsEnvelope = serde_json::from_slice(body)
            .map_err(|err| SyncError::decode(format!("invalid stats response: {err}")))?;
        for group in &envelope.d.stats {
            group.validate()?;
        }
        Ok(Self {
            stats: envelope.d.stats,
        })
    }
}

/// Error body returned with non-200 statuses. Only the message is surfaced.
#[derive(Debug, Deserialize)]
pub struct RemoteFault {
    #[serde(rename = "Message")]
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct TagListEnvelope {
    #[serde(default)]
    pub d: Vec<RawTag>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTag {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub out_of_range: bool,
    pub slave_id: SensorId,
    #[serde(default)]
    pub tag_type: i32,
    #[serde(default)]
    pub last_comm: i64,
}

impl From<RawTag> for SensorDescriptor {
    fn from(raw: RawTag) -> Self {
        SensorDescriptor {
            id: raw.slave_id,
            name: raw.name,
            comment: raw.comment.unwrap_or_default(),
            tag_type: raw.tag_type,
            last_comm: filetime_to_utc(raw.last_comm),
            out_of_range: raw.out_of_range,
            metrics: MetricsCollection::new(),
        }
    }
}

pub fn decode_tag_list(body: &[u8]) -> SyncResult<Vec<SensorDescriptor>> {
    let envelope: TagListEnvelope = serde_json::from_slice(body)
        .map_err(|err| SyncError::decode(format!("invalid tag list response: {err}")))?;
    Ok(envelope.d.into_iter().map(SensorDescriptor::from).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value as JsonValue};

    #[test]
    fn stats_request_ids_are_a_number_array() {
        let request = StatsRequest {
            ids: vec![3, 1, 255],
            kind: "temperature",
            from_date: "10/15/2017".to_string(),
            to_date: "10/16/2017".to_string(),
        };
        let body = encode_stats_request(&request).expect("encode");
        let value: JsonValue = serde_json::from_slice(&body).expect("json");
        assert_eq!(
            value,
            json!({
                "ids": [3, 1, 255],
                "type": "temperature",
                "fromDate": "10/15/2017",
                "toDate": "10/16/2017",
            })
        );
        let text = String::from_utf8(body).expect("utf8");
        assert!(text.starts_with(r#"{"ids":[3,1,255],"#));
    }

    #[test]
    fn decodes_stat_groups() {
        let body = br#"{"d": {"stats": [{"date": "10/15/2017", "ids": [1, 3],
            "values": [[20.5, 21.0], [18.25]], "tods": [[60, 120], [60]]}],
            "temp_unit": 0, "ids": [1, 3], "names": ["a", "b"]}}"#;
        let response = BatchResponse::decode(body).expect("decode");
        assert_eq!(response.stats.len(), 1);
        assert_eq!(response.stats[0].ids, vec![1, 3]);
        assert_eq!(response.stats[0].sample_count(), 3);
    }

    #[test]
    fn id_and_values_length_mismatch_is_a_decode_error() {
        let body = br#"{"d": {"stats": [{"date": "10/15/2017", "ids": [1, 3],
            "values": [[20.5]], "tods": [[60], [60]]}]}}"#;
        let err = BatchResponse::decode(body).unwrap_err();
        assert!(matches!(err, SyncError::Decode(_)), "{err}");
    }

    #[test]
    fn row_length_mismatch_is_a_decode_error() {
        let body = br#"{"d": {"stats": [{"date": "10/15/2017", "ids": [1],
            "values": [[20.5, 1.0]], "tods": [[60]]}]}}"#;
        let err = BatchResponse::decode(body).unwrap_err();
        assert!(matches!(err, SyncError::Decode(_)), "{err}");
    }

    #[test]
    fn missing_envelope_is_a_decode_error() {
        let err = BatchResponse::decode(br#"{"stats": []}"#).unwrap_err();
        assert!(matches!(err, SyncError::Decode(_)));
    }

    #[test]
    fn decodes_tag_list_into_descriptors() {
        let body = br#"{"d": [{"__type": "MyTagList.Tag", "name": "Bath",
            "comment": "location=bath", "outOfRange": true, "slaveId": 5,
            "tagType": 13, "lastComm": 131557748239379584, "temperature": 20.1}]}"#;
        let sensors = decode_tag_list(body).expect("decode");
        assert_eq!(sensors.len(), 1);
        let sensor = &sensors[0];
        assert_eq!(sensor.id, 5);
        assert_eq!(sensor.tag_type, 13);
        assert!(sensor.out_of_range);
        assert_eq!(sensor.last_comm.timestamp_millis(), 1_511_301_223_937);
        assert!(sensor.metrics.is_empty());
    }

    #[test]
    fn remote_fault_keeps_only_the_message() {
        let body = br#"{"Message": "Tag manager is offline",
            "ExceptionType": "System.Exception", "StackTrace": "   at MyTagList"}"#;
        let fault: RemoteFault = serde_json::from_slice(body).expect("fault");
        assert_eq!(fault.message, "Tag manager is offline");

        assert!(serde_json::from_slice::<RemoteFault>(b"<html>bad gateway</html>").is_err());
        assert!(serde_json::from_slice::<RemoteFault>(br#"{"ExceptionType": "x"}"#).is_err());
    }
}
