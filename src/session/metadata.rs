use crate::env::meta;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Everything stored under the `live_recording` metadata key.
///
/// Unknown keys are kept in `extra` at every level so a typed read never
/// drops fields written by the recorder.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveRecordingMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fabric_config: Option<FabricNodeConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recording_config: Option<RecordingConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recordings: Option<Recordings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<PersistedStatus>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `live_recording.fabric_config`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FabricNodeConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ingress_node_api: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ingress_node_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edge_write_token: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FabricNodeConfig {
    /// Ingress node API from metadata, else `fallback`
    pub fn node_api<'a>(&'a self, fallback: Option<&'a str>) -> Option<&'a str> {
        self.ingress_node_api
            .as_deref()
            .filter(|api| !api.trim().is_empty())
            .or(fallback)
    }

    pub fn edge_write_token(&self) -> Option<&str> {
        self.edge_write_token
            .as_deref()
            .filter(|token| !token.trim().is_empty())
    }
}

/// `live_recording.recording_config`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordingConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recording_params: Option<RecordingParams>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `live_recording.recording_config.recording_params`; transcoding
/// (`xc_params`) and other recorder settings stay opaque.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordingParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin_url: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `live_recording.recordings`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Recordings {
    /// 1-based index into `live_offering`; 0 or absent means never recorded.
    /// Values that are not a whole number decode as absent.
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_sequence"
    )]
    pub recording_sequence: Option<i64>,
    pub live_offering: Vec<RecordingPeriod>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Recordings {
    /// The period `recording_sequence` points at, if it exists
    pub fn current_period(&self) -> Option<&RecordingPeriod> {
        let sequence = self.recording_sequence.filter(|seq| *seq > 0)?;
        let index = usize::try_from(sequence - 1).ok()?;
        self.live_offering.get(index)
    }
}

fn lenient_sequence<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(Value::Number(n)) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        _ => None,
    })
}

/// One element of `live_offering`, appended by the recorder
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordingPeriod {
    pub start_time_epoch_sec: i64,
    /// 0 while the period is still open
    pub end_time_epoch_sec: i64,
    pub recording_start_time_epoch_sec: i64,
    pub video_finalized_parts_info: FinalizedPartsInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub live_recording_handle: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Aggregate counters for finalized video parts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FinalizedPartsInfo {
    pub n_parts: u64,
    /// Microseconds since the epoch; 0 until the first part is finalized
    pub last_finalization_time: i64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RecordingPeriod {
    pub fn is_open(&self) -> bool {
        self.end_time_epoch_sec == 0
    }

    pub fn handle(&self) -> Option<&str> {
        self.live_recording_handle
            .as_deref()
            .filter(|handle| !handle.trim().is_empty())
    }

    pub fn has_finalized_parts(&self) -> bool {
        self.video_finalized_parts_info.last_finalization_time != 0
    }

    /// Seconds elapsed since the last part was finalized; `None` before the
    /// first finalization
    pub fn since_last_finalize_sec(&self, now: DateTime<Utc>) -> Option<f64> {
        if !self.has_finalized_parts() {
            return None;
        }
        let last_usec = self.video_finalized_parts_info.last_finalization_time as f64;
        let now_usec = now.timestamp_micros() as f64;
        Some((now_usec - last_usec) / 1e6)
    }
}

/// `live_recording.status`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistedStatus {
    pub state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recording_stop_time: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PersistedStatus {
    pub fn active() -> Self {
        Self {
            state: meta::STATE_ACTIVE.to_string(),
            ..Default::default()
        }
    }

    pub fn closed(recording_stop_time: i64) -> Self {
        Self {
            state: meta::STATE_CLOSED.to_string(),
            recording_stop_time: Some(recording_stop_time),
            ..Default::default()
        }
    }
}
