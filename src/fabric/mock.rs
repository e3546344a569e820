//! In-memory fabric for tests and dry runs.
//!
//! [`MockFabric`] implements both [`MetadataGateway`] and [`LroClient`].
//! Metadata is stored per content id (object id or write token); opening an
//! edit copies the object's metadata, finalizing copies it back. LRO probes
//! answer from a script, then from a default response, and every call is
//! counted.

use super::lro::LroClient;
use super::metadata::{ContentEdit, MetadataGateway};
use super::types::{ControlAck, FabricError, LroStatusReport, LroTarget};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

/// Calls observed by a [`MockFabric`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MockCalls {
    pub probes: Vec<String>,
    pub starts: Vec<String>,
    pub stops: Vec<String>,
    pub merges: Vec<(String, String)>,
    pub replaces: Vec<(String, String)>,
    pub finalized: Vec<String>,
}

#[derive(Debug, Default)]
struct MockState {
    content: HashMap<String, Value>,
    probe_script: VecDeque<Result<String, FabricError>>,
    probe_default: Option<Result<String, FabricError>>,
    control_response: Option<Result<ControlAck, FabricError>>,
    fail_reads: bool,
    next_id: u32,
    calls: MockCalls,
}

/// In-memory [`MetadataGateway`] and [`LroClient`]
#[derive(Debug, Default)]
pub struct MockFabric {
    state: Mutex<MockState>,
}

impl MockFabric {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Set the full metadata of an object or write token
    pub fn set_content(&self, content_id: &str, metadata: Value) {
        self.state()
            .content
            .insert(content_id.to_string(), metadata);
    }

    pub fn content(&self, content_id: &str) -> Option<Value> {
        self.state().content.get(content_id).cloned()
    }

    /// Queue probe answers consumed one per probe
    pub fn script_probes(&self, states: &[&str]) {
        self.state()
            .probe_script
            .extend(states.iter().map(|state| Ok(state.to_string())));
    }

    /// Queue a failing probe
    pub fn script_probe_error(&self, error: FabricError) {
        self.state().probe_script.push_back(Err(error));
    }

    /// Answer for probes once the script is empty
    pub fn set_probe_default(&self, state: &str) {
        self.state().probe_default = Some(Ok(state.to_string()));
    }

    pub fn set_probe_default_error(&self, error: FabricError) {
        self.state().probe_default = Some(Err(error));
    }

    /// Answer for start/stop calls; defaults to an empty 2xx body
    pub fn set_control_response(&self, response: Result<ControlAck, FabricError>) {
        self.state().control_response = Some(response);
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.state().fail_reads = fail;
    }

    pub fn calls(&self) -> MockCalls {
        self.state().calls.clone()
    }

    fn next_id(&self, prefix: &str) -> String {
        let mut state = self.state();
        state.next_id += 1;
        format!("{}{}", prefix, state.next_id)
    }

    fn control_response(&self) -> Result<ControlAck, FabricError> {
        self.state()
            .control_response
            .clone()
            .unwrap_or(Ok(ControlAck::Empty))
    }
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|segment| !segment.is_empty())
}

fn lookup<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    segments(path).try_fold(root, |node, segment| node.get(segment))
}

/// Wrap `value` in one object level per path segment
fn nest(path: &str, value: Value) -> Value {
    let segments: Vec<&str> = segments(path).collect();
    segments.into_iter().rev().fold(value, |inner, segment| {
        let mut map = Map::new();
        map.insert(segment.to_string(), inner);
        Value::Object(map)
    })
}

/// Recursive object merge; non-object values overwrite
pub fn merge_json(target: &mut Value, patch: &Value) {
    match (target, patch) {
        (Value::Object(target), Value::Object(patch)) => {
            for (key, value) in patch {
                merge_json(target.entry(key.clone()).or_insert(Value::Null), value);
            }
        }
        (target, patch) => *target = patch.clone(),
    }
}

#[async_trait]
impl MetadataGateway for MockFabric {
    async fn read_metadata(
        &self,
        _library_id: &str,
        content_id: &str,
        path: &str,
    ) -> Result<Option<Value>, FabricError> {
        let state = self.state();
        if state.fail_reads {
            return Err(FabricError::Network("metadata read failed".to_string()));
        }
        Ok(state
            .content
            .get(content_id)
            .and_then(|root| lookup(root, path))
            .cloned())
    }

    async fn open_edit(&self, _library_id: &str, object_id: &str) -> Result<String, FabricError> {
        let token = self.next_id("tqw__");
        let mut state = self.state();
        let base = state
            .content
            .get(object_id)
            .cloned()
            .unwrap_or(Value::Object(Map::new()));
        state.content.insert(token.clone(), base);
        Ok(token)
    }

    async fn merge_metadata(
        &self,
        edit: &ContentEdit,
        path: &str,
        value: &Value,
    ) -> Result<(), FabricError> {
        let mut state = self.state();
        state
            .calls
            .merges
            .push((edit.write_token.clone(), path.to_string()));
        let root = state
            .content
            .entry(edit.write_token.clone())
            .or_insert(Value::Object(Map::new()));
        merge_json(root, &nest(path, value.clone()));
        Ok(())
    }

    async fn replace_metadata(
        &self,
        edit: &ContentEdit,
        path: &str,
        value: &Value,
    ) -> Result<(), FabricError> {
        let mut state = self.state();
        state
            .calls
            .replaces
            .push((edit.write_token.clone(), path.to_string()));
        let root = state
            .content
            .entry(edit.write_token.clone())
            .or_insert(Value::Object(Map::new()));
        merge_json(root, &nest(path, Value::Null));
        merge_json(root, &nest(path, value.clone()));
        Ok(())
    }

    async fn finalize(&self, edit: &ContentEdit) -> Result<String, FabricError> {
        let hash = self.next_id("hq__");
        let mut state = self.state();
        let staged = state.content.remove(&edit.write_token).ok_or_else(|| {
            FabricError::Status {
                status: 404,
                url: edit.write_token.clone(),
            }
        })?;
        state.content.insert(edit.object_id.clone(), staged);
        state.calls.finalized.push(edit.write_token.clone());
        Ok(hash)
    }
}

#[async_trait]
impl LroClient for MockFabric {
    async fn start(&self, target: &LroTarget) -> Result<ControlAck, FabricError> {
        self.state().calls.starts.push(target.start_url());
        self.control_response()
    }

    async fn stop(&self, target: &LroTarget, handle: &str) -> Result<ControlAck, FabricError> {
        self.state().calls.stops.push(target.stop_url(handle));
        self.control_response()
    }

    async fn probe(&self, url: &str) -> Result<LroStatusReport, FabricError> {
        let mut state = self.state();
        state.calls.probes.push(url.to_string());
        let answer = match state.probe_script.pop_front() {
            Some(answer) => answer,
            None => state.probe_default.clone().unwrap_or_else(|| {
                Err(FabricError::Status {
                    status: 404,
                    url: url.to_string(),
                })
            }),
        };
        answer.map(|state| LroStatusReport { state })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_merge_json_is_deep() {
        let mut target = json!({"a": {"b": 1, "c": 2}, "d": 3});
        merge_json(&mut target, &json!({"a": {"b": 10}, "e": 4}));
        assert_eq!(target, json!({"a": {"b": 10, "c": 2}, "d": 3, "e": 4}));
    }

    #[test]
    fn test_nest_builds_path() {
        assert_eq!(
            nest("live_recording/status", json!({"state": "closed"})),
            json!({"live_recording": {"status": {"state": "closed"}}})
        );
    }

    #[tokio::test]
    async fn test_edit_then_finalize_publishes() {
        let fabric = MockFabric::new();
        fabric.set_content("iq__X", json!({"live_recording": {"fabric_config": {}}}));

        let token = fabric.open_edit("ilibY", "iq__X").await.unwrap();
        let edit = ContentEdit {
            library_id: "ilibY".to_string(),
            object_id: "iq__X".to_string(),
            write_token: token.clone(),
        };
        fabric
            .merge_metadata(
                &edit,
                "live_recording/fabric_config",
                &json!({"edge_write_token": "tqw__E"}),
            )
            .await
            .unwrap();

        let before = fabric
            .read_metadata("ilibY", "iq__X", "live_recording/fabric_config/edge_write_token")
            .await
            .unwrap();
        assert!(before.is_none());

        fabric.finalize(&edit).await.unwrap();
        let after = fabric
            .read_metadata("ilibY", "iq__X", "live_recording/fabric_config/edge_write_token")
            .await
            .unwrap();
        assert_eq!(after, Some(json!("tqw__E")));
        assert!(fabric.content(&token).is_none());
    }
}
