use chrono::{TimeZone, Utc};
use lrc::fabric::{ContentEdit, MetadataGateway};
use lrc::session::Clock;
use lrc::{
    ControlOutcome, LiveControl, LrcConfig, ManualClock, MockFabric, SessionError, SessionState,
    StaticTokenIssuer,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const CONFIG: &str = r#"
[fabric]
url = "https://fabric.example.com"

[streams.channel-one]
object_id = "iq__Chan1"
library_id = "ilibLive"

[streams.channel-two]
object_id = "iq__Chan2"
library_id = "ilibLive"
node_hint = "node-b.example.com"
"#;

struct Setup {
    fabric: Arc<MockFabric>,
    clock: Arc<ManualClock>,
    control: LiveControl,
}

fn setup() -> Setup {
    let config = LrcConfig::from_toml_str(CONFIG).expect("sample config parses");
    let fabric = Arc::new(MockFabric::new());
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 9, 1, 8, 0, 0).unwrap(),
    ));
    let dyn_clock: Arc<dyn Clock> = clock.clone();

    fabric.set_content(
        "iq__Chan1",
        json!({
            "live_recording": {
                "fabric_config": { "ingress_node_api": "https://node-a.example.com" },
                "recording_config": {
                    "recording_params": { "origin_url": "srt://origin.example.com:9000" }
                }
            }
        }),
    );

    let control = LiveControl::with_components(
        config,
        fabric.clone(),
        fabric.clone(),
        Arc::new(StaticTokenIssuer::new(Some("atxsj_ingest".to_string()))),
        dyn_clock,
    )
    .expect("components wire up");

    Setup {
        fabric,
        clock,
        control,
    }
}

/// What the recorder writes once an LRO has been started
async fn record_period(fabric: &MockFabric, edge_write_token: &str, handle: &str) {
    let edit = ContentEdit {
        library_id: "ilibLive".to_string(),
        object_id: "iq__Chan1".to_string(),
        write_token: edge_write_token.to_string(),
    };
    fabric
        .merge_metadata(
            &edit,
            "live_recording/recordings",
            &json!({
                "recording_sequence": 1,
                "live_offering": [{
                    "start_time_epoch_sec": 1725177600,
                    "end_time_epoch_sec": 0,
                    "live_recording_handle": handle,
                    "video_finalized_parts_info": { "n_parts": 0, "last_finalization_time": 0 }
                }]
            }),
        )
        .await
        .expect("mock merge succeeds");
}

#[tokio::test]
async fn test_full_session_lifecycle() {
    let Setup {
        fabric,
        clock,
        control,
    } = setup();
    let cancel = CancellationToken::new();

    let session = control
        .edge()
        .start_session("channel-one")
        .await
        .expect("session starts");
    assert_eq!(session.fabric_api, "https://node-a.example.com");
    assert_eq!(session.ingest_token, "atxsj_ingest");

    let status = control
        .controller()
        .status("channel-one", false)
        .await
        .unwrap();
    assert_eq!(status.state, SessionState::Inactive);
    assert_eq!(
        status.edge_write_token.as_deref(),
        Some(session.edge_write_token.as_str())
    );

    record_period(&fabric, &session.edge_write_token, "tlro_7").await;
    fabric.script_probes(&["terminated", "running"]);

    let outcome = control.controller().start("channel-one", &cancel).await;
    assert!(
        matches!(outcome, ControlOutcome::Converged(_)),
        "{:?}",
        outcome
    );
    assert_eq!(outcome.status().unwrap().state, SessionState::Starting);
    assert_eq!(outcome.status().unwrap().tlro.as_deref(), Some("tlro_7"));

    fabric.script_probes(&["running", "terminated"]);
    let closed = control
        .edge()
        .stop_session("channel-one", &cancel)
        .await
        .expect("session stops");
    assert_eq!(closed.state, "closed");
    assert_eq!(closed.recording_stop_time, clock.now().timestamp());

    let persisted = fabric
        .read_metadata(
            "ilibLive",
            &session.edge_write_token,
            "live_recording/status",
        )
        .await
        .unwrap();
    assert_eq!(persisted.unwrap()["state"], "closed");

    let calls = fabric.calls();
    assert_eq!(calls.starts.len(), 1);
    assert_eq!(calls.stops.len(), 1);
    assert_eq!(calls.finalized.len(), 1);
    assert!(
        calls.stops[0].starts_with("https://node-a.example.com/qlibs/ilibLive/q/tqw__"),
        "{}",
        calls.stops[0]
    );
}

#[tokio::test]
async fn test_sessions_are_independent() {
    let Setup { fabric, control, .. } = setup();

    fabric.set_content(
        "iq__Chan2",
        json!({"live_recording": {"fabric_config": {"edge_write_token": "tqw__B"}}}),
    );

    let two = control
        .controller()
        .status("channel-two", false)
        .await
        .unwrap();
    assert_eq!(two.fabric_api.as_deref(), Some("https://node-b.example.com"));
    assert_eq!(two.state, SessionState::Inactive);

    let one = control
        .controller()
        .status("channel-one", false)
        .await
        .unwrap();
    assert!(one.edge_write_token.is_none());
    assert_eq!(control.registry().len(), 2);
}

#[tokio::test]
async fn test_unknown_session_reported() {
    let Setup { control, .. } = setup();

    assert!(matches!(
        control.controller().status("channel-nine", false).await,
        Err(SessionError::ConfigNotFound(_))
    ));
    assert!(matches!(
        control
            .edge()
            .stop_session("channel-nine", &CancellationToken::new())
            .await,
        Err(SessionError::ConfigNotFound(_))
    ));
}

#[tokio::test]
async fn test_stop_gives_up_after_poll_budget() {
    let Setup {
        fabric,
        clock,
        control,
    } = setup();
    let session = control.edge().start_session("channel-one").await.unwrap();
    record_period(&fabric, &session.edge_write_token, "tlro_8").await;
    fabric.set_probe_default("running");

    let outcome = control
        .controller()
        .stop("channel-one", &CancellationToken::new())
        .await;

    assert!(matches!(outcome, ControlOutcome::TimedOut(_)));
    assert!(!outcome.is_success());
    assert_eq!(clock.sleeps(), vec![Duration::from_secs(1); 10]);
}

#[test]
fn test_http_wiring_requires_fabric_url() {
    let mut config = LrcConfig::from_toml_str(CONFIG).unwrap();
    config.fabric.url = String::new();

    assert!(LiveControl::new(config).is_err());
}
