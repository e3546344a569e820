use crate::env::{endpoints, polling};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Connection settings for the content fabric
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FabricConfig {
    /// Base URL of the fabric node used for content metadata calls
    pub url: String,
    /// Bearer token attached to every fabric request
    pub auth_token: Option<String>,
    pub request_timeout_secs: u64,
}

impl Default for FabricConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            auth_token: None,
            request_timeout_secs: polling::DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl FabricConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Errors raised while talking to the fabric
#[derive(Debug, Clone, thiserror::Error)]
pub enum FabricError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Invalid fabric configuration: {0}")]
    Config(String),
}

impl From<reqwest::Error> for FabricError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            FabricError::Parse(error.to_string())
        } else if let Some(status) = error.status() {
            FabricError::Status {
                status: status.as_u16(),
                url: error.url().map(|u| u.to_string()).unwrap_or_default(),
            }
        } else {
            FabricError::Network(error.to_string())
        }
    }
}

impl From<serde_json::Error> for FabricError {
    fn from(error: serde_json::Error) -> Self {
        FabricError::Parse(error.to_string())
    }
}

/// Body of `GET .../call/live/status/{handle}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LroStatusReport {
    pub state: String,
}

/// Acknowledgement of a start/stop control call.
///
/// The LRO endpoints frequently answer a successful call with an empty body,
/// which is not valid JSON. That case is `Empty`, not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlAck {
    Empty,
    Body(serde_json::Value),
}

impl ControlAck {
    pub fn from_body(body: &[u8]) -> Self {
        let text = String::from_utf8_lossy(body);
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return ControlAck::Empty;
        }
        match serde_json::from_str(trimmed) {
            Ok(value) => ControlAck::Body(value),
            Err(_) => ControlAck::Body(serde_json::Value::String(trimmed.to_string())),
        }
    }
}

/// Addresses the LRO of one content object through its edge write token
#[derive(Debug, Clone, PartialEq)]
pub struct LroTarget {
    pub fabric_api: String,
    pub library_id: String,
    pub object_id: String,
    pub write_token: String,
}

impl LroTarget {
    fn base(&self) -> String {
        format!(
            "{}/{}/{}/q/{}",
            self.fabric_api.trim_end_matches('/'),
            endpoints::QLIBS,
            self.library_id,
            self.write_token
        )
    }

    pub fn start_url(&self) -> String {
        format!("{}/{}", self.base(), endpoints::LIVE_START)
    }

    pub fn stop_url(&self, handle: &str) -> String {
        format!("{}/{}/{}", self.base(), endpoints::LIVE_STOP, handle)
    }

    pub fn status_url(&self, handle: &str) -> String {
        format!("{}/{}/{}", self.base(), endpoints::LIVE_STATUS, handle)
    }
}

/// Turn a node address from metadata into an absolute base URL.
///
/// Addresses without a scheme get `https://`. Trailing slashes are dropped.
pub fn normalize_node_api(raw: &str) -> Result<String, FabricError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(FabricError::Config("empty ingress node API".to_string()));
    }

    let absolute = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("{}{}", endpoints::DEFAULT_SCHEME, trimmed)
    };

    let parsed = url::Url::parse(&absolute)
        .map_err(|e| FabricError::Config(format!("invalid node API '{}': {}", raw, e)))?;
    if parsed.host_str().is_none() {
        return Err(FabricError::Config(format!("node API '{}' has no host", raw)));
    }

    Ok(absolute.trim_end_matches('/').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target() -> LroTarget {
        LroTarget {
            fabric_api: "https://node.example.com/".to_string(),
            library_id: "ilibY".to_string(),
            object_id: "iq__X".to_string(),
            write_token: "tqw__T".to_string(),
        }
    }

    #[test]
    fn test_normalize_adds_scheme() {
        assert_eq!(
            normalize_node_api("node.example.com").unwrap(),
            "https://node.example.com"
        );
        assert_eq!(
            normalize_node_api("http://10.0.0.1:8008/").unwrap(),
            "http://10.0.0.1:8008"
        );
    }

    #[test]
    fn test_normalize_rejects_empty() {
        assert!(matches!(
            normalize_node_api("  "),
            Err(FabricError::Config(_))
        ));
    }

    #[test]
    fn test_lro_urls() {
        let target = target();
        assert_eq!(
            target.start_url(),
            "https://node.example.com/qlibs/ilibY/q/tqw__T/call/live/start"
        );
        assert_eq!(
            target.stop_url("h1"),
            "https://node.example.com/qlibs/ilibY/q/tqw__T/call/live/stop/h1"
        );
        assert_eq!(
            target.status_url("h1"),
            "https://node.example.com/qlibs/ilibY/q/tqw__T/call/live/status/h1"
        );
    }

    #[test]
    fn test_control_ack_empty_body() {
        assert_eq!(ControlAck::from_body(b""), ControlAck::Empty);
        assert_eq!(ControlAck::from_body(b"  \n"), ControlAck::Empty);
        assert_eq!(
            ControlAck::from_body(br#"{"handle":"h1"}"#),
            ControlAck::Body(serde_json::json!({"handle": "h1"}))
        );
    }
}
