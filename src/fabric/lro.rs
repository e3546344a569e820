//! Live recording process (LRO) client.
//!
//! Each operation is a single HTTP call with no retry of its own. Callers
//! decide how to interpret failures: the status resolver maps probe errors to
//! `stopped`, the session controller only logs control call results.

use super::types::{ControlAck, FabricConfig, FabricError, LroStatusReport, LroTarget};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use tracing::{debug, info, warn};

/// Start/stop/status calls against a fabric node's LRO endpoints
#[async_trait]
pub trait LroClient: Send + Sync {
    /// `POST .../call/live/start`
    async fn start(&self, target: &LroTarget) -> Result<ControlAck, FabricError>;

    /// `POST .../call/live/stop/{handle}`
    async fn stop(&self, target: &LroTarget, handle: &str) -> Result<ControlAck, FabricError>;

    /// `GET` a status URL built by [`LroTarget::status_url`]
    async fn probe(&self, url: &str) -> Result<LroStatusReport, FabricError>;
}

/// [`LroClient`] over `reqwest`
#[derive(Debug, Clone)]
pub struct HttpLroClient {
    client: Client,
    auth_token: Option<String>,
}

impl HttpLroClient {
    pub fn new(config: &FabricConfig) -> Result<Self, FabricError> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| FabricError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            auth_token: config.auth_token.clone(),
        })
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.auth_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn post_control(&self, url: String) -> Result<ControlAck, FabricError> {
        debug!("POST {}", url);
        let response = self.authorize(self.client.post(&url)).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FabricError::Status {
                status: status.as_u16(),
                url,
            });
        }

        let body = response.bytes().await?;
        Ok(ControlAck::from_body(&body))
    }
}

#[async_trait]
impl LroClient for HttpLroClient {
    async fn start(&self, target: &LroTarget) -> Result<ControlAck, FabricError> {
        self.post_control(target.start_url()).await
    }

    async fn stop(&self, target: &LroTarget, handle: &str) -> Result<ControlAck, FabricError> {
        self.post_control(target.stop_url(handle)).await
    }

    async fn probe(&self, url: &str) -> Result<LroStatusReport, FabricError> {
        debug!("GET {}", url);
        let response = self.authorize(self.client.get(url)).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FabricError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

/// Log the result of a fire-and-forget control call.
///
/// Callers never branch on a control call's result: success can only be
/// confirmed by polling status. An empty body is logged at debug level,
/// transport and HTTP failures as warnings.
pub fn report_control_result(action: &str, session: &str, result: &Result<ControlAck, FabricError>) {
    match result {
        Ok(ControlAck::Empty) => {
            debug!("LRO {} for '{}' accepted (empty response)", action, session)
        }
        Ok(ControlAck::Body(body)) => {
            info!("LRO {} for '{}' accepted: {}", action, session, body)
        }
        Err(FabricError::Status { status, url }) => {
            warn!("LRO {} for '{}' rejected with HTTP {} ({})", action, session, status, url)
        }
        Err(e) => warn!("LRO {} for '{}' failed: {}", action, session, e),
    }
}
