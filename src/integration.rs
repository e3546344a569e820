//! # System Wiring
//!
//! Combines configuration, the fabric clients and the session layer into one
//! [`LiveControl`] handle used by the CLI.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                     LiveControl                      │
//! │  ┌──────────────┐  ┌───────────────┐  ┌────────────┐ │
//! │  │    Edge      │─▶│    Session    │─▶│   Status   │ │
//! │  │   Session    │  │  Controller   │  │  Resolver  │ │
//! │  │   Manager    │  └───────────────┘  └────────────┘ │
//! │  └──────────────┘          │                 │       │
//! │         ▼                  ▼                 ▼       │
//! │  MetadataGateway       LroClient      MetadataGateway│
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use lrc::{LiveControl, LrcConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = LrcConfig::from_toml_file("lrc.toml")?;
//!     let control = LiveControl::new(config)?;
//!
//!     let outcome = control.controller().start("s1", &CancellationToken::new()).await;
//!     println!("{}", outcome.label());
//!     Ok(())
//! }
//! ```

use crate::env;
use crate::fabric::{
    FabricConfig, HttpLroClient, HttpMetadataGateway, LroClient, MetadataGateway,
    StaticTokenIssuer, TokenIssuer,
};
use crate::session::{
    Clock, ConfigError, EdgeSessionManager, PollingConfig, SessionController, SessionEntry,
    SessionRegistry, StatusResolver, SystemClock,
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LrcConfig {
    pub fabric: FabricConfig,
    pub polling: PollingConfig,
    /// Live recording sessions by name
    pub streams: BTreeMap<String, SessionEntry>,
}

impl LrcConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load from TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            ConfigError::Io(format!("{}: {}", path.as_ref().display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Save to TOML file
    pub fn to_toml_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))?;
        std::fs::write(path.as_ref(), content)
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.as_ref().display(), e)))
    }

    /// Apply `LRC_FABRIC_URL` and `LRC_AUTH_TOKEN` when set
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var(env::FABRIC_URL_VAR)
            && !url.trim().is_empty()
        {
            debug!("Fabric URL overridden by {}", env::FABRIC_URL_VAR);
            self.fabric.url = url;
        }
        if let Ok(token) = std::env::var(env::AUTH_TOKEN_VAR)
            && !token.trim().is_empty()
        {
            debug!("Auth token overridden by {}", env::AUTH_TOKEN_VAR);
            self.fabric.auth_token = Some(token);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.polling.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "polling.max_attempts must be at least 1".to_string(),
            ));
        }
        if !self.polling.stall_threshold_secs.is_finite() || self.polling.stall_threshold_secs <= 0.0
        {
            return Err(ConfigError::Invalid(
                "polling.stall_threshold_secs must be positive".to_string(),
            ));
        }
        SessionRegistry::from_entries(&self.streams).map(|_| ())
    }
}

/// Fully wired live recording control
pub struct LiveControl {
    registry: Arc<SessionRegistry>,
    controller: Arc<SessionController>,
    edge: EdgeSessionManager,
}

impl LiveControl {
    /// Wire the HTTP fabric clients from configuration
    pub fn new(config: LrcConfig) -> Result<Self> {
        config.validate()?;

        let gateway: Arc<dyn MetadataGateway> = Arc::new(
            HttpMetadataGateway::new(&config.fabric).context("Failed to create metadata gateway")?,
        );
        let lro: Arc<dyn LroClient> =
            Arc::new(HttpLroClient::new(&config.fabric).context("Failed to create LRO client")?);
        let tokens: Arc<dyn TokenIssuer> =
            Arc::new(StaticTokenIssuer::new(config.fabric.auth_token.clone()));

        Self::with_components(config, gateway, lro, tokens, Arc::new(SystemClock))
    }

    /// Wire caller-provided collaborators
    pub fn with_components(
        config: LrcConfig,
        gateway: Arc<dyn MetadataGateway>,
        lro: Arc<dyn LroClient>,
        tokens: Arc<dyn TokenIssuer>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let registry = Arc::new(SessionRegistry::from_entries(&config.streams)?);

        let resolver = Arc::new(StatusResolver::new(
            registry.clone(),
            gateway.clone(),
            lro.clone(),
            clock.clone(),
            config.polling.stall_threshold_secs,
        ));
        let controller = Arc::new(SessionController::new(
            resolver,
            lro,
            clock.clone(),
            config.polling.policy(),
        ));
        let edge = EdgeSessionManager::new(gateway, tokens, controller.clone(), clock);

        info!("Live recording control ready with {} sessions", registry.len());
        Ok(Self {
            registry,
            controller,
            edge,
        })
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn controller(&self) -> &SessionController {
        &self.controller
    }

    pub fn edge(&self) -> &EdgeSessionManager {
        &self.edge
    }
}
