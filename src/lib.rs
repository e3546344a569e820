//! # Live Recording Control
//!
//! Control of live recording sessions on a content fabric node. A session is
//! a named content object whose metadata tracks an edge write token and a
//! list of recording periods. Recording itself runs as a long-running
//! operation (LRO) on the ingress node, driven over HTTP.
//!
//! ## Architecture Overview
//!
//! - **[`fabric`]**: HTTP clients for content metadata and the LRO endpoints,
//!   plus an in-memory fabric for tests
//! - **[`session`]**: status resolution, convergent start/stop/reset, and
//!   edge session lifecycle
//! - **[`integration`]**: configuration file and component wiring
//! - **[`cli`]**: command line front end for the `lrc` binary
//!
//! ## Session States
//!
//! A status is resolved from metadata and a single LRO probe:
//!
//! - `inactive`: no edge write token or no current recording period
//! - `starting`: LRO running, no part finalized yet
//! - `running`: LRO running, parts finalized recently
//! - `stalled`: LRO running, last finalization older than the threshold
//! - `stopped`: the LRO status probe failed
//! - `terminated`: the LRO finished
//!
//! Control operations never trust the response of a control call. They poll
//! status at a fixed interval until the target state is observed or the
//! attempt budget runs out.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use lrc::{LiveControl, LrcConfig, SessionState};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = LrcConfig::from_toml_file("lrc.toml")?;
//!     let control = LiveControl::new(config)?;
//!
//!     let status = control.controller().status("s1", false).await?;
//!     if status.state == SessionState::Stalled {
//!         println!("{} has not finalized a part in a while", status.name);
//!     }
//!     Ok(())
//! }
//! ```

/// Session status, control, and edge session lifecycle.
///
/// Holds no durable state: every decision is made on a freshly resolved
/// status.
pub mod session;

/// Content fabric clients.
///
/// Metadata reads and edits, LRO control calls, and authorization tokens,
/// each behind a trait with an HTTP and an in-memory implementation.
pub mod fabric;

/// Configuration and wiring of the live recording control stack.
pub mod integration;

/// Command-line interface.
pub mod cli;

/// Centralized constants: metadata keys, endpoints, defaults.
pub mod env;

pub use fabric::{
    FabricConfig, FabricError, HttpLroClient, HttpMetadataGateway, LroClient, MetadataGateway,
    MockFabric, StaticTokenIssuer, TokenIssuer,
};
pub use integration::{LiveControl, LrcConfig};
pub use session::{
    ClosedSession, ConfigError, ControlOperation, ControlOutcome, EdgeSession,
    EdgeSessionManager, ManualClock, PollPolicy, SessionController, SessionError,
    SessionRegistry, SessionState, SessionStatus, StatusResolver, SystemClock,
};
