//! Environment constants and path utilities for live recording control.
//!
//! This module centralizes the hardcoded paths, metadata keys, endpoint
//! fragments and defaults used throughout the application, making them easier
//! to maintain and modify.

use std::path::{Path, PathBuf};

/// Main application directory name (hidden directory like .git, .vscode)
pub const LRC_DIR_NAME: &str = ".lrc";

/// Configuration file name
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Configuration file name looked up directly in the current directory
pub const LOCAL_CONFIG_FILE_NAME: &str = "lrc.toml";

/// Environment variable overriding the fabric URL
pub const FABRIC_URL_VAR: &str = "LRC_FABRIC_URL";

/// Environment variable overriding the fabric bearer token
pub const AUTH_TOKEN_VAR: &str = "LRC_AUTH_TOKEN";

/// Default log filter when `RUST_LOG` is not set
pub const DEFAULT_LOG_FILTER: &str = "lrc=info";

/// Content metadata keys. Field names and nesting are an external contract.
pub mod meta {
    /// Root key holding all live recording metadata
    pub const LIVE_RECORDING: &str = "live_recording";

    /// Fabric configuration subtree (ingress node, edge write token)
    pub const FABRIC_CONFIG: &str = "live_recording/fabric_config";

    /// Recording bookkeeping subtree (sequence and periods)
    pub const RECORDINGS: &str = "live_recording/recordings";

    /// Persisted session status subtree
    pub const STATUS: &str = "live_recording/status";

    /// Persisted state label for an open edge session
    pub const STATE_ACTIVE: &str = "active";

    /// Persisted state label for a closed edge session
    pub const STATE_CLOSED: &str = "closed";
}

/// Fabric node endpoint fragments
pub mod endpoints {
    /// Content libraries route prefix
    pub const QLIBS: &str = "qlibs";

    /// Start the live recording process
    pub const LIVE_START: &str = "call/live/start";

    /// Stop the live recording process, followed by the handle
    pub const LIVE_STOP: &str = "call/live/stop";

    /// Live recording process status, followed by the handle
    pub const LIVE_STATUS: &str = "call/live/status";

    /// Scheme prepended to node addresses that carry none
    pub const DEFAULT_SCHEME: &str = "https://";
}

/// Polling and staleness defaults
pub mod polling {
    /// Delay between two convergence probes, in milliseconds
    pub const DEFAULT_INTERVAL_MS: u64 = 1000;

    /// Number of probes before a convergence loop gives up
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

    /// Seconds without a finalized part before a running LRO counts as stalled
    pub const DEFAULT_STALL_THRESHOLD_SECS: f64 = 32.9;

    /// HTTP request timeout, in seconds
    pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
}

/// Test-related constants
pub mod test {
    /// Session name used across unit tests
    pub const TEST_SESSION: &str = "s1";

    /// Object id used across unit tests
    pub const TEST_OBJECT_ID: &str = "iq__X";

    /// Library id used across unit tests
    pub const TEST_LIBRARY_ID: &str = "ilibY";

    /// Environment variable enabling tests against a real fabric node
    pub const RUN_FABRIC_TESTS_VAR: &str = "RUN_FABRIC_TESTS";
}

/// Build config directory path in user's home directory
pub fn user_config_dir_path(home_dir: &Path) -> PathBuf {
    home_dir.join(LRC_DIR_NAME)
}

/// Build config file path in user's home directory
pub fn user_config_file_path(home_dir: &Path) -> PathBuf {
    user_config_dir_path(home_dir).join(CONFIG_FILE_NAME)
}

/// Build local config file path in current directory
pub fn local_config_file_path(current_dir: &Path) -> PathBuf {
    current_dir.join(LRC_DIR_NAME).join(CONFIG_FILE_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_paths() {
        let home_dir = Path::new("/home/user");
        let current_dir = Path::new("/current/project");

        assert_eq!(
            user_config_file_path(home_dir),
            Path::new("/home/user/.lrc/config.toml")
        );

        assert_eq!(
            local_config_file_path(current_dir),
            Path::new("/current/project/.lrc/config.toml")
        );
    }

    #[test]
    fn test_metadata_paths_nest_under_root() {
        for path in [meta::FABRIC_CONFIG, meta::RECORDINGS, meta::STATUS] {
            assert!(path.starts_with(meta::LIVE_RECORDING));
        }
    }
}
